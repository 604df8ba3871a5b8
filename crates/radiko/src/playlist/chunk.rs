use std::time::Duration;

use crate::time::RadikoTime;

/// One playlist request window, `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub from: RadikoTime,
    pub to: RadikoTime,
    /// Seconds from the job start to `from`
    pub elapsed_secs: i64,
}

/// Splits `[start, end)` into consecutive windows of at most `span`.
///
/// The last window always ends exactly at `end`. An empty or inverted range
/// yields no chunks.
pub fn plan_chunks(start: RadikoTime, end: RadikoTime, span: Duration) -> Vec<Chunk> {
    let total = start.seconds_until(end);
    let step = span.as_secs().max(1) as i64;
    let mut chunks = Vec::with_capacity((total.max(0) / step + 1) as usize);

    let mut cursor = start;
    let mut elapsed = 0;
    while elapsed < total {
        let to = if elapsed + step >= total {
            end
        } else {
            cursor.add_seconds(step)
        };
        chunks.push(Chunk {
            from: cursor,
            to,
            elapsed_secs: elapsed,
        });
        elapsed += step;
        cursor = to;
    }
    chunks
}
