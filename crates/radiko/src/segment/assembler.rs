use aac::{AdtsHeader, count_frames, has_adts_sync};
use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use crate::time::RadikoTime;

pub const AAC_MIME: &str = "audio/aac";

/// The assembled broadcast, ready for a file sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AacArtifact {
    pub filename: String,
    pub mime: &'static str,
    pub data: Bytes,
}

/// `RADIKO_<station>_<YYYYMMDD>_<HHMMSS>.aac`
pub fn artifact_filename(station: &str, start: RadikoTime) -> String {
    format!(
        "RADIKO_{}_{}_{}.aac",
        station,
        start.date_part(),
        start.time_part()
    )
}

/// Concatenates payloads in the order given, which must be ordinal order.
pub fn assemble(station: &str, start: RadikoTime, payloads: Vec<Bytes>) -> AacArtifact {
    let len = payloads.iter().map(Bytes::len).sum();
    let mut data = BytesMut::with_capacity(len);
    for payload in payloads {
        data.extend_from_slice(&payload);
    }
    let data = data.freeze();
    log_stream_info(&data);

    AacArtifact {
        filename: artifact_filename(station, start),
        mime: AAC_MIME,
        data,
    }
}

/// Logs the stream parameters of the first ADTS frame. Informational only.
pub fn log_stream_info(data: &[u8]) {
    if !has_adts_sync(data) {
        warn!(len = data.len(), "Assembled output does not start with an ADTS frame");
        return;
    }
    match AdtsHeader::parse(data) {
        Ok(header) => debug!(
            sample_rate = header.sampling_frequency,
            channels = header.channel_configuration,
            object_type = header.audio_object_type.as_u16(),
            leading_frames = count_frames(data),
            len = data.len(),
            "Assembled ADTS stream"
        ),
        Err(e) => warn!(error = %e, "Could not read the first ADTS header"),
    }
}
