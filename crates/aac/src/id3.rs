//! ID3v2 tag blocks prepended to HLS audio segments.
//!
//! Broadcast segments carry one or more ID3v2 blocks (timed metadata) ahead
//! of the first ADTS frame. Each block is laid out as:
//!
//! | offset | size | field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 3    | `"ID3"`                                |
//! | 3      | 2    | version                                |
//! | 5      | 1    | flags                                  |
//! | 6      | 4    | body size, synchsafe (7 bits per byte) |
//! | 10     | n    | body                                   |

use bytes::Bytes;

/// Magic marker opening every ID3v2 block.
pub const ID3_MAGIC: [u8; 3] = *b"ID3";

/// Size of the fixed ID3v2 header.
pub const ID3_HEADER_LEN: usize = 10;

/// Decodes a 4-byte synchsafe integer.
///
/// Only the low 7 bits of each byte are significant, so the result is at
/// most 28 bits wide. Bit 7 of every byte is ignored.
pub const fn decode_synchsafe(bytes: [u8; 4]) -> u32 {
    ((bytes[0] & 0x7f) as u32) << 21
        | ((bytes[1] & 0x7f) as u32) << 14
        | ((bytes[2] & 0x7f) as u32) << 7
        | (bytes[3] & 0x7f) as u32
}

/// Parsed ID3v2 block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Id3Header {
    /// Major and revision version bytes
    pub version: (u8, u8),
    /// Header flags
    pub flags: u8,
    /// Declared body length, excluding the 10-byte header
    pub body_len: u32,
}

impl Id3Header {
    /// Parses the header at the start of `data`.
    ///
    /// Returns `None` when the magic marker is absent or fewer than ten bytes
    /// are available.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < ID3_HEADER_LEN || data[..3] != ID3_MAGIC {
            return None;
        }

        Some(Self {
            version: (data[3], data[4]),
            flags: data[5],
            body_len: decode_synchsafe([data[6], data[7], data[8], data[9]]),
        })
    }

    /// Total number of bytes occupied by this block.
    pub const fn block_len(&self) -> usize {
        ID3_HEADER_LEN + self.body_len as usize
    }
}

/// Returns the offset of the first byte following every leading ID3v2 block.
///
/// Blocks are skipped back to back while the magic marker is present at the
/// current offset. A declared length running past the end of the buffer is
/// clamped to the buffer length.
pub fn leading_tags_len(data: &[u8]) -> usize {
    let mut offset = 0;
    while let Some(header) = Id3Header::parse(&data[offset..]) {
        offset = offset.saturating_add(header.block_len()).min(data.len());
    }
    offset
}

/// Strips every leading ID3v2 block from a segment.
///
/// The remaining bytes are returned without copying. A buffer that does not
/// start with the magic marker is returned unchanged.
pub fn strip_id3(data: Bytes) -> Bytes {
    let offset = leading_tags_len(&data);
    if offset == 0 {
        return data;
    }
    data.slice(offset..)
}
