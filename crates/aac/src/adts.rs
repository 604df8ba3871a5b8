//! ADTS frame headers.
//!
//! ISO/IEC 14496-3:2019(E) - 1.A.2.2 (adts_fixed_header / adts_variable_header)

use std::io;

/// Length of an ADTS header without CRC.
pub const ADTS_HEADER_LEN: usize = 7;

/// Audio Object Type carried in the ADTS `profile` field (value + 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum AudioObjectType {
    /// AAC main
    AacMain,
    /// AAC LC
    AacLowComplexity,
    /// AAC SSR
    AacScalableSampleRate,
    /// AAC LTP
    AacLongTermPrediction,
}

impl AudioObjectType {
    const fn from_profile(profile: u8) -> Self {
        match profile & 0b11 {
            0 => AudioObjectType::AacMain,
            1 => AudioObjectType::AacLowComplexity,
            2 => AudioObjectType::AacScalableSampleRate,
            _ => AudioObjectType::AacLongTermPrediction,
        }
    }

    /// Converts an AudioObjectType to its numeric object type id
    pub const fn as_u16(&self) -> u16 {
        match self {
            AudioObjectType::AacMain => 1,
            AudioObjectType::AacLowComplexity => 2,
            AudioObjectType::AacScalableSampleRate => 3,
            AudioObjectType::AacLongTermPrediction => 4,
        }
    }
}

/// Sampling frequency table.
///
/// ISO/IEC 14496-3:2019(E) - 1.6.2.4 (Table 1.22)
const SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// Maps a 4-bit sampling frequency index to Hz. Reserved and escape indices
/// have no ADTS meaning and return `None`.
pub const fn sample_rate_from_index(index: u8) -> Option<u32> {
    if (index as usize) < SAMPLE_RATES.len() {
        Some(SAMPLE_RATES[index as usize])
    } else {
        None
    }
}

/// Returns true when `data` begins with the 12-bit ADTS syncword.
pub fn has_adts_sync(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] & 0xF0 == 0xF0
}

/// Decoded fixed + variable ADTS header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct AdtsHeader {
    /// MPEG-2 (true) or MPEG-4 (false) identifier bit
    pub mpeg2: bool,
    /// Whether the header is followed by a CRC
    pub protection_absent: bool,
    /// Audio object type
    pub audio_object_type: AudioObjectType,
    /// Sampling frequency in Hz
    pub sampling_frequency: u32,
    /// Channel configuration
    pub channel_configuration: u8,
    /// Frame length including the header
    pub frame_length: u16,
}

impl AdtsHeader {
    /// Parses the header at the start of `data`.
    pub fn parse(data: &[u8]) -> io::Result<Self> {
        if data.len() < ADTS_HEADER_LEN {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "not enough bytes for an ADTS header",
            ));
        }
        if !has_adts_sync(data) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "missing ADTS syncword",
            ));
        }

        let sf_index = (data[2] >> 2) & 0x0F;
        let sampling_frequency = sample_rate_from_index(sf_index).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "Invalid sampling frequency index")
        })?;

        let frame_length = ((data[3] as u16 & 0x03) << 11)
            | ((data[4] as u16) << 3)
            | ((data[5] as u16) >> 5);

        Ok(Self {
            mpeg2: data[1] & 0x08 != 0,
            protection_absent: data[1] & 0x01 != 0,
            audio_object_type: AudioObjectType::from_profile(data[2] >> 6),
            sampling_frequency,
            channel_configuration: ((data[2] & 0x01) << 2) | (data[3] >> 6),
            frame_length,
        })
    }

    /// Header length, including the optional CRC.
    pub const fn header_len(&self) -> usize {
        if self.protection_absent {
            ADTS_HEADER_LEN
        } else {
            ADTS_HEADER_LEN + 2
        }
    }
}

/// Counts consecutive ADTS frames from the start of `data`.
///
/// Stops at the first byte position that does not carry a valid header or
/// at a frame whose declared length overruns the buffer.
pub fn count_frames(data: &[u8]) -> usize {
    let mut offset = 0;
    let mut frames = 0;
    while let Ok(header) = AdtsHeader::parse(&data[offset..]) {
        let len = header.frame_length as usize;
        if len < header.header_len() || offset + len > data.len() {
            break;
        }
        offset += len;
        frames += 1;
    }
    frames
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    // AAC LC, 48 kHz, stereo, 9-byte frame (7 header + 2 payload)
    const FRAME: [u8; 9] = [0xFF, 0xF1, 0x4C, 0x80, 0x01, 0x3F, 0xFC, 0xDE, 0xAD];

    #[test]
    fn test_adts_header_parse() {
        let header = AdtsHeader::parse(&FRAME).unwrap();
        assert_eq!(header.audio_object_type, AudioObjectType::AacLowComplexity);
        assert_eq!(header.sampling_frequency, 48000);
        assert_eq!(header.channel_configuration, 2);
        assert_eq!(header.frame_length, 9);
        assert!(header.protection_absent);
        assert!(!header.mpeg2);
    }

    #[test]
    fn test_missing_sync() {
        let err = AdtsHeader::parse(&[0x49, 0x44, 0x33, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(!has_adts_sync(b"ID3"));
    }

    #[test]
    fn test_count_frames() {
        let mut data = FRAME.to_vec();
        data.extend_from_slice(&FRAME);
        data.extend_from_slice(&FRAME[..4]);
        assert_eq!(count_frames(&data), 2);
    }

    #[test]
    fn test_idx_to_freq() {
        let cases = [
            (0x0, Some(96000)),
            (0x3, Some(48000)),
            (0x4, Some(44100)),
            (0xB, Some(8000)),
            (0xC, Some(7350)),
            (0xD, None),
            (0xF, None),
        ];

        for (idx, freq) in cases {
            assert_eq!(freq, sample_rate_from_index(idx), "Expected frequency for {idx:#x}");
        }
    }
}
