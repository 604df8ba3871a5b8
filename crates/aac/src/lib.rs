//! Framing helpers for AAC audio delivered over HLS.
//!
//! Timefree segments are raw ADTS streams with ID3v2 timed-metadata blocks
//! prepended. This crate strips those blocks and inspects ADTS headers so the
//! reassembled stream can be sanity checked.
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or
//! [Apache-2.0](./LICENSE.Apache-2.0) license. You can choose between one of
//! them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod adts;
pub mod id3;

pub use adts::{AdtsHeader, AudioObjectType, count_frames, has_adts_sync, sample_rate_from_index};
pub use id3::{Id3Header, decode_synchsafe, leading_tags_len, strip_id3};
