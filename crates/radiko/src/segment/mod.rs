//! Parallel segment retrieval and reassembly.

pub mod assembler;
pub mod fetcher;
pub mod scheduler;

pub use assembler::{AAC_MIME, AacArtifact, artifact_filename, assemble};
pub use fetcher::{HttpSegmentFetcher, SegmentDownloader};
pub use scheduler::SegmentScheduler;
