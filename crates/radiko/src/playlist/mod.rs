//! Timefree playlist planning: chunking, manifest retrieval and parsing.

pub mod chunk;
pub mod manifest;
pub mod planner;

pub use chunk::{Chunk, plan_chunks};
pub use manifest::{Manifest, parse_manifest, resolve_entry};
pub use planner::{
    HttpManifestSource, ManifestSource, PlaylistPlanner, SegmentRef, timefree_playlist_url,
};
