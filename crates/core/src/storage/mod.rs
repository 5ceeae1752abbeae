//! Filesystem-backed collaborators.

pub mod fs_builds;
pub mod jsonl_index;

pub use fs_builds::{BuildManifest, FsBuildRegistry};
pub use jsonl_index::{IndexRecord, JsonlMetadataIndex};
