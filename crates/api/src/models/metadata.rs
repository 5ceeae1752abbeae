use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provider id under which symbol entries are published to the metadata index.
pub const SYMBOLS_PROVIDER_ID: &str = "symbols-index";

/// Metadata field holding the artifact path relative to the build's artifact root.
pub const ARTIFACT_PATH_KEY: &str = "artifact_path";

/// Metadata field holding the symbol file name. Only legacy entries rely on it.
pub const FILE_NAME_KEY: &str = "file_name";

/// A record published by the external indexer when a build's artifacts were stored.
///
/// Entries are read-only from the symbol server's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub build_id: i64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, build_id: i64) -> Self {
        Self {
            key: key.into(),
            build_id,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(field.to_string(), value.into());
        self
    }

    pub fn artifact_path(&self) -> Option<&str> {
        self.metadata.get(ARTIFACT_PATH_KEY).map(String::as_str)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.metadata.get(FILE_NAME_KEY).map(String::as_str)
    }
}
