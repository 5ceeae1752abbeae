//! Metadata index backed by a JSON-lines file written by the indexer.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use symserve_api::{ApiError, ApiResult, MetadataEntries, MetadataEntry, MetadataIndex};
use tracing::warn;

/// One line of the index file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub provider_id: String,
    #[serde(flatten)]
    pub entry: MetadataEntry,
}

/// Reads the index file anew on every lookup and streams matching lines.
///
/// A missing file is an empty index. Lines that do not parse are logged and
/// skipped; only I/O failures surface as errors.
pub struct JsonlMetadataIndex {
    path: PathBuf,
}

impl JsonlMetadataIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetadataIndex for JsonlMetadataIndex {
    fn entries_by_key<'a>(&'a self, provider_id: &str, key: &str) -> ApiResult<MetadataEntries<'a>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Box::new(std::iter::empty::<ApiResult<MetadataEntry>>()));
            }
            Err(e) => return Err(e.into()),
        };

        let provider_id = provider_id.to_string();
        let key = key.to_string();
        let path = self.path.clone();
        let lines = BufReader::new(file).lines().enumerate();

        Ok(Box::new(lines.filter_map(move |(number, line)| {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(ApiError::Io(e))),
            };
            if line.trim().is_empty() {
                return None;
            }
            match serde_json::from_str::<IndexRecord>(&line) {
                Ok(record) if record.provider_id == provider_id && record.entry.key == key => {
                    Some(Ok(record.entry))
                }
                Ok(_) => None,
                Err(e) => {
                    warn!(
                        "Skipping unreadable index record {}:{}: {}",
                        path.display(),
                        number + 1,
                        e
                    );
                    None
                }
            }
        })))
    }
}
