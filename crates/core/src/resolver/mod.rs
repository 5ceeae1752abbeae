//! Symbol request resolution: path → index entry → build → owning project.

pub mod path;

pub use path::{COMPRESSED_FILE_SUFFIX, FILE_POINTER_SUFFIX, PathKind, classify, normalize};

use std::fmt;
use std::sync::Arc;
use symserve_api::{
    ApiResult, Build, BuildRegistry, MetadataEntry, MetadataIndex, SYMBOLS_PROVIDER_ID,
    SymbolRequest,
};
use tracing::debug;

/// Why a request did not resolve. Only ever logged, never shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    BlockedSuffix,
    MalformedPath,
    NotIndexed,
    CorruptEntry,
    BuildMissing,
    ProjectMissing,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MissReason::BlockedSuffix => "compressed or pointer file requested",
            MissReason::MalformedPath => "malformed request path",
            MissReason::NotIndexed => "symbol file is not indexed",
            MissReason::CorruptEntry => "index entry has no artifact path",
            MissReason::BuildMissing => "owning build no longer exists",
            MissReason::ProjectMissing => "owning build has no project",
        };
        f.write_str(text)
    }
}

/// An index hit traced back to its build and project.
pub struct ResolvedArtifact {
    pub request: SymbolRequest,
    pub entry_key: String,
    pub build: Arc<dyn Build>,
    pub artifact_path: String,
    pub project_id: String,
}

impl fmt::Debug for ResolvedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedArtifact")
            .field("request", &self.request)
            .field("entry_key", &self.entry_key)
            .field("build_id", &self.build.build_id())
            .field("artifact_path", &self.artifact_path)
            .field("project_id", &self.project_id)
            .finish()
    }
}

#[derive(Debug)]
pub enum Resolution {
    IndexProbe,
    Miss(MissReason),
    Found(ResolvedArtifact),
}

/// Maps request paths to indexed build artifacts.
///
/// Holds no state between calls: every resolution queries the index and the
/// registry afresh.
pub struct SymbolResolver {
    index: Arc<dyn MetadataIndex>,
    builds: Arc<dyn BuildRegistry>,
    prefix: String,
}

impl SymbolResolver {
    pub fn new(
        index: Arc<dyn MetadataIndex>,
        builds: Arc<dyn BuildRegistry>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            index,
            builds,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Resolves a raw request path.
    ///
    /// Expected failures come back as [`Resolution::Miss`]; `Err` means a
    /// collaborator failed.
    pub fn resolve(&self, path: &str) -> ApiResult<Resolution> {
        let request = match classify(path, &self.prefix) {
            PathKind::IndexProbe => return Ok(Resolution::IndexProbe),
            PathKind::BlockedSuffix => return Ok(Resolution::Miss(MissReason::BlockedSuffix)),
            PathKind::Malformed => return Ok(Resolution::Miss(MissReason::MalformedPath)),
            PathKind::Symbol(request) => request,
        };
        self.resolve_request(request)
    }

    pub fn resolve_request(&self, request: SymbolRequest) -> ApiResult<Resolution> {
        debug!(
            file_name = %request.file_name,
            guid = %request.guid(),
            "Symbol file requested"
        );

        let Some(entry) = self.find_entry(&request)? else {
            debug!(
                "There is no information about symbol file {} with id {} in the index",
                request.file_name,
                request.guid()
            );
            return Ok(Resolution::Miss(MissReason::NotIndexed));
        };

        let Some(artifact_path) = entry.artifact_path().map(str::to_string) else {
            debug!("Metadata stored under key '{}' is invalid", entry.key);
            return Ok(Resolution::Miss(MissReason::CorruptEntry));
        };

        let Some(build) = self.builds.find_build(entry.build_id)? else {
            debug!(
                "Failed to find build by id {}. Symbol file with key {} expected to be produced by that build",
                entry.build_id, entry.key
            );
            return Ok(Resolution::Miss(MissReason::BuildMissing));
        };

        let Some(project_id) = build.project_id().map(str::to_string) else {
            debug!("Build {} is not attached to a project", entry.build_id);
            return Ok(Resolution::Miss(MissReason::ProjectMissing));
        };

        Ok(Resolution::Found(ResolvedArtifact {
            request,
            entry_key: entry.key,
            build,
            artifact_path,
            project_id,
        }))
    }

    /// Looks up the composite key first, then falls back to entries published
    /// under the bare guid, matching their stored file name case-insensitively.
    pub fn find_entry(&self, request: &SymbolRequest) -> ApiResult<Option<MetadataEntry>> {
        let key = request.composite_key();
        if let Some(entry) = self
            .index
            .entries_by_key(SYMBOLS_PROVIDER_ID, &key)?
            .next()
            .transpose()?
        {
            return Ok(Some(entry));
        }

        // Entries published before composite keys existed, keyed by the bare
        // guid: lowercase like the composite key, or exactly as requested.
        let wanted = request.file_name.to_lowercase();
        for guid in legacy_keys(request.guid()) {
            for entry in self.index.entries_by_key(SYMBOLS_PROVIDER_ID, &guid)? {
                let entry = entry?;
                if entry
                    .file_name()
                    .is_some_and(|stored| stored.to_lowercase() == wanted)
                {
                    return Ok(Some(entry));
                }
            }
        }
        Ok(None)
    }
}

fn legacy_keys(guid: &str) -> Vec<String> {
    let lowercase = guid.to_ascii_lowercase();
    if lowercase == guid {
        vec![lowercase]
    } else {
        vec![lowercase, guid.to_string()]
    }
}
