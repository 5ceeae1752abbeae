//! Build registry over a directory tree:
//!
//! ```text
//! <root>/<build_id>/build.json     {"project_id": "..."}
//! <root>/<build_id>/artifacts/...  published files
//! ```
//!
//! With archive content enabled, `dir/symbols.zip!/x64/foo.pdb` addresses an
//! entry inside `artifacts/dir/symbols.zip`.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symserve_api::{
    ApiError, ApiResult, Artifact, ArtifactView, ArtifactsViewMode, Build, BuildRegistry,
    Permission, Subject,
};
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

pub const BUILD_MANIFEST: &str = "build.json";
pub const ARTIFACTS_DIR: &str = "artifacts";
/// Artifacts under this top-level directory need [`Permission::ViewHiddenArtifacts`].
pub const HIDDEN_ARTIFACTS_DIR: &str = ".internal";
pub const ARCHIVE_SEPARATOR: &str = "!/";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildManifest {
    pub project_id: Option<String>,
}

pub struct FsBuildRegistry {
    root: PathBuf,
}

impl FsBuildRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BuildRegistry for FsBuildRegistry {
    fn find_build(&self, build_id: i64) -> ApiResult<Option<Arc<dyn Build>>> {
        let dir = self.root.join(build_id.to_string());
        let text = match std::fs::read_to_string(dir.join(BUILD_MANIFEST)) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let manifest: BuildManifest = serde_json::from_str(&text).map_err(|e| {
            ApiError::Storage(format!("invalid manifest for build {build_id}: {e}"))
        })?;
        Ok(Some(Arc::new(FsBuild {
            build_id,
            project_id: manifest.project_id,
            artifacts_dir: dir.join(ARTIFACTS_DIR),
        })))
    }
}

pub struct FsBuild {
    build_id: i64,
    project_id: Option<String>,
    artifacts_dir: PathBuf,
}

impl Build for FsBuild {
    fn build_id(&self) -> i64 {
        self.build_id
    }

    fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    fn artifacts<'a>(
        &'a self,
        subject: &Subject,
        mode: ArtifactsViewMode,
    ) -> ApiResult<Box<dyn ArtifactView + 'a>> {
        let show_hidden = self.project_id.as_deref().is_some_and(|project_id| {
            subject.is_permission_granted_for_project(project_id, Permission::ViewHiddenArtifacts)
        });
        Ok(Box::new(FsArtifactView {
            build: self,
            mode,
            show_hidden,
        }))
    }
}

struct FsArtifactView<'a> {
    build: &'a FsBuild,
    mode: ArtifactsViewMode,
    show_hidden: bool,
}

impl FsArtifactView<'_> {
    fn locate(&self, relative: &str) -> Option<PathBuf> {
        let segments = safe_segments(relative)?;
        if !self.show_hidden && segments.first() == Some(&HIDDEN_ARTIFACTS_DIR) {
            debug!("Hidden artifact {} requested without permission", relative);
            return None;
        }
        let mut path = self.build.artifacts_dir.clone();
        path.extend(segments);
        Some(path)
    }
}

impl ArtifactView for FsArtifactView<'_> {
    fn artifact(&self, path: &str) -> ApiResult<Option<Box<dyn Artifact + '_>>> {
        if self.mode == ArtifactsViewMode::WithArchivesContent {
            if let Some((archive, entry)) = path.split_once(ARCHIVE_SEPARATOR) {
                return self.archived_artifact(path, archive, entry);
            }
        }

        let Some(file) = self.locate(path) else {
            return Ok(None);
        };
        match std::fs::metadata(&file) {
            Ok(meta) if meta.is_file() => Ok(Some(Box::new(FsArtifact {
                relative_path: path.to_string(),
                size: meta.len(),
                location: Location::File(file),
            }))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl FsArtifactView<'_> {
    fn archived_artifact(
        &self,
        path: &str,
        archive: &str,
        entry: &str,
    ) -> ApiResult<Option<Box<dyn Artifact + '_>>> {
        let Some(archive_file) = self.locate(archive) else {
            return Ok(None);
        };
        if safe_segments(entry).is_none() || !archive_file.is_file() {
            return Ok(None);
        }

        let mut zip = open_archive(&archive_file)?;
        let size = match zip.by_name(entry) {
            Ok(file) if file.is_dir() => return Ok(None),
            Ok(file) => file.size(),
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(archive_error(&archive_file, e)),
        };

        Ok(Some(Box::new(FsArtifact {
            relative_path: path.to_string(),
            size,
            location: Location::Archived {
                archive: archive_file,
                entry: entry.to_string(),
            },
        })))
    }
}

enum Location {
    File(PathBuf),
    Archived { archive: PathBuf, entry: String },
}

struct FsArtifact {
    relative_path: String,
    size: u64,
    location: Location,
}

impl Artifact for FsArtifact {
    fn relative_path(&self) -> &str {
        &self.relative_path
    }

    fn size(&self) -> Option<u64> {
        Some(self.size)
    }

    fn open(&self) -> ApiResult<Box<dyn Read + Send + '_>> {
        match &self.location {
            Location::File(path) => Ok(Box::new(File::open(path)?)),
            Location::Archived { archive, entry } => {
                // Zip entries borrow their archive, so spool the entry to an anonymous file.
                let mut zip = open_archive(archive)?;
                let mut source = zip.by_name(entry).map_err(|e| archive_error(archive, e))?;
                let mut spool = tempfile::tempfile()?;
                std::io::copy(&mut source, &mut spool)?;
                spool.seek(SeekFrom::Start(0))?;
                Ok(Box::new(spool))
            }
        }
    }
}

fn open_archive(path: &Path) -> ApiResult<ZipArchive<File>> {
    let file = File::open(path)?;
    ZipArchive::new(file).map_err(|e| archive_error(path, e))
}

fn archive_error(path: &Path, e: ZipError) -> ApiError {
    ApiError::Storage(format!("cannot read archive {}: {e}", path.display()))
}

/// Splits a `/`-separated relative path, refusing anything that could leave the root.
fn safe_segments(path: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = path.split('/').collect();
    let valid = segments.iter().all(|segment| {
        !segment.is_empty()
            && *segment != "."
            && *segment != ".."
            && !segment.contains('\\')
            && !segment.contains(':')
    });
    valid.then_some(segments)
}
