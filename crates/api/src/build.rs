use crate::error::ApiResult;
use crate::models::Subject;
use std::io::Read;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactsViewMode {
    /// Only the files the build published.
    Published,
    /// Published files plus entries nested inside published archives.
    WithArchivesContent,
}

/// Resolves build ids to builds.
pub trait BuildRegistry: Send + Sync {
    fn find_build(&self, build_id: i64) -> ApiResult<Option<Arc<dyn Build>>>;
}

pub trait Build: Send + Sync {
    fn build_id(&self) -> i64;

    /// Owning project. `None` once the project has been removed.
    fn project_id(&self) -> Option<&str>;

    /// Opens the artifact tree on behalf of `subject`.
    ///
    /// Implementations apply their own per-artifact access rules for the subject.
    fn artifacts<'a>(
        &'a self,
        subject: &Subject,
        mode: ArtifactsViewMode,
    ) -> ApiResult<Box<dyn ArtifactView + 'a>>;
}

pub trait ArtifactView {
    /// Looks up an artifact by its `/`-separated relative path.
    fn artifact(&self, path: &str) -> ApiResult<Option<Box<dyn Artifact + '_>>>;
}

pub trait Artifact {
    fn relative_path(&self) -> &str;

    fn size(&self) -> Option<u64>;

    fn open(&self) -> ApiResult<Box<dyn Read + Send + '_>>;
}
