//! In-memory collaborators.
//!
//! Thread-safe stand-ins for the metadata index and build registry, used by
//! tests and for embedding the server without a filesystem layout.

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use symserve_api::{
    ApiError, ApiResult, Artifact, ArtifactView, ArtifactsViewMode, Build, BuildRegistry,
    MetadataEntries, MetadataEntry, MetadataIndex, SYMBOLS_PROVIDER_ID, Subject,
};

/// Thread-safe in-memory metadata index
pub struct InMemoryMetadataIndex {
    /// (provider id, key) → entries in publication order
    entries: RwLock<HashMap<(String, String), Vec<MetadataEntry>>>,
    failure: RwLock<Option<String>>,
    lookups: AtomicUsize,
    yielded: Arc<AtomicUsize>,
}

impl InMemoryMetadataIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            failure: RwLock::new(None),
            lookups: AtomicUsize::new(0),
            yielded: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publishes an entry under the symbols provider, keyed by `entry.key`.
    pub fn publish(&self, entry: MetadataEntry) {
        self.publish_for(SYMBOLS_PROVIDER_ID, entry);
    }

    pub fn publish_for(&self, provider_id: &str, entry: MetadataEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry((provider_id.to_string(), entry.key.clone()))
            .or_default()
            .push(entry);
    }

    /// Makes every following lookup fail with a storage error.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    /// Number of `entries_by_key` calls so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of entries handed out by all iterators so far.
    pub fn entries_yielded(&self) -> usize {
        self.yielded.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryMetadataIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataIndex for InMemoryMetadataIndex {
    fn entries_by_key<'a>(&'a self, provider_id: &str, key: &str) -> ApiResult<MetadataEntries<'a>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self
            .failure
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(ApiError::Storage(message));
        }

        let snapshot = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(provider_id.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_default();

        let yielded = self.yielded.clone();
        Ok(Box::new(snapshot.into_iter().map(move |entry| {
            yielded.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ApiError>(entry)
        })))
    }
}

/// Thread-safe in-memory build registry
pub struct InMemoryBuildRegistry {
    builds: RwLock<HashMap<i64, Arc<InMemoryBuild>>>,
}

impl InMemoryBuildRegistry {
    pub fn new() -> Self {
        Self {
            builds: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, build: InMemoryBuild) -> Arc<InMemoryBuild> {
        let build = Arc::new(build);
        self.builds
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(build.build_id, build.clone());
        build
    }

    pub fn remove(&self, build_id: i64) -> Option<Arc<InMemoryBuild>> {
        self.builds
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&build_id)
    }
}

impl Default for InMemoryBuildRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildRegistry for InMemoryBuildRegistry {
    fn find_build(&self, build_id: i64) -> ApiResult<Option<Arc<dyn Build>>> {
        let builds = self.builds.read().unwrap_or_else(PoisonError::into_inner);
        Ok(builds
            .get(&build_id)
            .map(|build| build.clone() as Arc<dyn Build>))
    }
}

#[derive(Debug, Clone)]
enum Content {
    Bytes(Arc<[u8]>),
    /// Opening fails with the message.
    Broken(String),
    /// Yields the bytes, then fails with the message.
    Truncated(Arc<[u8]>, String),
}

#[derive(Debug, Clone)]
struct StoredArtifact {
    content: Content,
    archived: bool,
}

/// A view opening recorded by [`InMemoryBuild`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewAccess {
    pub subject: String,
    pub mode: ArtifactsViewMode,
}

pub struct InMemoryBuild {
    build_id: i64,
    project_id: Option<String>,
    artifacts: RwLock<HashMap<String, StoredArtifact>>,
    accesses: Mutex<Vec<ViewAccess>>,
}

impl InMemoryBuild {
    pub fn new(build_id: i64, project_id: Option<&str>) -> Self {
        Self {
            build_id,
            project_id: project_id.map(str::to_string),
            artifacts: RwLock::new(HashMap::new()),
            accesses: Mutex::new(Vec::new()),
        }
    }

    fn store(&self, path: &str, content: Content, archived: bool) {
        self.artifacts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), StoredArtifact { content, archived });
    }

    pub fn with_artifact(self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.add_artifact(path, bytes);
        self
    }

    pub fn add_artifact(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.store(path, Content::Bytes(bytes.into().into()), false);
    }

    /// An artifact living inside a published archive; only visible with archive content.
    pub fn add_archived_artifact(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.store(path, Content::Bytes(bytes.into().into()), true);
    }

    pub fn add_broken_artifact(&self, path: &str, message: &str) {
        self.store(path, Content::Broken(message.to_string()), false);
    }

    pub fn add_truncated_artifact(&self, path: &str, bytes: impl Into<Vec<u8>>, message: &str) {
        self.store(
            path,
            Content::Truncated(bytes.into().into(), message.to_string()),
            false,
        );
    }

    pub fn purge_artifact(&self, path: &str) {
        self.artifacts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
    }

    /// Every artifact view opened so far, with the subject it was opened for.
    pub fn accesses(&self) -> Vec<ViewAccess> {
        self.accesses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Build for InMemoryBuild {
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
        self.accesses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ViewAccess {
                subject: subject.name.clone(),
                mode,
            });
        Ok(Box::new(InMemoryArtifactView { build: self, mode }))
    }
}

struct InMemoryArtifactView<'a> {
    build: &'a InMemoryBuild,
    mode: ArtifactsViewMode,
}

impl ArtifactView for InMemoryArtifactView<'_> {
    fn artifact(&self, path: &str) -> ApiResult<Option<Box<dyn Artifact + '_>>> {
        let artifacts = self
            .build
            .artifacts
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(stored) = artifacts.get(path) else {
            return Ok(None);
        };
        if stored.archived && self.mode != ArtifactsViewMode::WithArchivesContent {
            return Ok(None);
        }
        Ok(Some(Box::new(InMemoryArtifact {
            path: path.to_string(),
            content: stored.content.clone(),
        })))
    }
}

struct InMemoryArtifact {
    path: String,
    content: Content,
}

impl Artifact for InMemoryArtifact {
    fn relative_path(&self) -> &str {
        &self.path
    }

    fn size(&self) -> Option<u64> {
        match &self.content {
            Content::Bytes(bytes) => Some(bytes.len() as u64),
            _ => None,
        }
    }

    fn open(&self) -> ApiResult<Box<dyn Read + Send + '_>> {
        match &self.content {
            Content::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            Content::Broken(message) => Err(ApiError::Storage(message.clone())),
            Content::Truncated(bytes, message) => Ok(Box::new(
                Cursor::new(bytes.clone()).chain(FailingReader(message.clone())),
            )),
        }
    }
}

struct FailingReader(String);

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other(self.0.clone()))
    }
}
