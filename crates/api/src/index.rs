use crate::error::ApiResult;
use crate::models::MetadataEntry;

/// Lazy sequence of entries stored under one key.
///
/// Dropping it early stops the underlying scan. Calling
/// [`MetadataIndex::entries_by_key`] again restarts from the beginning.
pub type MetadataEntries<'a> = Box<dyn Iterator<Item = ApiResult<MetadataEntry>> + 'a>;

/// Key → entries store populated by an external indexer.
pub trait MetadataIndex: Send + Sync {
    /// Entries published by `provider_id` under `key`, in index-defined order.
    fn entries_by_key<'a>(&'a self, provider_id: &str, key: &str) -> ApiResult<MetadataEntries<'a>>;
}
