//! In-memory cache of repository indexes.
//!
//! Each repository index is downloaded at most once per cache instance and
//! shared afterwards as an immutable [`Arc<IndexFile>`]. There is no expiry:
//! a long-lived cache keeps serving the index it first loaded.

use crate::error::Result;
use crate::index::{IndexDownloader, IndexFile};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[cfg(test)]
mod tests;

/// Cache over a type-erased downloader, as shared by the explorer.
pub type SharedIndexCache = RepositoryIndexCache<Arc<dyn IndexDownloader>>;

/// Lazily populated map from repository name to its parsed index.
///
/// A single lock guards the whole get-or-populate sequence, including the
/// download, so concurrent requests for the same repository trigger one
/// download. Requests for different repositories are serialized as well.
pub struct RepositoryIndexCache<D> {
    downloader: D,
    entries: Mutex<HashMap<String, Arc<IndexFile>>>,
}

impl<D: IndexDownloader> RepositoryIndexCache<D> {
    pub fn new(downloader: D) -> Self {
        Self {
            downloader,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the index of repository `name`, downloading it from `url` on
    /// first use.
    ///
    /// # Errors
    ///
    /// Propagates the downloader error. Failures are not cached; the next
    /// call retries the download.
    pub async fn get_index(&self, name: &str, url: &str) -> Result<Arc<IndexFile>> {
        let mut entries = self.entries.lock().await;

        if let Some(index) = entries.get(name) {
            debug!(repository = name, "Repository index cache hit");
            return Ok(Arc::clone(index));
        }

        let index = Arc::new(self.downloader.download(name, url).await?);
        entries.insert(name.to_string(), Arc::clone(&index));
        Ok(index)
    }

    /// Number of cached repositories.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.entries.lock().await.contains_key(name)
    }

    pub fn downloader(&self) -> &D {
        &self.downloader
    }
}
