use super::*;
use crate::error::ChartexError;
use crate::index::ChartVersion;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves a one-chart index and counts downloads. Fails for URLs
/// containing "broken".
#[derive(Default)]
struct CountingDownloader {
    calls: AtomicUsize,
}

#[async_trait]
impl IndexDownloader for CountingDownloader {
    async fn download(&self, name: &str, url: &str) -> Result<IndexFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if url.contains("broken") {
            return Err(ChartexError::index(
                url,
                "failed to download index",
                ChartexError::server("boom", 500),
            ));
        }

        let mut index = IndexFile {
            api_version: "v1".to_string(),
            ..Default::default()
        };
        index.entries.insert(
            name.to_string(),
            vec![ChartVersion {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                ..Default::default()
            }],
        );
        Ok(index)
    }
}

impl CountingDownloader {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn test_get_index_downloads_once_per_name() {
    let cache = RepositoryIndexCache::new(CountingDownloader::default());

    let first = cache.get_index("stable", "https://a.example.com").await.unwrap();
    let second = cache.get_index("stable", "https://a.example.com").await.unwrap();

    assert_eq!(cache.downloader().calls(), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(cache.contains("stable").await);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_get_index_separate_names() {
    let cache = RepositoryIndexCache::new(CountingDownloader::default());

    cache.get_index("a", "https://a.example.com").await.unwrap();
    let b = cache.get_index("b", "https://b.example.com").await.unwrap();

    assert_eq!(cache.downloader().calls(), 2);
    assert_eq!(b.chart_names(), vec!["b"]);
}

#[tokio::test]
async fn test_get_index_does_not_cache_failures() {
    let cache = RepositoryIndexCache::new(CountingDownloader::default());

    let err = cache
        .get_index("broken", "https://broken.example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, ChartexError::Index { .. }));
    assert!(cache.is_empty().await);

    cache
        .get_index("broken", "https://broken.example.com")
        .await
        .unwrap_err();
    assert_eq!(cache.downloader().calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_download_once() {
    let cache = Arc::new(RepositoryIndexCache::new(CountingDownloader::default()));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            cache.get_index("stable", "https://a.example.com").await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(cache.downloader().calls(), 1);
}
