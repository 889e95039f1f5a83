use super::*;
use crate::cache::RepositoryIndexCache;
use crate::index::{IndexDownloader, IndexFile};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

const INDEX: &str = r#"
apiVersion: v1
entries:
  nginx:
    - name: nginx
      version: 15.0.0
    - name: nginx
      version: 15.10.2
    - name: nginx
      version: 15.2.0
  empty: []
  apache:
    - name: apache
      version: 10.1.0
"#;

struct StaticDownloader;

#[async_trait]
impl IndexDownloader for StaticDownloader {
    async fn download(&self, _name: &str, url: &str) -> Result<IndexFile> {
        if url.contains("unreachable") {
            return Err(ChartexError::index(
                url,
                "failed to download index",
                ChartexError::network("connection refused"),
            ));
        }
        IndexFile::from_yaml(INDEX.as_bytes())
    }
}

/// Tags per reference; records every lookup.
#[derive(Default)]
struct StaticTags {
    tags: HashMap<String, Vec<String>>,
    requested: Mutex<Vec<String>>,
}

impl StaticTags {
    fn with(reference: &str, tags: &[&str]) -> Self {
        let mut lister = Self::default();
        lister.tags.insert(
            reference.to_string(),
            tags.iter().map(|t| t.to_string()).collect(),
        );
        lister
    }
}

#[async_trait]
impl TagLister for StaticTags {
    async fn list_tags(&self, reference: &str) -> Result<Vec<String>> {
        self.requested.lock().unwrap().push(reference.to_string());
        self.tags
            .get(reference)
            .cloned()
            .ok_or_else(|| ChartexError::not_found("repository", reference))
    }
}

fn resolver(tags: Arc<StaticTags>) -> VersionResolver {
    let downloader: Arc<dyn IndexDownloader> = Arc::new(StaticDownloader);
    VersionResolver::new(Arc::new(RepositoryIndexCache::new(downloader)), tags)
}

const REPO: &str = "https://charts.example.com";

#[tokio::test]
async fn test_list_charts_http_sorted() {
    let resolver = resolver(Arc::new(StaticTags::default()));

    assert_eq!(
        resolver.list_charts(REPO).await.unwrap(),
        vec!["apache", "empty", "nginx"]
    );
}

#[tokio::test]
async fn test_list_charts_oci_uses_locator_name() {
    let tags = Arc::new(StaticTags::default());
    let resolver = resolver(Arc::clone(&tags));

    assert_eq!(
        resolver
            .list_charts("oci://ghcr.io/org/charts/mychart")
            .await
            .unwrap(),
        vec!["mychart"]
    );
    // The registry is not consulted
    assert!(tags.requested.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_charts_rejects_empty_locators() {
    let resolver = resolver(Arc::new(StaticTags::default()));

    assert!(matches!(
        resolver.list_charts("").await,
        Err(ChartexError::Validation { .. })
    ));
    assert!(matches!(
        resolver.list_charts("oci://").await,
        Err(ChartexError::Validation { .. })
    ));
}

#[tokio::test]
async fn test_resolve_versions_http_index_order() {
    let resolver = resolver(Arc::new(StaticTags::default()));

    assert_eq!(
        resolver.resolve_versions(REPO, "nginx").await.unwrap(),
        vec!["15.10.2", "15.2.0", "15.0.0"]
    );
    assert!(resolver.resolve_versions(REPO, "absent").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resolve_versions_oci_uses_tags() {
    let tags = Arc::new(StaticTags::with("ghcr.io/org/charts/app", &["2.0.0", "1.0.0"]));
    let resolver = resolver(Arc::clone(&tags));

    let versions = resolver
        .resolve_versions("oci://ghcr.io/org/charts", "app")
        .await
        .unwrap();

    assert_eq!(versions, vec!["2.0.0", "1.0.0"]);
    assert_eq!(
        *tags.requested.lock().unwrap(),
        vec!["ghcr.io/org/charts/app".to_string()]
    );
}

#[tokio::test]
async fn test_resolve_latest_http() {
    let resolver = resolver(Arc::new(StaticTags::default()));

    assert_eq!(resolver.resolve_latest(REPO, "nginx").await.unwrap(), "15.10.2");
    assert!(resolver.resolve_latest(REPO, "absent").await.unwrap_err().is_not_found());
    assert!(resolver.resolve_latest(REPO, "empty").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_resolve_latest_oci() {
    let tags = Arc::new(StaticTags::with(
        "ghcr.io/org/charts/app",
        &["2.0.0", "1.0.0"],
    ));
    let resolver = resolver(tags);

    assert_eq!(
        resolver
            .resolve_latest("oci://ghcr.io/org/charts/app", "")
            .await
            .unwrap(),
        "2.0.0"
    );
}

#[tokio::test]
async fn test_resolve_latest_oci_without_tags() {
    let tags = Arc::new(StaticTags::with("ghcr.io/org/charts/app", &[]));
    let resolver = resolver(tags);

    let err = resolver
        .resolve_latest("oci://ghcr.io/org/charts", "app")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_index_failure_is_propagated() {
    let resolver = resolver(Arc::new(StaticTags::default()));

    let err = resolver
        .resolve_versions("https://unreachable.example.com", "nginx")
        .await
        .unwrap_err();
    assert!(matches!(err, ChartexError::Index { .. }));
}
