use super::*;
use crate::cache::RepositoryIndexCache;
use crate::chart::{CHART_YAML, ChartFile, ChartMetadata};
use crate::index::{HttpIndexDownloader, IndexDownloader};
use std::sync::Mutex;

/// Serves one packaged chart and records the references asked for.
#[derive(Default)]
struct RecordingPuller {
    pulled: Mutex<Vec<String>>,
}

#[async_trait]
impl ChartPuller for RecordingPuller {
    async fn pull_chart(&self, reference: &str) -> Result<Vec<u8>> {
        self.pulled.lock().unwrap().push(reference.to_string());
        packaged("app", "3.1.0")
    }
}

fn packaged(name: &str, version: &str) -> Result<Vec<u8>> {
    Chart {
        metadata: ChartMetadata::new(name, version),
        raw: vec![ChartFile::new(
            CHART_YAML,
            format!("apiVersion: v2\nname: {name}\nversion: {version}\n"),
        )],
        dependencies: vec![],
    }
    .to_archive()
}

fn index_yaml(chart_url: &str) -> String {
    format!(
        r#"apiVersion: v1
entries:
  app:
    - name: app
      version: 1.0.0
      urls:
        - {chart_url}
    - name: app
      version: 1.1.0
      urls:
        - app-1.1.0.tgz
"#
    )
}

fn loader(puller: Arc<RecordingPuller>, credentials: Option<Credentials>) -> RemoteChartLoader {
    let client = Client::new().unwrap();
    let downloader: Arc<dyn IndexDownloader> =
        Arc::new(HttpIndexDownloader::new(client.clone(), credentials.clone()));
    RemoteChartLoader::new(
        Arc::new(RepositoryIndexCache::new(downloader)),
        client,
        puller,
    )
    .with_credentials(credentials)
}

#[tokio::test]
async fn test_load_http_chart_by_version() {
    let mut server = mockito::Server::new_async().await;
    let _index = server
        .mock("GET", "/index.yaml")
        .with_status(200)
        .with_body(index_yaml("charts/app-1.0.0.tgz"))
        .create_async()
        .await;
    let archive = server
        .mock("GET", "/charts/app-1.0.0.tgz")
        .with_status(200)
        .with_body(packaged("app", "1.0.0").unwrap())
        .create_async()
        .await;

    let loader = loader(Arc::new(RecordingPuller::default()), None);
    let chart = loader.load(&server.url(), "app", "1.0.0").await.unwrap();

    archive.assert_async().await;
    assert_eq!(chart.name(), "app");
    assert_eq!(chart.version(), "1.0.0");
}

#[tokio::test]
async fn test_load_http_without_version_picks_newest() {
    let mut server = mockito::Server::new_async().await;
    let index = server
        .mock("GET", "/index.yaml")
        .with_status(200)
        .with_body(index_yaml("app-1.0.0.tgz"))
        .expect(1)
        .create_async()
        .await;
    let _archive = server
        .mock("GET", "/app-1.1.0.tgz")
        .with_status(200)
        .with_body(packaged("app", "1.1.0").unwrap())
        .expect(2)
        .create_async()
        .await;

    let loader = loader(Arc::new(RecordingPuller::default()), None);
    let chart = loader.load(&server.url(), "app", "").await.unwrap();
    assert_eq!(chart.version(), "1.1.0");

    // The index is served from the cache the second time
    loader.load(&server.url(), "app", "").await.unwrap();
    index.assert_async().await;
}

#[tokio::test]
async fn test_load_http_unknown_version() {
    let mut server = mockito::Server::new_async().await;
    let _index = server
        .mock("GET", "/index.yaml")
        .with_status(200)
        .with_body(index_yaml("app-1.0.0.tgz"))
        .create_async()
        .await;

    let loader = loader(Arc::new(RecordingPuller::default()), None);
    let err = loader.load(&server.url(), "app", "9.9.9").await.unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("app@9.9.9"));
}

#[tokio::test]
async fn test_load_http_sends_credentials_to_same_origin() {
    let mut server = mockito::Server::new_async().await;
    let _index = server
        .mock("GET", "/index.yaml")
        .with_status(200)
        .with_body(index_yaml("app-1.0.0.tgz"))
        .create_async()
        .await;
    let archive = server
        .mock("GET", "/app-1.0.0.tgz")
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_status(200)
        .with_body(packaged("app", "1.0.0").unwrap())
        .create_async()
        .await;

    let loader = loader(
        Arc::new(RecordingPuller::default()),
        Some(Credentials::basic("user", "pass")),
    );
    loader.load(&server.url(), "app", "1.0.0").await.unwrap();

    archive.assert_async().await;
}

#[tokio::test]
async fn test_load_http_withholds_credentials_from_other_hosts() {
    let mut repository = mockito::Server::new_async().await;
    let mut downloads = mockito::Server::new_async().await;

    let _index = repository
        .mock("GET", "/index.yaml")
        .with_status(200)
        .with_body(index_yaml(&format!("{}/app-1.0.0.tgz", downloads.url())))
        .create_async()
        .await;
    let archive = downloads
        .mock("GET", "/app-1.0.0.tgz")
        .match_header("authorization", mockito::Matcher::Missing)
        .with_status(200)
        .with_body(packaged("app", "1.0.0").unwrap())
        .create_async()
        .await;

    let loader = loader(
        Arc::new(RecordingPuller::default()),
        Some(Credentials::basic("user", "pass")),
    );
    loader.load(&repository.url(), "app", "1.0.0").await.unwrap();
    archive.assert_async().await;
}

#[tokio::test]
async fn test_load_http_pass_credentials_all() {
    let mut repository = mockito::Server::new_async().await;
    let mut downloads = mockito::Server::new_async().await;

    let _index = repository
        .mock("GET", "/index.yaml")
        .with_status(200)
        .with_body(index_yaml(&format!("{}/app-1.0.0.tgz", downloads.url())))
        .create_async()
        .await;
    let archive = downloads
        .mock("GET", "/app-1.0.0.tgz")
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_status(200)
        .with_body(packaged("app", "1.0.0").unwrap())
        .create_async()
        .await;

    let loader = loader(
        Arc::new(RecordingPuller::default()),
        Some(Credentials::basic("user", "pass")),
    )
    .with_pass_credentials_all(true);
    loader.load(&repository.url(), "app", "1.0.0").await.unwrap();
    archive.assert_async().await;
}

#[tokio::test]
async fn test_load_oci_pulls_reference() {
    let puller = Arc::new(RecordingPuller::default());
    let loader = loader(Arc::clone(&puller), None);

    let chart = loader
        .load("oci://ghcr.io/org/charts", "app", "3.1.0")
        .await
        .unwrap();

    assert_eq!(chart.version(), "3.1.0");
    assert_eq!(
        *puller.pulled.lock().unwrap(),
        vec!["ghcr.io/org/charts/app:3.1.0".to_string()]
    );
}
