//! High-level API for chartex.
//!
//! [`Chartex`] answers the questions the explorer is built for: which charts
//! and versions a repository serves, what a chart depends on, which
//! container images it deploys, and what its values and files look like.
//! Both classic HTTP repositories and `oci://` registries are accepted as
//! locators.
//!
//! # Examples
//!
//! ```no_run
//! use libchartex::Chartex;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let chartex = Chartex::new()?;
//!
//!     let versions = chartex
//!         .list_versions("https://charts.bitnami.com/bitnami", "nginx")
//!         .await?;
//!     println!("{} versions", versions.len());
//!
//!     let images = chartex
//!         .images("oci://registry-1.docker.io/bitnamicharts/nginx", "", "", &serde_json::Value::Null, true)
//!         .await?;
//!     for image in images {
//!         println!("{} ({})", image.full_image, image.source);
//!     }
//!     Ok(())
//! }
//! ```

use crate::aggregate;
use crate::auth::{Credentials, DockerCredentials};
use crate::cache::{RepositoryIndexCache, SharedIndexCache};
use crate::chart::Chart;
use crate::client::{Client, ClientConfig};
use crate::config::Config;
use crate::dependency;
use crate::error::{ChartexError, Result};
use crate::image::ImageReference;
use crate::index::{HttpIndexDownloader, IndexDownloader};
use crate::loader::{ChartLoader, RemoteChartLoader};
use crate::manifest;
use crate::oci::{ChartPuller, RegistryClient, TagLister};
use crate::reference::{chart_name_from_oci, is_oci};
use crate::render::{ChartRenderer, HelmTemplateRenderer};
use crate::resolver::VersionResolver;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;


/// Read-only explorer over Helm chart repositories.
///
/// One instance owns one repository index cache: every index is downloaded
/// at most once for the lifetime of the instance.
pub struct Chartex {
    cache: Arc<SharedIndexCache>,
    resolver: VersionResolver,
    loader: Arc<dyn ChartLoader>,
    renderer: Arc<dyn ChartRenderer>,
}

impl Chartex {
    /// Creates an explorer with the default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ChartexBuilder {
        ChartexBuilder::new()
    }

    /// Lists chart names served by `locator`.
    pub async fn list_charts(&self, locator: &str) -> Result<Vec<String>> {
        self.resolver.list_charts(locator).await
    }

    /// Lists the versions of a chart, newest first.
    pub async fn list_versions(&self, locator: &str, chart: &str) -> Result<Vec<String>> {
        let chart = self.resolve_chart_name(locator, chart)?;
        self.resolver.resolve_versions(locator, &chart).await
    }

    /// Returns the newest version of a chart.
    pub async fn latest_version(&self, locator: &str, chart: &str) -> Result<String> {
        let chart = self.resolve_chart_name(locator, chart)?;
        self.resolver.resolve_latest(locator, &chart).await
    }

    /// Returns the dependencies declared by a chart and, recursively, by its
    /// vendored subcharts, each as a compact JSON object.
    pub async fn dependencies(&self, locator: &str, chart: &str, version: &str) -> Result<Vec<String>> {
        let chart = self.load(locator, chart, version).await?;
        dependency::walk(&chart)
    }

    /// Renders a chart and returns the container images it deploys, sorted by
    /// full image string.
    ///
    /// With `recursive`, every vendored subchart is rendered on its own with
    /// the same `values` and contributes its images as well.
    pub async fn images(
        &self,
        locator: &str,
        chart: &str,
        version: &str,
        values: &Value,
        recursive: bool,
    ) -> Result<Vec<ImageReference>> {
        let chart = self.load(locator, chart, version).await?;

        let mut pending = vec![&chart];
        let mut images = Vec::new();
        while let Some(current) = pending.pop() {
            let manifests = self.renderer.render(current, values).await?;
            images.extend(manifest::extract(&manifests));

            if recursive {
                pending.extend(current.dependencies.iter().rev());
            }
        }

        Ok(aggregate::finalize(images))
    }

    /// Returns the raw `values.yaml` of a chart, empty when it has none.
    pub async fn values(&self, locator: &str, chart: &str, version: &str) -> Result<String> {
        Ok(self.load(locator, chart, version).await?.values())
    }

    /// Returns the raw `values.yaml` of the newest chart version.
    pub async fn latest_values(&self, locator: &str, chart: &str) -> Result<String> {
        self.values(locator, chart, "").await
    }

    /// Returns every file of a chart, each under a `# file:` header.
    pub async fn contents(
        &self,
        locator: &str,
        chart: &str,
        version: &str,
        recursive: bool,
    ) -> Result<String> {
        Ok(self.load(locator, chart, version).await?.contents(recursive))
    }

    /// Determines the chart name to operate on.
    ///
    /// OCI locators name the chart themselves, so `chart` may be empty;
    /// HTTP repositories require it.
    pub fn resolve_chart_name(&self, locator: &str, chart: &str) -> Result<String> {
        if locator.trim().is_empty() {
            return Err(ChartexError::validation("Repository locator is required"));
        }
        if !chart.is_empty() {
            return Ok(chart.to_string());
        }
        if is_oci(locator) {
            let name = chart_name_from_oci(locator);
            if !name.is_empty() {
                return Ok(name);
            }
        }
        Err(ChartexError::validation(format!(
            "Chart name is required for {}",
            locator
        )))
    }

    /// Number of repository indexes loaded so far.
    pub async fn cached_indexes(&self) -> usize {
        self.cache.len().await
    }

    async fn load(&self, locator: &str, chart: &str, version: &str) -> Result<Chart> {
        let chart = self.resolve_chart_name(locator, chart)?;
        let version = if version.is_empty() {
            self.resolver.resolve_latest(locator, &chart).await?
        } else {
            version.to_string()
        };

        debug!(locator, chart = %chart, version = %version, "Loading chart");
        self.loader.load(locator, &chart, &version).await
    }
}

/// Builder for [`Chartex`].
///
/// Collaborators not set explicitly are built from the configuration: an
/// HTTP index downloader, a registry client for tags and chart pulls, and a
/// `helm template` renderer.
#[derive(Default)]
pub struct ChartexBuilder {
    config: Option<Config>,
    credentials: Option<Credentials>,
    index_downloader: Option<Arc<dyn IndexDownloader>>,
    tag_lister: Option<Arc<dyn TagLister>>,
    chart_loader: Option<Arc<dyn ChartLoader>>,
    renderer: Option<Arc<dyn ChartRenderer>>,
}

impl ChartexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses `credentials` instead of the ones configured in `auth`.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_index_downloader(mut self, downloader: Arc<dyn IndexDownloader>) -> Self {
        self.index_downloader = Some(downloader);
        self
    }

    pub fn with_tag_lister(mut self, tag_lister: Arc<dyn TagLister>) -> Self {
        self.tag_lister = Some(tag_lister);
        self
    }

    pub fn with_chart_loader(mut self, loader: Arc<dyn ChartLoader>) -> Self {
        self.chart_loader = Some(loader);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Builds the explorer.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is inconsistent or referenced files
    /// (password, TLS material, registry credentials) cannot be read.
    pub fn build(self) -> Result<Chartex> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let client = Client::with_config(ClientConfig::from_config(&config))?;
        let credentials = match self.credentials {
            Some(credentials) => Some(credentials),
            None => config.auth.credentials()?,
        };
        let docker_credentials = match &config.registry.credentials_file {
            Some(path) => DockerCredentials::load(Path::new(path))?,
            None => DockerCredentials::default(),
        };

        let registry = Arc::new(
            RegistryClient::new(client.clone())
                .with_plain_http(config.registry.plain_http)
                .with_credentials(credentials.clone())
                .with_docker_credentials(docker_credentials),
        );

        let downloader = self.index_downloader.unwrap_or_else(|| {
            Arc::new(HttpIndexDownloader::new(client.clone(), credentials.clone()))
                as Arc<dyn IndexDownloader>
        });
        let cache = Arc::new(RepositoryIndexCache::new(downloader));

        let tag_lister = self
            .tag_lister
            .unwrap_or_else(|| Arc::clone(&registry) as Arc<dyn TagLister>);

        let loader = self.chart_loader.unwrap_or_else(|| {
            Arc::new(
                RemoteChartLoader::new(Arc::clone(&cache), client, registry as Arc<dyn ChartPuller>)
                    .with_credentials(credentials)
                    .with_pass_credentials_all(config.tls.pass_credentials_all),
            ) as Arc<dyn ChartLoader>
        });

        let renderer = self
            .renderer
            .unwrap_or_else(|| Arc::new(HelmTemplateRenderer::from_config(&config.render)) as Arc<dyn ChartRenderer>);

        Ok(Chartex {
            resolver: VersionResolver::new(Arc::clone(&cache), tag_lister),
            cache,
            loader,
            renderer,
        })
    }
}
