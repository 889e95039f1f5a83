//! Chart loading from repositories.
//!
//! [`RemoteChartLoader`] fetches a packaged chart and unpacks it into a
//! [`Chart`]. HTTP repositories are resolved through their cached index; OCI
//! locators are pulled from the registry.

use crate::auth::Credentials;
use crate::cache::SharedIndexCache;
use crate::chart::Chart;
use crate::client::{Client, same_origin};
use crate::error::{ChartexError, Result};
use crate::index::resolve_chart_url;
use crate::oci::ChartPuller;
use crate::reference::{is_oci, oci_reference};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

#[cfg(test)]
mod tests;

/// Loads a chart by repository locator, name and version.
#[async_trait]
pub trait ChartLoader: Send + Sync {
    /// Loads `chart` at `version` from `locator`.
    ///
    /// An empty `version` selects the newest one known to the repository.
    async fn load(&self, locator: &str, chart: &str, version: &str) -> Result<Chart>;
}

pub struct RemoteChartLoader {
    cache: Arc<SharedIndexCache>,
    client: Client,
    puller: Arc<dyn ChartPuller>,
    credentials: Option<Credentials>,
    pass_credentials_all: bool,
}

impl RemoteChartLoader {
    pub fn new(cache: Arc<SharedIndexCache>, client: Client, puller: Arc<dyn ChartPuller>) -> Self {
        Self {
            cache,
            client,
            puller,
            credentials: None,
            pass_credentials_all: false,
        }
    }

    /// Credentials sent with chart downloads from HTTP repositories.
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sends credentials to chart URLs on other hosts than the repository.
    pub fn with_pass_credentials_all(mut self, pass_credentials_all: bool) -> Self {
        self.pass_credentials_all = pass_credentials_all;
        self
    }

    async fn load_http(&self, locator: &str, chart: &str, version: &str) -> Result<Vec<u8>> {
        let index = self.cache.get_index(locator, locator).await?;
        let requested = (!version.is_empty()).then_some(version);

        let entry = index.get(chart, requested).ok_or_else(|| {
            ChartexError::not_found("chart", format!("{}@{} in {}", chart, version, locator))
        })?;

        let chart_url = entry.urls.first().ok_or_else(|| {
            ChartexError::validation(format!(
                "Chart {} {} in {} has no download URL",
                chart, entry.version, locator
            ))
        })?;
        let url = resolve_chart_url(locator, chart_url)?;

        let credentials = if self.pass_credentials_all || same_origin(locator, &url) {
            self.credentials.as_ref()
        } else {
            None
        };

        info!(chart, version = %entry.version, url = %url, "Downloading chart");
        self.client.get_bytes(&url, credentials).await
    }
}

#[async_trait]
impl ChartLoader for RemoteChartLoader {
    async fn load(&self, locator: &str, chart: &str, version: &str) -> Result<Chart> {
        let archive = if is_oci(locator) {
            self.puller
                .pull_chart(&oci_reference(locator, chart, version))
                .await?
        } else {
            self.load_http(locator, chart, version).await?
        };

        Chart::from_archive(&archive)
    }
}
