//! Chart and version resolution across HTTP repositories and OCI registries.
//!
//! HTTP locators are answered from the cached repository index. OCI locators
//! bypass the cache and ask the registry for the tags of the chart
//! reference, which come back newest first.

use crate::cache::SharedIndexCache;
use crate::error::{ChartexError, Result};
use crate::oci::TagLister;
use crate::reference::{chart_name_from_oci, is_oci, oci_reference};
use std::sync::Arc;
use tracing::debug;

#[cfg(test)]
mod tests;

pub struct VersionResolver {
    cache: Arc<SharedIndexCache>,
    tags: Arc<dyn TagLister>,
}

impl VersionResolver {
    pub fn new(cache: Arc<SharedIndexCache>, tags: Arc<dyn TagLister>) -> Self {
        Self { cache, tags }
    }

    /// Lists the charts served by `locator`.
    ///
    /// An OCI locator addresses a single chart whose name is its last path
    /// segment. HTTP repositories list every chart of their index, sorted.
    ///
    /// # Errors
    ///
    /// Fails with a validation error when the locator is empty or an OCI
    /// locator has no chart name.
    pub async fn list_charts(&self, locator: &str) -> Result<Vec<String>> {
        require_locator(locator)?;

        if is_oci(locator) {
            let name = chart_name_from_oci(locator);
            if name.is_empty() {
                return Err(ChartexError::validation(format!(
                    "Cannot derive a chart name from {}",
                    locator
                )));
            }
            return Ok(vec![name]);
        }

        let index = self.cache.get_index(locator, locator).await?;
        Ok(index.chart_names())
    }

    /// Lists the versions of `chart`, newest first.
    ///
    /// A chart missing from an HTTP index yields an empty list.
    pub async fn resolve_versions(&self, locator: &str, chart: &str) -> Result<Vec<String>> {
        require_locator(locator)?;

        if is_oci(locator) {
            let reference = oci_reference(locator, chart, "");
            debug!(reference = %reference, "Listing OCI chart tags");
            return self.tags.list_tags(&reference).await;
        }

        let index = self.cache.get_index(locator, locator).await?;
        Ok(index
            .versions(chart)
            .map(|versions| versions.iter().map(|v| v.version.clone()).collect())
            .unwrap_or_default())
    }

    /// Returns the newest version of `chart`.
    ///
    /// # Errors
    ///
    /// [`ChartexError::NotFound`] when the chart is absent or has no
    /// published versions.
    pub async fn resolve_latest(&self, locator: &str, chart: &str) -> Result<String> {
        if is_oci(locator) {
            let reference = oci_reference(locator, chart, "");
            return self
                .resolve_versions(locator, chart)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| ChartexError::not_found("chart version", reference));
        }

        require_locator(locator)?;
        let index = self.cache.get_index(locator, locator).await?;
        index
            .get(chart, None)
            .map(|entry| entry.version.clone())
            .ok_or_else(|| ChartexError::not_found("chart", format!("{} in {}", chart, locator)))
    }
}

fn require_locator(locator: &str) -> Result<()> {
    if locator.trim().is_empty() {
        return Err(ChartexError::validation("Repository locator is required"));
    }
    Ok(())
}
