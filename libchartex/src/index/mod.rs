//! Chart repository index (`index.yaml`).
//!
//! Classic Helm repositories publish an `index.yaml` listing every chart and
//! version they serve. [`IndexFile`] models that document; versions of each
//! chart are kept in descending version order once loaded. The
//! [`IndexDownloader`] trait separates fetching an index from caching it.

use crate::auth::Credentials;
use crate::client::Client;
use crate::error::{ChartexError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use url::Url;


/// File name of the index inside a repository.
pub const INDEX_FILE: &str = "index.yaml";

/// One published version of a chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartVersion {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: String,
    /// Download locations of the packaged chart, absolute or relative to
    /// the repository URL.
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(
        default,
        deserialize_with = "optional_scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

/// A parsed repository index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile {
    #[serde(default)]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<ChartVersion>>,
}

impl IndexFile {
    /// Parses index contents and sorts every chart's versions, newest first.
    pub fn from_yaml(data: &[u8]) -> Result<Self> {
        let mut index: IndexFile = serde_yaml::from_slice(data).map_err(|e| {
            ChartexError::validation_with_source("Failed to parse repository index", e)
        })?;

        if index.api_version.is_empty() {
            return Err(ChartexError::validation(
                "Repository index has no apiVersion",
            ));
        }

        index.sort_entries();
        Ok(index)
    }

    /// Sorts each chart's versions in descending version order.
    ///
    /// Versions that are not valid semantic versions sort after all valid
    /// ones, in descending lexical order.
    pub fn sort_entries(&mut self) {
        for versions in self.entries.values_mut() {
            versions.sort_by(|a, b| compare_versions_desc(&a.version, &b.version));
        }
    }

    /// Returns the distinct chart names in ascending order.
    pub fn chart_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Returns the versions of `chart`, newest first.
    pub fn versions(&self, chart: &str) -> Option<&[ChartVersion]> {
        self.entries.get(chart).map(Vec::as_slice)
    }

    /// Looks up a chart version; `None` selects the newest.
    pub fn get(&self, chart: &str, version: Option<&str>) -> Option<&ChartVersion> {
        let versions = self.versions(chart)?;
        match version {
            Some(version) => versions.iter().find(|v| v.version == version),
            None => versions.first(),
        }
    }
}

/// Parses a chart version leniently: a leading `v` is ignored and missing
/// minor or patch components count as zero.
pub fn parse_version(version: &str) -> Option<semver::Version> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if let Ok(parsed) = semver::Version::parse(trimmed) {
        return Some(parsed);
    }

    let split = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split);
    let padded = match core.split('.').count() {
        1 => format!("{}.0.0{}", core, suffix),
        2 => format!("{}.0{}", core, suffix),
        _ => return None,
    };
    semver::Version::parse(&padded).ok()
}

/// Orders versions newest first; unparsable versions come last.
pub fn compare_versions_desc(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.cmp(a),
    }
}

/// Returns the URL of the index inside `repository_url`.
pub fn index_url(repository_url: &str) -> String {
    format!("{}/{}", repository_url.trim_end_matches('/'), INDEX_FILE)
}

/// Resolves a chart download URL listed in an index.
///
/// Absolute URLs are returned unchanged. Relative ones, including those with
/// a leading `/`, are appended to the repository URL.
pub fn resolve_chart_url(repository_url: &str, chart_url: &str) -> Result<String> {
    if let Ok(url) = Url::parse(chart_url) {
        return Ok(url.to_string());
    }

    let base = format!("{}/", repository_url.trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|base| base.join(chart_url.trim_start_matches('/')))
        .map(|url| url.to_string())
        .map_err(|e| {
            ChartexError::validation_with_source(
                format!(
                    "Invalid chart URL {} for repository {}",
                    chart_url, repository_url
                ),
                e,
            )
        })
}

/// Fetches the index of a repository.
#[async_trait]
pub trait IndexDownloader: Send + Sync {
    /// Downloads and parses the index of the repository at `url`.
    ///
    /// `name` identifies the repository in logs and errors.
    async fn download(&self, name: &str, url: &str) -> Result<IndexFile>;
}

#[async_trait]
impl<T: IndexDownloader + ?Sized> IndexDownloader for Arc<T> {
    async fn download(&self, name: &str, url: &str) -> Result<IndexFile> {
        (**self).download(name, url).await
    }
}

/// Downloads indexes over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpIndexDownloader {
    client: Client,
    credentials: Option<Credentials>,
}

impl HttpIndexDownloader {
    pub fn new(client: Client, credentials: Option<Credentials>) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl IndexDownloader for HttpIndexDownloader {
    async fn download(&self, name: &str, url: &str) -> Result<IndexFile> {
        let target = index_url(url);
        info!(repository = name, url = %target, "Downloading repository index");

        let data = self
            .client
            .get_bytes(&target, self.credentials.as_ref())
            .await
            .map_err(|e| ChartexError::index(url, "failed to download index", e))?;

        IndexFile::from_yaml(&data).map_err(|e| ChartexError::index(url, "invalid index", e))
    }
}

fn scalar_to_string(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accepts unquoted numeric versions such as `version: 1.0`.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let value = serde_yaml::Value::deserialize(deserializer)?;
    Ok(scalar_to_string(value).unwrap_or_default())
}

fn optional_scalar_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    let value = serde_yaml::Value::deserialize(deserializer)?;
    Ok(scalar_to_string(value))
}
