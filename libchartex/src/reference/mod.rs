//! Repository locators and OCI chart references.
//!
//! A locator is either a classic HTTP repository URL or an `oci://` registry
//! path. For OCI locators this module builds the registry reference of a
//! chart (`registry/path/chart:version`) and parses it through
//! `oci_spec::distribution::Reference`.

use crate::error::{ChartexError, Result};
use oci_spec::distribution::Reference as OciReference;
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
mod tests;

/// Scheme prefix of OCI locators.
pub const OCI_SCHEME: &str = "oci://";

/// Returns true when `locator` addresses an OCI registry.
///
/// # Examples
///
/// ```
/// use libchartex::reference::is_oci;
///
/// assert!(is_oci("oci://ghcr.io/org/charts"));
/// assert!(!is_oci("https://charts.bitnami.com/bitnami"));
/// assert!(!is_oci(""));
/// ```
pub fn is_oci(locator: &str) -> bool {
    locator.starts_with(OCI_SCHEME)
}

/// Splits a `:tag` suffix off the last path segment.
///
/// A colon in an earlier segment, or in a bare `host:port`, is a registry
/// port and stays put.
fn split_tag(reference: &str) -> (&str, Option<&str>) {
    let Some(slash) = reference.rfind('/') else {
        return (reference, None);
    };
    let segment_start = slash + 1;
    match reference[segment_start..].find(':') {
        Some(offset) => {
            let at = segment_start + offset;
            (&reference[..at], Some(&reference[at + 1..]))
        }
        None => (reference, None),
    }
}

/// Builds the registry reference of a chart from an OCI locator.
///
/// The chart name is appended unless the locator already ends with it, and
/// `version` becomes the tag. Empty `chart` or `version` are left out.
///
/// # Examples
///
/// ```
/// use libchartex::reference::oci_reference;
///
/// assert_eq!(
///     oci_reference("oci://ghcr.io/org/charts", "mychart", "1.0.0"),
///     "ghcr.io/org/charts/mychart:1.0.0"
/// );
/// assert_eq!(
///     oci_reference("oci://ghcr.io/org/charts/mychart", "mychart", ""),
///     "ghcr.io/org/charts/mychart"
/// );
/// ```
pub fn oci_reference(locator: &str, chart: &str, version: &str) -> String {
    let trimmed = locator.strip_prefix(OCI_SCHEME).unwrap_or(locator);
    let (base, tag) = split_tag(trimmed);
    let mut reference = base.trim_end_matches('/').to_string();

    if !chart.is_empty() && reference != chart && !reference.ends_with(&format!("/{}", chart)) {
        reference.push('/');
        reference.push_str(chart);
    }

    if !version.is_empty() {
        reference.push(':');
        reference.push_str(version);
    } else if let Some(tag) = tag
        && chart.is_empty()
    {
        reference.push(':');
        reference.push_str(tag);
    }

    reference
}

/// Derives the chart name from an OCI locator: the last path segment
/// without any `:tag`.
///
/// # Examples
///
/// ```
/// use libchartex::reference::chart_name_from_oci;
///
/// assert_eq!(chart_name_from_oci("oci://ghcr.io/org/charts/mychart:1.0.0"), "mychart");
/// ```
pub fn chart_name_from_oci(locator: &str) -> String {
    let trimmed = locator.strip_prefix(OCI_SCHEME).unwrap_or(locator);
    let (base, _) = split_tag(trimmed.trim_end_matches('/'));
    base.rsplit('/').next().unwrap_or_default().to_string()
}

/// A parsed registry reference, wrapping `oci_spec::distribution::Reference`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference(OciReference);

impl FromStr for Reference {
    type Err = ChartexError;

    fn from_str(s: &str) -> Result<Self> {
        let oci_reference = OciReference::from_str(s).map_err(|e| ChartexError::Validation {
            message: format!("Invalid OCI reference {}: {}", s, e),
            source: Some(Box::new(e)),
        })?;
        Ok(Reference(oci_reference))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Reference {
    /// Returns the registry part of the reference.
    pub fn registry(&self) -> &str {
        self.0.registry()
    }

    /// Returns the host serving the registry API.
    ///
    /// Docker Hub is addressed as `docker.io` but served from
    /// `registry-1.docker.io`.
    pub fn api_host(&self) -> &str {
        match self.registry() {
            "docker.io" | "index.docker.io" => "registry-1.docker.io",
            registry => registry,
        }
    }

    /// Returns the repository part of the reference.
    pub fn repository(&self) -> &str {
        self.0.repository()
    }

    /// Returns the tag part of the reference, if present.
    pub fn tag(&self) -> Option<&str> {
        self.0.tag()
    }

    /// Returns the digest part of the reference, if present.
    pub fn digest(&self) -> Option<&str> {
        self.0.digest()
    }
}
