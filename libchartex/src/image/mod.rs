//! Container image reference normalization.
//!
//! Image strings found in rendered manifests are free-form (`nginx`,
//! `bitnami/redis:7.2`, `registry.example.com:5000/app@sha256:...`). This
//! module turns them into a structured [`ImageReference`] without ever
//! failing: missing parts fall back to Docker Hub defaults.

use serde::{Deserialize, Serialize};


/// Registry assumed for images that do not name one.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Tag assumed for images that carry neither a tag nor a digest.
pub const DEFAULT_TAG: &str = "latest";

/// A container image referenced by a workload in a rendered chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub digest: String,
    /// The image string exactly as written in the manifest.
    pub full_image: String,
    /// Where the image was found, e.g. `Deployment/web` or `Job/migrate (init)`.
    pub source: String,
}

impl ImageReference {
    /// Returns a copy labelled with `source`.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Parses an image string into its registry, repository, tag and digest.
///
/// Registry detection is heuristic: a leading path segment is treated as a
/// host only when it contains `.` or `:`. A bare internal host such as
/// `myregistry/app` is therefore read as the Docker Hub repository
/// `myregistry/app`.
///
/// # Examples
///
/// ```
/// use libchartex::image::normalize;
///
/// let image = normalize("registry.example.com:5000/app:v1");
/// assert_eq!(image.registry, "registry.example.com:5000");
/// assert_eq!(image.repository, "app");
/// assert_eq!(image.tag, "v1");
///
/// let image = normalize("nginx");
/// assert_eq!(image.registry, "docker.io");
/// assert_eq!(image.repository, "library/nginx");
/// assert_eq!(image.tag, "latest");
/// ```
pub fn normalize(image: &str) -> ImageReference {
    let mut reference = ImageReference {
        full_image: image.to_string(),
        tag: DEFAULT_TAG.to_string(),
        ..Default::default()
    };

    if image.is_empty() {
        return reference;
    }

    let mut remainder = image;

    // name@digest or name:tag@digest
    if let Some((name, digest)) = remainder.rsplit_once('@') {
        reference.digest = digest.to_string();
        reference.tag.clear();
        remainder = name;
    }

    // A colon followed by a slash belongs to a registry port, not a tag.
    if let Some((name, tag)) = remainder.rsplit_once(':')
        && !tag.contains('/')
    {
        reference.tag = tag.to_string();
        remainder = name;
    }

    let segments: Vec<&str> = remainder.split('/').collect();
    match segments.as_slice() {
        [name] => {
            reference.registry = DEFAULT_REGISTRY.to_string();
            reference.repository = format!("library/{}", name);
        }
        [first, rest] if is_host_like(first) => {
            reference.registry = first.to_string();
            reference.repository = rest.to_string();
        }
        [_, _] => {
            reference.registry = DEFAULT_REGISTRY.to_string();
            reference.repository = remainder.to_string();
        }
        [first, rest @ ..] => {
            reference.registry = first.to_string();
            reference.repository = rest.join("/");
        }
        [] => {}
    }

    reference
}

fn is_host_like(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':')
}
