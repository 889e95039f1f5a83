//! Image extraction from rendered Kubernetes manifests.
//!
//! Rendered chart output is a list of YAML blobs, each possibly holding many
//! `---` separated documents. Every document is parsed independently into a
//! [`Node`] tree; workloads with a known pod spec location contribute one
//! [`ImageReference`] per container.
//!
//! A document that fails to parse is skipped and logged at debug level. It
//! never affects the other documents.

use crate::image::{ImageReference, normalize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use tracing::debug;


/// Separator between YAML documents in rendered output.
pub const DOCUMENT_SEPARATOR: &str = "---";

/// A parsed manifest document.
///
/// Mapping keys are always strings: non-string scalar keys are stringified
/// and complex keys are dropped, so lookups never have to consider the
/// original key type.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(String),
    String(String),
    Sequence(Vec<Node>),
    Mapping(BTreeMap<String, Node>),
}

impl Node {
    /// Parses a single YAML document.
    pub fn parse(document: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str::<Value>(document).map(Node::from)
    }

    /// Returns the child stored under `key` if this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// Follows `path` through nested mappings.
    ///
    /// Returns `None` as soon as a segment is missing or a node along the way
    /// is not a mapping.
    ///
    /// # Examples
    ///
    /// ```
    /// use libchartex::manifest::Node;
    ///
    /// let node = Node::parse("spec:\n  replicas: 3\n").unwrap();
    /// assert_eq!(node.get_path(&["spec", "replicas"]).and_then(Node::as_str), Some("3"));
    /// assert!(node.get_path(&["spec", "replicas", "deeper"]).is_none());
    /// ```
    pub fn get_path(&self, path: &[&str]) -> Option<&Node> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Returns the scalar text of strings and numbers.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) | Node::Number(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the text of string nodes only.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n.to_string()),
            Value::String(s) => Node::String(s),
            Value::Sequence(items) => Node::Sequence(items.into_iter().map(Node::from).collect()),
            Value::Mapping(mapping) => Node::Mapping(
                mapping
                    .into_iter()
                    .filter_map(|(key, value)| scalar_key(key).map(|k| (k, Node::from(value))))
                    .collect(),
            ),
            Value::Tagged(tagged) => Node::from(tagged.value),
        }
    }
}

fn scalar_key(key: Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Tagged(tagged) => scalar_key(tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Where the pod spec lives for each workload kind that carries containers.
fn pod_spec_path(kind: &str) -> Option<&'static [&'static str]> {
    match kind {
        "Deployment" | "StatefulSet" | "DaemonSet" | "ReplicaSet" | "Job" => {
            Some(&["spec", "template", "spec"])
        }
        "CronJob" => Some(&["spec", "jobTemplate", "spec", "template", "spec"]),
        "Pod" => Some(&["spec"]),
        _ => None,
    }
}

/// Splits a rendered blob into trimmed, non-empty documents.
pub fn split_documents(blob: &str) -> impl Iterator<Item = &str> {
    blob.split(DOCUMENT_SEPARATOR)
        .map(str::trim)
        .filter(|doc| !doc.is_empty())
}

/// Extracts every container image from a set of rendered manifest blobs.
///
/// The result keeps document order and may contain duplicates; see
/// [`crate::aggregate::finalize`].
pub fn extract<I, S>(blobs: I) -> Vec<ImageReference>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut images = Vec::new();
    for blob in blobs {
        for document in split_documents(blob.as_ref()) {
            images.extend(extract_document(document));
        }
    }
    images
}

/// Extracts the container images of a single YAML document.
pub fn extract_document(document: &str) -> Vec<ImageReference> {
    match Node::parse(document) {
        Ok(node) => extract_from_node(&node),
        Err(e) => {
            debug!(error = %e, "Skipping manifest document that failed to parse");
            Vec::new()
        }
    }
}

/// Extracts the container images of an already parsed document.
pub fn extract_from_node(node: &Node) -> Vec<ImageReference> {
    let Some(kind) = node.get("kind").and_then(Node::as_string) else {
        return Vec::new();
    };
    let Some(path) = pod_spec_path(kind) else {
        return Vec::new();
    };
    let Some(pod_spec) = node.get_path(path) else {
        return Vec::new();
    };

    let source = match node.get_path(&["metadata", "name"]).and_then(Node::as_string) {
        Some(name) if !name.is_empty() => format!("{}/{}", kind, name),
        _ => kind.to_string(),
    };

    let mut images = container_images(pod_spec, "containers", &source);
    images.extend(container_images(
        pod_spec,
        "initContainers",
        &format!("{} (init)", source),
    ));
    images
}

fn container_images(pod_spec: &Node, field: &str, source: &str) -> Vec<ImageReference> {
    let Some(containers) = pod_spec.get(field).and_then(Node::as_sequence) else {
        return Vec::new();
    };

    containers
        .iter()
        .filter_map(|container| container.get("image").and_then(Node::as_string))
        .filter(|image| !image.is_empty())
        .map(|image| normalize(image).with_source(source))
        .collect()
}
