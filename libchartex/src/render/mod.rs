//! Chart rendering.
//!
//! Template evaluation is delegated to the `helm` binary: the in-memory chart
//! is packaged into a temporary directory and passed to `helm template`
//! together with the value overrides. The rendered YAML is returned as is.
//!
//! `helm template` refuses charts that declare dependencies missing from
//! `charts/`, so declarations without a vendored subchart are dropped from
//! the packaged copy. Templates calling `required` or `fail` still abort the
//! render.

use crate::chart::{CHART_YAML, Chart, REQUIREMENTS_YAML};
use crate::config;
use crate::error::{ChartexError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::ffi::OsString;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

#[cfg(test)]
mod tests;

/// Renders a chart into Kubernetes manifests.
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    /// Renders `chart` with `values` merged over the chart defaults.
    ///
    /// Returns one or more blobs of `---` separated YAML documents.
    async fn render(&self, chart: &Chart, values: &Value) -> Result<Vec<String>>;
}

/// Renders charts with `helm template`.
#[derive(Debug, Clone)]
pub struct HelmTemplateRenderer {
    helm_binary: String,
    release_name: String,
    namespace: String,
}

impl Default for HelmTemplateRenderer {
    fn default() -> Self {
        Self::from_config(&config::Render::default())
    }
}

impl HelmTemplateRenderer {
    pub fn from_config(config: &config::Render) -> Self {
        Self {
            helm_binary: config.helm_binary.clone(),
            release_name: config.release_name.clone(),
            namespace: config.namespace.clone(),
        }
    }

    pub fn with_helm_binary(mut self, helm_binary: impl Into<String>) -> Self {
        self.helm_binary = helm_binary.into();
        self
    }

    fn template_args(&self, chart_path: &Path, values_path: Option<&Path>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "template".into(),
            self.release_name.clone().into(),
            chart_path.into(),
            "--namespace".into(),
            self.namespace.clone().into(),
        ];
        if let Some(values_path) = values_path {
            args.push("--values".into());
            args.push(values_path.into());
        }
        args
    }
}

fn has_overrides(values: &Value) -> bool {
    match values {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// Returns a copy of `chart` whose declared dependencies, at every level,
/// are limited to the vendored subcharts.
fn vendored_only(chart: &Chart) -> Result<Chart> {
    let vendored: Vec<&str> = chart.dependencies.iter().map(Chart::name).collect();

    let mut pruned = chart.clone();
    for file in pruned
        .raw
        .iter_mut()
        .filter(|f| f.name == CHART_YAML || f.name == REQUIREMENTS_YAML)
    {
        let rewritten = prune_declared(&file.data, &vendored).map_err(|e| {
            ChartexError::render_with_source(
                chart.name(),
                format!("failed to rewrite {}", file.name),
                e,
            )
        })?;
        if let Some(data) = rewritten {
            debug!(chart = %chart.name(), file = %file.name, "Dropped dependencies without a vendored subchart");
            file.data = data;
        }
    }

    pruned.dependencies = chart
        .dependencies
        .iter()
        .map(vendored_only)
        .collect::<Result<_>>()?;
    Ok(pruned)
}

/// Removes `dependencies` entries that match no vendored subchart.
///
/// Returns `None` when nothing was removed, leaving the file untouched.
fn prune_declared(data: &[u8], vendored: &[&str]) -> serde_yaml::Result<Option<Vec<u8>>> {
    let mut document: serde_yaml::Value = serde_yaml::from_slice(data)?;
    let Some(declared) = document
        .get_mut("dependencies")
        .and_then(serde_yaml::Value::as_sequence_mut)
    else {
        return Ok(None);
    };

    let before = declared.len();
    declared.retain(|dependency| is_vendored(dependency, vendored));
    if declared.len() == before {
        return Ok(None);
    }

    serde_yaml::to_string(&document).map(|yaml| Some(yaml.into_bytes()))
}

fn is_vendored(dependency: &serde_yaml::Value, vendored: &[&str]) -> bool {
    ["name", "alias"]
        .iter()
        .filter_map(|key| dependency.get(*key).and_then(serde_yaml::Value::as_str))
        .any(|name| vendored.contains(&name))
}

#[async_trait]
impl ChartRenderer for HelmTemplateRenderer {
    async fn render(&self, chart: &Chart, values: &Value) -> Result<Vec<String>> {
        let name = chart.name().to_string();
        if has_overrides(values) && !values.is_object() {
            return Err(ChartexError::validation(
                "Chart values must be a JSON object",
            ));
        }

        let workdir = tempfile::tempdir().map_err(|e| {
            ChartexError::render_with_source(&name, "failed to create working directory", e)
        })?;

        let chart_path = workdir
            .path()
            .join(format!("{}-{}.tgz", chart.name(), chart.version()));
        tokio::fs::write(&chart_path, vendored_only(chart)?.to_archive()?)
            .await
            .map_err(|e| ChartexError::render_with_source(&name, "failed to write chart", e))?;

        let values_path = workdir.path().join("values.json");
        let values_path = if has_overrides(values) {
            let data = serde_json::to_vec(values).map_err(|e| {
                ChartexError::render_with_source(&name, "failed to serialize values", e)
            })?;
            tokio::fs::write(&values_path, data).await.map_err(|e| {
                ChartexError::render_with_source(&name, "failed to write values", e)
            })?;
            Some(values_path.as_path())
        } else {
            None
        };

        let args = self.template_args(&chart_path, values_path);
        debug!(chart = %name, binary = %self.helm_binary, ?args, "Rendering chart");

        let output = Command::new(&self.helm_binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                ChartexError::render_with_source(
                    &name,
                    format!("failed to run {}", self.helm_binary),
                    e,
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChartexError::render(
                &name,
                format!("{} exited with {}: {}", self.helm_binary, output.status, stderr.trim()),
            ));
        }

        Ok(vec![String::from_utf8_lossy(&output.stdout).into_owned()])
    }
}
