//! Declared chart dependencies.
//!
//! [`walk`] reads the `dependencies` section of `Chart.yaml` and descends
//! into vendored subcharts, producing one compact JSON object per declared
//! dependency in pre-order.

use crate::chart::{CHART_YAML, Chart};
use crate::error::{ChartexError, Result};
use serde::{Deserialize, Serialize};


/// A dependency declared in `Chart.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub repository: String,
}

impl DependencyItem {
    fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.version.is_empty() && !self.repository.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ChartSchema {
    #[serde(default)]
    dependencies: Option<Vec<DependencyItem>>,
}

/// Returns the declared dependencies of `chart` and of every vendored
/// subchart that matches a declaration by name and version.
///
/// Each entry is a JSON object of the form
/// `{"name":"redis","version":"17.0.0","repository":"https://charts.bitnami.com/bitnami"}`.
///
/// # Errors
///
/// Fails when `Chart.yaml` is missing from the chart files, cannot be
/// parsed, or declares a dependency without a name, version or repository.
pub fn walk(chart: &Chart) -> Result<Vec<String>> {
    let chart_yaml = chart
        .file(CHART_YAML)
        .filter(|f| !f.data.is_empty())
        .ok_or_else(|| ChartexError::validation("`Chart.yaml` not found in the chart"))?;

    let schema: ChartSchema = serde_yaml::from_slice(&chart_yaml.data)
        .map_err(|e| ChartexError::validation_with_source("Failed to parse Chart.yaml", e))?;
    let declared = schema.dependencies.unwrap_or_default();

    let mut dependencies = Vec::with_capacity(declared.len());
    for item in declared {
        if !item.is_complete() {
            return Err(ChartexError::validation(format!(
                "Dependency item is missing required fields: {:?}",
                item
            )));
        }

        let json = serde_json::to_string(&item).map_err(|e| {
            ChartexError::validation_with_source("Failed to serialize dependency item", e)
        })?;
        dependencies.push(json);

        let subchart = chart
            .dependencies
            .iter()
            .find(|sub| sub.name() == item.name && sub.version() == item.version);
        if let Some(subchart) = subchart {
            let nested = walk(subchart).map_err(|e| {
                ChartexError::validation_with_source(
                    format!("Failed to get dependencies for chart {}", subchart.name()),
                    e,
                )
            })?;
            dependencies.extend(nested);
        }
    }

    Ok(dependencies)
}
