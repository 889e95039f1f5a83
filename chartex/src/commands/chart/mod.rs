use crate::format::{self, Formattable, OutputFormat};
use libchartex::Chartex;
use libchartex::dependency::DependencyItem;
use serde::Serialize;
use tabled::Tabled;
use tracing::debug;

/// A declared chart dependency, as displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct DependencyRow {
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "VERSION")]
    pub version: String,
    #[tabled(rename = "REPOSITORY")]
    pub repository: String,
}

impl From<DependencyItem> for DependencyRow {
    fn from(item: DependencyItem) -> Self {
        Self {
            name: item.name,
            version: item.version,
            repository: item.repository,
        }
    }
}

/// Charts served by a repository
pub async fn charts(chartex: &Chartex, repo: &str, format: OutputFormat) -> Result<String, String> {
    let charts = chartex.list_charts(repo).await.map_err(describe)?;
    format::format_output_vec(&charts, format)
}

/// Versions of a chart, newest first
pub async fn versions(
    chartex: &Chartex,
    repo: &str,
    chart: &str,
    format: OutputFormat,
) -> Result<String, String> {
    let versions = chartex.list_versions(repo, chart).await.map_err(describe)?;
    format::format_output_vec(&versions, format)
}

/// Newest version of a chart
pub async fn latest(
    chartex: &Chartex,
    repo: &str,
    chart: &str,
    format: OutputFormat,
) -> Result<String, String> {
    let version = chartex.latest_version(repo, chart).await.map_err(describe)?;
    format::format_output(&version, format)
}

/// Default values of a chart
///
/// Pretty output is the raw `values.yaml`; JSON and YAML re-encode it.
pub async fn values(
    chartex: &Chartex,
    repo: &str,
    chart: &str,
    version: &str,
    format: OutputFormat,
) -> Result<String, String> {
    let values = chartex.values(repo, chart, version).await.map_err(describe)?;
    if format == OutputFormat::Pretty {
        return Ok(values);
    }

    let parsed: serde_yaml::Value = if values.trim().is_empty() {
        serde_yaml::Value::Mapping(Default::default())
    } else {
        serde_yaml::from_str(&values).map_err(|e| format!("Failed to parse values.yaml: {}", e))?
    };

    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&parsed)
            .map_err(|e| format!("Failed to serialize to JSON: {}", e)),
        _ => serde_yaml::to_string(&parsed).map_err(|e| format!("Failed to serialize to YAML: {}", e)),
    }
}

/// All files of a chart, annotated with their paths
pub async fn contents(
    chartex: &Chartex,
    repo: &str,
    chart: &str,
    version: &str,
    recursive: bool,
    format: OutputFormat,
) -> Result<String, String> {
    let contents = chartex
        .contents(repo, chart, version, recursive)
        .await
        .map_err(describe)?;
    format::format_output(&contents, format)
}

/// Declared dependencies of a chart and its vendored subcharts
pub async fn dependencies(
    chartex: &Chartex,
    repo: &str,
    chart: &str,
    version: &str,
    format: OutputFormat,
) -> Result<String, String> {
    let raw = chartex
        .dependencies(repo, chart, version)
        .await
        .map_err(describe)?;
    debug!(count = raw.len(), "Resolved chart dependencies");

    let rows = parse_dependencies(&raw)?;
    match format {
        OutputFormat::Pretty if rows.is_empty() => Ok("No dependencies.".to_string()),
        OutputFormat::Pretty => {
            use tabled::{Table, settings::Style};
            Ok(Table::new(&rows).with(Style::empty()).to_string())
        }
        _ => format::format_output_vec(&rows, format),
    }
}

impl Formattable for DependencyRow {
    fn format_pretty(&self) -> String {
        format!("{} {} {}", self.name, self.version, self.repository)
    }
}

/// Decodes the JSON objects produced by the dependency walk.
pub fn parse_dependencies(raw: &[String]) -> Result<Vec<DependencyRow>, String> {
    raw.iter()
        .map(|entry| {
            serde_json::from_str::<DependencyItem>(entry)
                .map(DependencyRow::from)
                .map_err(|e| format!("Invalid dependency entry {}: {}", entry, e))
        })
        .collect()
}

/// Error message with its chain of causes.
pub fn describe(error: libchartex::ChartexError) -> String {
    format::error_chain(&error)
}
