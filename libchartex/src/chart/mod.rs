//! In-memory Helm charts.
//!
//! A [`Chart`] is loaded from a packaged `.tgz` archive. Files of the chart
//! itself are kept verbatim in [`Chart::raw`]; vendored subcharts found under
//! `charts/` (packaged archives or plain directories) are loaded recursively
//! into [`Chart::dependencies`].

use crate::error::{ChartexError, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Component, Path};
use tar::Archive;


/// File name of the chart metadata.
pub const CHART_YAML: &str = "Chart.yaml";

/// File name of the default values.
pub const VALUES_YAML: &str = "values.yaml";

/// Dependency declarations of `apiVersion: v1` charts.
pub const REQUIREMENTS_YAML: &str = "requirements.yaml";

const CHARTS_DIR: &str = "charts/";
const TEMPLATES_DIR: &str = "templates/";

/// Files interpreted by Helm itself rather than exposed as chart files.
const RESERVED_FILES: &[&str] = &[
    CHART_YAML,
    VALUES_YAML,
    "values.schema.json",
    "Chart.lock",
    REQUIREMENTS_YAML,
    "requirements.lock",
];

/// A single file of a chart, named relative to the chart root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl ChartFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// The subset of `Chart.yaml` the explorer relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(default)]
    pub api_version: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ChartMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            api_version: "v2".to_string(),
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }
}

/// A loaded chart with its vendored subcharts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chart {
    pub metadata: ChartMetadata,
    /// Every file of this chart, excluding files of vendored subcharts.
    pub raw: Vec<ChartFile>,
    pub dependencies: Vec<Chart>,
}

impl Chart {
    /// Loads a chart from the bytes of a packaged (`.tgz`) chart.
    ///
    /// The archive is expected to contain a single top-level directory named
    /// after the chart, as produced by `helm package`.
    pub fn from_archive(bytes: &[u8]) -> Result<Self> {
        let mut archive = Archive::new(GzDecoder::new(bytes));
        let entries = archive
            .entries()
            .map_err(|e| ChartexError::validation_with_source("Failed to read chart archive", e))?;

        let mut files = Vec::new();
        for entry in entries {
            let mut entry = entry.map_err(|e| {
                ChartexError::validation_with_source("Failed to read chart archive entry", e)
            })?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let path = entry
                .path()
                .map_err(|e| {
                    ChartexError::validation_with_source("Invalid path in chart archive", e)
                })?
                .into_owned();
            let Some(name) = relative_name(&path)? else {
                continue;
            };

            let mut data = Vec::new();
            entry.read_to_end(&mut data).map_err(|e| {
                ChartexError::validation_with_source(
                    format!("Failed to read {} from chart archive", name),
                    e,
                )
            })?;
            files.push(ChartFile { name, data });
        }

        Self::from_files(files)
    }

    /// Builds a chart from files named relative to the chart root.
    ///
    /// Files under `charts/` become subcharts: `charts/<name>.tgz` is loaded
    /// as an archive and `charts/<dir>/...` as an unpacked chart.
    pub fn from_files(files: Vec<ChartFile>) -> Result<Self> {
        let mut raw = Vec::new();
        let mut archives = Vec::new();
        let mut directories: BTreeMap<String, Vec<ChartFile>> = BTreeMap::new();

        for file in files {
            let Some(rest) = file.name.strip_prefix(CHARTS_DIR) else {
                raw.push(file);
                continue;
            };

            match rest.split_once('/') {
                Some((dir, inner)) => {
                    let inner = ChartFile::new(inner, file.data);
                    directories.entry(dir.to_string()).or_default().push(inner);
                }
                None if rest.ends_with(".tgz") => archives.push(file),
                // Stray files such as charts/.gitkeep
                None => {}
            }
        }

        let chart_yaml = raw
            .iter()
            .find(|f| f.name == CHART_YAML)
            .ok_or_else(|| ChartexError::validation("Chart.yaml file is missing"))?;
        let metadata = ChartMetadata::from_yaml(&chart_yaml.data)?;

        let mut dependencies = Vec::new();
        for archive in archives {
            let chart = Chart::from_archive(&archive.data).map_err(|e| {
                ChartexError::validation_with_source(
                    format!("Failed to load subchart {}", archive.name),
                    e,
                )
            })?;
            dependencies.push(chart);
        }
        for (dir, files) in directories {
            let chart = Chart::from_files(files).map_err(|e| {
                ChartexError::validation_with_source(format!("Failed to load subchart {}", dir), e)
            })?;
            dependencies.push(chart);
        }

        Ok(Self {
            metadata,
            raw,
            dependencies,
        })
    }

    /// Packages the chart into `.tgz` bytes.
    ///
    /// Subcharts are written unpacked under `charts/<name>/`, which
    /// [`Chart::from_archive`] and `helm` both accept.
    pub fn to_archive(&self) -> Result<Vec<u8>> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        self.append_to(&mut builder, self.name())
            .map_err(|e| ChartexError::validation_with_source("Failed to package chart", e))?;

        builder
            .into_inner()
            .and_then(|encoder| encoder.finish())
            .map_err(|e| ChartexError::validation_with_source("Failed to package chart", e))
    }

    fn append_to<W: Write>(&self, builder: &mut tar::Builder<W>, prefix: &str) -> std::io::Result<()> {
        for file in &self.raw {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(file.data.len() as u64);
            header.set_mode(0o644);
            builder.append_data(
                &mut header,
                format!("{}/{}", prefix, file.name),
                file.data.as_slice(),
            )?;
        }

        for subchart in &self.dependencies {
            let prefix = format!("{}/{}{}", prefix, CHARTS_DIR, subchart.name());
            subchart.append_to(builder, &prefix)?;
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Looks up a raw file by its path relative to the chart root.
    pub fn file(&self, name: &str) -> Option<&ChartFile> {
        self.raw.iter().find(|f| f.name == name)
    }

    /// Returns the raw `values.yaml`, or an empty string when the chart has none.
    pub fn values(&self) -> String {
        self.file(VALUES_YAML)
            .map(|f| String::from_utf8_lossy(&f.data).into_owned())
            .unwrap_or_default()
    }

    pub fn templates(&self) -> impl Iterator<Item = &ChartFile> {
        self.raw.iter().filter(|f| f.name.starts_with(TEMPLATES_DIR))
    }

    /// Returns the non-template files of the chart (README, NOTES, helpers
    /// outside `templates/` and so on).
    pub fn files(&self) -> impl Iterator<Item = &ChartFile> {
        self.raw.iter().filter(|f| {
            !f.name.starts_with(TEMPLATES_DIR) && !RESERVED_FILES.contains(&f.name.as_str())
        })
    }

    /// Renders the chart files as one annotated text listing.
    ///
    /// Each file is introduced by `# file: <chart>/<path>`. When `recursive`
    /// is set, every subchart follows under a `# Subchart: <name>` line.
    pub fn contents(&self, recursive: bool) -> String {
        let mut out = String::new();
        for file in self.files() {
            out.push_str(&format!("# file: {}/{}\n", self.name(), file.name));
            out.push_str(&String::from_utf8_lossy(&file.data));
            out.push_str("\n\n");
        }

        if recursive {
            for subchart in &self.dependencies {
                out.push_str(&format!("# Subchart: {}\n", subchart.name()));
                out.push_str(&subchart.contents(recursive));
            }
        }

        out
    }
}

impl ChartMetadata {
    /// Parses `Chart.yaml` contents.
    pub fn from_yaml(data: &[u8]) -> Result<Self> {
        let metadata: ChartMetadata = serde_yaml::from_slice(data)
            .map_err(|e| ChartexError::validation_with_source("Failed to parse Chart.yaml", e))?;

        if metadata.name.is_empty() {
            return Err(ChartexError::validation("Chart.yaml is missing a chart name"));
        }

        Ok(metadata)
    }
}

/// Strips the top-level chart directory from an archive path.
///
/// Returns `Ok(None)` for the directory itself and rejects paths that would
/// escape the chart root.
fn relative_name(path: &Path) -> Result<Option<String>> {
    let mut parts = Vec::new();
    let mut components = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir));
    if !matches!(components.next(), Some(Component::Normal(_))) {
        return Err(ChartexError::validation(format!(
            "Illegal path in chart archive: {}",
            path.display()
        )));
    }

    for component in components {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            _ => {
                return Err(ChartexError::validation(format!(
                    "Illegal path in chart archive: {}",
                    path.display()
                )));
            }
        }
    }

    if parts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parts.join("/")))
    }
}
