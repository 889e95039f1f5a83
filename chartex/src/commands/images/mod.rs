use crate::commands::chart::describe;
use crate::format::{self, Formattable, OutputFormat};
use libchartex::{Chartex, ImageReference};
use serde_json::{Map, Value};
use tabled::Tabled;

/// A container image, as displayed in tables
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct ImageRow {
    #[tabled(rename = "IMAGE")]
    pub image: String,
    #[tabled(rename = "REGISTRY")]
    pub registry: String,
    #[tabled(rename = "REPOSITORY")]
    pub repository: String,
    #[tabled(rename = "TAG")]
    pub tag: String,
    #[tabled(rename = "DIGEST")]
    pub digest: String,
    #[tabled(rename = "SOURCE")]
    pub source: String,
}

impl From<&ImageReference> for ImageRow {
    fn from(image: &ImageReference) -> Self {
        Self {
            image: image.full_image.clone(),
            registry: image.registry.clone(),
            repository: image.repository.clone(),
            tag: image.tag.clone(),
            digest: image.digest.clone(),
            source: image.source.clone(),
        }
    }
}

impl Formattable for ImageReference {
    fn format_pretty(&self) -> String {
        format!("{} ({})", self.full_image, self.source)
    }
}

/// Parses repeated `--set-json` overrides into one values object.
///
/// Each override must be a JSON object. Later overrides are merged over
/// earlier ones, nested objects key by key.
pub fn parse_set_json(overrides: &[String]) -> Result<Value, String> {
    let mut values = Value::Object(Map::new());
    for raw in overrides {
        let overlay: Value = serde_json::from_str(raw)
            .map_err(|e| format!("Invalid --set-json value {}: {}", raw, e))?;
        if !overlay.is_object() {
            return Err(format!("--set-json value must be a JSON object: {}", raw));
        }
        merge_values(&mut values, overlay);
    }
    Ok(values)
}

/// Deep-merges `overlay` into `base`; non-object values replace.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Container images deployed by a rendered chart
pub async fn images(
    chartex: &Chartex,
    repo: &str,
    chart: &str,
    version: &str,
    set_json: &[String],
    recursive: bool,
    format: OutputFormat,
) -> Result<String, String> {
    let values = parse_set_json(set_json)?;
    let images = chartex
        .images(repo, chart, version, &values, recursive)
        .await
        .map_err(describe)?;

    match format {
        OutputFormat::Pretty if images.is_empty() => Ok("No images found.".to_string()),
        OutputFormat::Pretty => {
            use tabled::{Table, settings::Style};
            let rows: Vec<ImageRow> = images.iter().map(ImageRow::from).collect();
            Ok(Table::new(&rows).with(Style::empty()).to_string())
        }
        _ => format::format_output_vec(&images, format),
    }
}
