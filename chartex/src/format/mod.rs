use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Trait for types that can be formatted for CLI output
pub trait Formattable: Serialize {
    /// Format the type for pretty (human-readable) output
    fn format_pretty(&self) -> String;
}

impl Formattable for String {
    fn format_pretty(&self) -> String {
        self.clone()
    }
}

/// Format a single item for output
pub fn format_output<T: Formattable + ?Sized>(item: &T, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Pretty => Ok(item.format_pretty()),
        OutputFormat::Json => serde_json::to_string_pretty(item)
            .map_err(|e| format!("Failed to serialize to JSON: {}", e)),
        OutputFormat::Yaml => {
            serde_yaml::to_string(item).map_err(|e| format!("Failed to serialize to YAML: {}", e))
        }
    }
}

/// Format a list of items for output, one pretty item per line
pub fn format_output_vec<T: Formattable>(items: &[T], format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Pretty => {
            let output: Vec<String> = items.iter().map(|item| item.format_pretty()).collect();
            Ok(output.join("\n"))
        }
        OutputFormat::Json => serde_json::to_string_pretty(items)
            .map_err(|e| format!("Failed to serialize to JSON: {}", e)),
        OutputFormat::Yaml => {
            serde_yaml::to_string(items).map_err(|e| format!("Failed to serialize to YAML: {}", e))
        }
    }
}

/// Check if we should use colors in output
pub fn should_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err()
}

/// Colorize an X mark for errors if colors are enabled
pub fn error_mark() -> String {
    if should_color() {
        format!("{}", "✗".red().bold())
    } else {
        "✗".to_string()
    }
}

/// Renders an error and its chain of causes, one per line.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }
    message
}

/// Print an error message to stderr
pub fn error(message: &str) {
    eprintln!("{} {}", error_mark(), message);
}

/// Print formatted output, or the error and exit non-zero
pub fn emit(output: Result<String, String>) {
    match output {
        Ok(text) if text.ends_with('\n') => print!("{}", text),
        Ok(text) => println!("{}", text),
        Err(e) => {
            error(&e);
            std::process::exit(1);
        }
    }
}
