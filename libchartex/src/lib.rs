//! Chartex - Helm Chart Repository Explorer Library
//!
//! Chartex answers read-only questions about Helm charts published in
//! classic HTTP repositories (`index.yaml`) and OCI registries (`oci://`).
//!
//! # Quick Start
//!
//! ```no_run
//! use libchartex::Chartex;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let chartex = Chartex::new()?;
//!
//!     let repo = "https://charts.bitnami.com/bitnami";
//!     for chart in chartex.list_charts(repo).await? {
//!         println!("{}", chart);
//!     }
//!
//!     let latest = chartex.latest_version(repo, "redis").await?;
//!     let deps = chartex.dependencies(repo, "redis", &latest).await?;
//!     println!("redis {} has {} dependencies", latest, deps.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - **Versions**: list charts and versions, resolve the latest version
//! - **Images**: render a chart and collect every container image it deploys
//! - **Dependencies**: walk declared dependencies through vendored subcharts
//! - **Caching**: repository indexes are downloaded once per [`Chartex`]
//! - **Authentication**: basic auth, registry token exchange, mutual TLS
//!
//! # Main Types
//!
//! - [`Chartex`] - Main entry point
//! - [`ChartexBuilder`] - Builder for configuration and custom collaborators
//! - [`ImageReference`] - A normalized container image
//! - [`Config`] - Network, auth, TLS, registry and rendering settings
//!
//! The building blocks ([`image::normalize`], [`manifest::extract`],
//! [`aggregate::finalize`], [`dependency::walk`], ...) are public for
//! callers that already hold rendered manifests or loaded charts.

#![warn(clippy::all)]

/// Returns the libchartex crate version.
///
/// # Examples
///
/// ```
/// let version = libchartex::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

mod explorer;
pub use explorer::{Chartex, ChartexBuilder};

pub use auth::Credentials;
pub use chart::Chart;
pub use config::Config;
pub use error::{ChartexError, Result};
pub use image::ImageReference;

pub mod aggregate;
pub mod dependency;
pub mod image;
pub mod manifest;

#[doc(hidden)]
pub mod auth;
#[doc(hidden)]
pub mod cache;
pub mod chart;
#[doc(hidden)]
pub mod client;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod digest;
#[doc(hidden)]
pub mod error;
#[doc(hidden)]
pub mod index;
pub mod loader;
#[doc(hidden)]
pub mod oci;
#[doc(hidden)]
pub mod reference;
pub mod render;
pub mod resolver;
