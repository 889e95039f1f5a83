//! Application configuration.
//!
//! This module manages explorer configuration with sensible defaults,
//! loading from a YAML file. Authentication and TLS material configured here
//! applies to both HTTP chart repositories and OCI registries.

use crate::auth::Credentials;
use crate::error::{ChartexError, Result};
use config::{Config as ConfigRs, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;


/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub tls: Tls,
    #[serde(default)]
    pub registry: Registry,
    #[serde(default)]
    pub render: Render,
}

impl Config {
    /// Parses a `Config` from a YAML string.
    ///
    /// This function is primarily used for testing.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let builder = ConfigRs::builder()
            .add_source(ConfigRs::try_from(&Config::default())?)
            .add_source(File::from_str(s, FileFormat::Yaml));

        Self::from_builder(builder)
    }

    /// Loads a `Config` from an optional file path.
    ///
    /// Without a path the defaults are returned. A path that is given must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigRs::builder().add_source(ConfigRs::try_from(&Config::default())?);

        if let Some(p) = path {
            builder = builder.add_source(File::from(p).format(FileFormat::Yaml).required(true));
        }

        Self::from_builder(builder)
    }

    /// Creates a `Config` from a `config::ConfigBuilder`.
    fn from_builder(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let cfg: Self = builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| {
                ChartexError::config_with_source(
                    "Failed to deserialize configuration",
                    None,
                    e,
                )
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks settings that only make sense together.
    ///
    /// Username and password file, and TLS certificate and key, must be
    /// provided in pairs.
    pub fn validate(&self) -> Result<()> {
        match (&self.auth.username, &self.auth.password_file) {
            (Some(_), None) => {
                return Err(ChartexError::config(
                    "username and password_file must be provided together (missing password_file)",
                    None,
                ));
            }
            (None, Some(_)) => {
                return Err(ChartexError::config(
                    "username and password_file must be provided together (missing username)",
                    None,
                ));
            }
            _ => {}
        }

        match (&self.tls.cert_file, &self.tls.key_file) {
            (Some(_), None) => Err(ChartexError::config(
                "tls cert_file and key_file must be provided together (missing key_file)",
                None,
            )),
            (None, Some(_)) => Err(ChartexError::config(
                "tls cert_file and key_file must be provided together (missing cert_file)",
                None,
            )),
            _ => Ok(()),
        }
    }
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    /// Request timeout in seconds.
    #[serde(default = "default_network_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            timeout: default_network_timeout(),
            max_idle_per_host: default_max_idle_per_host(),
        }
    }
}

fn default_network_timeout() -> u64 {
    30
}

fn default_max_idle_per_host() -> usize {
    10
}

/// Shared authentication settings for OCI registries and HTTP repositories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Auth {
    #[serde(default)]
    pub username: Option<String>,

    /// File holding the password; surrounding whitespace is trimmed.
    #[serde(default)]
    pub password_file: Option<String>,
}

impl Auth {
    /// Resolves the configured basic credentials by reading the password file.
    ///
    /// Returns `Ok(None)` when no credentials are configured.
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        let (Some(username), Some(password_file)) = (&self.username, &self.password_file) else {
            return Ok(None);
        };

        let password = std::fs::read_to_string(password_file).map_err(|e| {
            ChartexError::config_with_source(
                "Failed to read password file".to_string(),
                Some(password_file.clone()),
                e,
            )
        })?;

        Ok(Some(Credentials::basic(
            username.clone(),
            password.trim().to_string(),
        )))
    }
}

/// TLS settings for HTTP chart repositories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Tls {
    /// Client certificate (PEM) for mutual TLS.
    #[serde(default)]
    pub cert_file: Option<String>,

    /// Client private key (PEM) matching `cert_file`.
    #[serde(default)]
    pub key_file: Option<String>,

    /// Additional CA bundle used to verify repository servers.
    #[serde(default)]
    pub ca_file: Option<String>,

    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Send credentials to every host when following redirects.
    #[serde(default)]
    pub pass_credentials_all: bool,
}

/// OCI registry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Registry {
    /// Docker-style `config.json` holding per-registry credentials.
    #[serde(default)]
    pub credentials_file: Option<String>,

    /// Talk to OCI registries over plain HTTP.
    #[serde(default)]
    pub plain_http: bool,
}

/// Settings for the `helm template` renderer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Render {
    #[serde(default = "default_helm_binary")]
    pub helm_binary: String,

    #[serde(default = "default_release_name")]
    pub release_name: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for Render {
    fn default() -> Self {
        Self {
            helm_binary: default_helm_binary(),
            release_name: default_release_name(),
            namespace: default_namespace(),
        }
    }
}

fn default_helm_binary() -> String {
    "helm".to_string()
}

fn default_release_name() -> String {
    "release-name".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}
