//! Application context that holds resolved configuration
//!
//! The context is built following the precedence order:
//! 1. Default values
//! 2. Config file values
//! 3. CLI flags
//!
//! Once built, the context is passed as read-only throughout the application.

use crate::format::OutputFormat;
use clap::Args;
use libchartex::{Chartex, Config};
use std::path::{Path, PathBuf};

/// Verbosity of diagnostic output, from the repeated `-v` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerbosityLevel {
    Normal,
    Verbose,
    VeryVerbose,
    Trace,
}

impl VerbosityLevel {
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Normal,
            1 => VerbosityLevel::Verbose,
            2 => VerbosityLevel::VeryVerbose,
            _ => VerbosityLevel::Trace,
        }
    }

    /// Log filter used when `RUST_LOG` is not set
    pub fn filter_directive(self) -> &'static str {
        match self {
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "info",
            VerbosityLevel::VeryVerbose => "debug",
            VerbosityLevel::Trace => "trace",
        }
    }
}

/// Flags shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file (default: <config dir>/chartex/config.yaml)
    #[arg(long, global = true, env = "CHARTEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Username for repository and registry authentication
    #[arg(long, global = true, requires = "password_file")]
    pub username: Option<String>,

    /// File containing the password for --username
    #[arg(long, global = true, requires = "username")]
    pub password_file: Option<PathBuf>,

    /// Docker-style config.json with per-registry credentials
    #[arg(long, global = true)]
    pub registry_credentials: Option<PathBuf>,

    /// Talk to OCI registries over plain HTTP
    #[arg(long, global = true)]
    pub registry_plain_http: bool,

    /// Client certificate (PEM) for mutual TLS
    #[arg(long, global = true, requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// Client private key (PEM) for mutual TLS
    #[arg(long, global = true, requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,

    /// CA bundle (PEM) used to verify repository servers
    #[arg(long, global = true)]
    pub tls_ca: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub tls_insecure_skip_verify: bool,

    /// Send credentials to every host serving chart archives
    #[arg(long, global = true)]
    pub pass_credentials_all: bool,
}

/// Application context with resolved configuration and runtime state
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Resolved configuration
    pub config: Config,
    pub format: OutputFormat,
    pub verbosity: VerbosityLevel,
}

impl AppContext {
    /// Build context with precedence: defaults > config file > CLI flags
    pub fn build(args: &GlobalArgs) -> Result<Self, String> {
        let path = args.config.clone().or_else(|| {
            default_config_path().filter(|path| path.exists())
        });
        let config = Config::load(path.as_deref()).map_err(|e| e.to_string())?;

        Self::from_config(config, args)
    }

    /// Applies CLI overrides on top of an already loaded configuration.
    pub fn from_config(mut config: Config, args: &GlobalArgs) -> Result<Self, String> {
        if let Some(username) = &args.username {
            config.auth.username = Some(username.clone());
        }
        if let Some(password_file) = &args.password_file {
            config.auth.password_file = Some(path_string(password_file));
        }
        if let Some(credentials) = &args.registry_credentials {
            config.registry.credentials_file = Some(path_string(credentials));
        }
        if let Some(cert) = &args.tls_cert {
            config.tls.cert_file = Some(path_string(cert));
        }
        if let Some(key) = &args.tls_key {
            config.tls.key_file = Some(path_string(key));
        }
        if let Some(ca) = &args.tls_ca {
            config.tls.ca_file = Some(path_string(ca));
        }
        // Switches only ever enable a setting
        config.registry.plain_http |= args.registry_plain_http;
        config.tls.insecure_skip_verify |= args.tls_insecure_skip_verify;
        config.tls.pass_credentials_all |= args.pass_credentials_all;

        config.validate().map_err(|e| e.to_string())?;

        Ok(Self {
            config,
            format: args.format,
            verbosity: VerbosityLevel::from_count(args.verbose),
        })
    }

    /// Creates the explorer for this context.
    pub fn chartex(&self) -> Result<Chartex, String> {
        Chartex::builder()
            .with_config(self.config.clone())
            .build()
            .map_err(|e| e.to_string())
    }
}

/// Default configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chartex").join("config.yaml"))
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
