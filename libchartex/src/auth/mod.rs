//! Authentication handling for chart repositories and OCI registries.
//!
//! This module provides credentials shared by HTTP repositories and OCI
//! registries, parsing of `WWW-Authenticate` challenges for the registry
//! token flow, and lookup of per-registry credentials in a Docker-style
//! `config.json` file.

use crate::error::{ChartexError, Result};
use base64::{Engine as _, engine::general_purpose};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;


/// Credentials for repository or registry authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// No authentication required (anonymous access)
    Anonymous,

    /// HTTP Basic authentication with username and password
    Basic {
        /// Username for authentication
        username: String,
        /// Password for authentication
        password: String,
    },

    /// Bearer token authentication (OAuth2-style)
    Bearer {
        /// The bearer token
        token: String,
    },
}

impl Credentials {
    /// Creates anonymous credentials.
    pub fn anonymous() -> Self {
        Self::Anonymous
    }

    /// Creates Basic authentication credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use libchartex::auth::Credentials;
    ///
    /// let creds = Credentials::basic("username", "password");
    /// assert!(creds.to_header_value().unwrap().starts_with("Basic "));
    /// ```
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates Bearer token credentials.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Returns the Authorization header value for these credentials.
    pub fn to_header_value(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::Basic { username, password } => {
                let credentials = format!("{}:{}", username, password);
                let encoded = general_purpose::STANDARD.encode(credentials);
                Some(format!("Basic {}", encoded))
            }
            Self::Bearer { token } => Some(format!("Bearer {}", token)),
        }
    }
}

/// Information parsed from a WWW-Authenticate header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// The authentication scheme (e.g., "Bearer")
    pub scheme: String,

    /// The authentication realm
    pub realm: String,

    /// The service identifier
    pub service: Option<String>,

    /// The scope being requested
    pub scope: Option<String>,
}

impl AuthChallenge {
    /// Parses a WWW-Authenticate header value.
    ///
    /// Example header: `Bearer realm="https://ghcr.io/token",service="ghcr.io",scope="repository:org/chart:pull"`
    ///
    /// # Examples
    ///
    /// ```
    /// use libchartex::auth::AuthChallenge;
    ///
    /// let header = r#"Bearer realm="https://auth.example.com/token",service="registry""#;
    /// let challenge = AuthChallenge::parse(header).unwrap();
    /// assert_eq!(challenge.scheme, "Bearer");
    /// assert_eq!(challenge.service.as_deref(), Some("registry"));
    /// ```
    pub fn parse(header: &str) -> Result<Self> {
        let header = header.trim();

        let (scheme, params) = header
            .split_once(' ')
            .ok_or_else(|| ChartexError::validation("Invalid WWW-Authenticate header format"))?;

        let mut realm = None;
        let mut service = None;
        let mut scope = None;

        // Quoted values may contain commas (e.g. multiple scopes), so split
        // only on commas that sit outside quotes.
        for param in split_params(params) {
            if let Some((key, value)) = param.split_once('=') {
                let value = value.trim().trim_matches('"').to_string();
                match key.trim() {
                    "realm" => realm = Some(value),
                    "service" => service = Some(value),
                    "scope" => scope = Some(value),
                    _ => {}
                }
            }
        }

        let realm = realm.ok_or_else(|| {
            ChartexError::validation("WWW-Authenticate header missing required 'realm' parameter")
        })?;

        Ok(Self {
            scheme: scheme.to_string(),
            realm,
            service,
            scope,
        })
    }

    /// Builds the token endpoint URL for a pull of `repository`.
    ///
    /// The scope announced by the registry wins over the derived pull scope.
    pub fn token_url(&self, repository: &str) -> String {
        let scope = self
            .scope
            .clone()
            .unwrap_or_else(|| format!("repository:{}:pull", repository));
        let mut url = format!("{}?scope={}", self.realm, scope);
        if let Some(service) = &self.service {
            url.push_str(&format!("&service={}", service));
        }
        url
    }
}

fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in params.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(params[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(params[start..].trim());
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

/// Token response returned by a registry token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

impl TokenResponse {
    pub(crate) fn into_token(self) -> Option<String> {
        self.token.or(self.access_token).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
struct DockerConfigFile {
    #[serde(default)]
    auths: HashMap<String, DockerAuthEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct DockerAuthEntry {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    identitytoken: Option<String>,
}

/// Registry credentials loaded from a Docker-style `config.json`.
///
/// Only inline `auths` entries are supported; credential helpers are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockerCredentials {
    entries: HashMap<String, Credentials>,
}

impl DockerCredentials {
    /// Loads credentials from a file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ChartexError::config_with_source(
                "Failed to read registry credentials file".to_string(),
                Some(path.display().to_string()),
                e,
            )
        })?;
        Self::from_json(&contents)
    }

    /// Parses credentials from the JSON contents of a `config.json`.
    pub fn from_json(contents: &str) -> Result<Self> {
        let file: DockerConfigFile = serde_json::from_str(contents).map_err(|e| {
            ChartexError::validation_with_source("Failed to parse registry credentials file", e)
        })?;

        let mut entries = HashMap::new();
        for (server, entry) in file.auths {
            if let Some(creds) = entry.into_credentials()? {
                entries.insert(normalize_server(&server), creds);
            }
        }

        Ok(Self { entries })
    }

    /// Returns the credentials stored for `registry` (a host, optionally with port).
    pub fn get(&self, registry: &str) -> Option<&Credentials> {
        let key = normalize_server(registry);
        self.entries.get(&key).or_else(|| {
            // Docker Hub is stored under its legacy index URL
            if key == "docker.io" || key == "registry-1.docker.io" {
                self.entries
                    .get("index.docker.io")
                    .or_else(|| self.entries.get("docker.io"))
            } else {
                None
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DockerAuthEntry {
    fn into_credentials(self) -> Result<Option<Credentials>> {
        if let Some(token) = self.identitytoken.filter(|t| !t.is_empty()) {
            return Ok(Some(Credentials::bearer(token)));
        }

        if let (Some(username), Some(password)) = (self.username, self.password) {
            return Ok(Some(Credentials::basic(username, password)));
        }

        let Some(auth) = self.auth.filter(|a| !a.is_empty()) else {
            return Ok(None);
        };

        let decoded = general_purpose::STANDARD.decode(auth.trim()).map_err(|e| {
            ChartexError::validation_with_source("Invalid base64 in registry credentials", e)
        })?;
        let decoded = String::from_utf8(decoded).map_err(|e| {
            ChartexError::validation_with_source("Registry credentials are not valid UTF-8", e)
        })?;
        let (username, password) = decoded.split_once(':').ok_or_else(|| {
            ChartexError::validation("Registry credentials must have the form user:password")
        })?;

        Ok(Some(Credentials::basic(username, password)))
    }
}

/// Reduces `https://index.docker.io/v1/` style keys to a bare host.
fn normalize_server(server: &str) -> String {
    let server = server
        .strip_prefix("https://")
        .or_else(|| server.strip_prefix("http://"))
        .unwrap_or(server);
    server
        .split('/')
        .next()
        .unwrap_or(server)
        .to_ascii_lowercase()
}
