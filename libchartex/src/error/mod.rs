//! Error types for chartex
//!
//! Every fallible operation in the library returns [`ChartexError`]. Variants
//! follow the failure taxonomy of the explorer: malformed input
//! ([`ChartexError::Validation`]), absent charts or versions
//! ([`ChartexError::NotFound`]), and collaborator failures (network, index
//! download, rendering) that keep their underlying cause as `source`.

use thiserror::Error;


type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for chartex operations
#[derive(Error, Debug)]
pub enum ChartexError {
    /// Network-related errors (connection, timeout, DNS)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Authentication errors (401, 403, token issues)
    #[error("Authentication error (status: {status_code:?}): {message}")]
    Authentication {
        message: String,
        status_code: Option<u16>,
    },

    /// Resource not found errors (chart, version, tag, endpoint)
    #[error("{resource_type} not found: {name}")]
    NotFound { resource_type: String, name: String },

    /// Rate limiting errors (429)
    #[error("Rate limit: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    /// Server errors (500, 503)
    #[error("Server error (status: {status_code}): {message}")]
    Server { message: String, status_code: u16 },

    /// Malformed input (missing fields, invalid references, bad chart metadata)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Repository index could not be constructed, downloaded or parsed
    #[error("Repository index error for {url}: {message}")]
    Index {
        url: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Chart rendering failed
    #[error("Failed to render chart {chart}: {message}")]
    Render {
        chart: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Configuration errors (invalid config file, missing settings)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<BoxedSource>,
    },
}

/// Result type alias for chartex operations
pub type Result<T> = std::result::Result<T, ChartexError>;

impl ChartexError {
    /// Creates a new network error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libchartex::error::ChartexError;
    ///
    /// let err = ChartexError::network("connection refused");
    /// assert!(matches!(err, ChartexError::Network { .. }));
    /// ```
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new network error with a source error.
    pub fn network_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new authentication error.
    pub fn authentication<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        Self::Authentication {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new not found error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libchartex::error::ChartexError;
    ///
    /// let err = ChartexError::not_found("chart", "nginx");
    /// assert_eq!(err.to_string(), "chart not found: nginx");
    /// ```
    pub fn not_found<S: Into<String>, N: Into<String>>(resource_type: S, name: N) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Creates a new rate limit error.
    pub fn rate_limit<S: Into<String>>(message: S, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new server error.
    pub fn server<S: Into<String>>(message: S, status_code: u16) -> Self {
        Self::Server {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new validation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libchartex::error::ChartexError;
    ///
    /// let err = ChartexError::validation("chart name is required");
    /// assert!(matches!(err, ChartexError::Validation { .. }));
    /// ```
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new validation error with a source error.
    pub fn validation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Validation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new repository index error, keeping the underlying cause.
    ///
    /// The cause is usually another `ChartexError` produced by the transport.
    pub fn index<U, S, E>(url: U, message: S, source: E) -> Self
    where
        U: Into<String>,
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Index {
            url: url.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new render error without an underlying cause.
    pub fn render<C: Into<String>, S: Into<String>>(chart: C, message: S) -> Self {
        Self::Render {
            chart: chart.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new render error with a source error.
    pub fn render_with_source<C, S, E>(chart: C, message: S, source: E) -> Self
    where
        C: Into<String>,
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Render {
            chart: chart.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S, path: Option<S>) -> Self {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: None,
        }
    }

    /// Creates a new configuration error with a source error.
    pub fn config_with_source<S, E>(message: S, path: Option<S>, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true when the error reports a missing chart, version or tag.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<config::ConfigError> for ChartexError {
    fn from(e: config::ConfigError) -> Self {
        ChartexError::config_with_source("Failed to build configuration", None, e)
    }
}
