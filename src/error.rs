//! Error types for the explorer
//!
//! Only the transport, configuration and query-validation layers produce
//! errors. The decoder and the table normalizer never fail, and the graph
//! traversal turns every inner failure into a pruned branch.

use thiserror::Error;

/// Failure of a single request against the graph API
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request cancelled")]
    Cancelled,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid request URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Response is not valid JSON: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Query parameter validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("At least one search criteria is required (Entity ID, Kind, or Name)")]
    MissingSearchCriteria,

    #[error("Entity ID is required")]
    MissingEntityId,

    #[error("Attribute name is required")]
    MissingAttributeName,
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;
