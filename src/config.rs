//! Explorer configuration
//!
//! Loaded from YAML, with environment overrides for the API location.
//! Every field has a default so an empty document is a valid config.

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable holding the graph API base URL
pub const API_URL_ENV: &str = "OPENGIN_API_URL";

/// Fallback environment variable used by older deployments
pub const LEGACY_API_URL_ENV: &str = "EXTERNAL_API_URL";

/// Environment variable pointing at a YAML config file
pub const CONFIG_PATH_ENV: &str = "OPENGIN_CONFIG";

/// Root configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Base URL of the graph API, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Deepest level explored below a root-level category
    pub max_depth: usize,
    /// Relation linking the root entity to its top-level categories
    pub category_relation: String,
    /// `kind.major` of terminal dataset entities
    pub dataset_kind: String,
    /// Relation names followed when descending
    pub child_relations: ChildRelationsConfig,
    /// Number of API calls kept in the call log
    pub call_log_capacity: usize,
}

/// Vocabulary of relation names that lead to child nodes
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChildRelationsConfig {
    /// Names matched exactly
    pub exact: Vec<String>,
    /// Substrings matched anywhere in the name
    pub contains: Vec<String>,
}

impl Default for ChildRelationsConfig {
    fn default() -> Self {
        Self {
            exact: ["IS_ATTRIBUTE", "HAS_CHILD", "CHILD_CATEGORY", "AS_CATEGORY"]
                .map(String::from)
                .to_vec(),
            contains: ["CHILD", "ATTRIBUTE"].map(String::from).to_vec(),
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: 30,
            max_depth: 10,
            category_relation: "AS_CATEGORY".to_string(),
            dataset_kind: "Dataset".to_string(),
            child_relations: ChildRelationsConfig::default(),
            call_log_capacity: 50,
        }
    }
}

impl ExplorerConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // an empty document deserializes as unit, not as an empty map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ExplorerConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, or the file named by `OPENGIN_CONFIG`, then env overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                tracing::info!(path = %path, "Loading explorer configuration");
                Self::from_file(&path)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(url) =
            std::env::var(API_URL_ENV).or_else(|_| std::env::var(LEGACY_API_URL_ENV))
        {
            config.base_url = url;
        }
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.category_relation.is_empty() {
            return Err(ConfigError::Invalid {
                field: "category_relation".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.call_log_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "call_log_capacity".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
