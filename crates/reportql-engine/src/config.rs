//! Engine configuration
//!
//! Loads from a YAML file with environment-variable overrides; environment
//! always wins. Everything has a default so an engine can be built with no
//! file at all.

use std::collections::HashMap;
use std::path::Path;

use reportql_ir::QueryIntent;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Result cache time-to-live in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Minimum fuzzy-match score for entity resolution
    pub fuzzy_threshold: f64,
    /// Row limit when ranking is requested without a number
    pub default_row_limit: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.85,
            default_row_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Row-hint threshold above which an unfiltered table draws a warning
    pub large_table_rows: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            large_table_rows: 1_000_000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stdout, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            output: "stdout".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

/// An extra classifier rule supplied as data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierRuleConfig {
    pub intent: QueryIntent,
    pub pattern: String,
}

/// Main engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Extra synonym entries merged over the built-in table
    #[serde(default)]
    pub synonyms: HashMap<String, String>,
    /// Extra intent rules appended to the built-in rule table
    #[serde(default)]
    pub rules: Vec<ClassifierRuleConfig>,
}

impl EngineConfig {
    /// Load configuration from a YAML file with environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: EngineConfig = serde_yaml::from_str(&contents)?;

        if let Ok(ttl) = std::env::var("REPORTQL_CACHE_TTL_SECS") {
            if let Ok(ttl) = ttl.parse() {
                config.cache.ttl_secs = ttl;
            }
        }
        if let Ok(threshold) = std::env::var("REPORTQL_FUZZY_THRESHOLD") {
            if let Ok(threshold) = threshold.parse() {
                config.resolver.fuzzy_threshold = threshold;
            }
        }
        if let Ok(limit) = std::env::var("REPORTQL_DEFAULT_ROW_LIMIT") {
            if let Ok(limit) = limit.parse() {
                config.resolver.default_row_limit = limit;
            }
        }
        if let Ok(rows) = std::env::var("REPORTQL_LARGE_TABLE_ROWS") {
            if let Ok(rows) = rows.parse() {
                config.validator.large_table_rows = rows;
            }
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.logging.format = format;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            config.logging.output = output;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            config.logging.directory = dir;
        }

        Ok(config)
    }

    /// Push the logging section into the environment the logging module reads
    pub fn apply_logging_env(&self) {
        std::env::set_var("RUST_LOG", &self.logging.level);
        std::env::set_var("LOG_FORMAT", &self.logging.format);
        std::env::set_var("LOG_OUTPUT", &self.logging.output);
        std::env::set_var("LOG_DIR", &self.logging.directory);
    }
}
