//! Configuration for the case workflow engine

use crate::tally::DuplicatePolicy;
use serde::{Deserialize, Serialize};

/// Report text stored when an execution is finished without one.
pub const DEFAULT_REPORT: &str = "Work completed";

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// What happens when a household casts a second ballot in a stage
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Report text used when `finish` receives a blank report
    #[serde(default = "default_report")]
    pub default_report: String,

    /// How many times a write is re-applied after a version conflict
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,

    /// Whether the audited override may move a case out of a terminal status
    #[serde(default)]
    pub allow_terminal_override: bool,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Overwrite,
            default_report: DEFAULT_REPORT.to_string(),
            max_conflict_retries: 3,
            allow_terminal_override: false,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn default_report() -> String {
    DEFAULT_REPORT.to_string()
}

fn default_max_conflict_retries() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Load configuration: defaults, then an optional file, then
    /// `CASEFLOW_*` environment variables (`__` separates nested keys).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&EngineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CASEFLOW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
