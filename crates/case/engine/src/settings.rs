//! Engine settings.
//!
//! Loaded in layers: built-in defaults, then an optional file, then
//! environment variables such as `CASE_ENGINE_RETRY__MAX_ATTEMPTS=5`.

use serde::{Deserialize, Serialize};

/// Tunables shared by every command the engine executes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Fallback flag applied when a start request leaves it unset
    #[serde(default)]
    pub default_fallback_to_default_tenant: bool,

    /// Whether instance creation publishes engine events
    #[serde(default = "default_true")]
    pub fire_events: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
            default_fallback_to_default_tenant: false,
            fire_events: true,
        }
    }
}

/// Retry policy for transient store failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the n-th retry is `n * backoff_ms`
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineSettings {
    /// Load settings from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&EngineSettings::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CASE_ENGINE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff_ms: u64) -> Self {
        self.retry = RetryConfig {
            max_attempts,
            backoff_ms,
        };
        self
    }

    pub fn with_default_fallback(mut self, fallback: bool) -> Self {
        self.default_fallback_to_default_tenant = fallback;
        self
    }

    pub fn with_fire_events(mut self, fire_events: bool) -> Self {
        self.fire_events = fire_events;
        self
    }
}
