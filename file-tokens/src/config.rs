use config::{Config as ConfigCrate, ConfigError};
use serde::Deserialize;

/// Environment prefix used by [`TokenConfig::new`]
pub const DEFAULT_ENV_PREFIX: &str = "FILE_TOKENS";

/// Configuration for the token registry
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TokenConfig {
    /// Lifetime of a newly issued token in seconds (default: 1 hour)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Identity recorded on tokens requested without an authenticated user
    #[serde(default = "default_guest_user")]
    pub guest_user: String,
}

fn default_timeout() -> u64 {
    3600
}

fn default_guest_user() -> String {
    "guest".to_string()
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            guest_user: default_guest_user(),
        }
    }
}

impl TokenConfig {
    /// Creates a new config from `FILE_TOKENS_*` environment variables
    pub fn new() -> Result<Self, String> {
        Self::from_env_prefix(DEFAULT_ENV_PREFIX)
    }

    /// Creates a new config from environment variables starting with `prefix`
    ///
    /// Field names follow the prefix after a single underscore, e.g.
    /// `<PREFIX>_TIMEOUT` or `<PREFIX>_GUEST_USER`.
    pub fn from_env_prefix(prefix: &str) -> Result<Self, String> {
        ConfigCrate::builder()
            .add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e: ConfigError| e.to_string())?
            .try_deserialize()
            .map_err(|e| e.to_string())
    }
}
