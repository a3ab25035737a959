//! Sync configuration read from the environment.
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `BTS_DATA_BUCKET_NAME` | Yes | Bucket holding `bts-data/` |
//! | `BTS_DATA_URL` | Yes | Archive base URL; `_{year}_{month}.zip` is appended |
//! | `BTS_HTTP_TIMEOUT_SECS` | No | Download timeout in seconds (default 900) |

use std::time::Duration;

use aviation_bts_models::BTS_PREFIX;

/// Default download timeout, matching the 15 minute budget of the
/// scheduled job.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },

    /// Environment variable present but unusable.
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv {
        /// Name of the environment variable.
        name: String,
        /// The rejected value.
        value: String,
    },
}

/// Everything a sync run needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Destination bucket.
    pub bucket: String,
    /// Archive base URL.
    pub archive_base_url: String,
    /// Key prefix listed to find the latest period.
    pub prefix: String,
    /// Timeout applied to the archive download.
    pub http_timeout: Duration,
}

impl SyncConfig {
    /// Creates a config with the default prefix and timeout.
    #[must_use]
    pub fn new(bucket: impl Into<String>, archive_base_url: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            archive_base_url: archive_base_url.into(),
            prefix: BTS_PREFIX.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Reads the config from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if a required variable is unset
    /// or empty, [`ConfigError::InvalidEnv`] if the timeout is not a whole
    /// number of seconds.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let require = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnv {
                    name: name.to_string(),
                })
        };

        let mut config = Self::new(require("BTS_DATA_BUCKET_NAME")?, require("BTS_DATA_URL")?);

        if let Some(raw) = lookup("BTS_HTTP_TIMEOUT_SECS").filter(|v| !v.is_empty()) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "BTS_HTTP_TIMEOUT_SECS".to_string(),
                value: raw.clone(),
            })?;
            config.http_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
