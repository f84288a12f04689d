//! Client configuration.
//!
//! Read from `DUKA_*` environment variables, falling back to defaults that
//! match the storefront's manual payment setup.

use std::path::PathBuf;
use std::time::Duration;

use duka_observability::LogFormat;
use thiserror::Error;

pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_PAYMENT_DESTINATION: &str = "0795 360 391";
pub const DEFAULT_CURRENCY_LABEL: &str = "Ksh.";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("could not resolve a data directory; set DUKA_DATA_DIR")]
    NoDataDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Directory holding `cart.db`.
    pub data_dir: PathBuf,
    /// Device profile owning the cart slot.
    pub profile: String,
    /// Phone number customers pay to.
    pub payment_destination: String,
    pub currency_label: String,
    /// Base URL of the hosted backend, e.g. `https://xyz.supabase.co`.
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    /// Bearer token of the signed-in user. Falls back to the API key.
    pub access_token: Option<String>,
    /// Current user id, if signed in.
    pub user_id: Option<String>,
    pub http_timeout: Duration,
    pub log_format: LogFormat,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let data_dir = match get("DUKA_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        let http_timeout = match get("DUKA_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|err: std::num::ParseIntError| {
                    ConfigError::InvalidValue {
                        key: "DUKA_HTTP_TIMEOUT_SECS",
                        value: raw.clone(),
                        reason: err.to_string(),
                    }
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "DUKA_HTTP_TIMEOUT_SECS",
                        value: raw,
                        reason: "must be at least 1".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_HTTP_TIMEOUT,
        };

        let log_format = match get("DUKA_LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|err: duka_observability::UnknownLogFormat| {
                ConfigError::InvalidValue {
                    key: "DUKA_LOG_FORMAT",
                    value: raw.clone(),
                    reason: err.to_string(),
                }
            })?,
            None => LogFormat::default(),
        };

        let api_url = get("DUKA_API_URL").map(|url| url.trim_end_matches('/').to_string());
        if let Some(url) = &api_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    key: "DUKA_API_URL",
                    value: url.clone(),
                    reason: "expected an http(s) URL".to_string(),
                });
            }
        }

        Ok(Self {
            data_dir,
            profile: get("DUKA_PROFILE").unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            payment_destination: get("DUKA_PAYMENT_DESTINATION")
                .unwrap_or_else(|| DEFAULT_PAYMENT_DESTINATION.to_string()),
            currency_label: get("DUKA_CURRENCY_LABEL")
                .unwrap_or_else(|| DEFAULT_CURRENCY_LABEL.to_string()),
            api_url,
            api_key: get("DUKA_API_KEY"),
            access_token: get("DUKA_ACCESS_TOKEN"),
            user_id: get("DUKA_USER_ID"),
            http_timeout,
            log_format,
        })
    }

    /// Path of the SQLite file holding the cart slots.
    pub fn cart_db_path(&self) -> PathBuf {
        self.data_dir.join("cart.db")
    }
}

fn default_data_dir() -> Result<PathBuf, ConfigError> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .ok_or(ConfigError::NoDataDir)?;
    Ok(base.join("duka"))
}
