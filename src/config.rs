use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::ConfigError;
use crate::sync::DEFAULT_QUIET_INTERVAL;

pub const BASE_URL_KEY: &str = "MEDITRACK_BASE_API_URL";
pub const AUTOSAVE_MS_KEY: &str = "MEDITRACK_AUTOSAVE_MS";
pub const TIMEOUT_SECS_KEY: &str = "MEDITRACK_TIMEOUT_SECS";
pub const EMAIL_KEY: &str = "MEDITRACK_EMAIL";
pub const PASSWORD_KEY: &str = "MEDITRACK_PASSWORD";

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend root, without a trailing slash.
    pub base_url: String,
    pub autosave_quiet: Duration,
    pub request_timeout: Duration,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            autosave_quiet: DEFAULT_QUIET_INTERVAL,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            email: None,
            password: None,
        }
    }
}

impl ClientConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary key lookup. Missing keys fall back to
    /// defaults; present but unparsable values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url: String = try_load(&lookup, BASE_URL_KEY, DEFAULT_BASE_URL)?;
        let autosave_ms: u64 = try_load(
            &lookup,
            AUTOSAVE_MS_KEY,
            &DEFAULT_QUIET_INTERVAL.as_millis().to_string(),
        )?;
        let timeout_secs: u64 =
            try_load(&lookup, TIMEOUT_SECS_KEY, &DEFAULT_TIMEOUT_SECS.to_string())?;

        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: TIMEOUT_SECS_KEY.to_string(),
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            autosave_quiet: Duration::from_millis(autosave_ms),
            request_timeout: Duration::from_secs(timeout_secs),
            email: lookup(EMAIL_KEY).filter(|s| !s.is_empty()),
            password: lookup(PASSWORD_KEY).filter(|s| !s.is_empty()),
        })
    }

    /// Both halves of the login pair, if configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.email.as_deref()?, self.password.as_deref()?))
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }
    })
}
