//! Options of the shared-key authentication scheme.
//!
//! Options are loaded once (from code, serde, or environment variables), validated when the
//! handler is built, and read-only afterwards.

use std::env;
use std::time::Duration;

use http::HeaderName;

use crate::error::OptionsError;

/// Default scheme prefix of the `Authorization` header.
pub const DEFAULT_SCHEME: &str = "SharedKey";

/// Default name of the date header.
pub const DEFAULT_DATE_HEADER: &str = "x-ts-date";

/// Server-side options of the shared-key scheme.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SharedKeyOptions {
    /// Scheme prefix expected in the `Authorization` header.
    pub header_value_prefix: String,
    /// Challenge written to `WWW-Authenticate`. Defaults to the scheme prefix.
    pub challenge: Option<String>,
    /// Accepted date header names, in lookup order.
    pub date_header_names: Vec<String>,
    /// Only requests under this path are validated by the shared-key validator.
    pub path_prefix: Option<String>,
    /// Include `error` and `error_description` in challenges.
    pub include_error_details: bool,
    /// Keep the raw token on the authentication ticket.
    pub save_token: bool,
    /// Maximum age of a signed request.
    #[serde(with = "duration_secs")]
    pub max_age: Duration,
    /// Tolerated clock drift for dates in the future.
    #[serde(with = "duration_secs")]
    pub clock_skew: Duration,
    /// Upper bound for a single key resolver call.
    #[serde(with = "duration_secs")]
    pub key_resolution_timeout: Duration,
}

impl Default for SharedKeyOptions {
    fn default() -> Self {
        Self {
            header_value_prefix: DEFAULT_SCHEME.to_owned(),
            challenge: None,
            date_header_names: vec![DEFAULT_DATE_HEADER.to_owned()],
            path_prefix: None,
            include_error_details: true,
            save_token: false,
            max_age: Duration::from_secs(300),
            clock_skew: Duration::from_secs(30),
            key_resolution_timeout: Duration::from_secs(10),
        }
    }
}

impl SharedKeyOptions {
    /// Load options from `SHAREDKEY_*` environment variables, falling back to defaults.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `SHAREDKEY_HEADER_PREFIX` | `header_value_prefix` |
    /// | `SHAREDKEY_CHALLENGE` | `challenge` |
    /// | `SHAREDKEY_DATE_HEADERS` | `date_header_names` (comma separated) |
    /// | `SHAREDKEY_PATH_PREFIX` | `path_prefix` |
    /// | `SHAREDKEY_INCLUDE_ERROR_DETAILS` | `include_error_details` |
    /// | `SHAREDKEY_SAVE_TOKEN` | `save_token` |
    /// | `SHAREDKEY_MAX_AGE_SECS` | `max_age` |
    /// | `SHAREDKEY_CLOCK_SKEW_SECS` | `clock_skew` |
    /// | `SHAREDKEY_KEY_TIMEOUT_MS` | `key_resolution_timeout` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(v) = env::var("SHAREDKEY_HEADER_PREFIX") {
            options.header_value_prefix = v;
        }
        if let Ok(v) = env::var("SHAREDKEY_CHALLENGE") {
            options.challenge = Some(v);
        }
        if let Ok(v) = env::var("SHAREDKEY_DATE_HEADERS") {
            options.date_header_names = v
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(ToOwned::to_owned)
                .collect();
        }
        if let Ok(v) = env::var("SHAREDKEY_PATH_PREFIX") {
            options.path_prefix = Some(v).filter(|p| !p.is_empty());
        }
        options.include_error_details =
            env_bool("SHAREDKEY_INCLUDE_ERROR_DETAILS", options.include_error_details);
        options.save_token = env_bool("SHAREDKEY_SAVE_TOKEN", options.save_token);
        if let Some(secs) = env_u64("SHAREDKEY_MAX_AGE_SECS") {
            options.max_age = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("SHAREDKEY_CLOCK_SKEW_SECS") {
            options.clock_skew = Duration::from_secs(secs);
        }
        if let Some(millis) = env_u64("SHAREDKEY_KEY_TIMEOUT_MS") {
            options.key_resolution_timeout = Duration::from_millis(millis);
        }

        options
    }

    /// Check the options for consistency.
    ///
    /// # Errors
    ///
    /// Returns the first [`OptionsError`] found.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.header_value_prefix.is_empty()
            || self.header_value_prefix.contains(char::is_whitespace)
        {
            return Err(OptionsError::InvalidHeaderValuePrefix(
                self.header_value_prefix.clone(),
            ));
        }
        if self.date_header_names.is_empty() {
            return Err(OptionsError::NoDateHeaderNames);
        }
        if let Some(name) = self
            .date_header_names
            .iter()
            .find(|name| HeaderName::from_bytes(name.as_bytes()).is_err())
        {
            return Err(OptionsError::InvalidDateHeaderName(name.clone()));
        }
        if let Some(prefix) = self.path_prefix.as_ref().filter(|p| !p.starts_with('/')) {
            return Err(OptionsError::InvalidPathPrefix(prefix.clone()));
        }
        if self.max_age.is_zero() {
            return Err(OptionsError::InvalidMaxAge);
        }
        Ok(())
    }

    /// The challenge emitted in `WWW-Authenticate`.
    #[must_use]
    pub fn challenge(&self) -> &str {
        self.challenge
            .as_deref()
            .unwrap_or(&self.header_value_prefix)
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
