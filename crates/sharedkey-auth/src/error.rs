//! Error types for shared-key signing and verification.
//!
//! Verification failures are split in two classes:
//!
//! - [`ValidationError`]: the request was examined and rejected. These are collected by the
//!   validator pipeline and reported as an authentication failure.
//! - The remaining [`AuthError`] variants: the verification attempt itself could not complete
//!   (the key store failed or timed out). These are transient and propagate to the host.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::keys::KeyResolverError;

/// A request that was examined by a validator and rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The supplied date header value could not be parsed.
    #[error("The date '{value}' is not a valid date")]
    InvalidDate {
        /// The raw header value.
        value: String,
    },

    /// The date parsed but lies outside the accepted freshness window.
    #[error(
        "The request date '{supplied_time}' is outside the allowed window, \
         oldest allowed '{oldest_allowed}', newest allowed '{newest_allowed}'"
    )]
    TimeWindowExpired {
        /// Oldest signing time still accepted.
        oldest_allowed: DateTime<Utc>,
        /// Newest signing time accepted, including clock skew.
        newest_allowed: DateTime<Utc>,
        /// The signing time carried by the request.
        supplied_time: DateTime<Utc>,
    },

    /// No candidate key produced a matching signature.
    #[error("The signature is invalid")]
    InvalidSignature,

    /// None of the accepted date headers were present.
    #[error("The request has no date, expected one of: {accepted}")]
    NoDate {
        /// Comma separated list of the accepted header names.
        accepted: String,
    },

    /// The key resolver returned no candidate keys.
    #[error("No signing keys are available")]
    NoKeys,

    /// The candidate keys were structurally invalid.
    #[error("The signing keys are invalid")]
    InvalidSigningKeys,

    /// A signed component contains characters outside ASCII.
    #[error("The request {field} contains non-ASCII characters")]
    UnsupportedCharacters {
        /// The offending canonical component.
        field: &'static str,
    },
}

impl ValidationError {
    /// Display precedence when several failures are summarized, lowest first.
    ///
    /// Earlier-detected problems win since later checks are usually unreachable once an
    /// earlier one fails.
    #[must_use]
    pub fn precedence(&self) -> u8 {
        match self {
            Self::InvalidDate { .. } => 0,
            Self::TimeWindowExpired { .. } => 1,
            Self::InvalidSignature => 2,
            Self::NoDate { .. } => 3,
            Self::NoKeys => 4,
            Self::InvalidSigningKeys => 5,
            Self::UnsupportedCharacters { .. } => 6,
        }
    }
}

/// Errors produced by a verification attempt.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request was rejected by the validator.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The key resolver failed.
    #[error("key resolution failed: {0}")]
    KeyResolution(#[from] KeyResolverError),

    /// The key resolver did not answer in time.
    #[error("key resolution timed out after {timeout:?}")]
    KeyResolutionTimedOut {
        /// The configured timeout.
        timeout: Duration,
    },
}

impl AuthError {
    /// Whether the error is transient and the request may be retried as-is.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}

/// Why a request failed to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationFailure {
    /// A token was present but no configured validator could read it.
    NoValidatorAvailable,
    /// Every validator that could read the token rejected it, in attempt order.
    Validation(Vec<ValidationError>),
    /// An event hook rejected the request.
    Rejected(String),
}

impl AuthenticationFailure {
    /// Human readable description used for `error_description`.
    ///
    /// Validation failures are listed by precedence, most specific first, without duplicates.
    /// Returns an empty string when there is nothing useful to say.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::NoValidatorAvailable => String::new(),
            Self::Rejected(message) => message.clone(),
            Self::Validation(errors) => {
                let mut ordered: Vec<&ValidationError> = Vec::with_capacity(errors.len());
                for error in errors {
                    if !ordered.contains(&error) {
                        ordered.push(error);
                    }
                }
                ordered.sort_by_key(|e| e.precedence());
                ordered
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            }
        }
    }

    /// The validation errors behind this failure, if any.
    #[must_use]
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl std::fmt::Display for AuthenticationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoValidatorAvailable => f.write_str("no validator available for token"),
            Self::Rejected(message) => write!(f, "rejected: {message}"),
            Self::Validation(_) => f.write_str(&self.description()),
        }
    }
}

/// Errors raised while signing an outgoing request.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The signer was configured without a key.
    #[error("a non-empty signing key is required")]
    MissingKey,

    /// A computed header value is not a valid HTTP header value.
    #[error("invalid value for header {0}")]
    InvalidHeaderValue(String),

    /// A signed component contains characters outside ASCII.
    #[error("the request {0} contains non-ASCII characters")]
    UnsupportedCharacters(&'static str),
}

/// Errors raised when validating [`SharedKeyOptions`](crate::options::SharedKeyOptions).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    /// The scheme prefix is empty or contains whitespace.
    #[error("header value prefix must be a non-empty token without whitespace: {0:?}")]
    InvalidHeaderValuePrefix(String),

    /// No date header names were configured.
    #[error("at least one date header name is required")]
    NoDateHeaderNames,

    /// A configured date header name is not a valid HTTP header name.
    #[error("invalid date header name: {0:?}")]
    InvalidDateHeaderName(String),

    /// The path prefix does not start with `/`.
    #[error("path prefix must start with '/': {0:?}")]
    InvalidPathPrefix(String),

    /// The freshness window is zero.
    #[error("max age must be greater than zero")]
    InvalidMaxAge,
}
