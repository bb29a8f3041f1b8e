//! Token validators.
//!
//! A validator decides whether it understands a token ([`TokenValidator::can_read`]) and, if
//! so, verifies it ([`TokenValidator::validate`]). [`SharedKeyValidator`] is the concrete
//! validator of the scheme:
//!
//! 1. Resolve candidate keys from the [`KeyResolver`].
//! 2. Read the date from the first accepted date header present on the request.
//! 3. Reject dates outside the freshness window.
//! 4. Recompute the canonical string and compare the signature of every candidate key in
//!    constant time; the first match wins.
//!
//! Path scoping happens in `can_read`: a request outside the configured prefix is simply not
//! claimed by this validator.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use http::HeaderMap;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::{CanonicalRequest, ascii_header, content_length, content_type};
use crate::date::{Clock, SystemClock, parse_http_date};
use crate::error::{AuthError, ValidationError};
use crate::keys::{KeyResolver, SharedKey};
use crate::options::SharedKeyOptions;
use crate::signer::compute_signature;
use crate::ticket::ValidatedToken;

/// A pluggable token validator.
///
/// # Object safety
///
/// The trait uses `#[async_trait]` so validators can be stored as `Arc<dyn TokenValidator>`.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Whether this validator understands `token` for this request.
    fn can_read(&self, token: &str, request: &http::request::Parts) -> bool;

    /// Verify the token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] when the request is rejected, and the other
    /// [`AuthError`] variants when verification could not be carried out.
    async fn validate(
        &self,
        token: &str,
        request: &http::request::Parts,
    ) -> Result<ValidatedToken, AuthError>;
}

/// The shared-key signature validator.
#[derive(Clone)]
pub struct SharedKeyValidator {
    date_header_names: Vec<String>,
    path_prefix: Option<String>,
    max_age: TimeDelta,
    clock_skew: TimeDelta,
    key_resolution_timeout: Duration,
    key_resolver: Arc<dyn KeyResolver>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SharedKeyValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyValidator")
            .field("date_header_names", &self.date_header_names)
            .field("path_prefix", &self.path_prefix)
            .field("max_age", &self.max_age)
            .field("clock_skew", &self.clock_skew)
            .field("key_resolution_timeout", &self.key_resolution_timeout)
            .field("key_resolver", &"...")
            .field("clock", &self.clock)
            .finish()
    }
}

impl SharedKeyValidator {
    /// Create a validator from the scheme options and a key resolver.
    #[must_use]
    pub fn new(options: &SharedKeyOptions, key_resolver: Arc<dyn KeyResolver>) -> Self {
        Self {
            date_header_names: options.date_header_names.clone(),
            path_prefix: options.path_prefix.clone(),
            max_age: TimeDelta::from_std(options.max_age).unwrap_or(TimeDelta::MAX),
            clock_skew: TimeDelta::from_std(options.clock_skew).unwrap_or(TimeDelta::MAX),
            key_resolution_timeout: options.key_resolution_timeout,
            key_resolver,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for freshness checks.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn resolve_keys(
        &self,
        request: &http::request::Parts,
    ) -> Result<Vec<SharedKey>, AuthError> {
        let keys = tokio::time::timeout(
            self.key_resolution_timeout,
            self.key_resolver.resolve_keys(request),
        )
        .await
        .map_err(|_| AuthError::KeyResolutionTimedOut {
            timeout: self.key_resolution_timeout,
        })??;

        if keys.is_empty() {
            return Err(ValidationError::NoKeys.into());
        }
        if keys.iter().any(SharedKey::is_empty) {
            return Err(ValidationError::InvalidSigningKeys.into());
        }
        Ok(keys)
    }

    /// Find the first accepted date header that is present and non-empty.
    ///
    /// A present value with bytes outside ASCII is an invalid date, not a missing one.
    fn find_date<'a>(
        &'a self,
        headers: &'a HeaderMap,
    ) -> Result<(&'a str, &'a str), ValidationError> {
        for name in &self.date_header_names {
            match ascii_header(headers, name.as_str()) {
                Ok(Some(value)) if !value.is_empty() => return Ok((name.as_str(), value)),
                Ok(_) => {}
                Err(raw) => {
                    return Err(ValidationError::InvalidDate {
                        value: String::from_utf8_lossy(raw).into_owned(),
                    });
                }
            }
        }
        Err(ValidationError::NoDate {
            accepted: self.date_header_names.join(", "),
        })
    }

    fn check_freshness(&self, supplied_time: DateTime<Utc>) -> Result<(), ValidationError> {
        let now = self.clock.now();
        let oldest_allowed = now
            .checked_sub_signed(self.max_age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let newest_allowed = now
            .checked_add_signed(self.clock_skew)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        if supplied_time < oldest_allowed || supplied_time > newest_allowed {
            return Err(ValidationError::TimeWindowExpired {
                oldest_allowed,
                newest_allowed,
                supplied_time,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TokenValidator for SharedKeyValidator {
    fn can_read(&self, token: &str, request: &http::request::Parts) -> bool {
        if token.is_empty() {
            return false;
        }
        self.path_prefix
            .as_deref()
            .is_none_or(|prefix| path_in_scope(request.uri.path(), prefix))
    }

    async fn validate(
        &self,
        token: &str,
        request: &http::request::Parts,
    ) -> Result<ValidatedToken, AuthError> {
        let keys = self.resolve_keys(request).await?;

        let (date_header_name, date_value) = self.find_date(&request.headers)?;
        let signed_at = parse_http_date(date_value).ok_or_else(|| ValidationError::InvalidDate {
            value: date_value.to_owned(),
        })?;
        self.check_freshness(signed_at)?;

        let canonical_request = CanonicalRequest {
            method: request.method.as_str(),
            content_length: content_length(&request.headers),
            content_type: content_type(&request.headers).map_err(|_| {
                ValidationError::UnsupportedCharacters {
                    field: "content type",
                }
            })?,
            date_header_name,
            date_value,
            path: request.uri.path(),
        };
        if let Some(field) = canonical_request.non_ascii_component() {
            return Err(ValidationError::UnsupportedCharacters { field }.into());
        }
        let canonical = canonical_request.build();
        debug!(canonical, candidates = keys.len(), "verifying shared key signature");

        let matched = keys.iter().enumerate().find(|(_, key)| {
            let expected = compute_signature(key.as_bytes(), &canonical);
            expected.as_bytes().ct_eq(token.as_bytes()).into()
        });

        let Some((key_index, key)) = matched else {
            debug!("no candidate key matched the signature");
            return Err(ValidationError::InvalidSignature.into());
        };

        debug!(key_index, key_id = ?key.id(), "shared key signature verified");

        let mut claims = BTreeMap::new();
        claims.insert("signed_at".to_owned(), signed_at.to_rfc3339());

        Ok(ValidatedToken {
            key_index,
            key_id: key.id().map(ToOwned::to_owned),
            date_header_name: date_header_name.to_owned(),
            date_value: date_value.to_owned(),
            signed_at,
            claims,
        })
    }
}

/// Whether `path` lies under `prefix`, matching whole segments and ignoring ASCII case.
///
/// `/secure` covers `/secure` and `/secure/orders`, but not `/secured`.
#[must_use]
pub fn path_in_scope(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/').as_bytes();
    let path = path.as_bytes();
    if prefix.is_empty() {
        return true;
    }
    path.len() >= prefix.len()
        && path[..prefix.len()].eq_ignore_ascii_case(prefix)
        && (path.len() == prefix.len() || path[prefix.len()] == b'/')
}
