//! The server-side authentication handler.
//!
//! [`SharedKeyHandler`] drives one authentication attempt:
//!
//! 1. The message-received hook may supply a token or a final result.
//! 2. Otherwise the token is extracted from the `Authorization` header. No token means
//!    [`AuthenticateResult::NoResult`], never a failure.
//! 3. Validators run in order. Each one that can read the token gets a single attempt;
//!    rejections are collected and the next validator is tried, the first success is final.
//! 4. Collected rejections become [`AuthenticateResult::Fail`] after the authentication-failed
//!    hook. Errors that prevent verification (key store failures) do not stop the remaining
//!    validators; when nothing succeeds, the first such error runs that hook and is then
//!    returned as `Err`.
//!
//! [`SharedKeyHandler::challenge`] and [`SharedKeyHandler::forbid`] write the 401 and 403
//! responses.

use std::fmt;
use std::sync::Arc;

use http::header::WWW_AUTHENTICATE;
use http::{HeaderValue, StatusCode};
use tracing::{debug, info, warn};

use crate::challenge::build_challenge;
use crate::date::Clock;
use crate::error::{AuthError, AuthenticationFailure, OptionsError};
use crate::events::{
    AuthenticationFailedContext, ChallengeContext, FailureCause, ForbiddenContext,
    MessageReceivedContext, SharedKeyEvents, TokenValidatedContext,
};
use crate::keys::{KeyResolver, NoKeysResolver};
use crate::options::{DEFAULT_SCHEME, SharedKeyOptions};
use crate::ticket::{AuthenticateResult, AuthenticationTicket, ValidatedToken};
use crate::token::extract_token;
use crate::validator::{SharedKeyValidator, TokenValidator};

/// RFC 6750 error code used for rejected tokens.
const INVALID_TOKEN: &str = "invalid_token";

/// Authenticates requests signed with the shared-key scheme.
#[derive(Clone)]
pub struct SharedKeyHandler {
    scheme: String,
    options: SharedKeyOptions,
    events: SharedKeyEvents,
    validators: Vec<Arc<dyn TokenValidator>>,
}

impl fmt::Debug for SharedKeyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyHandler")
            .field("scheme", &self.scheme)
            .field("options", &self.options)
            .field("events", &self.events)
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl SharedKeyHandler {
    /// Start building a handler.
    #[must_use]
    pub fn builder() -> SharedKeyHandlerBuilder {
        SharedKeyHandlerBuilder::default()
    }

    /// The scheme name recorded on tickets.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The validated options.
    #[must_use]
    pub fn options(&self) -> &SharedKeyOptions {
        &self.options
    }

    /// Authenticate a request.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] when verification could not be carried out, for example when
    /// the key resolver failed or timed out, and no authentication-failed hook supplied a
    /// result. These errors are transient.
    pub async fn authenticate(
        &self,
        request: &http::request::Parts,
    ) -> Result<AuthenticateResult, AuthError> {
        let mut received = MessageReceivedContext {
            request,
            options: &self.options,
            token: None,
            result: None,
        };
        self.events.message_received(&mut received);
        if let Some(result) = received.result {
            debug!("message received hook produced the result");
            return Ok(result);
        }

        let token = match received.token.filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => match extract_token(&request.headers, &self.options.header_value_prefix) {
                Some(token) => token.to_owned(),
                None => {
                    debug!(path = %request.uri.path(), "no shared key token on request");
                    return Ok(AuthenticateResult::NoResult);
                }
            },
        };

        let mut errors = Vec::new();
        let mut fatal = None;
        for validator in &self.validators {
            if !validator.can_read(&token, request) {
                continue;
            }
            match validator.validate(&token, request).await {
                Ok(validated) => return Ok(self.token_validated(request, token, validated)),
                Err(AuthError::Validation(err)) => {
                    info!(error = %err, path = %request.uri.path(), "shared key validation failed");
                    errors.push(err);
                }
                Err(err) => {
                    warn!(error = %err, "shared key verification could not complete");
                    fatal.get_or_insert(err);
                }
            }
        }

        if let Some(err) = fatal {
            return self.fatal(request, err);
        }

        if errors.is_empty() {
            debug!(path = %request.uri.path(), "no validator can read the token");
            return Ok(AuthenticateResult::Fail(
                AuthenticationFailure::NoValidatorAvailable,
            ));
        }

        let failure = AuthenticationFailure::Validation(errors);
        let overridden = {
            let mut ctx = AuthenticationFailedContext {
                request,
                options: &self.options,
                cause: FailureCause::Failure(&failure),
                result: None,
            };
            self.events.authentication_failed(&mut ctx);
            ctx.result
        };
        Ok(overridden.unwrap_or(AuthenticateResult::Fail(failure)))
    }

    /// Write a 401 challenge to `response`.
    ///
    /// `failure` is the reason authentication failed, or `None` when no token was presented.
    /// Error parameters are only emitted for actual failures and when
    /// `include_error_details` is enabled. A challenge hook may take over the response, in
    /// which case nothing is written.
    pub fn challenge(
        &self,
        request: &http::request::Parts,
        response: &mut http::response::Parts,
        failure: Option<&AuthenticationFailure>,
    ) {
        let mut ctx = ChallengeContext::new(request, response, &self.options, failure);
        if self.options.include_error_details {
            if let Some(failure) = failure {
                ctx.error = Some(INVALID_TOKEN.to_owned());
                ctx.error_description = Some(failure.description()).filter(|d| !d.is_empty());
            }
        }

        self.events.challenge(&mut ctx);
        if ctx.is_handled() {
            debug!("challenge handled by hook");
            return;
        }

        let challenge = self.options.challenge();
        let value = build_challenge(
            challenge,
            ctx.error.as_deref(),
            ctx.error_description.as_deref(),
            ctx.error_uri.as_deref(),
        );
        let header = HeaderValue::from_str(&value).or_else(|e| {
            warn!(error = %e, "challenge parameters are not a valid header value, sending bare challenge");
            HeaderValue::from_str(challenge)
        });

        ctx.response.status = StatusCode::UNAUTHORIZED;
        match header {
            Ok(header) => {
                ctx.response.headers.append(WWW_AUTHENTICATE, header);
            }
            Err(e) => warn!(error = %e, "configured challenge is not a valid header value"),
        }
    }

    /// Write a 403 response status and run the forbidden hook. The body is left untouched.
    pub fn forbid(&self, request: &http::request::Parts, response: &mut http::response::Parts) {
        response.status = StatusCode::FORBIDDEN;
        let mut ctx = ForbiddenContext {
            request,
            response,
            options: &self.options,
        };
        self.events.forbidden(&mut ctx);
    }

    fn token_validated(
        &self,
        request: &http::request::Parts,
        token: String,
        validated: ValidatedToken,
    ) -> AuthenticateResult {
        let mut ctx = TokenValidatedContext {
            request,
            options: &self.options,
            ticket: AuthenticationTicket::new(&self.scheme, validated),
            save_token: self.options.save_token,
            result: None,
        };
        self.events.token_validated(&mut ctx);
        if let Some(result) = ctx.result {
            debug!("token validated hook produced the result");
            return result;
        }

        let mut ticket = ctx.ticket;
        if ctx.save_token {
            ticket.token = Some(token);
        }
        debug!(principal = %ticket.principal.name, "shared key authentication succeeded");
        AuthenticateResult::Success(Box::new(ticket))
    }

    fn fatal(
        &self,
        request: &http::request::Parts,
        err: AuthError,
    ) -> Result<AuthenticateResult, AuthError> {
        let overridden = {
            let mut ctx = AuthenticationFailedContext {
                request,
                options: &self.options,
                cause: FailureCause::Error(&err),
                result: None,
            };
            self.events.authentication_failed(&mut ctx);
            ctx.result
        };
        match overridden {
            Some(result) => Ok(result),
            None => Err(err),
        }
    }
}

/// Builder for [`SharedKeyHandler`].
#[derive(Default)]
pub struct SharedKeyHandlerBuilder {
    scheme: Option<String>,
    options: SharedKeyOptions,
    key_resolver: Option<Arc<dyn KeyResolver>>,
    clock: Option<Arc<dyn Clock>>,
    events: SharedKeyEvents,
    validators: Vec<Arc<dyn TokenValidator>>,
}

impl fmt::Debug for SharedKeyHandlerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyHandlerBuilder")
            .field("scheme", &self.scheme)
            .field("options", &self.options)
            .field("key_resolver", &self.key_resolver.as_ref().map(|_| "..."))
            .field("clock", &self.clock)
            .field("events", &self.events)
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl SharedKeyHandlerBuilder {
    /// Scheme name recorded on tickets, `SharedKey` by default.
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Scheme options.
    #[must_use]
    pub fn options(mut self, options: SharedKeyOptions) -> Self {
        self.options = options;
        self
    }

    /// Source of candidate keys. Without one the handler never validates a request.
    #[must_use]
    pub fn key_resolver(mut self, resolver: impl KeyResolver + 'static) -> Self {
        self.key_resolver = Some(Arc::new(resolver));
        self
    }

    /// Clock used by the default validator.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Event hooks.
    #[must_use]
    pub fn events(mut self, events: SharedKeyEvents) -> Self {
        self.events = events;
        self
    }

    /// Append a validator. When none are added, a [`SharedKeyValidator`] built from the
    /// options, key resolver and clock is used.
    #[must_use]
    pub fn validator(mut self, validator: impl TokenValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Validate the options and build the handler.
    ///
    /// # Errors
    ///
    /// Returns an [`OptionsError`] when the options are inconsistent.
    pub fn build(self) -> Result<SharedKeyHandler, OptionsError> {
        self.options.validate()?;

        let validators = if self.validators.is_empty() {
            let resolver = self
                .key_resolver
                .unwrap_or_else(|| Arc::new(NoKeysResolver) as Arc<dyn KeyResolver>);
            let mut validator = SharedKeyValidator::new(&self.options, resolver);
            if let Some(clock) = self.clock {
                validator = validator.with_clock(clock);
            }
            vec![Arc::new(validator) as Arc<dyn TokenValidator>]
        } else {
            self.validators
        };

        Ok(SharedKeyHandler {
            scheme: self.scheme.unwrap_or_else(|| DEFAULT_SCHEME.to_owned()),
            options: self.options,
            events: self.events,
            validators,
        })
    }
}
