//! Event hooks invoked by [`SharedKeyHandler`](crate::handler::SharedKeyHandler).
//!
//! Every hook is optional. The handler behaves correctly with all of them unset; hooks only
//! observe or override outcomes.

use std::fmt;
use std::sync::Arc;

use crate::error::{AuthError, AuthenticationFailure};
use crate::options::SharedKeyOptions;
use crate::ticket::{AuthenticateResult, AuthenticationTicket};

/// Hook invoked before the token is extracted.
pub type MessageReceivedHook = Arc<dyn Fn(&mut MessageReceivedContext<'_>) + Send + Sync>;
/// Hook invoked after a validator accepted the token.
pub type TokenValidatedHook = Arc<dyn Fn(&mut TokenValidatedContext<'_>) + Send + Sync>;
/// Hook invoked when authentication fails or errors.
pub type AuthenticationFailedHook =
    Arc<dyn Fn(&mut AuthenticationFailedContext<'_>) + Send + Sync>;
/// Hook invoked while a challenge is built.
pub type ChallengeHook = Arc<dyn Fn(&mut ChallengeContext<'_>) + Send + Sync>;
/// Hook invoked when a request is forbidden.
pub type ForbiddenHook = Arc<dyn Fn(&mut ForbiddenContext<'_>) + Send + Sync>;

/// State visible to the message-received hook.
#[derive(Debug)]
pub struct MessageReceivedContext<'a> {
    /// The inbound request.
    pub request: &'a http::request::Parts,
    /// Scheme options.
    pub options: &'a SharedKeyOptions,
    /// A token to use instead of the `Authorization` header.
    pub token: Option<String>,
    /// A final result, skipping the rest of the pipeline.
    pub result: Option<AuthenticateResult>,
}

/// State visible to the token-validated hook.
#[derive(Debug)]
pub struct TokenValidatedContext<'a> {
    /// The inbound request.
    pub request: &'a http::request::Parts,
    /// Scheme options.
    pub options: &'a SharedKeyOptions,
    /// The ticket about to be returned. Hooks may add properties or claims.
    pub ticket: AuthenticationTicket,
    /// Whether the raw token is kept on the ticket, initialized from the options.
    pub save_token: bool,
    /// A final result replacing the success.
    pub result: Option<AuthenticateResult>,
}

impl TokenValidatedContext<'_> {
    /// Reject the request despite the valid token.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.result = Some(AuthenticateResult::Fail(AuthenticationFailure::Rejected(
            message.into(),
        )));
    }
}

/// What caused the authentication-failed hook to run.
#[derive(Debug, Clone, Copy)]
pub enum FailureCause<'a> {
    /// Every capable validator rejected the token.
    Failure(&'a AuthenticationFailure),
    /// Verification could not be completed.
    Error(&'a AuthError),
}

/// State visible to the authentication-failed hook.
#[derive(Debug)]
pub struct AuthenticationFailedContext<'a> {
    /// The inbound request.
    pub request: &'a http::request::Parts,
    /// Scheme options.
    pub options: &'a SharedKeyOptions,
    /// The failure or error.
    pub cause: FailureCause<'a>,
    /// A final result replacing the failure or error.
    pub result: Option<AuthenticateResult>,
}

/// State visible to the challenge hook.
#[derive(Debug)]
pub struct ChallengeContext<'a> {
    /// The inbound request.
    pub request: &'a http::request::Parts,
    /// The outgoing response.
    pub response: &'a mut http::response::Parts,
    /// Scheme options.
    pub options: &'a SharedKeyOptions,
    /// The failure behind the challenge, `None` when no token was presented.
    pub failure: Option<&'a AuthenticationFailure>,
    /// RFC 6750 `error` parameter.
    pub error: Option<String>,
    /// RFC 6750 `error_description` parameter.
    pub error_description: Option<String>,
    /// RFC 6750 `error_uri` parameter.
    pub error_uri: Option<String>,
    handled: bool,
}

impl<'a> ChallengeContext<'a> {
    pub(crate) fn new(
        request: &'a http::request::Parts,
        response: &'a mut http::response::Parts,
        options: &'a SharedKeyOptions,
        failure: Option<&'a AuthenticationFailure>,
    ) -> Self {
        Self {
            request,
            response,
            options,
            failure,
            error: None,
            error_description: None,
            error_uri: None,
            handled: false,
        }
    }

    /// Skip the default status and `WWW-Authenticate` header.
    pub fn handle_response(&mut self) {
        self.handled = true;
    }

    /// Whether a hook took over the response.
    #[must_use]
    pub fn is_handled(&self) -> bool {
        self.handled
    }
}

/// State visible to the forbidden hook.
#[derive(Debug)]
pub struct ForbiddenContext<'a> {
    /// The inbound request.
    pub request: &'a http::request::Parts,
    /// The outgoing response, already set to 403.
    pub response: &'a mut http::response::Parts,
    /// Scheme options.
    pub options: &'a SharedKeyOptions,
}

/// The set of hooks of one handler.
///
/// # Examples
///
/// ```
/// use sharedkey_auth::events::SharedKeyEvents;
///
/// let events = SharedKeyEvents::default().on_challenge(|ctx| {
///     ctx.error_uri = Some("https://example.com/docs/auth".to_owned());
/// });
/// # let _ = events;
/// ```
#[derive(Clone, Default)]
pub struct SharedKeyEvents {
    message_received: Option<MessageReceivedHook>,
    token_validated: Option<TokenValidatedHook>,
    authentication_failed: Option<AuthenticationFailedHook>,
    challenge: Option<ChallengeHook>,
    forbidden: Option<ForbiddenHook>,
}

impl fmt::Debug for SharedKeyEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyEvents")
            .field("message_received", &self.message_received.is_some())
            .field("token_validated", &self.token_validated.is_some())
            .field("authentication_failed", &self.authentication_failed.is_some())
            .field("challenge", &self.challenge.is_some())
            .field("forbidden", &self.forbidden.is_some())
            .finish()
    }
}

impl SharedKeyEvents {
    /// Set the message-received hook.
    #[must_use]
    pub fn on_message_received<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut MessageReceivedContext<'_>) + Send + Sync + 'static,
    {
        self.message_received = Some(Arc::new(hook));
        self
    }

    /// Set the token-validated hook.
    #[must_use]
    pub fn on_token_validated<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut TokenValidatedContext<'_>) + Send + Sync + 'static,
    {
        self.token_validated = Some(Arc::new(hook));
        self
    }

    /// Set the authentication-failed hook.
    #[must_use]
    pub fn on_authentication_failed<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut AuthenticationFailedContext<'_>) + Send + Sync + 'static,
    {
        self.authentication_failed = Some(Arc::new(hook));
        self
    }

    /// Set the challenge hook.
    #[must_use]
    pub fn on_challenge<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ChallengeContext<'_>) + Send + Sync + 'static,
    {
        self.challenge = Some(Arc::new(hook));
        self
    }

    /// Set the forbidden hook.
    #[must_use]
    pub fn on_forbidden<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ForbiddenContext<'_>) + Send + Sync + 'static,
    {
        self.forbidden = Some(Arc::new(hook));
        self
    }

    pub(crate) fn message_received(&self, ctx: &mut MessageReceivedContext<'_>) {
        if let Some(hook) = &self.message_received {
            hook(ctx);
        }
    }

    pub(crate) fn token_validated(&self, ctx: &mut TokenValidatedContext<'_>) {
        if let Some(hook) = &self.token_validated {
            hook(ctx);
        }
    }

    pub(crate) fn authentication_failed(&self, ctx: &mut AuthenticationFailedContext<'_>) {
        if let Some(hook) = &self.authentication_failed {
            hook(ctx);
        }
    }

    pub(crate) fn challenge(&self, ctx: &mut ChallengeContext<'_>) {
        if let Some(hook) = &self.challenge {
            hook(ctx);
        }
    }

    pub(crate) fn forbidden(&self, ctx: &mut ForbiddenContext<'_>) {
        if let Some(hook) = &self.forbidden {
            hook(ctx);
        }
    }
}
