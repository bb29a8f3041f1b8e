//! Results of an authentication attempt.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::AuthenticationFailure;

/// What a validator established about a verified request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedToken {
    /// Position of the matching key in the resolver's list.
    pub key_index: usize,
    /// Identifier of the matching key, if it has one.
    pub key_id: Option<String>,
    /// Date header the signature was computed over.
    pub date_header_name: String,
    /// Raw date header value.
    pub date_value: String,
    /// Parsed signing time.
    pub signed_at: DateTime<Utc>,
    /// Additional claims surfaced by the validator.
    pub claims: BTreeMap<String, String>,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Principal {
    /// Display name, the key id when available.
    pub name: String,
    /// Claims describing the caller.
    pub claims: BTreeMap<String, String>,
}

/// A successful authentication, handed to the host for the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AuthenticationTicket {
    /// Name of the scheme that produced the ticket.
    pub scheme: String,
    /// The authenticated caller.
    pub principal: Principal,
    /// Verification details.
    pub validated: ValidatedToken,
    /// Free-form properties set by event hooks.
    pub properties: BTreeMap<String, String>,
    /// The raw token, only kept when token saving is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AuthenticationTicket {
    /// Build a ticket for a verified request.
    #[must_use]
    pub fn new(scheme: impl Into<String>, validated: ValidatedToken) -> Self {
        let scheme = scheme.into();
        let mut claims = validated.claims.clone();
        if let Some(id) = &validated.key_id {
            claims.insert("key_id".to_owned(), id.clone());
        }
        let name = validated.key_id.clone().unwrap_or_else(|| scheme.clone());

        Self {
            scheme,
            principal: Principal { name, claims },
            validated,
            properties: BTreeMap::new(),
            token: None,
        }
    }
}

/// Outcome of [`SharedKeyHandler::authenticate`](crate::handler::SharedKeyHandler::authenticate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticateResult {
    /// No credentials for this scheme were presented.
    NoResult,
    /// The request is authenticated.
    Success(Box<AuthenticationTicket>),
    /// Credentials were presented and rejected.
    Fail(AuthenticationFailure),
}

impl AuthenticateResult {
    /// Whether the request is authenticated.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The ticket of a successful result.
    #[must_use]
    pub fn ticket(&self) -> Option<&AuthenticationTicket> {
        match self {
            Self::Success(ticket) => Some(ticket),
            _ => None,
        }
    }

    /// The failure of a failed result.
    #[must_use]
    pub fn failure(&self) -> Option<&AuthenticationFailure> {
        match self {
            Self::Fail(failure) => Some(failure),
            _ => None,
        }
    }
}
