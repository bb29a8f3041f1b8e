//! A handler that echoes the authenticated caller back as JSON.

use bytes::Bytes;
use http::StatusCode;
use sharedkey_auth::AuthenticationTicket;

use crate::dispatch::{Forbidden, HandlerFuture, ProtectedHandler};
use crate::response::json_response;

/// Echoes the principal, verification details and request summary of each request.
///
/// Requests under `forbidden_prefix` are denied with 403, which is useful to exercise the
/// forbid path from clients.
#[derive(Debug, Clone, Default)]
pub struct EchoHandler {
    forbidden_prefix: Option<String>,
}

impl EchoHandler {
    /// Create an echo handler that denies requests under `prefix`.
    #[must_use]
    pub fn with_forbidden_prefix(prefix: impl Into<String>) -> Self {
        Self {
            forbidden_prefix: Some(prefix.into()),
        }
    }
}

impl ProtectedHandler for EchoHandler {
    fn handle(
        &self,
        request: http::Request<Bytes>,
        ticket: Option<AuthenticationTicket>,
    ) -> HandlerFuture {
        let denied = self
            .forbidden_prefix
            .as_deref()
            .is_some_and(|prefix| request.uri().path().starts_with(prefix));

        Box::pin(async move {
            if denied {
                return Err(Forbidden::new(format!(
                    "path {} is not available to shared key callers",
                    request.uri().path()
                )));
            }

            let body = serde_json::json!({
                "method": request.method().as_str(),
                "path": request.uri().path(),
                "bodyLength": request.body().len(),
                "ticket": ticket,
            });
            Ok(json_response(StatusCode::OK, &body))
        })
    }
}
