//! Handler trait for authenticated requests.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use sharedkey_auth::AuthenticationTicket;

use crate::response::SharedKeyResponseBody;

/// Returned by a [`ProtectedHandler`] to deny an authenticated caller.
///
/// The service answers with 403 through the forbid path of the authentication handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("forbidden: {reason}")]
pub struct Forbidden {
    /// Why the caller was denied. Logged, never sent to the caller.
    pub reason: String,
}

impl Forbidden {
    /// Create a denial.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Future returned by [`ProtectedHandler::handle`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<SharedKeyResponseBody>, Forbidden>> + Send>>;

/// Application logic behind the shared-key service.
///
/// The handler receives the buffered request and the ticket of the authenticated caller.
/// The ticket is `None` only when the service does not require authentication and the
/// request carried no token.
pub trait ProtectedHandler: Send + Sync + 'static {
    /// Handle an authenticated request.
    fn handle(
        &self,
        request: http::Request<Bytes>,
        ticket: Option<AuthenticationTicket>,
    ) -> HandlerFuture;
}

/// Dispatch a request to the handler.
pub async fn dispatch_request<H: ProtectedHandler>(
    handler: &H,
    request: http::Request<Bytes>,
    ticket: Option<AuthenticationTicket>,
) -> Result<http::Response<SharedKeyResponseBody>, Forbidden> {
    tracing::debug!(
        method = %request.method(),
        path = %request.uri().path(),
        principal = ticket.as_ref().map_or("anonymous", |t| t.principal.name.as_str()),
        "dispatching authenticated request"
    );
    handler.handle(request, ticket).await
}
