//! Shared-key HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use sharedkey_auth::{AuthError, AuthenticateResult, AuthenticationFailure, SharedKeyHandler};
use tracing::{info, warn};

use crate::dispatch::{ProtectedHandler, dispatch_request};
use crate::response::{SharedKeyResponseBody, empty_response, error_response};

/// Header carrying the per-request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Seconds a client should wait before retrying after a transient authentication error.
const RETRY_AFTER_SECS: &str = "1";

/// Configuration for the shared-key HTTP service.
#[derive(Debug, Clone)]
pub struct SharedKeyHttpConfig {
    /// Whether requests without a token are challenged. When disabled they reach the
    /// handler without a ticket; requests with a rejected token are always challenged.
    pub require_authentication: bool,
}

impl Default for SharedKeyHttpConfig {
    fn default() -> Self {
        Self {
            require_authentication: true,
        }
    }
}

/// Hyper `Service` that authenticates every request before handing it to a
/// [`ProtectedHandler`].
#[derive(Debug)]
pub struct SharedKeyHttpService<H: ProtectedHandler> {
    handler: Arc<H>,
    auth: Arc<SharedKeyHandler>,
    config: Arc<SharedKeyHttpConfig>,
}

impl<H: ProtectedHandler> SharedKeyHttpService<H> {
    /// Create a new `SharedKeyHttpService`.
    pub fn new(handler: Arc<H>, auth: Arc<SharedKeyHandler>, config: SharedKeyHttpConfig) -> Self {
        Self {
            handler,
            auth,
            config: Arc::new(config),
        }
    }
}

impl<H: ProtectedHandler> Clone for SharedKeyHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            auth: Arc::clone(&self.auth),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: ProtectedHandler> hyper::service::Service<http::Request<Incoming>>
    for SharedKeyHttpService<H>
{
    type Response = http::Response<SharedKeyResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let auth = Arc::clone(&self.auth);
        let config = Arc::clone(&self.config);
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let response = process_request(req, handler.as_ref(), &auth, &config).await;
            let response = add_common_headers(response, &request_id);
            Ok(response)
        })
    }
}

/// Process a single request through authentication and dispatch.
pub async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    auth: &SharedKeyHandler,
    config: &SharedKeyHttpConfig,
) -> http::Response<SharedKeyResponseBody>
where
    H: ProtectedHandler,
    B: http_body::Body,
    B::Error: Display,
{
    let (parts, body) = req.into_parts();

    // 1. Authenticate from the request head.
    let ticket = match auth.authenticate(&parts).await {
        Ok(AuthenticateResult::Success(ticket)) => Some(*ticket),
        Ok(AuthenticateResult::NoResult) if !config.require_authentication => None,
        Ok(AuthenticateResult::NoResult) => return challenge_response(auth, &parts, None),
        Ok(AuthenticateResult::Fail(failure)) => {
            info!(path = %parts.uri.path(), %failure, "rejecting unauthenticated request");
            return challenge_response(auth, &parts, Some(&failure));
        }
        Err(err) => return unavailable_response(&err),
    };

    // 2. Collect body.
    let body = match collect_body(body).await {
        Ok(body) => body,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, "bad_request", &message),
    };

    // 3. Dispatch to handler.
    let request = http::Request::from_parts(parts.clone(), body);
    match dispatch_request(handler, request, ticket).await {
        Ok(response) => response,
        Err(denied) => {
            info!(path = %parts.uri.path(), reason = %denied.reason, "request forbidden");
            forbidden_response(auth, &parts)
        }
    }
}

/// Collect the incoming body into a single `Bytes` buffer.
async fn collect_body<B>(body: B) -> Result<Bytes, String>
where
    B: http_body::Body,
    B::Error: Display,
{
    body.collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| format!("Failed to read request body: {e}"))
}

fn challenge_response(
    auth: &SharedKeyHandler,
    request: &http::request::Parts,
    failure: Option<&AuthenticationFailure>,
) -> http::Response<SharedKeyResponseBody> {
    let (mut parts, body) = empty_response().into_parts();
    auth.challenge(request, &mut parts, failure);
    http::Response::from_parts(parts, body)
}

fn forbidden_response(
    auth: &SharedKeyHandler,
    request: &http::request::Parts,
) -> http::Response<SharedKeyResponseBody> {
    let (mut parts, body) = empty_response().into_parts();
    auth.forbid(request, &mut parts);
    http::Response::from_parts(parts, body)
}

fn unavailable_response(err: &AuthError) -> http::Response<SharedKeyResponseBody> {
    warn!(error = %err, "authentication unavailable");
    let mut response = error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "authentication_unavailable",
        "Authentication is temporarily unavailable",
    );
    response.headers_mut().insert(
        http::header::RETRY_AFTER,
        http::HeaderValue::from_static(RETRY_AFTER_SECS),
    );
    response
}

/// Add common response headers to every response.
fn add_common_headers(
    mut response: http::Response<SharedKeyResponseBody>,
    request_id: &str,
) -> http::Response<SharedKeyResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }

    headers.insert("server", http::HeaderValue::from_static("sharedkey"));

    response
}
