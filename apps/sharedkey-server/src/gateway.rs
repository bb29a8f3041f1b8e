//! Gateway service in front of the shared-key protected application.
//!
//! Health-check endpoints (`/_health`, `/health`) are answered at the gateway level without
//! authentication. Everything else goes through [`SharedKeyHttpService`].

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use hyper::body::Incoming;
use hyper::service::Service;

use sharedkey_http::dispatch::ProtectedHandler;
use sharedkey_http::response::json_response;
use sharedkey_http::{SharedKeyHttpService, SharedKeyResponseBody};

/// Routes health checks locally and everything else to the protected service.
#[derive(Debug)]
pub struct GatewayService<H: ProtectedHandler> {
    protected: SharedKeyHttpService<H>,
}

impl<H: ProtectedHandler> GatewayService<H> {
    /// Create a new gateway wrapping the protected service.
    pub fn new(protected: SharedKeyHttpService<H>) -> Self {
        Self { protected }
    }
}

impl<H: ProtectedHandler> Clone for GatewayService<H> {
    fn clone(&self) -> Self {
        Self {
            protected: self.protected.clone(),
        }
    }
}

impl<H: ProtectedHandler> Service<http::Request<Incoming>> for GatewayService<H> {
    type Response = http::Response<SharedKeyResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        if is_health_check(req.method(), req.uri().path()) {
            return Box::pin(async { Ok(health_check_response()) });
        }

        self.protected.call(req)
    }
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/_health" || path == "/health")
}

/// Produce the health check response.
fn health_check_response() -> http::Response<SharedKeyResponseBody> {
    json_response(
        http::StatusCode::OK,
        &serde_json::json!({ "status": "running", "version": crate::VERSION }),
    )
}
