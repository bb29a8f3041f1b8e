//! Hyper service layer for the shared-key authentication scheme.
//!
//! - **Service**: authenticates each request with a [`sharedkey_auth::SharedKeyHandler`],
//!   answering 401 with a challenge, 503 when keys cannot be resolved, or dispatching to
//!   the application
//! - **Handler trait**: the boundary between HTTP transport and application logic
//! - **Response helpers**: JSON success and error responses
//! - **Echo handler**: reports the authenticated caller back, used by the server binary

pub mod dispatch;
pub mod echo;
pub mod response;
pub mod service;

pub use dispatch::{Forbidden, HandlerFuture, ProtectedHandler};
pub use echo::EchoHandler;
pub use response::SharedKeyResponseBody;
pub use service::{SharedKeyHttpConfig, SharedKeyHttpService, process_request};
