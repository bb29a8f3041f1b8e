//! Shared-key HMAC-SHA256 request signing and verification.
//!
//! This crate implements both halves of a symmetric pre-shared-key scheme for HTTP requests.
//! The client signs a canonical representation of the request and sends the signature as
//! `Authorization: SharedKey {signature}`; the server rebuilds the same representation and
//! checks the signature, the freshness of the date header and, optionally, a path scope.
//!
//! # Overview
//!
//! The canonical string is the newline-separated list of method, content length, content
//! type, `{date header name}:{date value}` and path:
//!
//! ```text
//! POST
//! 42
//! application/json
//! x-ts-date:Tue, 15 Nov 1994 08:12:31 GMT
//! /api/orders
//! ```
//!
//! The signature is the base64-encoded HMAC-SHA256 of that string under the shared key.
//!
//! # Usage
//!
//! ```rust
//! use sharedkey_auth::{RequestSigner, SharedKey, SharedKeyHandler, SignRequest, StaticKeyResolver};
//!
//! # tokio_test::block_on(async {
//! let key = SharedKey::from_base64("c2VjcmV0").unwrap();
//!
//! // Client side: sign an outgoing request.
//! let signer = RequestSigner::new(key.clone()).unwrap();
//! let request = http::Request::builder()
//!     .method("GET")
//!     .uri("https://api.example.com/orders")
//!     .body(String::new())
//!     .unwrap()
//!     .signed(&signer)
//!     .unwrap();
//!
//! // Server side: verify it.
//! let handler = SharedKeyHandler::builder()
//!     .key_resolver(StaticKeyResolver::new(vec![key]))
//!     .build()
//!     .unwrap();
//! let (parts, _body) = request.into_parts();
//! let result = handler.authenticate(&parts).await.unwrap();
//! assert!(result.succeeded());
//! # });
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical string construction shared by both sides
//! - [`challenge`] - `WWW-Authenticate` formatting
//! - [`date`] - Date header format and the clock abstraction
//! - [`error`] - Error types
//! - [`events`] - Optional hooks into the authentication pipeline
//! - [`handler`] - The server-side authentication pipeline
//! - [`keys`] - Shared keys and key resolvers
//! - [`options`] - Scheme options
//! - [`signer`] - Client-side signing
//! - [`ticket`] - Authentication results
//! - [`token`] - Token extraction
//! - [`validator`] - Token validators

pub mod canonical;
pub mod challenge;
pub mod date;
pub mod error;
pub mod events;
pub mod handler;
pub mod keys;
pub mod options;
pub mod signer;
pub mod ticket;
pub mod token;
pub mod validator;

pub use error::{AuthError, AuthenticationFailure, OptionsError, SignError, ValidationError};
pub use events::SharedKeyEvents;
pub use handler::{SharedKeyHandler, SharedKeyHandlerBuilder};
pub use keys::{KeyResolver, KeyResolverError, NoKeysResolver, SharedKey, StaticKeyResolver};
pub use options::SharedKeyOptions;
pub use signer::{RequestSigner, SignRequest, SignerOptions, compute_signature};
pub use ticket::{AuthenticateResult, AuthenticationTicket};
pub use validator::{SharedKeyValidator, TokenValidator};
