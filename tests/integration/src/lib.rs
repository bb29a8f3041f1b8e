//! Integration tests for the shared-key signing stack.
//!
//! Each test starts an in-process server on an ephemeral port and drives it with `reqwest`,
//! signing requests through the `reqwest` adapter of `sharedkey-auth`. No external server is
//! needed:
//!
//! ```text
//! cargo test -p sharedkey-integration
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Once};

use anyhow::Result;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use sharedkey_auth::{
    RequestSigner, SharedKey, SharedKeyHandler, SharedKeyOptions, SignRequest, StaticKeyResolver,
};
use sharedkey_http::{EchoHandler, SharedKeyHttpConfig, SharedKeyHttpService};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A server running on a background task, stopped when dropped.
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Absolute URL of `path` on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Settings of a test server.
#[derive(Debug, Clone)]
pub struct ServerSetup {
    /// Scheme options.
    pub options: SharedKeyOptions,
    /// Keys accepted by the server, in order.
    pub keys: Vec<SharedKey>,
    /// Service configuration.
    pub http: SharedKeyHttpConfig,
    /// Paths the echo handler forbids.
    pub forbidden_prefix: Option<String>,
}

impl Default for ServerSetup {
    fn default() -> Self {
        Self {
            options: SharedKeyOptions::default(),
            keys: vec![SharedKey::from("secret").with_id("primary")],
            http: SharedKeyHttpConfig::default(),
            forbidden_prefix: None,
        }
    }
}

/// Start a server with the given setup on `127.0.0.1` and an ephemeral port.
pub async fn start_server(setup: ServerSetup) -> TestServer {
    init_tracing();

    let auth = SharedKeyHandler::builder()
        .options(setup.options)
        .key_resolver(StaticKeyResolver::new(setup.keys))
        .build()
        .expect("test options should be valid");
    let handler = setup
        .forbidden_prefix
        .map_or_else(EchoHandler::default, EchoHandler::with_forbidden_prefix);
    let service = SharedKeyHttpService::new(Arc::new(handler), Arc::new(auth), setup.http);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("listener has an address");

    let task = tokio::spawn(async move {
        let http = HttpConnBuilder::new(TokioExecutor::new());
        while let Ok((stream, _)) = listener.accept().await {
            let conn = http
                .serve_connection(TokioIo::new(stream), service.clone())
                .into_owned();
            tokio::spawn(async move {
                let _ = conn.await;
            });
        }
    });

    TestServer { addr, task }
}

/// Start a server with the default setup.
pub async fn start_default_server() -> TestServer {
    start_server(ServerSetup::default()).await
}

/// A signer for the given raw key.
#[must_use]
pub fn signer(key: &str) -> RequestSigner {
    RequestSigner::new(SharedKey::from(key)).expect("test key is not empty")
}

/// Sign and send a request.
pub async fn send_signed(
    client: &reqwest::Client,
    builder: reqwest::RequestBuilder,
    signer: &RequestSigner,
) -> Result<reqwest::Response> {
    let request = builder.build()?.signed(signer)?;
    Ok(client.execute(request).await?)
}

/// The `WWW-Authenticate` header of a response, or an empty string.
#[must_use]
pub fn challenge(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

mod test_challenge;
mod test_freshness;
mod test_round_trip;
mod test_scope;
