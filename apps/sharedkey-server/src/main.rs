//! SharedKey Server - an HTTP server protected by shared-key request signatures.
//!
//! Every request except the health check must carry
//! `Authorization: SharedKey {signature}` and a fresh date header. Authenticated requests are
//! answered by an echo handler that reports the caller and the verification details back as
//! JSON.
//!
//! # Usage
//!
//! ```text
//! SHAREDKEY_KEYS=primary=c2VjcmV0 GATEWAY_LISTEN=0.0.0.0:8080 sharedkey-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `SHAREDKEY_KEYS` | *(empty)* | Comma-separated base64 keys, each optionally `id=key` |
//! | `SHAREDKEY_REQUIRE_AUTH` | `true` | Challenge requests that carry no token |
//! | `SHAREDKEY_FORBIDDEN_PREFIX` | *(unset)* | Paths answered with 403 after authentication |
//! | `SHAREDKEY_*` | | Scheme options, see `SharedKeyOptions::from_env` |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod gateway;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use sharedkey_auth::{SharedKeyHandler, SharedKeyOptions, StaticKeyResolver};
use sharedkey_http::{EchoHandler, SharedKeyHttpConfig, SharedKeyHttpService};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::gateway::GatewayService;

/// Server version reported in health check responses.
const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

/// Process settings read from the environment. Scheme options are read separately by
/// [`SharedKeyOptions::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct ServerConfig {
    listen: String,
    log_level: String,
    keys: String,
    require_authentication: bool,
    forbidden_prefix: Option<String>,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            listen: lookup("GATEWAY_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_owned()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_owned()),
            keys: lookup("SHAREDKEY_KEYS").unwrap_or_default(),
            require_authentication: parse_bool(lookup("SHAREDKEY_REQUIRE_AUTH").as_deref(), true),
            forbidden_prefix: lookup("SHAREDKEY_FORBIDDEN_PREFIX").filter(|p| !p.is_empty()),
        }
    }

    /// Address probed by `--health-check`; a wildcard bind is probed on loopback.
    fn probe_addr(&self) -> String {
        self.listen.replace("0.0.0.0", "127.0.0.1")
    }

    fn echo_handler(&self) -> EchoHandler {
        self.forbidden_prefix
            .clone()
            .map_or_else(EchoHandler::default, EchoHandler::with_forbidden_prefix)
    }

    fn http_config(&self) -> SharedKeyHttpConfig {
        SharedKeyHttpConfig {
            require_authentication: self.require_authentication,
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over `LOG_LEVEL` when it parses.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the key resolver from the raw `SHAREDKEY_KEYS` value.
fn build_key_resolver(raw: &str) -> Result<StaticKeyResolver> {
    let resolver =
        StaticKeyResolver::parse(raw).context("SHAREDKEY_KEYS must contain base64 keys")?;
    if resolver.is_empty() {
        warn!("no shared keys configured, every signed request will be rejected");
    }
    Ok(resolver)
}

/// Build the authentication handler, validating the options.
fn build_auth_handler(
    options: SharedKeyOptions,
    resolver: StaticKeyResolver,
) -> Result<SharedKeyHandler> {
    SharedKeyHandler::builder()
        .options(options)
        .key_resolver(resolver)
        .build()
        .context("invalid shared key options")
}

/// Accept connections until `shutdown` resolves, then drain the open ones.
async fn serve(
    listener: TcpListener,
    service: GatewayService<EchoHandler>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let graceful = GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());
    tokio::pin!(shutdown);

    loop {
        let (stream, peer_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            },
            () = &mut shutdown => break,
        };

        let conn = http
            .serve_connection(TokioIo::new(stream), service.clone())
            .into_owned();
        let conn = graceful.watch(conn);
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(%peer_addr, error = %e, "connection ended with error");
            }
        });
    }

    info!("draining open connections");
    graceful.shutdown().await;
    info!("server stopped");
    Ok(())
}

/// Resolve on Ctrl-C. If the signal cannot be installed, never resolve.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => {
            error!(error = %e, "cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

/// Ask the server at `addr` for its health endpoint and expect a 200 `running` answer.
async fn check_health(addr: &str) -> Result<()> {
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;
    let request = format!("GET /_health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    let response = String::from_utf8_lossy(&raw);

    let status = response
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1));
    anyhow::ensure!(
        status == Some("200") && response.contains("\"running\""),
        "unhealthy response from {addr}: status {}",
        status.unwrap_or("missing")
    );
    Ok(())
}

/// Parse a boolean flag, accepting `1`, `true` and `yes` in any case.
fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    raw.map_or(default, |v| {
        matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env();

    // Exit status for container health checks.
    if std::env::args().any(|a| a == "--health-check") {
        let healthy = check_health(&config.probe_addr()).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    let resolver = build_key_resolver(&config.keys)?;
    let key_count = resolver.len();
    let auth = build_auth_handler(SharedKeyOptions::from_env(), resolver)?;
    let http_config = config.http_config();

    info!(
        scheme = %auth.options().header_value_prefix,
        date_headers = ?auth.options().date_header_names,
        path_prefix = ?auth.options().path_prefix,
        include_error_details = auth.options().include_error_details,
        require_authentication = http_config.require_authentication,
        forbidden_prefix = ?config.forbidden_prefix,
        keys = key_count,
        "initializing shared key service",
    );

    let service = SharedKeyHttpService::new(
        Arc::new(config.echo_handler()),
        Arc::new(auth),
        http_config,
    );

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, version = VERSION, "starting SharedKey Server");

    serve(listener, GatewayService::new(service), shutdown_signal()).await
}
