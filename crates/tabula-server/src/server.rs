//! HTTP server.
//!
//! A hyper http1 accept loop over the assembled [`App`]. `/health` is
//! answered outside the pipeline; everything else is collected into a
//! buffered request and processed through the pipeline with the page
//! dispatcher as the terminal handler. Shutdown stops accepting, then
//! waits for in-flight connections up to the configured drain timeout.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use tabula_config::Settings;
use tabula_middleware::{MiddlewareContext, Response, ResponseExt};

use crate::app::App;
use crate::health::HealthCheck;
use crate::shutdown::ShutdownSignal;

/// Server hosting configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the listener to.
    pub http_addr: String,
    /// How long to wait for in-flight connections on shutdown.
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Derives the server configuration from bootstrap settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            http_addr: settings.server.http_addr.clone(),
            shutdown_timeout: Duration::from_secs(settings.server.shutdown_timeout_secs),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// The Tabularium HTTP server.
pub struct Server {
    config: ServerConfig,
    app: Arc<App>,
    health: HealthCheck,
    shutdown: ShutdownSignal,
}

impl Server {
    /// Creates a server over an assembled application.
    #[must_use]
    pub fn new(config: ServerConfig, app: Arc<App>) -> Self {
        Self {
            config,
            app,
            health: HealthCheck::new("tabula-server", env!("CARGO_PKG_VERSION")),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// The server's shutdown signal; trigger it to stop `run`.
    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.config.http_addr).await?;
        info!(addr = %self.config.http_addr, "server listening");
        self.serve(listener).await
    }

    /// Serves connections from an already bound listener until shutdown.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let in_flight = Arc::new(AtomicUsize::new(0));

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => break,
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(err) => {
                            warn!(error = %err, "failed to accept connection");
                            continue;
                        }
                    };
                    debug!(peer = %peer, "connection accepted");

                    let app = self.app.clone();
                    let health = self.health.clone();
                    let in_flight = in_flight.clone();

                    tokio::spawn(async move {
                        in_flight.fetch_add(1, Ordering::SeqCst);
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |request| {
                            let app = app.clone();
                            let health = health.clone();
                            async move {
                                Ok::<_, Infallible>(handle_request(app, health, request).await)
                            }
                        });
                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            debug!(error = %err, "connection error");
                        }
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    });
                }
            }
        }

        self.drain(&in_flight).await;
        Ok(())
    }

    /// Waits for in-flight connections, up to the drain timeout.
    async fn drain(&self, in_flight: &AtomicUsize) {
        let deadline = Instant::now() + self.config.shutdown_timeout;
        while in_flight.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let remaining = in_flight.load(Ordering::SeqCst);
        if remaining > 0 {
            warn!(remaining, "drain timeout reached with connections open");
        } else {
            info!("server drained");
        }
    }
}

/// Handles one request: health probes directly, everything else through
/// the pipeline.
async fn handle_request(
    app: Arc<App>,
    health: HealthCheck,
    request: http::Request<Incoming>,
) -> Response {
    if request.uri().path() == "/health" && request.method() == http::Method::GET {
        let body = serde_json::to_string(&health.status())
            .unwrap_or_else(|_| "{\"status\":\"healthy\"}".to_string());
        return http::Response::builder()
            .status(http::StatusCode::OK)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .expect("failed to build health response");
    }

    let (parts, body) = request.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            debug!(error = %err, "failed to read request body");
            return Response::error(http::StatusCode::BAD_REQUEST, "failed to read request body");
        }
    };
    let request = http::Request::from_parts(parts, Full::new(bytes));

    let dispatcher = app.dispatcher.clone();
    app.pipeline
        .process(MiddlewareContext::new(), request, move |ctx, req| {
            dispatcher.handle(ctx, req)
        })
        .await
}
