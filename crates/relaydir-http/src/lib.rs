// # HTTP Directory Service
//
// This crate exposes the relay registry core over HTTP.
//
// ## Responsibilities
//
// This is a translation layer ONLY: requests become core operations, core
// errors become status codes. All registry semantics (validation, admission,
// freshness, eviction) live in relaydir-core.
//
// ## Routes
//
// | Method & path       | Core call                       | Success |
// |---------------------|---------------------------------|---------|
// | GET `/`             | —                               | 200 greeting |
// | GET `/relays`       | `RelayStore::list`              | 200 `{relays, count}` |
// | POST `/register`    | `RelayStore::register`          | 201 `{success: true}` |
// | POST `/heartbeat`   | `RelayStore::heartbeat`         | 200 `{success, relay_id, last_seen}` |
// | DELETE `/relay/:id` | `RelayStore::remove`            | 200 `{success, relay_id}` |
// | GET `/health`       | `RelayStore::health_summary`    | 200 summary |
//
// Validation and lookup failures map 1:1 to 400/404 responses with a
// `{success: false, error}` body; nothing escapes as a 500. Snapshot
// persistence failures never reach a response at all — the core logs and
// swallows them after the in-memory mutation has committed.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use relaydir_core::traits::Clock;
use relaydir_core::{Error, RelayStore, Result};

/// Shared state handed to every request handler
pub struct DirectoryContext {
    /// The registry core
    pub store: Arc<RelayStore>,

    /// Time source for health summaries
    pub clock: Arc<dyn Clock>,

    /// Staleness threshold reported by `/health`
    pub relay_timeout: Duration,

    /// Process start, for the uptime counter
    started_at: Instant,
}

impl DirectoryContext {
    /// Create a new context over the shared store
    pub fn new(store: Arc<RelayStore>, clock: Arc<dyn Clock>, relay_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            relay_timeout,
            started_at: Instant::now(),
        }
    }

    fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// HTTP server for the directory service
///
/// Bind first, then serve; binding separately lets callers (and tests) bind
/// port 0 and read the assigned address back via [`local_addr`](Self::local_addr).
pub struct DirectoryServer {
    listener: TcpListener,
    ctx: Arc<DirectoryContext>,
}

impl DirectoryServer {
    /// Bind the listener
    pub async fn bind(addr: SocketAddr, ctx: Arc<DirectoryContext>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, ctx })
    }

    /// The bound local address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the shutdown signal fires
    ///
    /// Each connection is served http1 on its own task; in-flight requests
    /// on open connections are not awaited at shutdown.
    pub async fn serve(self, mut shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        info!("directory server listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, remote) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("accept failed: {}", e);
                            continue;
                        }
                    };

                    let io = TokioIo::new(stream);
                    let ctx = self.ctx.clone();
                    tokio::spawn(async move {
                        let service =
                            service_fn(move |req| handle_request(req, ctx.clone()));
                        if let Err(e) = hyper::server::conn::http1::Builder::new()
                            .serve_connection(io, service)
                            .await
                        {
                            debug!("connection from {} ended with error: {}", remote, e);
                        }
                    });
                }

                _ = &mut shutdown_rx => {
                    info!("shutdown signal received, closing listener");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn handle_request(
    req: Request<Incoming>,
    ctx: Arc<DirectoryContext>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!(%method, %path, "request");

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/") => text_response(StatusCode::OK, "relay directory server is alive"),
        (&Method::GET, "/relays") => list_relays(&ctx).await,
        (&Method::POST, "/register") => register(req, &ctx).await,
        (&Method::POST, "/heartbeat") => heartbeat(req, &ctx).await,
        (&Method::DELETE, p) if p.starts_with("/relay/") => {
            remove_relay(p.trim_start_matches("/relay/"), &ctx).await
        }
        (&Method::GET, "/health") => health(&ctx).await,
        _ => error_response(StatusCode::NOT_FOUND, "not found"),
    };

    Ok(response)
}

async fn list_relays(ctx: &DirectoryContext) -> Response<Full<Bytes>> {
    let relays = ctx.store.list().await;
    json_response(
        StatusCode::OK,
        &json!({
            "relays": relays,
            "count": relays.len(),
        }),
    )
}

/// Register request body
///
/// `port` stays raw JSON here: the wire accepts an integer or a numeric
/// string, and [`coerce_port`] turns both into the canonical integer before
/// the core sees the value.
#[derive(Debug, Deserialize)]
struct RegisterBody {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    port: Option<serde_json::Value>,
    #[serde(default)]
    public_key: Option<String>,
}

async fn register(req: Request<Incoming>, ctx: &DirectoryContext) -> Response<Full<Bytes>> {
    let body: RegisterBody = match read_json(req).await {
        Ok(body) => body,
        Err(response) => return response,
    };

    let port = match coerce_port(body.port) {
        Ok(port) => port,
        Err(e) => return core_error_response(&e),
    };

    let result = ctx
        .store
        .register(
            body.id.as_deref().unwrap_or(""),
            body.address.as_deref().unwrap_or(""),
            port,
            body.public_key.as_deref().unwrap_or(""),
        )
        .await;

    match result {
        Ok(()) => json_response(
            StatusCode::CREATED,
            &json!({
                "success": true,
                "message": "relay registered successfully",
            }),
        ),
        Err(e) => core_error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct HeartbeatBody {
    #[serde(default)]
    id: Option<String>,
}

async fn heartbeat(req: Request<Incoming>, ctx: &DirectoryContext) -> Response<Full<Bytes>> {
    let body: HeartbeatBody = match read_json(req).await {
        Ok(body) => body,
        Err(response) => return response,
    };
    let id = body.id.unwrap_or_default();

    match ctx.store.heartbeat(&id).await {
        Ok(last_seen) => json_response(
            StatusCode::OK,
            &json!({
                "success": true,
                "message": "heartbeat received",
                "relay_id": id,
                "last_seen": last_seen,
            }),
        ),
        Err(e) => core_error_response(&e),
    }
}

async fn remove_relay(id: &str, ctx: &DirectoryContext) -> Response<Full<Bytes>> {
    match ctx.store.remove(id).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &json!({
                "success": true,
                "message": "relay removed successfully",
                "relay_id": id,
            }),
        ),
        Err(e) => core_error_response(&e),
    }
}

async fn health(ctx: &DirectoryContext) -> Response<Full<Bytes>> {
    let now_ms = ctx.clock.now_ms();
    let summary = ctx.store.health_summary(now_ms, ctx.relay_timeout).await;

    json_response(
        StatusCode::OK,
        &json!({
            "status": "ok",
            "relayCount": summary.total,
            "activeRelays": summary.active,
            "inactiveRelays": summary.inactive,
            "uptime_seconds": ctx.uptime_seconds(),
        }),
    )
}

/// Coerce the wire representation of a port to the canonical integer
///
/// `8080` and `"8080"` are treated identically; fractional numbers and
/// non-numeric strings are invalid, an absent value is a missing field.
/// Range checking stays with the core validator.
fn coerce_port(value: Option<serde_json::Value>) -> std::result::Result<i64, Error> {
    let value = value.ok_or_else(|| Error::missing_field("port"))?;

    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| Error::invalid_port(n.to_string())),
        serde_json::Value::String(s) => match s.trim().parse::<i64>() {
            Ok(port) => Ok(port),
            Err(_) => Err(Error::invalid_port(s)),
        },
        other => Err(Error::invalid_port(other.to_string())),
    }
}

/// Read and deserialize a JSON request body, or produce the 400 response
async fn read_json<T: serde::de::DeserializeOwned>(
    req: Request<Incoming>,
) -> std::result::Result<T, Response<Full<Bytes>>> {
    let bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read request body: {}", e);
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "failed to read request body",
            ));
        }
    };

    serde_json::from_slice(&bytes).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("invalid JSON body: {}", e),
        )
    })
}

/// Map a core error to its HTTP status
fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::MissingField(_)
        | Error::InvalidAddress(_)
        | Error::InvalidPort(_)
        | Error::DuplicateId(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        // Remaining kinds never cross the core boundary on request paths
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn core_error_response(err: &Error) -> Response<Full<Bytes>> {
    error_response(status_for(err), &err.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &json!({
            "success": false,
            "error": message,
        }),
    )
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn text_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}
