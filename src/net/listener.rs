//! HTTP API listener.
//!
//! # Responsibilities
//! - Bind the configured Unix socket or TCP address at construction
//! - Serve the HTTP API until asked to stop
//! - Report a serve failure through the crash channel
//! - Remove the Unix socket file once stopped

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::lifecycle::component::{crash_channel, BackendClient, CrashChannel, Listener, Transport};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Address could not be interpreted for the transport.
    #[error("invalid {transport} address {addr:?}")]
    InvalidAddress { transport: Transport, addr: String },

    /// Failed to bind to address.
    #[error("failed to bind: {0}")]
    Bind(#[source] io::Error),

    /// The server terminated abnormally.
    #[error("server failed: {0}")]
    Serve(#[source] io::Error),

    /// Transport not available on this platform.
    #[error("{0} sockets are not supported on this platform")]
    Unsupported(Transport),
}

/// A socket bound at construction, waiting to be served.
enum BoundSocket {
    Tcp(std::net::TcpListener),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixListener),
}

#[derive(Clone)]
struct ApiState {
    transport: Transport,
    addr: String,
    backend: Arc<dyn BackendClient>,
}

/// HTTP API server bound to one address.
pub struct HttpApiListener {
    transport: Transport,
    addr: String,
    socket: Option<BoundSocket>,
    backend: Arc<dyn BackendClient>,
    stop_tx: watch::Sender<bool>,
}

impl HttpApiListener {
    /// Bind `addr` for `transport`.
    ///
    /// A stale Unix socket file at `addr` is removed first.
    pub fn bind(
        transport: Transport,
        addr: &str,
        backend: Arc<dyn BackendClient>,
    ) -> Result<Self, ListenerError> {
        let socket = match transport {
            Transport::Tcp => BoundSocket::Tcp(bind_tcp(addr)?),
            Transport::Unix => bind_unix(addr)?,
        };

        tracing::info!(transport = %transport, address = %addr, "Listener bound");

        let (stop_tx, _) = watch::channel(false);
        Ok(Self {
            transport,
            addr: addr.to_string(),
            socket: Some(socket),
            backend,
            stop_tx,
        })
    }

    /// Local address of a TCP listener that has not started yet.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.socket {
            Some(BoundSocket::Tcp(listener)) => listener.local_addr().ok(),
            _ => None,
        }
    }

    fn router(&self) -> Router {
        let state = ApiState {
            transport: self.transport,
            addr: self.addr.clone(),
            backend: Arc::clone(&self.backend),
        };
        Router::new()
            .route("/_ping", get(ping))
            .route("/_status", get(status))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }
}

impl Listener for HttpApiListener {
    fn transport(&self) -> Transport {
        self.transport
    }

    fn addr(&self) -> &str {
        &self.addr
    }

    fn start(&mut self) -> CrashChannel {
        let (crash_tx, crash_rx) = crash_channel();
        let Some(socket) = self.socket.take() else {
            tracing::warn!(address = %self.addr, "Listener already started");
            return crash_rx;
        };

        let router = self.router();
        let mut stop_rx = self.stop_tx.subscribe();
        let shutdown = async move {
            let _ = stop_rx.wait_for(|stop| *stop).await;
        };
        let transport = self.transport;
        let addr = self.addr.clone();

        tokio::spawn(async move {
            let result = match socket {
                BoundSocket::Tcp(std_listener) => {
                    match tokio::net::TcpListener::from_std(std_listener) {
                        Ok(listener) => {
                            axum::serve(listener, router)
                                .with_graceful_shutdown(shutdown)
                                .await
                        }
                        Err(e) => Err(e),
                    }
                }
                #[cfg(unix)]
                BoundSocket::Unix(std_listener) => {
                    let result = match tokio::net::UnixListener::from_std(std_listener) {
                        Ok(listener) => {
                            axum::serve(listener, router)
                                .with_graceful_shutdown(shutdown)
                                .await
                        }
                        Err(e) => Err(e),
                    };
                    remove_socket_file(&addr);
                    result
                }
            };

            match result {
                Ok(()) => {
                    tracing::debug!(transport = %transport, address = %addr, "HTTP API server stopped");
                }
                Err(e) => {
                    let _ = crash_tx.send(ListenerError::Serve(e)).await;
                }
            }
            // crash_tx dropped here: the channel closes.
        });

        crash_rx
    }

    fn stop(&self) {
        self.stop_tx.send_replace(true);
    }
}

impl Drop for HttpApiListener {
    fn drop(&mut self) {
        // Bound but never started: the socket file is ours to clean up.
        #[cfg(unix)]
        if let Some(BoundSocket::Unix(_)) = self.socket.take() {
            remove_socket_file(&self.addr);
        }
    }
}

fn bind_tcp(addr: &str) -> Result<std::net::TcpListener, ListenerError> {
    let socket_addr: SocketAddr = addr.parse().map_err(|_| ListenerError::InvalidAddress {
        transport: Transport::Tcp,
        addr: addr.to_string(),
    })?;
    let listener = std::net::TcpListener::bind(socket_addr).map_err(ListenerError::Bind)?;
    listener.set_nonblocking(true).map_err(ListenerError::Bind)?;
    Ok(listener)
}

#[cfg(unix)]
fn bind_unix(addr: &str) -> Result<BoundSocket, ListenerError> {
    if addr.is_empty() {
        return Err(ListenerError::InvalidAddress {
            transport: Transport::Unix,
            addr: addr.to_string(),
        });
    }
    clear_stale_socket(addr)?;
    let listener = std::os::unix::net::UnixListener::bind(addr).map_err(ListenerError::Bind)?;
    listener.set_nonblocking(true).map_err(ListenerError::Bind)?;
    Ok(BoundSocket::Unix(listener))
}

#[cfg(not(unix))]
fn bind_unix(_addr: &str) -> Result<BoundSocket, ListenerError> {
    Err(ListenerError::Unsupported(Transport::Unix))
}

/// Remove a socket file left behind by an earlier run. Anything else at the
/// path is left alone and fails the bind.
#[cfg(unix)]
fn clear_stale_socket(addr: &str) -> Result<(), ListenerError> {
    use std::os::unix::fs::FileTypeExt;

    match std::fs::symlink_metadata(addr) {
        Ok(meta) if meta.file_type().is_socket() => {
            remove_socket_file(addr);
            Ok(())
        }
        Ok(_) => Err(ListenerError::Bind(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{addr} exists and is not a socket"),
        ))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ListenerError::Bind(e)),
    }
}

#[cfg(unix)]
fn remove_socket_file(addr: &str) {
    let path = std::path::Path::new(addr);
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = ?path, "Removed socket file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = ?path, error = %e, "Failed to remove socket file"),
    }
}

async fn ping() -> &'static str {
    "pong"
}

async fn status(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "transport": state.transport.as_str(),
        "address": state.addr,
        "backend": state.backend.name(),
    }))
}
