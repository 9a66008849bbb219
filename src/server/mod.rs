//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and dispatches HTTP/1.1 requests to a handler function.
//! Supports HTTP/1.1 persistent connections (keep-alive) out of the box. Each
//! connection owns its read buffer, so a body is only ever assembled for the
//! request it belongs to.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::http::{
    Method, StatusCode,
    request::{Request, RequestError},
    response::Response,
};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Largest request body we will buffer before answering `413`.
pub const MAX_BODY_SIZE: usize = 1_000_000;

/// Room allowed for the request line and headers on top of the body.
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// The HTTP server.
///
/// Binds to a TCP address and dispatches incoming HTTP/1.1 requests to a
/// handler function.
///
/// # Examples
///
/// ```rust,no_run
/// use http_echo::server::Server;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::bind("127.0.0.1:8124").await?;
///     server.run(http_echo::echo::handle).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts accepting connections and dispatching requests to `handler`.
    ///
    /// Runs until the process is terminated. See [`run_until`](Self::run_until)
    /// for a version that stops on a signal.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the TCP listener itself fails.
    pub async fn run<H, F>(self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        self.run_until(handler, std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// The handler receives a [`Request`] and must return a [`Future`] that
    /// resolves to a [`Response`]. The handler is wrapped in an [`Arc`] and
    /// shared across all spawned Tokio tasks, so it must be `Send + Sync + 'static`.
    /// Connections already in flight are left to finish on their own tasks.
    pub async fn run_until<H, F, S>(self, handler: H, shutdown: S) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
        S: Future<Output = ()>,
    {
        let handler = Arc::new(handler);
        info!(address = %self.local_addr, "listening");

        tokio::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer_addr) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, handler).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Handles a single TCP connection over its lifetime.
///
/// HTTP/1.1 connections are persistent by default: we loop, reading one
/// request per iteration, until the peer closes the connection or signals
/// `Connection: close`.
async fn handle_connection<H, F>(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<H>,
) -> Result<(), std::io::Error>
where
    H: Fn(Request) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        if buf.is_empty() && !read_more(&mut stream, &mut buf, peer_addr).await? {
            break;
        }

        if buf.len() > MAX_HEAD_SIZE + MAX_BODY_SIZE {
            warn!(peer = %peer_addr, "request too large, sending 413");
            reject(&mut stream, StatusCode::PAYLOAD_TOO_LARGE).await?;
            break;
        }

        // Attempt to parse the buffered data as an HTTP request.
        let (request, body_offset) = match Request::parse(&buf) {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) => {
                if buf.len() > MAX_HEAD_SIZE {
                    warn!(peer = %peer_addr, "request head too large, sending 413");
                    reject(&mut stream, StatusCode::PAYLOAD_TOO_LARGE).await?;
                    break;
                }
                if !read_more(&mut stream, &mut buf, peer_addr).await? {
                    break;
                }
                continue;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                reject(&mut stream, StatusCode::BAD_REQUEST).await?;
                break;
            }
        };

        if request.has_transfer_encoding() {
            warn!(peer = %peer_addr, "Transfer-Encoding bodies are not supported, sending 411");
            reject(&mut stream, StatusCode::LENGTH_REQUIRED).await?;
            break;
        }

        let content_length = request.content_length().unwrap_or(0);
        if content_length > MAX_BODY_SIZE {
            warn!(
                peer = %peer_addr,
                content_length,
                limit = MAX_BODY_SIZE,
                "request body too large, sending 413"
            );
            reject(&mut stream, StatusCode::PAYLOAD_TOO_LARGE).await?;
            break;
        }

        // Wait for the full body to arrive.
        let total_needed = body_offset + content_length;
        if buf.len() < total_needed {
            if !read_more(&mut stream, &mut buf, peer_addr).await? {
                break;
            }
            continue;
        }

        let keep_alive = request.is_keep_alive();
        let is_head = request.method() == &Method::Head;

        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "dispatching request"
        );

        let response = handler(request)
            .await
            .keep_alive(keep_alive)
            .omit_body(is_head);
        stream.write_all(&response.into_bytes()).await?;
        stream.flush().await?;

        // Drop the consumed request bytes from the buffer.
        let _ = buf.split_to(total_needed);

        if !keep_alive {
            debug!(peer = %peer_addr, "Connection: close, shutting down");
            break;
        }
    }

    Ok(())
}

/// Reads whatever the peer has sent next. Returns `false` once the peer has
/// closed its side of the connection.
async fn read_more(
    stream: &mut TcpStream,
    buf: &mut BytesMut,
    peer_addr: SocketAddr,
) -> Result<bool, std::io::Error> {
    let bytes_read = stream.read_buf(buf).await?;
    if bytes_read == 0 {
        debug!(peer = %peer_addr, "connection closed by peer");
        return Ok(false);
    }
    Ok(true)
}

/// Writes a bare error response that closes the connection.
async fn reject(stream: &mut TcpStream, status: StatusCode) -> Result<(), std::io::Error> {
    let response = Response::new(status)
        .body(status.canonical_reason().unwrap_or_default())
        .keep_alive(false);
    stream.write_all(&response.into_bytes()).await?;
    stream.flush().await
}
