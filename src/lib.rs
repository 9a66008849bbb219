//! # http-echo
//!
//! A configurable HTTP/1.1 echo server for exercising HTTP clients against
//! controllable status codes, headers, reason phrases, and bodies.
//!
//! The response is described by the request itself:
//!
//! - the path picks the status (`/404`);
//! - dotted query parameters set fields (`?headers.X-Foo=bar&reasonPhrase=Nope`);
//! - a `json` parameter carries a whole option object, or an array of
//!   candidates with header conditions (first match wins).
//!
//! Without a `body`, the response body is a transcript of the request and of
//! the response being sent.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use http_echo::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind("127.0.0.1:8124").await?;
//!     server.run(http_echo::echo::handle).await?;
//!     Ok(())
//! }
//! ```

// ── Transport and wire types ──────────────────────────────────────────────────
pub mod http;
pub mod server;

// ── Echo behavior and runtime configuration ───────────────────────────────────
pub mod config;
pub mod echo;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use config::Config;
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use server::{Server, ServerError};
