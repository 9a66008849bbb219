//! The echo core: request → candidate options → selected option → response.
//!
//! Each request is handled on its own with no shared state:
//!
//! ```text
//! Parsing ──▶ Matching ──▶ Synthesizing ──▶ Sent
//!    │
//!    └──▶ Failed ──▶ Sent (fixed 500)
//! ```
//!
//! Validation failures are logged with their cause and answered with a bare
//! `500 Internal Server Error`; nothing taken from the request is reflected
//! into the error response.

use tracing::{debug, info, warn};

pub mod condition;
pub mod options;
pub mod parser;
pub mod render;

pub use condition::Condition;
pub use options::{CandidateList, OptionsError, ResponseOption};
pub use parser::parse_options;
pub use render::synthesize;

use crate::http::{Request, Response, StatusCode};

/// Body of the response sent when a request cannot be turned into options.
pub const ERROR_BODY: &str = "Internal Server Error";

/// Produces the echo response for `request`.
///
/// Never fails: any [`OptionsError`] becomes the fixed `500` response.
///
/// # Examples
///
/// ```
/// use http_echo::echo;
/// use http_echo::http::Request;
///
/// let (request, _) = Request::parse(b"GET /201?reasonPhrase=Yay HTTP/1.1\r\n\r\n").unwrap();
/// let response = echo::respond(&request);
/// assert_eq!(response.status().as_u16(), 201);
/// assert_eq!(response.reason_phrase(), "Yay");
///
/// let (bad, _) = Request::parse(b"GET /600 HTTP/1.1\r\n\r\n").unwrap();
/// let response = echo::respond(&bad);
/// assert_eq!(response.status().as_u16(), 500);
/// assert_eq!(response.body_bytes(), b"Internal Server Error");
/// ```
pub fn respond(request: &Request) -> Response {
    let candidates = match parse_options(request) {
        Ok(candidates) => candidates,
        Err(error) => return failed(request, &error),
    };
    debug!(candidates = candidates.len(), "options parsed");

    let selected = match candidates.select(request) {
        Some(option) => option.clone(),
        None => {
            debug!("no candidate matched, using default");
            ResponseOption::fallback()
        }
    };

    let finished = synthesize(selected, request);
    let body = finished.body.as_deref().unwrap_or_default();
    info!(
        method = %request.method(),
        target = %request.target(),
        status = finished.status.as_u16(),
        "{body}"
    );

    finished.into_response()
}

/// Async adapter so [`respond`] can be handed straight to the server.
pub async fn handle(request: Request) -> Response {
    respond(&request)
}

fn failed(request: &Request, error: &OptionsError) -> Response {
    warn!(
        method = %request.method(),
        target = %request.target(),
        error = %error,
        "error processing request"
    );
    internal_error()
}

/// The fixed response for requests that could not be processed.
pub fn internal_error() -> Response {
    Response::new(StatusCode::INTERNAL_SERVER_ERROR)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(ERROR_BODY)
}
