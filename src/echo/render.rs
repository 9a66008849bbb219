//! Response synthesis: fills in defaults and builds the diagnostic body.

use std::fmt::{self, Write};

use super::options::ResponseOption;
use crate::http::{Headers, Request, Response, StatusCode};

const SEPARATOR: &str = "====================";
const DEFAULT_CONTENT_TYPE: &str = "text/plain";
const DEFAULT_CACHE_CONTROL: &str = "no-cache";
const HTML_CONTENT_TYPE: &str = "text/html";

/// Completes `option` into the response that will actually be sent.
///
/// - the reason phrase falls back to the status table (none for unknown codes);
/// - `Content-Type` falls back to `text/plain`, `Cache-Control` to `no-cache`;
/// - a missing or empty body becomes the diagnostic transcript, wrapped in a
///   small HTML page when `Content-Type` is exactly `text/html`;
/// - `Content-Length` is always recomputed from the final body.
///
/// The returned option has `reason_phrase` set whenever one is known and
/// `body` always set.
pub fn synthesize(option: ResponseOption, request: &Request) -> ResponseOption {
    let ResponseOption {
        status,
        reason_phrase,
        mut headers,
        body,
        condition,
    } = option;

    let reason_phrase = reason_phrase
        .filter(|r| !r.is_empty())
        .or_else(|| status.canonical_reason().map(str::to_owned));

    if !headers.contains("content-type") {
        headers.set("Content-Type", DEFAULT_CONTENT_TYPE);
    }
    if !headers.contains("cache-control") {
        headers.set("Cache-Control", DEFAULT_CACHE_CONTROL);
    }

    let body = match body.filter(|b| !b.is_empty()) {
        Some(body) => body,
        None => {
            let transcript = diagnostic_body(request, status, reason_phrase.as_deref(), &headers);
            if headers.get("content-type") == Some(HTML_CONTENT_TYPE) {
                wrap_html(status, &transcript)
            } else {
                transcript
            }
        }
    };

    headers.set("Content-Length", body.len().to_string());

    ResponseOption {
        status,
        reason_phrase,
        headers,
        body: Some(body),
        condition,
    }
}

impl ResponseOption {
    /// Converts a synthesized option into a wire response.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(self.status).headers(self.headers);
        if let Some(reason) = self.reason_phrase {
            response = response.reason(reason);
        }
        if let Some(body) = self.body {
            response = response.body(body);
        }
        response
    }
}

/// Renders the request/response transcript used as the default body.
fn diagnostic_body(
    request: &Request,
    status: StatusCode,
    reason_phrase: Option<&str>,
    headers: &Headers,
) -> String {
    let mut body = String::with_capacity(256);
    // A `String` writer only errors when a `Display` impl does.
    if write_transcript(&mut body, request, status, reason_phrase, headers).is_err() {
        body.clear();
    }
    body
}

fn write_transcript(
    out: &mut impl Write,
    request: &Request,
    status: StatusCode,
    reason_phrase: Option<&str>,
    headers: &Headers,
) -> fmt::Result {
    write!(out, "{SEPARATOR}\r\nREQUEST\r\n\r\n")?;
    write!(out, "{} {}\r\n", request.method(), request.target())?;
    for (name, value) in request.headers().iter() {
        write!(out, "{}: {value}\r\n", name.to_ascii_lowercase())?;
    }

    write!(out, "\r\n\r\n{SEPARATOR}\r\nRESPONSE\r\n\r\n")?;
    write!(out, "{}", status.as_u16())?;
    if let Some(reason) = reason_phrase {
        write!(out, " {reason}")?;
    }
    write!(out, "\r\n{headers}")
}

fn wrap_html(status: StatusCode, body: &str) -> String {
    format!(
        "<html><head><title>HTTP Response {}</title></head><body><pre>{body}</pre></body></html>",
        status.as_u16()
    )
}
