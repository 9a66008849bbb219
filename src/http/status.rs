//! HTTP status codes and the standard reason-phrase table.

use std::fmt;

use thiserror::Error;

/// Returned when a number falls outside the three-digit `100..=599` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid HTTP status code: {0}")]
pub struct InvalidStatusCode(pub i64);

/// An HTTP response status code in the range `100..=599`.
///
/// Unlike a closed enum, any code in range is representable so callers can
/// ask for unusual statuses such as `599` or `218`. Only well-known codes
/// carry a [`canonical_reason`](Self::canonical_reason).
///
/// # Examples
///
/// ```
/// use http_echo::http::StatusCode;
///
/// let status = StatusCode::OK;
/// assert_eq!(status.as_u16(), 200);
/// assert_eq!(status.canonical_reason(), Some("OK"));
///
/// let odd = StatusCode::from_i64(599).unwrap();
/// assert_eq!(odd.canonical_reason(), None);
/// assert!(StatusCode::from_i64(600).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const CONTINUE: Self = Self(100);
    pub const OK: Self = Self(200);
    pub const CREATED: Self = Self(201);
    pub const NO_CONTENT: Self = Self(204);
    pub const NOT_MODIFIED: Self = Self(304);
    pub const BAD_REQUEST: Self = Self(400);
    pub const NOT_FOUND: Self = Self(404);
    pub const LENGTH_REQUIRED: Self = Self(411);
    pub const PAYLOAD_TOO_LARGE: Self = Self(413);
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);

    /// Smallest valid status code.
    pub const MIN: u16 = 100;
    /// Largest valid status code.
    pub const MAX: u16 = 599;

    /// Builds a status code, rejecting anything outside `100..=599`.
    pub fn from_i64(code: i64) -> Result<Self, InvalidStatusCode> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&code) {
            Ok(Self(code as u16))
        } else {
            Err(InvalidStatusCode(code))
        }
    }

    /// Returns the numeric status code as a `u16`.
    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns `false` for statuses whose responses never carry a body
    /// (1xx, `204 No Content`, `304 Not Modified`).
    pub fn allows_body(self) -> bool {
        !(self.0 < 200 || self == Self::NO_CONTENT || self == Self::NOT_MODIFIED)
    }

    /// Returns the standard reason phrase, or `None` for codes outside the table.
    pub fn canonical_reason(self) -> Option<&'static str> {
        let reason = match self.0 {
            100 => "Continue",
            101 => "Switching Protocols",
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            203 => "Non-Authoritative Information",
            204 => "No Content",
            205 => "Reset Content",
            206 => "Partial Content",
            300 => "Multiple Choices",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            305 => "Use Proxy",
            307 => "Temporary Redirect",
            400 => "Bad Request",
            401 => "Unauthorized",
            402 => "Payment Required",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            406 => "Not Acceptable",
            407 => "Proxy Authentication Required",
            408 => "Request Timeout",
            409 => "Conflict",
            410 => "Gone",
            411 => "Length Required",
            412 => "Precondition Failed",
            413 => "Request Entity Too Large",
            414 => "Request-URI Too Long",
            415 => "Unsupported Media Type",
            416 => "Requested Range Not Satisfiable",
            417 => "Expectation Failed",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            505 => "HTTP Version Not Supported",
            _ => return None,
        };
        Some(reason)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical_reason() {
            Some(reason) => write!(f, "{} {}", self.0, reason),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> u16 {
        code.as_u16()
    }
}
