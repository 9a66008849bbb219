//! Response option records and the errors raised while building them.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::condition::Condition;
use crate::http::status::InvalidStatusCode;
use crate::http::{Headers, Request, StatusCode};

/// Longest reason phrase a caller may request, in characters.
pub const MAX_REASON_PHRASE_LEN: usize = 100;

/// Everything that can go wrong while turning a request into candidate options.
///
/// Every variant is a validation failure. The dispatcher logs it and answers
/// with a fixed `500`; none of the detail reaches the client.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("json parameter is {len} characters, limit is {max}")]
    JsonTooLarge { len: usize, max: usize },

    #[error("json parameter is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("json parameter contains reserved key `{key}`")]
    ForbiddenKey { key: String },

    #[error("json parameter nesting exceeds {max} levels")]
    TooDeep { max: usize },

    #[error("json parameter must be an object or an array, got {kind}")]
    UnexpectedJsonRoot { kind: &'static str },

    #[error("invalid option record: {0}")]
    InvalidOption(#[source] serde_json::Error),

    #[error("unknown option key `{key}`")]
    UnknownRootKey { key: String },

    #[error("`{param}` must be addressed as `{root}.<name>`")]
    InvalidPath { param: String, root: &'static str },

    #[error("`{key}` cannot have nested fields")]
    NestedLeaf { key: &'static str },

    #[error("invalid header name `{name}`")]
    InvalidHeaderName { name: String },

    #[error("invalid value for header `{name}`")]
    InvalidHeaderValue { name: String },

    #[error("header `{name}` must be a string, number or boolean")]
    InvalidHeaderType { name: String },

    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatusCode),

    #[error("reason phrase is {len} characters, limit is {max}")]
    ReasonTooLong { len: usize, max: usize },

    #[error("reason phrase contains control characters")]
    InvalidReasonPhrase,

    #[error("condition must map header names to strings")]
    InvalidCondition,
}

/// One option record as written by a caller, before validation.
///
/// This is the shape of an element of a `json` array, of a `json` object, and
/// of the record assembled from dotted query parameters. Unknown keys are
/// ignored, and an explicit `null` counts as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOption {
    #[serde(default, deserialize_with = "lenient_status_code")]
    pub status_code: Option<i64>,
    #[serde(default)]
    pub reason_phrase: Option<String>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub condition: Option<BTreeMap<String, Value>>,
}

/// Accepts `statusCode` as a number or as a numeric string such as `"201"`.
/// An empty string reads as absent.
fn lenient_status_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Written {
        Number(i64),
        Text(String),
    }

    match Option::<Written>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Written::Number(code)) => Ok(Some(code)),
        Some(Written::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse().map(Some).map_err(|_| {
                de::Error::custom(format!("statusCode `{text}` is not an integer"))
            })
        }
    }
}

/// What the `json` query parameter turned out to hold.
#[derive(Debug)]
pub enum OptionsSource {
    /// Explicit multi-candidate authoring; query fields are not consulted.
    List(Vec<RawOption>),
    /// Base record that dotted query parameters are merged into.
    Single(RawOption),
}

/// A validated candidate response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseOption {
    /// Status code, already checked against `100..=599`.
    pub status: StatusCode,
    /// Caller-supplied reason phrase; `None` falls back to the status table.
    pub reason_phrase: Option<String>,
    /// Validated response headers.
    pub headers: Headers,
    /// Caller-supplied body; `None` or empty means the diagnostic transcript.
    pub body: Option<String>,
    /// Request headers that must match for this candidate to be chosen.
    pub condition: Condition,
}

impl ResponseOption {
    /// The option used when no candidate matches: a bare `200`.
    pub fn fallback() -> Self {
        Self {
            status: StatusCode::OK,
            reason_phrase: None,
            headers: Headers::new(),
            body: None,
            condition: Condition::default(),
        }
    }

    /// Validates a raw record and fixes its status code.
    pub(crate) fn from_raw(raw: RawOption, status: i64) -> Result<Self, OptionsError> {
        let status = StatusCode::from_i64(status)?;

        if let Some(reason) = &raw.reason_phrase {
            validate_reason_phrase(reason)?;
        }

        let raw_headers = raw.headers.unwrap_or_default();
        let mut headers = Headers::with_capacity(raw_headers.len());
        for (name, value) in raw_headers {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return Err(OptionsError::InvalidHeaderType { name }),
            };
            validate_header(&name, &value)?;
            headers.set(name, value);
        }

        let condition = Condition::compile(raw.condition.unwrap_or_default())?;

        Ok(Self {
            status,
            reason_phrase: raw.reason_phrase,
            headers,
            body: raw.body,
            condition,
        })
    }
}

/// An ordered list of candidates. The first whose condition holds wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateList(Vec<ResponseOption>);

impl CandidateList {
    /// Wraps candidates in priority order.
    pub fn new(options: Vec<ResponseOption>) -> Self {
        Self(options)
    }

    /// Returns the first candidate whose condition matches `request`.
    pub fn select(&self, request: &Request) -> Option<&ResponseOption> {
        self.0
            .iter()
            .find(|option| option.condition.matches(request.headers()))
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when there are no candidates, so every request gets the fallback.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the candidates in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &ResponseOption> {
        self.0.iter()
    }
}

pub(crate) fn validate_header(name: &str, value: &str) -> Result<(), OptionsError> {
    if !crate::http::headers::is_valid_name(name) {
        return Err(OptionsError::InvalidHeaderName {
            name: name.to_owned(),
        });
    }
    if !crate::http::headers::is_valid_value(value) {
        return Err(OptionsError::InvalidHeaderValue {
            name: name.to_owned(),
        });
    }
    Ok(())
}

fn validate_reason_phrase(reason: &str) -> Result<(), OptionsError> {
    let len = reason.chars().count();
    if len > MAX_REASON_PHRASE_LEN {
        return Err(OptionsError::ReasonTooLong {
            len,
            max: MAX_REASON_PHRASE_LEN,
        });
    }
    if reason.chars().any(char::is_control) {
        return Err(OptionsError::InvalidReasonPhrase);
    }
    Ok(())
}
