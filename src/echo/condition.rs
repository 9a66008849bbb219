//! Declarative request conditions.
//!
//! A condition is a set of `header name -> expected value` pairs. It holds when
//! every named request header is present with exactly the expected value.
//! Nothing supplied by a caller is ever evaluated as code.

use std::collections::BTreeMap;

use serde_json::Value;

use super::options::OptionsError;
use crate::http::Headers;

/// A compiled header-equality condition. The empty condition always matches.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use http_echo::echo::Condition;
/// use http_echo::http::Headers;
///
/// let mut spec = BTreeMap::new();
/// spec.insert("X-Mode".to_owned(), "beta".into());
/// let condition = Condition::compile(spec).unwrap();
///
/// let mut headers = Headers::new();
/// headers.insert("x-mode", "beta");
/// assert!(condition.matches(&headers));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condition {
    expected: Vec<(String, String)>,
}

impl Condition {
    /// Builds a condition from a caller-supplied mapping.
    ///
    /// Header names are lower-cased. Every value must be a JSON string.
    pub fn compile(spec: BTreeMap<String, Value>) -> Result<Self, OptionsError> {
        let expected = spec
            .into_iter()
            .map(|(name, value)| match value {
                Value::String(value) => Ok((name.to_ascii_lowercase(), value)),
                _ => Err(OptionsError::InvalidCondition),
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { expected })
    }

    /// Returns `true` if every expected header equals the request's value.
    pub fn matches(&self, headers: &Headers) -> bool {
        self.expected
            .iter()
            .all(|(name, value)| headers.get(name) == Some(value.as_str()))
    }

    /// Returns `true` when no header is required, so every request matches.
    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }
}
