//! Turns an inbound request into an ordered list of candidate responses.
//!
//! The response shape comes from three places:
//!
//! | Source                    | Example                                   |
//! |---------------------------|-------------------------------------------|
//! | Path                      | `/404` → default status `404`             |
//! | `json` query parameter    | `?json=[{"statusCode":201}, ...]`         |
//! | Dotted query parameters   | `?headers.X-Foo=bar&reasonPhrase=Nope`    |
//!
//! A `json` array yields one candidate per element and ignores every other
//! query parameter. Otherwise a single candidate is built from the `json`
//! object (if any) with the dotted parameters applied on top, and its status
//! always comes from the path.

use std::collections::BTreeMap;

use serde_json::Value;

use super::options::{CandidateList, OptionsError, OptionsSource, RawOption, ResponseOption};
use crate::http::Request;

/// Longest accepted `json` parameter, in UTF-16 code units.
pub const MAX_JSON_LEN: usize = 10_000;

/// Deepest level a value in the `json` parameter may sit at (the root is level 0).
pub const MAX_JSON_DEPTH: usize = 10;

/// Status used when the path does not start with a number.
const DEFAULT_STATUS: i64 = 200;

/// Object keys that are refused anywhere inside a `json` payload.
const RESERVED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Builds the candidate list for `request`.
///
/// # Errors
///
/// Returns an [`OptionsError`] describing the first rule the request broke.
///
/// # Examples
///
/// ```
/// use http_echo::echo::parse_options;
/// use http_echo::http::Request;
///
/// let raw = b"GET /418?headers.X-Tea=earl-grey HTTP/1.1\r\n\r\n";
/// let (request, _) = Request::parse(raw).unwrap();
///
/// let candidates = parse_options(&request).unwrap();
/// let option = candidates.select(&request).unwrap();
/// assert_eq!(option.status.as_u16(), 418);
/// assert_eq!(option.headers.get("x-tea"), Some("earl-grey"));
/// ```
pub fn parse_options(request: &Request) -> Result<CandidateList, OptionsError> {
    let path_status = path_status(request.path());

    let base = match request.query_param("json") {
        Some(json) => match parse_json_source(json)? {
            OptionsSource::List(records) => {
                let options = records
                    .into_iter()
                    .map(|raw| {
                        let status = match raw.status_code {
                            Some(code) if code != 0 => code,
                            _ => path_status,
                        };
                        ResponseOption::from_raw(raw, status)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(CandidateList::new(options));
            }
            OptionsSource::Single(raw) => raw,
        },
        None => RawOption::default(),
    };

    let raw = apply_query(base, request.query_pairs())?;
    let option = ResponseOption::from_raw(raw, path_status)?;
    Ok(CandidateList::new(vec![option]))
}

/// Reads a leading integer from the path the way `parseInt` would: an
/// optional sign, then digits, with anything after them ignored.
///
/// Returns [`DEFAULT_STATUS`] when there are no digits. Overlong numbers
/// saturate so they fail the status range check later.
fn path_status(path: &str) -> i64 {
    let rest = path.strip_prefix('/').unwrap_or(path);
    let (negative, unsigned) = match rest.as_bytes().first() {
        Some(b'-') => (true, &rest[1..]),
        Some(b'+') => (false, &rest[1..]),
        _ => (false, rest),
    };

    let digits = unsigned
        .bytes()
        .take_while(u8::is_ascii_digit)
        .collect::<Vec<_>>();
    if digits.is_empty() {
        return DEFAULT_STATUS;
    }

    let magnitude = digits.iter().fold(0i64, |acc, digit| {
        acc.saturating_mul(10)
            .saturating_add(i64::from(digit - b'0'))
    });
    if negative { -magnitude } else { magnitude }
}

/// Validates the `json` parameter and resolves it into list or single form.
fn parse_json_source(json: &str) -> Result<OptionsSource, OptionsError> {
    let len = json.encode_utf16().count();
    if len > MAX_JSON_LEN {
        return Err(OptionsError::JsonTooLarge {
            len,
            max: MAX_JSON_LEN,
        });
    }

    let value: Value = serde_json::from_str(json).map_err(OptionsError::MalformedJson)?;
    reject_reserved_keys(&value)?;
    check_depth(&value, 0)?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(OptionsError::InvalidOption))
            .collect::<Result<Vec<_>, _>>()
            .map(OptionsSource::List),
        object @ Value::Object(_) => serde_json::from_value(object)
            .map(OptionsSource::Single)
            .map_err(OptionsError::InvalidOption),
        other => Err(OptionsError::UnexpectedJsonRoot {
            kind: json_kind(&other),
        }),
    }
}

fn reject_reserved_keys(value: &Value) -> Result<(), OptionsError> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if RESERVED_KEYS.contains(&key.as_str()) {
                    return Err(OptionsError::ForbiddenKey { key: key.clone() });
                }
                reject_reserved_keys(child)?;
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_reserved_keys),
        _ => Ok(()),
    }
}

fn check_depth(value: &Value, depth: usize) -> Result<(), OptionsError> {
    if depth > MAX_JSON_DEPTH {
        return Err(OptionsError::TooDeep {
            max: MAX_JSON_DEPTH,
        });
    }
    match value {
        Value::Object(map) => map.values().try_for_each(|v| check_depth(v, depth + 1)),
        Value::Array(items) => items.iter().try_for_each(|v| check_depth(v, depth + 1)),
        _ => Ok(()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Applies dotted query parameters onto `option`, in order.
fn apply_query(
    mut option: RawOption,
    pairs: &[(String, String)],
) -> Result<RawOption, OptionsError> {
    for (name, value) in pairs {
        if name == "json" {
            continue;
        }

        let mut segments = name.split('.');
        let root = segments.next().unwrap_or_default();
        let rest = segments.collect::<Vec<_>>();

        match root {
            "headers" => {
                let [header] = rest.as_slice() else {
                    return Err(OptionsError::InvalidPath {
                        param: name.clone(),
                        root: "headers",
                    });
                };
                assign(&mut option.headers, header, value);
            }
            "condition" => match rest.as_slice() {
                [] if value.is_empty() => option.condition = None,
                [] => return Err(OptionsError::InvalidCondition),
                [header] => assign(&mut option.condition, header, value),
                _ => {
                    return Err(OptionsError::InvalidPath {
                        param: name.clone(),
                        root: "condition",
                    });
                }
            },
            "reasonPhrase" => {
                if !rest.is_empty() {
                    return Err(OptionsError::NestedLeaf {
                        key: "reasonPhrase",
                    });
                }
                option.reason_phrase = Some(value.clone());
            }
            "body" => {
                if !rest.is_empty() {
                    return Err(OptionsError::NestedLeaf { key: "body" });
                }
                option.body = Some(value.clone());
            }
            // Accepted for compatibility; the path-derived status always replaces it.
            "statusCode" => {}
            _ => {
                return Err(OptionsError::UnknownRootKey {
                    key: root.to_owned(),
                });
            }
        }
    }
    Ok(option)
}

/// Sets a header-keyed entry, replacing any earlier spelling of the same name.
fn assign(map: &mut Option<BTreeMap<String, Value>>, name: &str, value: &str) {
    let map = map.get_or_insert_with(BTreeMap::new);
    map.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    map.insert(name.to_owned(), Value::String(value.to_owned()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(target: &str) -> Request {
        request_with(target, &[])
    }

    fn request_with(target: &str, headers: &[(&str, &str)]) -> Request {
        let mut raw = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n");
        for (name, value) in headers {
            raw.push_str(&format!("{name}: {value}\r\n"));
        }
        raw.push_str("\r\n");
        Request::parse(raw.as_bytes()).unwrap().0
    }

    fn encode(json: &str) -> String {
        url::form_urlencoded::byte_serialize(json.as_bytes()).collect()
    }

    fn nested(levels: usize) -> String {
        let mut json = r#"{"value":"test"}"#.to_owned();
        for _ in 1..levels {
            json = format!(r#"{{"nested":{json}}}"#);
        }
        json
    }

    fn single(target: &str) -> ResponseOption {
        let req = request(target);
        let list = parse_options(&req).unwrap();
        assert_eq!(list.len(), 1);
        list.iter().next().unwrap().clone()
    }

    #[test]
    fn path_status_parsing() {
        assert_eq!(path_status("/404"), 404);
        assert_eq!(path_status("/"), 200);
        assert_eq!(path_status(""), 200);
        assert_eq!(path_status("/hello"), 200);
        assert_eq!(path_status("/201/created"), 201);
        assert_eq!(path_status("/302abc"), 302);
        assert_eq!(path_status("/-5"), -5);
        assert_eq!(path_status("/99999999999999999999999"), i64::MAX);
    }

    #[test]
    fn bare_path_selects_status() {
        assert_eq!(single("/404").status.as_u16(), 404);
        assert_eq!(single("/anything").status.as_u16(), 200);
    }

    #[test]
    fn out_of_range_path_is_rejected() {
        for target in ["/99", "/600", "/0", "/-200", "/99999999999999999999999"] {
            let err = parse_options(&request(target)).unwrap_err();
            assert!(
                matches!(err, OptionsError::InvalidStatus(_)),
                "{target}: {err}"
            );
        }
    }

    #[test]
    fn dotted_query_fields() {
        let option = single("/200?headers.X-Custom-Header=hello&reasonPhrase=Custom-OK&body=hi");
        assert_eq!(option.headers.get("X-Custom-Header"), Some("hello"));
        assert_eq!(option.reason_phrase.as_deref(), Some("Custom-OK"));
        assert_eq!(option.body.as_deref(), Some("hi"));
    }

    #[test]
    fn later_query_assignment_wins() {
        let option = single("/200?body=first&body=second");
        assert_eq!(option.body.as_deref(), Some("second"));
    }

    #[test]
    fn path_overrides_query_status() {
        assert_eq!(single("/202?statusCode=404").status.as_u16(), 202);
    }

    #[test]
    fn path_overrides_json_object_status() {
        let target = format!("/202?json={}", encode(r#"{"statusCode":404}"#));
        assert_eq!(single(&target).status.as_u16(), 202);
    }

    #[test]
    fn json_object_merges_with_query() {
        let json = encode(r#"{"headers":{"X-Foo":"Bar"},"body":"json"}"#);
        let option = single(&format!("/201?json={json}&headers.X-Extra=1&body=query"));
        assert_eq!(option.status.as_u16(), 201);
        assert_eq!(option.headers.get("x-foo"), Some("Bar"));
        assert_eq!(option.headers.get("x-extra"), Some("1"));
        assert_eq!(option.body.as_deref(), Some("query"));
    }

    #[test]
    fn query_header_overrides_json_header_in_any_case() {
        let json = encode(r#"{"headers":{"x-a":"json"}}"#);
        let option = single(&format!("/200?json={json}&headers.X-A=query"));
        assert_eq!(option.headers.get("x-a"), Some("query"));
        assert_eq!(option.headers.len(), 1);

        let json = encode(r#"{"headers":{"X-B":"json"}}"#);
        let option = single(&format!("/200?json={json}&headers.x-b=query"));
        assert_eq!(option.headers.get("X-B"), Some("query"));

        let option = single("/200?headers.X-C=first&headers.x-c=second");
        assert_eq!(option.headers.get("x-c"), Some("second"));
    }

    #[test]
    fn query_condition_overrides_json_condition_in_any_case() {
        let json = encode(r#"{"condition":{"x-mode":"json"}}"#);
        let target = format!("/200?json={json}&condition.X-Mode=query");
        let req = request_with(&target, &[("X-Mode", "query")]);
        assert!(parse_options(&req).unwrap().select(&req).is_some());
    }

    #[test]
    fn null_headers_and_condition_in_json() {
        let json = encode(r#"{"headers":null,"condition":null}"#);
        let option = single(&format!("/202?json={json}&headers.X-A=1"));
        assert_eq!(option.status.as_u16(), 202);
        assert_eq!(option.headers.get("x-a"), Some("1"));
        assert!(option.condition.is_empty());

        let json = encode(r#"[{"condition":null,"statusCode":201}]"#);
        let req = request(&format!("/200?json={json}"));
        let list = parse_options(&req).unwrap();
        assert_eq!(list.select(&req).unwrap().status.as_u16(), 201);
    }

    #[test]
    fn json_array_accepts_string_status() {
        let json = encode(r#"[{"statusCode":"201"},{"statusCode":""}]"#);
        let list = parse_options(&request(&format!("/404?json={json}"))).unwrap();
        let statuses: Vec<_> = list.iter().map(|o| o.status.as_u16()).collect();
        assert_eq!(statuses, vec![201, 404]);

        let json = encode(r#"[{"statusCode":"abc"}]"#);
        let err = parse_options(&request(&format!("/200?json={json}"))).unwrap_err();
        assert!(matches!(err, OptionsError::InvalidOption(_)));
    }

    #[test]
    fn json_array_yields_candidates() {
        let json = encode(
            r#"[{"statusCode":401,"condition":{"X-Auth":"none"}},{"statusCode":0},{"body":"x"}]"#,
        );
        let req = request(&format!("/503?json={json}&unknown=ignored"));
        let list = parse_options(&req).unwrap();
        let statuses: Vec<_> = list.iter().map(|o| o.status.as_u16()).collect();
        assert_eq!(statuses, vec![401, 503, 503]);
        assert!(!list.iter().next().unwrap().condition.is_empty());
    }

    #[test]
    fn json_array_ignores_invalid_path_when_statuses_given() {
        let json = encode(r#"[{"statusCode":201}]"#);
        let list = parse_options(&request(&format!("/600?json={json}"))).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn empty_json_array_has_no_candidates() {
        let list = parse_options(&request("/200?json=%5B%5D")).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn json_size_limit() {
        let at_limit = format!(r#"{{"data":"{}"}}"#, "x".repeat(MAX_JSON_LEN - 11));
        assert_eq!(at_limit.len(), MAX_JSON_LEN);
        assert!(parse_options(&request(&format!("/200?json={}", encode(&at_limit)))).is_ok());

        let over = format!(r#"{{"data":"{}"}}"#, "x".repeat(11_000));
        let err = parse_options(&request(&format!("/200?json={}", encode(&over)))).unwrap_err();
        assert!(matches!(err, OptionsError::JsonTooLarge { .. }));
    }

    #[test]
    fn json_size_counts_utf16_units() {
        let emoji = format!(r#"{{"data":"{}"}}"#, "\u{1F600}".repeat(6_000));
        assert!(emoji.chars().count() < MAX_JSON_LEN);
        let err = parse_options(&request(&format!("/200?json={}", encode(&emoji)))).unwrap_err();
        assert!(matches!(err, OptionsError::JsonTooLarge { len: 12_011, .. }));
    }

    #[test]
    fn malformed_json() {
        let err = parse_options(&request(&format!("/200?json={}", encode("{invalid json}"))))
            .unwrap_err();
        assert!(matches!(err, OptionsError::MalformedJson(_)));
    }

    #[test]
    fn reserved_keys_anywhere() {
        for json in [
            r#"{"__proto__":{"isAdmin":true}}"#,
            r#"{"constructor":{"prototype":{"isAdmin":true}}}"#,
            r#"{"prototype":{"isAdmin":true}}"#,
            r#"{"headers":{"X-A":"1"},"deep":{"list":[{"__proto__":1}]}}"#,
            r#"[{"condition":{"constructor":"x"}}]"#,
        ] {
            let err = parse_options(&request(&format!("/200?json={}", encode(json)))).unwrap_err();
            assert!(matches!(err, OptionsError::ForbiddenKey { .. }), "{json}");
        }
    }

    #[test]
    fn depth_limit() {
        assert!(parse_options(&request(&format!("/200?json={}", encode(&nested(10))))).is_ok());

        let err = parse_options(&request(&format!("/200?json={}", encode(&nested(11)))))
            .unwrap_err();
        assert!(matches!(err, OptionsError::TooDeep { max: MAX_JSON_DEPTH }));

        let err = parse_options(&request(&format!("/200?json={}", encode(&nested(16)))))
            .unwrap_err();
        assert!(matches!(err, OptionsError::TooDeep { .. }));
    }

    #[test]
    fn scalar_json_roots_are_rejected() {
        for json in ["5", "null", "\"text\"", "true"] {
            let err = parse_options(&request(&format!("/200?json={}", encode(json)))).unwrap_err();
            assert!(matches!(err, OptionsError::UnexpectedJsonRoot { .. }), "{json}");
        }
    }

    #[test]
    fn unknown_root_key() {
        let err = parse_options(&request("/200?malicious.key=value")).unwrap_err();
        assert!(matches!(err, OptionsError::UnknownRootKey { key } if key == "malicious"));
    }

    #[test]
    fn header_paths_need_exactly_two_segments() {
        for target in ["/200?headers=x", "/200?headers.X-Custom.nested=value"] {
            let err = parse_options(&request(target)).unwrap_err();
            assert!(matches!(err, OptionsError::InvalidPath { root: "headers", .. }));
        }
    }

    #[test]
    fn header_injection() {
        let name = encode("X-Test\r\nX-Injected: malicious");
        let err = parse_options(&request(&format!("/200?headers.{name}=value"))).unwrap_err();
        assert!(matches!(err, OptionsError::InvalidHeaderName { .. }));

        let value = encode("value\r\nX-Injected: malicious");
        let err = parse_options(&request(&format!("/200?headers.X-Custom={value}"))).unwrap_err();
        assert!(matches!(err, OptionsError::InvalidHeaderValue { .. }));

        let err = parse_options(&request("/200?headers.X-Test%3Cscript%3E=value")).unwrap_err();
        assert!(matches!(err, OptionsError::InvalidHeaderName { .. }));
    }

    #[test]
    fn json_headers_are_validated_too() {
        let json = encode(r#"{"headers":{"Bad Name":"x"}}"#);
        let err = parse_options(&request(&format!("/200?json={json}"))).unwrap_err();
        assert!(matches!(err, OptionsError::InvalidHeaderName { .. }));
    }

    #[test]
    fn leaf_fields_cannot_nest() {
        for (target, key) in [
            ("/200?reasonPhrase.nested=value", "reasonPhrase"),
            ("/200?body.nested=value", "body"),
        ] {
            let err = parse_options(&request(target)).unwrap_err();
            assert!(matches!(err, OptionsError::NestedLeaf { key: k } if k == key));
        }
    }

    #[test]
    fn reason_phrase_from_query_is_validated() {
        let ok = format!("/200?reasonPhrase={}", "A".repeat(100));
        assert!(parse_options(&request(&ok)).is_ok());

        let long = format!("/200?reasonPhrase={}", "A".repeat(101));
        assert!(matches!(
            parse_options(&request(&long)).unwrap_err(),
            OptionsError::ReasonTooLong { .. }
        ));

        let crlf = format!("/200?reasonPhrase={}", encode("OK\r\nX-Injected: malicious"));
        assert!(matches!(
            parse_options(&request(&crlf)).unwrap_err(),
            OptionsError::InvalidReasonPhrase
        ));
    }

    #[test]
    fn condition_from_query() {
        let req = request_with("/200?condition.X-Mode=beta", &[("X-Mode", "beta")]);
        let list = parse_options(&req).unwrap();
        assert!(list.select(&req).is_some());

        let other = request_with("/200?condition.X-Mode=beta", &[("X-Mode", "stable")]);
        let list = parse_options(&other).unwrap();
        assert!(list.select(&other).is_none());
    }

    #[test]
    fn bare_condition_parameter() {
        assert!(single("/200?condition=").condition.is_empty());
        assert!(matches!(
            parse_options(&request("/200?condition=true")).unwrap_err(),
            OptionsError::InvalidCondition
        ));
        assert!(matches!(
            parse_options(&request("/200?condition.a.b=c")).unwrap_err(),
            OptionsError::InvalidPath { root: "condition", .. }
        ));
    }
}
