//! Transport capability: the only way the core talks to a backend.
//!
//! This module provides the [`Transport`] trait, the request/response types
//! that flow through it, and the status interpretation shared by every
//! implementation. The blocking HTTP implementation lives in the `restkit`
//! crate.
//!
//! # Testing
//!
//! Use [`MockTransport`] to script backend responses without network access:
//!
//! ```
//! use declarative::transport::{Method, MockTransport, Request, Transport};
//! use serde_json::json;
//!
//! let mock = MockTransport::new("https://api.example.com");
//! mock.respond(Method::Get, "/api/projects/", 200, json!([{"name": "alpha"}]));
//!
//! let response = mock.send(&Request::get("/api/projects/")).unwrap();
//! assert_eq!(response.body[0]["name"], "alpha");
//! ```

mod mock;

pub use mock::{MockTransport, RecordedCall};

use crate::error::{Error, Result};
use crate::value::is_locator;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// `{placeholder}` in a path template.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
});

/// Transport capability.
///
/// Implementations send exactly one request per call and apply the status
/// contract of [`interpret_response`].
pub trait Transport: Send + Sync {
    /// Base URL that relative paths are joined onto.
    fn base_url(&self) -> &str;

    /// Send a request and return the parsed response.
    ///
    /// # Errors
    ///
    /// Returns `Error::Backend` for any status of 400 or above,
    /// `Error::Transport` when the request could not be delivered and
    /// `Error::InvalidResponse` for a success body that is not JSON.
    fn send(&self, request: &Request) -> Result<Response>;
}

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether the method changes backend state.
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered query parameters. A key may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single key/value pair.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Append a JSON value. Lists become repeated keys, null is skipped.
    pub fn push_value(&mut self, key: &str, value: &Value) {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    self.push_value(key, item);
                }
            }
            Value::String(s) => self.push(key, s.as_str()),
            other => self.push(key, other.to_string()),
        }
    }

    /// Append every pair of another query.
    pub fn extend(&mut self, other: &Query) {
        self.pairs.extend(other.pairs.iter().cloned());
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All pairs in insertion order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (k, v) in iter {
            query.push(k, v);
        }
        query
    }
}

/// A single backend request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Path template relative to the base URL, or an absolute locator.
    pub path: String,
    /// Values substituted into `{placeholders}` of `path`.
    pub path_params: BTreeMap<String, String>,
    pub query: Query,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            path_params: BTreeMap::new(),
            query: Query::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Set the query.
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Add a path parameter.
    pub fn with_path_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(key.into(), value.into());
        self
    }

    /// Replace all path parameters.
    pub fn with_path_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.path_params = params;
        self
    }

    /// Set the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Path with every placeholder substituted.
    pub fn rendered_path(&self) -> Result<String> {
        render_path(&self.path, &self.path_params)
    }

    /// Full URL for this request against `base_url`.
    pub fn url(&self, base_url: &str) -> Result<String> {
        Ok(join_url(base_url, &self.rendered_path()?))
    }
}

/// A parsed backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

/// Substitute `{name}` placeholders in a path template.
///
/// # Errors
///
/// Returns `Error::Configuration` naming the first placeholder without a value.
pub fn render_path(template: &str, params: &BTreeMap<String, String>) -> Result<String> {
    if let Some(missing) = placeholders(template)
        .into_iter()
        .find(|name| !params.contains_key(name))
    {
        return Err(Error::config(format!(
            "missing path parameter '{missing}' for '{template}'"
        )));
    }
    Ok(PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            params.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned())
}

/// Names of the placeholders in a path template, in order.
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Join a base URL and a path with exactly one slash. Absolute locators are
/// returned unchanged.
pub fn join_url(base_url: &str, path: &str) -> String {
    if is_locator(path) {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Apply the status contract to a raw response.
///
/// - status >= 400: `Error::Backend` with the body parsed as JSON when
///   possible, otherwise the raw text
/// - 204 or empty body: `[]` for `GET`, `null` otherwise
/// - any other success: the body parsed as JSON, `Error::InvalidResponse`
///   if it is not JSON
pub fn interpret_response(method: Method, url: &str, status: u16, body: &str) -> Result<Response> {
    if status >= 400 {
        let detail = serde_json::from_str::<Value>(body)
            .unwrap_or_else(|_| Value::String(body.to_string()));
        let message = error_message(&detail, status);
        return Err(Error::Backend {
            method: method.as_str().to_string(),
            url: url.to_string(),
            status,
            message,
            detail,
        });
    }

    if status == 204 || body.trim().is_empty() {
        let body = if method == Method::Get {
            Value::Array(Vec::new())
        } else {
            Value::Null
        };
        return Ok(Response { status, body });
    }

    let body = serde_json::from_str(body).map_err(|e| {
        Error::InvalidResponse(format!("{method} {url} returned non-JSON body: {e}"))
    })?;
    Ok(Response { status, body })
}

fn error_message(detail: &Value, status: u16) -> String {
    match detail {
        Value::Object(map) => map
            .get("detail")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| detail.to_string()),
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Null | Value::String(_) => format!("HTTP {status}"),
        other => other.to_string(),
    }
}
