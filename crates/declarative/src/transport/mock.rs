//! In-memory transport for tests.

use super::{Method, Query, Request, Response, Transport, interpret_response, join_url};
use crate::error::Result;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// A request observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    /// Rendered path relative to the base URL.
    pub path: String,
    pub query: Query,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    responses: VecDeque<(u16, Value)>,
}

impl Route {
    fn matches(&self, method: Method, path: &str, query: &Query) -> bool {
        self.method == method
            && self.path == path
            && self
                .query
                .iter()
                .all(|pair| query.pairs().iter().any(|p| p == pair))
    }

    /// Pop the next response; the last one stays for subsequent calls.
    fn next_response(&mut self) -> (u16, Value) {
        if self.responses.len() > 1 {
            self.responses.pop_front().unwrap_or((500, Value::Null))
        } else {
            self.responses.front().cloned().unwrap_or((500, Value::Null))
        }
    }
}

/// Mock transport for testing without network access.
///
/// Routes are matched on method, rendered path and a subset of query pairs;
/// the route requiring the most query pairs wins. Each route holds a queue
/// of responses whose last entry repeats forever. Unmatched requests get a
/// 404. Every request is recorded.
#[derive(Debug, Clone)]
pub struct MockTransport {
    base_url: String,
    routes: Arc<Mutex<Vec<Route>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockTransport {
    /// Create an empty mock transport.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            routes: Arc::default(),
            calls: Arc::default(),
        }
    }

    /// Queue a response for `method path`.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.respond_query(method, path, &[], status, body);
    }

    /// Queue a response for `method path` when every given query pair is present.
    pub fn respond_query(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        status: u16,
        body: Value,
    ) {
        let path = self.relative(path);
        let query: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(route) = routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path && r.query == query)
        {
            route.responses.push_back((status, body));
        } else {
            routes.push(Route {
                method,
                path,
                query,
                responses: VecDeque::from([(status, body)]),
            });
        }
    }

    /// Every request received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests that change backend state.
    pub fn writes(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method.is_write())
            .collect()
    }

    /// Number of requests for `method path`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        let path = self.relative(path);
        self.calls()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    /// Forget recorded calls, keeping routes.
    pub fn clear_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn relative(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.strip_prefix(base).unwrap_or(path);
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        }
    }
}

impl Transport for MockTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send(&self, request: &Request) -> Result<Response> {
        let path = self.relative(&request.rendered_path()?);
        let url = join_url(&self.base_url, &path);
        log::debug!("mock {} {}", request.method, url);

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                method: request.method,
                path: path.clone(),
                query: request.query.clone(),
                body: request.body.clone(),
            });

        let (status, body) = {
            let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
            routes
                .iter_mut()
                .filter(|r| r.matches(request.method, &path, &request.query))
                .max_by_key(|r| r.query.len())
                .map(Route::next_response)
                .unwrap_or_else(|| (404, json!({"detail": "Not found."})))
        };

        let text = if body.is_null() {
            String::new()
        } else {
            body.to_string()
        };
        interpret_response(request.method, &url, status, &text)
    }
}
