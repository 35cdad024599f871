//! ureq-backed transport.

use declarative::transport::interpret_response;
use declarative::{Error, Method, Request, Response, Result, Transport};
use serde_json::Value;
use std::time::Duration;
use ureq::typestate::WithBody;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("restkit/", env!("CARGO_PKG_VERSION"));

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server root; request paths are joined onto it.
    pub api_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Blocking HTTP transport.
///
/// Non-2xx statuses are not treated as transport errors by the agent; they
/// are turned into `Error::Backend` with the parsed body as detail.
pub struct HttpTransport {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    api_url: String,
    authorization: Option<String>,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            authorization: config.token.map(|token| format!("token {token}")),
        }
    }

    /// Value of the `Authorization` header, if any.
    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    /// Headers and query shared by every request.
    fn prepare<B>(&self, builder: ureq::RequestBuilder<B>, request: &Request) -> ureq::RequestBuilder<B> {
        let mut builder = builder
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT);
        if let Some(authorization) = &self.authorization {
            builder = builder.header("Authorization", authorization);
        }
        for (key, value) in request.query.pairs() {
            builder = builder.query(key, value);
        }
        builder
    }

    fn dispatch(&self, request: &Request, url: &str) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let body = request.body.as_ref();
        match request.method {
            Method::Get => self.prepare(self.agent.get(url), request).call(),
            Method::Delete => match body {
                None => self.prepare(self.agent.delete(url), request).call(),
                Some(_) => send_body(
                    self.prepare(self.agent.delete(url), request).force_send_body(),
                    body,
                ),
            },
            Method::Post => send_body(self.prepare(self.agent.post(url), request), body),
            Method::Put => send_body(self.prepare(self.agent.put(url), request), body),
            Method::Patch => send_body(self.prepare(self.agent.patch(url), request), body),
        }
    }
}

fn send_body(
    builder: ureq::RequestBuilder<WithBody>,
    body: Option<&Value>,
) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send_json(body),
        None => builder.send_empty(),
    }
}

impl Transport for HttpTransport {
    fn base_url(&self) -> &str {
        &self.api_url
    }

    fn send(&self, request: &Request) -> Result<Response> {
        let url = request.url(&self.api_url)?;
        log::debug!("{} {}", request.method, url);

        let mut response = self
            .dispatch(request, &url)
            .map_err(|e| transport_error(request.method, &url, &e))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| transport_error(request.method, &url, &e))?;
        log::trace!("{status} {url}: {text}");

        interpret_response(request.method, &url, status, &text)
    }
}

fn transport_error(method: Method, url: &str, err: &ureq::Error) -> Error {
    match err {
        ureq::Error::Timeout(_) => Error::Transport(format!("{method} {url} timed out")),
        other => Error::Transport(format!("{method} {url}: {other}")),
    }
}
