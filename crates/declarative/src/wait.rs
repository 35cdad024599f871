//! Polling for asynchronous backend tasks.

use crate::context::ProgressCallback;
use crate::error::{Error, Result};
use crate::transport::{Request, Transport};
use crate::value::{UUID_FIELD, str_field};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::thread;
use std::time::{Duration, Instant};

/// Which states end a wait, and where to read the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaitConfig {
    #[serde(default = "default_state_field")]
    pub state_field: String,
    #[serde(default = "default_ok_states")]
    pub ok_states: Vec<String>,
    #[serde(default = "default_erred_states")]
    pub erred_states: Vec<String>,
}

fn default_state_field() -> String {
    "state".to_string()
}

fn default_ok_states() -> Vec<String> {
    vec!["OK".to_string()]
}

fn default_erred_states() -> Vec<String> {
    vec!["Erred".to_string()]
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            state_field: default_state_field(),
            ok_states: default_ok_states(),
            erred_states: default_erred_states(),
        }
    }
}

impl WaitConfig {
    /// States of a marketplace order.
    pub fn marketplace_order() -> Self {
        Self {
            state_field: default_state_field(),
            ok_states: vec!["done".to_string()],
            erred_states: vec![
                "erred".to_string(),
                "rejected".to_string(),
                "canceled".to_string(),
            ],
        }
    }
}

/// Where the polled object's identifier comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSource {
    /// A field of the operation's response body.
    ResultBody(String),
    /// A field of the resource as known before the operation.
    Resource(String),
}

/// What becomes of the resource once the task is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnStable {
    /// The polled object is the resource.
    KeepPolled,
    /// The polled object is a task (an order); fetch the resource again.
    Refetch,
}

/// Everything needed to wait for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSpec {
    /// Detail path with a `{uuid}` placeholder.
    pub polling_path: String,
    pub config: WaitConfig,
    pub id_source: IdSource,
    pub on_stable: OnStable,
    /// Wait for a 404 instead of an ok state (deletions).
    pub gone_is_success: bool,
}

impl WaitSpec {
    /// Poll the resource itself at `polling_path` until it settles.
    pub fn resource(polling_path: impl Into<String>, config: WaitConfig) -> Self {
        Self {
            polling_path: polling_path.into(),
            config,
            id_source: IdSource::Resource(UUID_FIELD.to_string()),
            on_stable: OnStable::KeepPolled,
            gone_is_success: false,
        }
    }

    /// Identifier of the object to poll.
    pub fn task_id(&self, result: &Value, resource: Option<&Value>) -> Result<String> {
        let (source, key, name) = match &self.id_source {
            IdSource::ResultBody(key) => (Some(result), key, "operation result"),
            IdSource::Resource(key) => (resource, key, "resource"),
        };
        source
            .and_then(|object| object.get(key))
            .and_then(|id| match id {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| {
                Error::InvalidResponse(format!(
                    "cannot wait: no '{key}' in the {name} to poll {}",
                    self.polling_path
                ))
            })
    }
}

/// Polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            interval: Duration::from_secs(20),
        }
    }
}

/// How a wait ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The object reached an ok state.
    Stable(Value),
    /// The object disappeared (only when `gone_is_success`).
    Gone,
}

/// Poll `spec.polling_path` for `id` until an ok or erred state (a 404 for
/// deletions), or the timeout.
pub fn poll(
    transport: &dyn Transport,
    spec: &WaitSpec,
    id: &str,
    options: PollOptions,
    progress: &mut dyn ProgressCallback,
) -> Result<PollOutcome> {
    let started = Instant::now();
    let request = Request::get(spec.polling_path.as_str()).with_path_param(UUID_FIELD, id);

    loop {
        match transport.send(&request) {
            Ok(response) => {
                let state = state_of(&response.body, &spec.config.state_field);
                progress.on_poll(id, state.as_deref());

                if let Some(state) = state {
                    if !spec.gone_is_success && spec.config.ok_states.contains(&state) {
                        log::debug!("{id} reached '{state}'");
                        return Ok(PollOutcome::Stable(response.body));
                    }
                    if spec.config.erred_states.contains(&state) {
                        return Err(Error::TaskFailed {
                            id: id.to_string(),
                            state,
                            detail: response.body,
                        });
                    }
                }
            }
            Err(err) if spec.gone_is_success && err.status() == Some(404) => {
                log::debug!("{id} is gone");
                return Ok(PollOutcome::Gone);
            }
            Err(err) => return Err(err),
        }

        let waited = started.elapsed();
        if waited >= options.timeout {
            return Err(Error::Timeout {
                id: id.to_string(),
                waited,
            });
        }
        thread::sleep(options.interval.min(options.timeout - waited));
    }
}

fn state_of(body: &Value, field: &str) -> Option<String> {
    match body.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoProgress;
    use crate::transport::{Method, MockTransport};
    use serde_json::json;

    fn fast() -> PollOptions {
        PollOptions {
            timeout: Duration::from_millis(60),
            interval: Duration::from_millis(5),
        }
    }

    fn spec() -> WaitSpec {
        WaitSpec::resource("/api/instances/{uuid}/", WaitConfig::default())
    }

    #[test]
    fn test_poll_until_ok() {
        let mock = MockTransport::new("https://api.example.com");
        mock.respond(Method::Get, "/api/instances/i1/", 200, json!({"state": "Updating"}));
        mock.respond(Method::Get, "/api/instances/i1/", 200, json!({"state": "OK", "name": "vm"}));

        let outcome = poll(&mock, &spec(), "i1", fast(), &mut NoProgress).unwrap();
        assert_eq!(outcome, PollOutcome::Stable(json!({"state": "OK", "name": "vm"})));
        assert_eq!(mock.count(Method::Get, "/api/instances/i1/"), 2);
    }

    #[test]
    fn test_poll_erred_fails_immediately() {
        let mock = MockTransport::new("https://api.example.com");
        mock.respond(Method::Get, "/api/instances/i1/", 200, json!({"state": "Erred", "error_message": "quota"}));

        let err = poll(&mock, &spec(), "i1", PollOptions::default(), &mut NoProgress).unwrap_err();
        match err {
            Error::TaskFailed { id, state, detail } => {
                assert_eq!(id, "i1");
                assert_eq!(state, "Erred");
                assert_eq!(detail["error_message"], "quota");
            }
            other => panic!("Expected Error::TaskFailed, got {other:?}"),
        }
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn test_poll_times_out() {
        let mock = MockTransport::new("https://api.example.com");
        mock.respond(Method::Get, "/api/instances/i1/", 200, json!({"state": "Creating"}));

        let options = fast();
        let err = poll(&mock, &spec(), "i1", options, &mut NoProgress).unwrap_err();
        match err {
            Error::Timeout { id, waited } => {
                assert_eq!(id, "i1");
                assert!(waited >= options.timeout);
            }
            other => panic!("Expected Error::Timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_poll_404_is_gone_for_deletions() {
        let mock = MockTransport::new("https://api.example.com");
        let mut spec = spec();
        spec.gone_is_success = true;

        let outcome = poll(&mock, &spec, "i1", fast(), &mut NoProgress).unwrap();
        assert_eq!(outcome, PollOutcome::Gone);
    }

    #[test]
    fn test_deletion_wait_ignores_ok_state() {
        let mock = MockTransport::new("https://api.example.com");
        mock.respond(Method::Get, "/api/instances/i1/", 200, json!({"state": "OK"}));
        mock.respond(Method::Get, "/api/instances/i1/", 404, json!({"detail": "Not found."}));
        let mut spec = spec();
        spec.gone_is_success = true;

        let outcome = poll(&mock, &spec, "i1", fast(), &mut NoProgress).unwrap();
        assert_eq!(outcome, PollOutcome::Gone);
        assert_eq!(mock.count(Method::Get, "/api/instances/i1/"), 2);
    }

    #[test]
    fn test_poll_404_is_error_otherwise() {
        let mock = MockTransport::new("https://api.example.com");
        let err = poll(&mock, &spec(), "i1", fast(), &mut NoProgress).unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_custom_state_field() {
        let mock = MockTransport::new("https://api.example.com");
        mock.respond(Method::Get, "/api/orders/o1/", 200, json!({"status": "done"}));
        let spec = WaitSpec {
            polling_path: "/api/orders/{uuid}/".to_string(),
            config: WaitConfig {
                state_field: "status".to_string(),
                ..WaitConfig::marketplace_order()
            },
            id_source: IdSource::ResultBody("uuid".to_string()),
            on_stable: OnStable::Refetch,
            gone_is_success: false,
        };
        assert!(matches!(
            poll(&mock, &spec, "o1", fast(), &mut NoProgress).unwrap(),
            PollOutcome::Stable(_)
        ));
    }

    #[test]
    fn test_task_id_sources() {
        let spec = spec();
        assert_eq!(
            spec.task_id(&json!(null), Some(&json!({"uuid": "r1"}))).unwrap(),
            "r1"
        );
        assert!(spec.task_id(&json!({"uuid": "x"}), None).is_err());

        let order = WaitSpec {
            id_source: IdSource::ResultBody("uuid".to_string()),
            ..spec
        };
        assert_eq!(order.task_id(&json!({"uuid": "o1"}), None).unwrap(), "o1");
    }
}
