//! Planned backend changes.
//!
//! An [`Operation`] is one write request plus what it means: the fragment
//! shown to users, the effect its result has on the known resource, and an
//! optional wait. Operations are built by drivers and run by the reconciler.

use crate::diff::{Change, DiffFragment};
use crate::error::Result;
use crate::transport::{Method, Request, Response, Transport, join_url};
use crate::wait::WaitSpec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// How an update response is folded into the known resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Replace only the keys present in the response.
    #[default]
    Merge,
    /// The response becomes the resource.
    Replace,
}

/// Create a resource, directly or by submitting an order.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOp {
    pub path: String,
    pub path_params: BTreeMap<String, String>,
    pub payload: Value,
    /// The response is an order, not the resource.
    pub submits_order: bool,
    pub wait: Option<WaitSpec>,
}

/// Patch plain fields of an existing resource.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOp {
    pub path: String,
    pub path_params: BTreeMap<String, String>,
    pub changes: Vec<Change>,
    pub merge: MergePolicy,
}

impl UpdateOp {
    /// Request body: every changed field with its new value.
    pub fn payload(&self) -> Value {
        Value::Object(
            self.changes
                .iter()
                .map(|c| (c.param.clone(), c.new.clone()))
                .collect(),
        )
    }
}

/// Invoke a dedicated action endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOp {
    /// Name shown to users (the managed parameter, or a one-shot action name).
    pub action: String,
    pub path: String,
    pub path_params: BTreeMap<String, String>,
    pub payload: Option<Value>,
    /// Backend value before the action.
    pub old: Value,
    /// Desired value after resolution.
    pub new: Value,
    pub wait: Option<WaitSpec>,
}

/// Remove a resource, by `DELETE` or by a termination request.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOp {
    pub method: Method,
    pub path: String,
    pub path_params: BTreeMap<String, String>,
    pub payload: Option<Value>,
    /// Snapshot of the resource being removed.
    pub attributes: Value,
    pub wait: Option<WaitSpec>,
}

impl DeleteOp {
    /// `DELETE` without a payload, `POST` with one.
    pub fn method_for(payload: Option<&Value>) -> Method {
        if payload.is_some() {
            Method::Post
        } else {
            Method::Delete
        }
    }
}

/// One planned change.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Create(CreateOp),
    Update(UpdateOp),
    Action(ActionOp),
    Delete(DeleteOp),
}

/// Serialized form of an operation's request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSummary {
    pub method: Method,
    pub url: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Operation {
    /// The request this operation sends.
    pub fn request(&self) -> Request {
        let (method, path, path_params, body) = match self {
            Operation::Create(op) => (Method::Post, &op.path, &op.path_params, Some(op.payload.clone())),
            Operation::Update(op) => (Method::Patch, &op.path, &op.path_params, Some(op.payload())),
            Operation::Action(op) => (Method::Post, &op.path, &op.path_params, op.payload.clone()),
            Operation::Delete(op) => (op.method, &op.path, &op.path_params, op.payload.clone()),
        };
        let request = Request::new(method, path.as_str()).with_path_params(path_params.clone());
        match body {
            Some(body) => request.with_body(body),
            None => request,
        }
    }

    /// Send the request.
    pub fn execute(&self, transport: &dyn Transport) -> Result<Response> {
        let request = self.request();
        log::info!("{} {}", request.method, request.rendered_path()?);
        transport.send(&request)
    }

    /// The fragment reported to users.
    pub fn describe(&self) -> DiffFragment {
        match self {
            Operation::Create(op) => {
                let attributes = if op.submits_order {
                    op.payload.get("attributes").cloned().unwrap_or(Value::Object(Map::new()))
                } else {
                    op.payload.clone()
                };
                DiffFragment::created(attributes)
            }
            Operation::Update(op) => DiffFragment::Updated {
                updated_attributes: op.changes.clone(),
            },
            Operation::Action(op) => DiffFragment::Action {
                action: op.action.clone(),
                old: op.old.clone(),
                new: op.new.clone(),
            },
            Operation::Delete(op) => DiffFragment::deleted(
                op.attributes.clone(),
                op.payload.as_ref().and_then(|p| p.get("attributes").cloned()),
            ),
        }
    }

    /// One-line description.
    pub fn description(&self) -> String {
        match self {
            Operation::Create(op) if op.submits_order => "Submit order to create resource".to_string(),
            Operation::Create(_) => "Create resource".to_string(),
            Operation::Update(op) => {
                let fields: Vec<&str> = op.changes.iter().map(|c| c.param.as_str()).collect();
                format!("Update fields: {}", fields.join(", "))
            }
            Operation::Action(op) => format!("Execute action '{}'", op.action),
            Operation::Delete(op) if op.payload.is_some() => "Terminate resource".to_string(),
            Operation::Delete(_) => "Delete resource".to_string(),
        }
    }

    pub fn wait(&self) -> Option<&WaitSpec> {
        match self {
            Operation::Create(op) => op.wait.as_ref(),
            Operation::Update(_) => None,
            Operation::Action(op) => op.wait.as_ref(),
            Operation::Delete(op) => op.wait.as_ref(),
        }
    }

    /// Request summary against `base_url`.
    pub fn summary(&self, base_url: &str) -> Result<RequestSummary> {
        let request = self.request();
        Ok(RequestSummary {
            method: request.method,
            url: join_url(base_url, &request.rendered_path()?),
            description: self.description(),
            body: request.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use serde_json::json;

    fn uuid_params(uuid: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("uuid".to_string(), uuid.to_string())])
    }

    #[test]
    fn test_update_request_carries_changed_fields() {
        let op = Operation::Update(UpdateOp {
            path: "/api/projects/{uuid}/".into(),
            path_params: uuid_params("p1"),
            changes: vec![Change {
                param: "description".into(),
                old: json!("old"),
                new: json!("new"),
            }],
            merge: MergePolicy::Merge,
        });
        let request = op.request();
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.rendered_path().unwrap(), "/api/projects/p1/");
        assert_eq!(request.body, Some(json!({"description": "new"})));
        assert_eq!(op.description(), "Update fields: description");
    }

    #[test]
    fn test_delete_method_follows_payload() {
        assert_eq!(DeleteOp::method_for(None), Method::Delete);
        assert_eq!(DeleteOp::method_for(Some(&json!({}))), Method::Post);
    }

    #[test]
    fn test_order_describes_attributes_only() {
        let op = Operation::Create(CreateOp {
            path: "/api/marketplace-orders/".into(),
            path_params: BTreeMap::new(),
            payload: json!({"project": "p", "offering": "o", "attributes": {"name": "vm"}}),
            submits_order: true,
            wait: None,
        });
        assert_eq!(op.describe(), DiffFragment::created(json!({"name": "vm"})));
    }

    #[test]
    fn test_termination_describes_options() {
        let op = Operation::Delete(DeleteOp {
            method: Method::Post,
            path: "/api/marketplace-resources/{uuid}/terminate/".into(),
            path_params: uuid_params("m1"),
            payload: Some(json!({"attributes": {"action": "force_destroy"}})),
            attributes: json!({"name": "vm"}),
            wait: None,
        });
        assert_eq!(
            op.describe(),
            DiffFragment::deleted(json!({"name": "vm"}), Some(json!({"action": "force_destroy"})))
        );
        assert_eq!(op.description(), "Terminate resource");
    }

    #[test]
    fn test_summary_renders_url_and_body() {
        let op = Operation::Action(ActionOp {
            action: "security_groups".into(),
            path: "/api/instances/{uuid}/update_security_groups/".into(),
            path_params: uuid_params("i1"),
            payload: Some(json!({"security_groups": ["u"]})),
            old: json!([]),
            new: json!(["u"]),
            wait: None,
        });
        let summary = op.summary("https://api.example.com/").unwrap();
        assert_eq!(summary.method, Method::Post);
        assert_eq!(
            summary.url,
            "https://api.example.com/api/instances/i1/update_security_groups/"
        );
        assert_eq!(summary.body, Some(json!({"security_groups": ["u"]})));
        let serialized = serde_json::to_value(&summary).unwrap();
        assert_eq!(serialized["method"], "POST");
    }

    #[test]
    fn test_execute_sends_one_request() {
        let mock = MockTransport::new("https://api.example.com");
        mock.respond(Method::Post, "/api/projects/", 201, json!({"uuid": "p1"}));
        let op = Operation::Create(CreateOp {
            path: "/api/projects/".into(),
            path_params: BTreeMap::new(),
            payload: json!({"name": "alpha"}),
            submits_order: false,
            wait: None,
        });
        let response = op.execute(&mock).unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(mock.calls().len(), 1);
        assert_eq!(mock.calls()[0].body, Some(json!({"name": "alpha"})));
    }
}
