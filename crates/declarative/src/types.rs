//! Core types for a reconciliation run

use crate::diff::{DiffFragment, DiffSummary};
use crate::error::{Error, Result};
use crate::operation::RequestSummary;
use crate::value::Params;
use crate::wait::PollOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter that carries the desired state.
pub const STATE_PARAM: &str = "state";

/// Whether the resource should exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
}

impl DesiredState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesiredState::Present => "present",
            DesiredState::Absent => "absent",
        }
    }
}

/// Desired state of one resource
#[derive(Debug, Clone, PartialEq)]
pub struct Desired {
    pub state: DesiredState,
    pub params: Params,
}

impl Desired {
    pub fn present(params: Params) -> Self {
        Self {
            state: DesiredState::Present,
            params,
        }
    }

    pub fn absent(params: Params) -> Self {
        Self {
            state: DesiredState::Absent,
            params,
        }
    }

    /// Read the state from the `state` parameter (default `present`).
    pub fn from_params(params: Params) -> Result<Self> {
        let state = match params.get(STATE_PARAM) {
            None | Some(Value::Null) => DesiredState::Present,
            Some(Value::String(s)) if s == "present" => DesiredState::Present,
            Some(Value::String(s)) if s == "absent" => DesiredState::Absent,
            Some(other) => {
                return Err(Error::config(format!(
                    "state must be 'present' or 'absent', got {other}"
                )));
            }
        };
        Ok(Self { state, params })
    }

    /// The resource's name, for messages.
    pub fn name(&self) -> Option<&str> {
        self.params.get("name").and_then(Value::as_str)
    }
}

/// Run mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Plan and report, never write
    Check,
    #[default]
    Apply,
}

/// Options for a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub mode: Mode,
    /// Wait for asynchronous operations to settle
    pub wait: bool,
    pub poll: PollOptions,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Apply,
            wait: true,
            poll: PollOptions::default(),
        }
    }
}

impl ReconcileOptions {
    pub fn check() -> Self {
        Self {
            mode: Mode::Check,
            ..Self::default()
        }
    }
}

/// Outcome of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    /// Changes were (or, in check mode, would be) made
    pub changed: bool,
    /// The resource as last known
    pub resource: Option<Value>,
    pub diff: Vec<DiffFragment>,
    /// Requests that were (or would be) sent
    pub commands: Vec<RequestSummary>,
    /// The user declined the confirmation prompt
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub declined: bool,
}

impl Report {
    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_fragments(&self.diff)
    }
}
