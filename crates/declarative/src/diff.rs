//! Human-readable description of planned changes

use serde::Serialize;
use serde_json::Value;

/// State label of a creation fragment.
pub const WILL_BE_CREATED: &str = "will be created";

/// State label of a deletion fragment.
pub const WILL_BE_DELETED: &str = "will be deleted";

/// One changed field of a simple update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub param: String,
    pub old: Value,
    pub new: Value,
}

/// What one operation will do, in the shape reported to users.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DiffFragment {
    Created {
        state: String,
        attributes: Value,
    },
    Updated {
        updated_attributes: Vec<Change>,
    },
    Action {
        action: String,
        old: Value,
        new: Value,
    },
    Deleted {
        state: String,
        attributes: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        termination_options: Option<Value>,
    },
}

impl DiffFragment {
    pub fn created(attributes: Value) -> Self {
        Self::Created {
            state: WILL_BE_CREATED.to_string(),
            attributes,
        }
    }

    pub fn deleted(attributes: Value, termination_options: Option<Value>) -> Self {
        Self::Deleted {
            state: WILL_BE_DELETED.to_string(),
            attributes,
            termination_options,
        }
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub creations: usize,
    pub updates: usize,
    pub actions: usize,
    pub deletions: usize,
}

impl DiffSummary {
    /// Create a summary from a list of fragments
    pub fn from_fragments(fragments: &[DiffFragment]) -> Self {
        let mut summary = Self::default();
        for fragment in fragments {
            match fragment {
                DiffFragment::Created { .. } => summary.creations += 1,
                DiffFragment::Updated { .. } => summary.updates += 1,
                DiffFragment::Action { .. } => summary.actions += 1,
                DiffFragment::Deleted { .. } => summary.deletions += 1,
            }
        }
        summary
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &DiffSummary) {
        self.creations += other.creations;
        self.updates += other.updates;
        self.actions += other.actions;
        self.deletions += other.deletions;
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.creations + self.updates + self.actions + self.deletions
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fragment_shapes() {
        assert_eq!(
            serde_json::to_value(DiffFragment::created(json!({"name": "web"}))).unwrap(),
            json!({"state": "will be created", "attributes": {"name": "web"}})
        );
        assert_eq!(
            serde_json::to_value(DiffFragment::Updated {
                updated_attributes: vec![Change {
                    param: "description".into(),
                    old: json!("a"),
                    new: json!("b"),
                }],
            })
            .unwrap(),
            json!({"updated_attributes": [{"param": "description", "old": "a", "new": "b"}]})
        );
        assert_eq!(
            serde_json::to_value(DiffFragment::Action {
                action: "update_security_groups".into(),
                old: json!([]),
                new: json!(["u"]),
            })
            .unwrap(),
            json!({"action": "update_security_groups", "old": [], "new": ["u"]})
        );
        assert_eq!(
            serde_json::to_value(DiffFragment::deleted(json!({"uuid": "x"}), None)).unwrap(),
            json!({"state": "will be deleted", "attributes": {"uuid": "x"}})
        );
    }

    #[test]
    fn test_deleted_with_termination_options() {
        let fragment = DiffFragment::deleted(json!({}), Some(json!({"action": "force_destroy"})));
        assert_eq!(
            serde_json::to_value(fragment).unwrap()["termination_options"],
            json!({"action": "force_destroy"})
        );
    }

    #[test]
    fn test_summary() {
        let fragments = vec![
            DiffFragment::created(json!({})),
            DiffFragment::Updated {
                updated_attributes: vec![],
            },
            DiffFragment::Action {
                action: "a".into(),
                old: json!(null),
                new: json!(null),
            },
        ];
        let mut summary = DiffSummary::from_fragments(&fragments);
        assert_eq!(summary.total(), 3);
        assert!(summary.has_changes());

        summary.merge(&DiffSummary::from_fragments(&[DiffFragment::deleted(json!({}), None)]));
        assert_eq!(summary.deletions, 1);
        assert_eq!(summary.total(), 4);
    }
}
