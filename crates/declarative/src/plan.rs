//! Plans - ordered lists of operations for one resource

use crate::diff::{DiffFragment, DiffSummary};
use crate::error::Result;
use crate::operation::{Operation, RequestSummary};

/// The operations that converge one resource, in execution order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    operations: Vec<Operation>,
}

impl Plan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation at the end
    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Append all operations of another plan
    pub fn extend(&mut self, other: Plan) {
        self.operations.extend(other.operations);
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Fragments of every operation
    pub fn describe(&self) -> Vec<DiffFragment> {
        self.operations.iter().map(Operation::describe).collect()
    }

    /// Request summaries of every operation
    pub fn summaries(&self, base_url: &str) -> Result<Vec<RequestSummary>> {
        self.operations.iter().map(|op| op.summary(base_url)).collect()
    }

    /// Counts by kind of change
    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_fragments(&self.describe())
    }
}

impl From<Operation> for Plan {
    fn from(operation: Operation) -> Self {
        Self {
            operations: vec![operation],
        }
    }
}

impl FromIterator<Operation> for Plan {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self {
            operations: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}
