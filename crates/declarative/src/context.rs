//! Progress and confirmation callbacks.
//!
//! These traits let the reconciler report what it is doing and ask before
//! writing, without depending on any particular terminal UI.

use crate::operation::Operation;
use crate::plan::Plan;

/// Progress callback for reconciliation.
///
/// Implement this trait to receive progress updates during a run.
pub trait ProgressCallback: Send {
    /// Called once the plan for a resource is known
    fn on_plan(&mut self, resource_type: &str, plan: &Plan);

    /// Called before an operation is sent
    fn on_operation_start(&mut self, index: usize, total: usize, operation: &Operation);

    /// Called after an operation (and any wait it triggered) completed
    fn on_operation_complete(&mut self, index: usize, operation: &Operation);

    /// Called after every poll of an asynchronous task
    fn on_poll(&mut self, id: &str, state: Option<&str>);
}

/// Confirmation callback for user interaction.
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_plan(&mut self, _resource_type: &str, _plan: &Plan) {}
    fn on_operation_start(&mut self, _index: usize, _total: usize, _operation: &Operation) {}
    fn on_operation_complete(&mut self, _index: usize, _operation: &Operation) {}
    fn on_poll(&mut self, _id: &str, _state: Option<&str>) {}
}

/// Progress callback that reports through the `log` facade
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_plan(&mut self, resource_type: &str, plan: &Plan) {
        log::info!("{resource_type}: {} operation(s) planned", plan.len());
    }

    fn on_operation_start(&mut self, index: usize, total: usize, operation: &Operation) {
        log::info!("[{}/{}] {}", index + 1, total, operation.description());
    }

    fn on_operation_complete(&mut self, index: usize, operation: &Operation) {
        log::debug!("[{}] done: {}", index + 1, operation.description());
    }

    fn on_poll(&mut self, id: &str, state: Option<&str>) {
        log::debug!("{id}: state {}", state.unwrap_or("<none>"));
    }
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> bool {
        false
    }
}
