//! Progress indicators and prompts for the converge CLI.

use declarative::{ConfirmCallback, Operation, Plan, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar over a number of resources
pub fn bar(len: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Spinner for work without a known length
pub fn spinner(message: impl Into<String>, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Reports reconciliation steps of one resource on a shared bar
pub struct BarProgress {
    pb: ProgressBar,
    label: String,
}

impl BarProgress {
    pub fn new(pb: ProgressBar, label: impl Into<String>) -> Self {
        Self {
            pb,
            label: label.into(),
        }
    }

    fn show(&self, detail: &str) {
        self.pb.set_message(format!("{}: {detail}", self.label));
    }
}

impl ProgressCallback for BarProgress {
    fn on_plan(&mut self, _resource_type: &str, plan: &Plan) {
        if plan.is_empty() {
            self.show("up to date");
        } else {
            self.show(&format!("{} operation(s)", plan.len()));
        }
    }

    fn on_operation_start(&mut self, index: usize, total: usize, operation: &Operation) {
        self.show(&format!("[{}/{}] {}", index + 1, total, operation.description()));
        log::info!(
            "{}: [{}/{}] {}",
            self.label,
            index + 1,
            total,
            operation.description()
        );
    }

    fn on_operation_complete(&mut self, _index: usize, operation: &Operation) {
        log::debug!("{}: done: {}", self.label, operation.description());
    }

    fn on_poll(&mut self, id: &str, state: Option<&str>) {
        self.show(&format!("waiting for {id} ({})", state.unwrap_or("pending")));
    }
}

/// Asks on the terminal; a prompt that cannot be shown counts as a no
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        confirm_proceed(prompt).unwrap_or_else(|e| {
            log::warn!("Confirmation prompt failed: {e}");
            false
        })
    }
}

/// Confirm with user
pub fn confirm_proceed(prompt: &str) -> anyhow::Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(true)
        .interact()?;

    Ok(confirmed)
}
