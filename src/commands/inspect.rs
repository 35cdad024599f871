//! `show` and `action`: single-resource commands that bypass the manifest's
//! resource list

use anyhow::Result;
use declarative::{
    AutoConfirm, ConfirmCallback, JobResult, NAME_PARAM, Params, ReconcileOptions, Reconciler,
};
use serde_json::Value;

use super::Session;
use crate::Context;
use crate::engine;
use crate::progress::{self, BarProgress, PromptConfirm};
use crate::ui::{self, format_value, truncate};

fn lookup_params(identifier: &str) -> Params {
    let mut params = Params::new();
    params.insert(NAME_PARAM.to_string(), Value::String(identifier.to_string()));
    params
}

/// Top-level scalar fields of a resource, for the human-readable view
fn summary_fields(resource: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = resource else {
        return vec![(String::new(), format_value(resource))];
    };
    map.iter()
        .filter(|(_, value)| !value.is_null() && !value.is_object())
        .map(|(key, value)| (key.clone(), truncate(&format_value(value), 80)))
        .collect()
}

/// Look up one resource by name or UUID
pub fn show(ctx: &Context, driver: &str, identifier: &str) -> Result<()> {
    let session = Session::open(ctx)?;
    let reconciler = Reconciler::new(
        &session.transport,
        session.driver(driver)?,
        ReconcileOptions::check(),
    );

    let resource = reconciler.facts(&lookup_params(identifier))?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&resource)?);
        return Ok(());
    }
    ui::header(&format!("{driver}/{identifier}"));
    for (key, value) in summary_fields(&resource) {
        ui::kv(&key, &value);
    }
    Ok(())
}

/// Run a configured one-shot action
pub fn action(ctx: &Context, driver: &str, name: &str, action: &str, yes: bool) -> Result<()> {
    let session = Session::open(ctx)?;
    let reconciler = Reconciler::new(
        &session.transport,
        session.driver(driver)?,
        ReconcileOptions::default(),
    );

    let label = format!("{driver}/{name}");
    // The prompt and a spinner would fight over the terminal
    let pb = progress::spinner(format!("{label}: {action}"), ctx.hide_progress() || !yes);
    let mut reporter = BarProgress::new(pb.clone(), label.as_str());
    let mut confirm: Box<dyn ConfirmCallback> = if yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(PromptConfirm)
    };

    let result = reconciler.run_action(&lookup_params(name), action, &mut reporter, confirm.as_mut());
    pb.finish_and_clear();
    let report = result?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.declined {
        ui::warn("Aborted");
    } else {
        engine::display_reports(
            "Action",
            &[JobResult {
                label: label.clone(),
                result: Ok(report),
            }],
            ctx.verbose > 0,
        );
        ui::success(&format!("Action '{action}' executed on {label}"));
    }
    Ok(())
}
