//! `plan` and `apply`

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{Job, JobResult, Mode, PollOptions, ReconcileOptions, Report};
use serde::Serialize;
use std::time::Duration;

use super::Session;
use crate::Context;
use crate::cli::{ApplyArgs, PlanArgs};
use crate::engine::{self, ExecuteSummary};
use crate::progress;
use crate::ui;

/// Report of one resource as printed by `--json`
#[derive(Serialize)]
struct JsonReport<'a> {
    target: &'a str,
    #[serde(flatten)]
    report: Option<&'a Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn print_json(results: &[JobResult]) -> Result<()> {
    let reports: Vec<JsonReport<'_>> = results
        .iter()
        .map(|result| JsonReport {
            target: &result.label,
            report: result.result.as_ref().ok(),
            error: result.result.as_ref().err().map(ToString::to_string),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

fn fail_on_errors(results: &[JobResult]) -> Result<()> {
    let failed: Vec<&str> = results
        .iter()
        .filter(|r| r.result.is_err())
        .map(|r| r.label.as_str())
        .collect();
    if !failed.is_empty() {
        bail!("{} resource(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

fn show(ctx: &Context, title: &str, results: &[JobResult]) -> Result<()> {
    if ctx.json {
        print_json(results)
    } else {
        engine::display_reports(title, results, ctx.verbose > 0);
        Ok(())
    }
}

/// Show what apply would change
pub fn plan(ctx: &Context, args: PlanArgs) -> Result<()> {
    let session = Session::open(ctx)?;
    let jobs = session.jobs(args.target.as_deref())?;

    let results = engine::run(
        &session.transport,
        &jobs,
        ReconcileOptions::check(),
        1,
        ctx.hide_progress(),
    )?;
    show(ctx, "Plan", &results)?;
    fail_on_errors(&results)
}

/// Converge resources: plan, confirm, then apply what changed
pub fn apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let session = Session::open(ctx)?;
    let jobs = session.jobs(args.target.as_deref())?;
    let threads = usize::from(args.jobs.max(1));

    let checked = engine::run(
        &session.transport,
        &jobs,
        ReconcileOptions::check(),
        threads,
        ctx.hide_progress(),
    )?;
    if !ctx.json {
        engine::display_reports("Plan", &checked, ctx.verbose > 0);
    }
    fail_on_errors(&checked)?;

    let pending: Vec<Job<'_>> = jobs
        .iter()
        .zip(&checked)
        .filter(|(_, checked)| checked.result.as_ref().is_ok_and(|r| r.changed))
        .map(|(job, _)| Job {
            label: job.label.clone(),
            driver: job.driver,
            desired: job.desired.clone(),
        })
        .collect();

    if pending.is_empty() {
        if ctx.json {
            print_json(&checked)?;
        }
        return Ok(());
    }

    if !args.yes
        && !progress::confirm_proceed(&format!(
            "Apply changes to {} resource(s)?",
            pending.len()
        ))?
    {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    let options = apply_options(&args);
    let applied = engine::run(
        &session.transport,
        &pending,
        options,
        threads,
        ctx.hide_progress(),
    )?;

    if ctx.json {
        print_json(&applied)?;
    } else {
        engine::display_reports("Applied", &applied, ctx.verbose > 0);
        engine::print_summary(&ExecuteSummary::from_results(&applied));
        if !options.wait {
            ui::dim("Asynchronous tasks were not awaited; run `converge plan` to check them later.");
        }
    }
    fail_on_errors(&applied)
}

fn apply_options(args: &ApplyArgs) -> ReconcileOptions {
    ReconcileOptions {
        mode: Mode::Apply,
        wait: !args.no_wait,
        poll: PollOptions {
            timeout: Duration::from_secs(args.timeout),
            interval: Duration::from_secs(args.interval.max(1)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Error;
    use serde_json::json;

    fn args() -> ApplyArgs {
        ApplyArgs {
            target: None,
            yes: true,
            jobs: 4,
            no_wait: true,
            timeout: 120,
            interval: 0,
        }
    }

    #[test]
    fn test_apply_options() {
        let options = apply_options(&args());
        assert_eq!(options.mode, Mode::Apply);
        assert!(!options.wait);
        assert_eq!(options.poll.timeout, Duration::from_secs(120));
        assert_eq!(options.poll.interval, Duration::from_secs(1));
    }

    #[test]
    fn test_json_report_shape() {
        let ok = Report {
            changed: true,
            resource: Some(json!({"uuid": "p1"})),
            ..Report::default()
        };
        let reports = [
            JsonReport {
                target: "project/alpha",
                report: Some(&ok),
                error: None,
            },
            JsonReport {
                target: "project/beta",
                report: None,
                error: Some("boom".to_string()),
            },
        ];
        let value = serde_json::to_value(reports).unwrap();
        assert_eq!(value[0]["target"], "project/alpha");
        assert_eq!(value[0]["changed"], true);
        assert_eq!(value[0]["resource"], json!({"uuid": "p1"}));
        assert!(value[0].get("error").is_none());
        assert_eq!(value[1]["error"], "boom");
        assert!(value[1].get("changed").is_none());
    }

    #[test]
    fn test_fail_on_errors() {
        let results = vec![
            JobResult {
                label: "project/alpha".to_string(),
                result: Ok(Report::default()),
            },
            JobResult {
                label: "project/beta".to_string(),
                result: Err(Error::config("bad")),
            },
        ];
        let err = fail_on_errors(&results).unwrap_err();
        assert_eq!(err.to_string(), "1 resource(s) failed: project/beta");
        assert!(fail_on_errors(&results[..1]).is_ok());
    }
}
