//! Execution engine - runs reconciliation jobs with progress reporting

use colored::Colorize;
use declarative::{
    AutoConfirm, Job, JobResult, ReconcileOptions, Reconciler, Transport, reconcile_batch,
};

use crate::progress::{self, BarProgress};

/// Summary of execution results
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub changed: usize,
    pub unchanged: usize,
    pub declined: usize,
    pub failed: usize,
}

impl ExecuteSummary {
    pub fn from_results(results: &[JobResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match &result.result {
                Ok(report) if report.declined => summary.declined += 1,
                Ok(report) if report.changed => summary.changed += 1,
                Ok(_) => summary.unchanged += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Converge every job, sequentially with a progress bar or on `threads`
/// worker threads.
pub fn run(
    transport: &dyn Transport,
    jobs: &[Job<'_>],
    options: ReconcileOptions,
    threads: usize,
    hidden: bool,
) -> anyhow::Result<Vec<JobResult>> {
    if threads > 1 && jobs.len() > 1 {
        let spinner = progress::spinner(
            format!("Converging {} resources ({threads} jobs)...", jobs.len()),
            hidden,
        );
        let results = reconcile_batch(transport, jobs, options, threads);
        spinner.finish_and_clear();
        return Ok(results?);
    }

    let pb = progress::bar(jobs.len() as u64, hidden);
    let mut results = Vec::with_capacity(jobs.len());
    for job in jobs {
        let mut reporter = BarProgress::new(pb.clone(), job.label.as_str());
        let result = Reconciler::new(transport, job.driver, options).reconcile(
            &job.desired,
            &mut reporter,
            &mut AutoConfirm,
        );

        let symbol = match &result {
            Ok(report) if report.changed => "✓",
            Ok(_) => "○",
            Err(_) => "✗",
        };
        pb.set_message(format!("{symbol} {}", job.label));
        pb.inc(1);

        if let Err(err) = &result {
            log::debug!("{}: {err}", job.label);
        }
        results.push(JobResult {
            label: job.label.clone(),
            result,
        });
    }
    pb.finish_and_clear();

    Ok(results)
}

pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Resources converged successfully!", "✓".green().bold());
    } else {
        println!("  {} Resources converged with errors", "⚠".yellow().bold());
    }

    if summary.changed > 0 {
        println!("    • {} resources changed", summary.changed);
    }
    if summary.unchanged > 0 {
        println!("    • {} resources already up to date", summary.unchanged);
    }
    if summary.declined > 0 {
        println!("    • {} resources skipped", summary.declined);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{
        CreateConfig, CrudConfig, CrudDriver, DeleteConfig, Desired, DriverConfig, Error, Method,
        MockTransport, Mode, Report,
    };
    use serde_json::json;

    fn driver() -> CrudDriver {
        let mut create = CreateConfig::new("/api/projects/");
        create.fields = vec!["name".to_string()];
        CrudDriver::new(CrudConfig {
            driver: DriverConfig::new("project", "/api/projects/"),
            create,
            delete: DeleteConfig::default(),
        })
        .unwrap()
    }

    fn job<'a>(driver: &'a CrudDriver, name: &str) -> Job<'a> {
        Job {
            label: format!("project/{name}"),
            driver,
            desired: Desired::present(
                json!({"name": name}).as_object().cloned().unwrap_or_default(),
            ),
        }
    }

    #[test]
    fn test_summary_from_results() {
        let results = vec![
            JobResult {
                label: "a".to_string(),
                result: Ok(Report {
                    changed: true,
                    ..Report::default()
                }),
            },
            JobResult {
                label: "b".to_string(),
                result: Ok(Report::default()),
            },
            JobResult {
                label: "c".to_string(),
                result: Ok(Report {
                    declined: true,
                    ..Report::default()
                }),
            },
            JobResult {
                label: "d".to_string(),
                result: Err(Error::config("broken")),
            },
        ];
        assert_eq!(
            ExecuteSummary::from_results(&results),
            ExecuteSummary {
                changed: 1,
                unchanged: 1,
                declined: 1,
                failed: 1,
            }
        );
    }

    #[test]
    fn test_run_sequential_check_mode() {
        let mock = MockTransport::new("https://api.example.com");
        mock.respond_query(
            Method::Get,
            "/api/projects/",
            &[("name_exact", "alpha")],
            200,
            json!([]),
        );
        mock.respond_query(
            Method::Get,
            "/api/projects/",
            &[("name_exact", "beta")],
            200,
            json!([{"uuid": "b1", "name": "beta"}]),
        );
        let driver = driver();
        let jobs = vec![job(&driver, "alpha"), job(&driver, "beta")];

        let results = run(&mock, &jobs, ReconcileOptions::check(), 1, true).unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].result.as_ref().is_ok_and(|r| r.changed));
        assert!(results[1].result.as_ref().is_ok_and(|r| !r.changed));
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn test_run_parallel_apply() {
        let mock = MockTransport::new("https://api.example.com");
        mock.respond(Method::Get, "/api/projects/", 200, json!([]));
        mock.respond(
            Method::Post,
            "/api/projects/",
            201,
            json!({"uuid": "p1", "name": "created"}),
        );
        let driver = driver();
        let jobs = vec![job(&driver, "alpha"), job(&driver, "beta")];
        let options = ReconcileOptions {
            mode: Mode::Apply,
            ..ReconcileOptions::default()
        };

        let results = run(&mock, &jobs, options, 2, true).unwrap();

        let summary = ExecuteSummary::from_results(&results);
        assert_eq!(summary.changed, 2);
        assert_eq!(mock.writes().len(), 2);
    }
}
