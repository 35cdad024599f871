//! Parallel reconciliation of independent resources

use crate::context::{AutoConfirm, LogProgress};
use crate::driver::{Driver, NAME_PARAM};
use crate::error::{Error, Result};
use crate::reconcile::Reconciler;
use crate::transport::Transport;
use crate::types::{Desired, ReconcileOptions, Report};
use crate::value::reference_text;
use rayon::prelude::*;
use std::collections::BTreeSet;

/// One resource to converge
pub struct Job<'a> {
    /// Shown in results and logs
    pub label: String,
    pub driver: &'a dyn Driver,
    pub desired: Desired,
}

/// Result of one job, in submission order
#[derive(Debug)]
pub struct JobResult {
    pub label: String,
    pub result: Result<Report>,
}

/// Converge every job on a pool of `jobs` threads.
///
/// Runs are independent: each has its own resolver cache and none is
/// confirmed interactively. Two jobs may not target the same resource
/// (same resource type and name), since concurrent runs against one target
/// would race.
pub fn reconcile_batch(
    transport: &dyn Transport,
    batch: &[Job<'_>],
    options: ReconcileOptions,
    jobs: usize,
) -> Result<Vec<JobResult>> {
    check_distinct(batch)?;

    let run = |job: &Job<'_>| JobResult {
        label: job.label.clone(),
        result: Reconciler::new(transport, job.driver, options).reconcile(
            &job.desired,
            &mut LogProgress,
            &mut AutoConfirm,
        ),
    };

    if jobs <= 1 || batch.len() <= 1 {
        return Ok(batch.iter().map(run).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| Error::config(format!("failed to create thread pool: {e}")))?;

    Ok(pool.install(|| batch.par_iter().map(run).collect()))
}

fn check_distinct(batch: &[Job<'_>]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for job in batch {
        let name = job
            .desired
            .params
            .get(NAME_PARAM)
            .and_then(reference_text)
            .unwrap_or_default();
        let resource_type = job.driver.config().resource_type.as_str();
        if !seen.insert((resource_type, name.clone())) {
            return Err(Error::config(format!(
                "{resource_type} '{name}' is declared more than once"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{CreateConfig, CrudConfig, CrudDriver, DeleteConfig, DriverConfig};
    use crate::transport::{Method, MockTransport};
    use crate::value::Params;
    use serde_json::{Value, json};

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

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

    fn job<'a>(driver: &'a dyn Driver, name: &str) -> Job<'a> {
        Job {
            label: format!("project/{name}"),
            driver,
            desired: Desired::present(params(json!({"name": name}))),
        }
    }

    #[test]
    fn test_batch_runs_every_job_in_order() {
        let mock = MockTransport::new("https://api.example.com");
        for name in ["a", "b", "c"] {
            mock.respond_query(
                Method::Get,
                "/api/projects/",
                &[("name_exact", name)],
                200,
                json!([{"uuid": name, "name": name}]),
            );
        }
        let driver = driver();
        let batch = vec![job(&driver, "a"), job(&driver, "b"), job(&driver, "c")];

        let results = reconcile_batch(&mock, &batch, ReconcileOptions::default(), 3).unwrap();

        let labels: Vec<&str> = results.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["project/a", "project/b", "project/c"]);
        assert!(results.iter().all(|r| matches!(r.result, Ok(ref report) if !report.changed)));
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn test_batch_keeps_failures_per_job() {
        let mock = MockTransport::new("https://api.example.com");
        mock.respond_query(
            Method::Get,
            "/api/projects/",
            &[("name_exact", "a")],
            200,
            json!([]),
        );
        mock.respond(Method::Post, "/api/projects/", 201, json!({"uuid": "a"}));
        let driver = driver();
        let batch = vec![job(&driver, "a"), job(&driver, "missing")];

        let results = reconcile_batch(&mock, &batch, ReconcileOptions::default(), 2).unwrap();

        assert!(results[0].result.as_ref().is_ok_and(|r| r.changed));
        assert_eq!(
            results[1].result.as_ref().err().and_then(Error::status),
            Some(404)
        );
    }

    #[test]
    fn test_batch_rejects_duplicate_targets() {
        let mock = MockTransport::new("https://api.example.com");
        let driver = driver();
        let batch = vec![job(&driver, "a"), job(&driver, "a")];

        let err = reconcile_batch(&mock, &batch, ReconcileOptions::default(), 2).unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("more than once")));
        assert!(mock.calls().is_empty());
    }
}
