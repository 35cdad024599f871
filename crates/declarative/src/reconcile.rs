//! Reconciliation - converge one resource to its desired state
//!
//! A run checks whether the resource exists, asks the driver for a plan,
//! and either reports it (check mode) or executes it operation by
//! operation, folding every response into the known resource and waiting
//! for asynchronous operations to settle.

use crate::context::{AutoConfirm, ConfirmCallback, NoProgress, ProgressCallback};
use crate::driver::{
    Driver, ExistencePolicy, NAME_PARAM, RunContext, check_existence, resource_uuid, uuid_params,
};
use crate::error::{Error, Result};
use crate::operation::{ActionOp, MergePolicy, Operation};
use crate::plan::Plan;
use crate::transport::{Request, Response, Transport};
use crate::types::{Desired, DesiredState, Mode, ReconcileOptions, Report};
use crate::value::{Params, UUID_FIELD, is_uuid, reference_text};
use crate::wait::{OnStable, PollOutcome, WaitSpec, poll};
use serde_json::Value;

/// Drives one resource type against one backend
pub struct Reconciler<'a> {
    transport: &'a dyn Transport,
    driver: &'a dyn Driver,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(transport: &'a dyn Transport, driver: &'a dyn Driver, options: ReconcileOptions) -> Self {
        Self {
            transport,
            driver,
            options,
        }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Converge the resource described by `desired`.
    pub fn reconcile(
        &self,
        desired: &Desired,
        progress: &mut dyn ProgressCallback,
        confirm: &mut dyn ConfirmCallback,
    ) -> Result<Report> {
        let config = self.driver.config();
        let mut ctx = RunContext::new(self.transport, config, &desired.params);
        ctx.resource = self.driver.check_existence(&mut ctx)?;

        let plan = match (desired.state, ctx.resource.is_some()) {
            (DesiredState::Present, false) => self.driver.plan_creation(&mut ctx)?,
            (DesiredState::Present, true) => self.driver.plan_update(&mut ctx)?,
            (DesiredState::Absent, true) => self.driver.plan_deletion(&mut ctx)?,
            (DesiredState::Absent, false) => Plan::new(),
        };
        log::debug!(
            "{} '{}': {} -> {} operation(s)",
            config.resource_type,
            desired.name().unwrap_or("?"),
            desired.state.as_str(),
            plan.len()
        );
        progress.on_plan(&config.resource_type, &plan);

        self.execute(ctx, &plan, progress, confirm)
    }

    /// Converge without progress reporting or confirmation.
    pub fn reconcile_simple(&self, desired: &Desired) -> Result<Report> {
        self.reconcile(desired, &mut NoProgress, &mut AutoConfirm)
    }

    /// Look up a resource by name or UUID without changing anything.
    pub fn facts(&self, params: &Params) -> Result<Value> {
        let config = self.driver.config();
        let identifier = params
            .get(NAME_PARAM)
            .and_then(reference_text)
            .ok_or_else(|| Error::missing(vec![NAME_PARAM.to_string()], "lookup"))?;

        if is_uuid(&identifier) {
            let request =
                Request::get(config.detail_path()).with_path_param(UUID_FIELD, identifier.as_str());
            return match self.transport.send(&request) {
                Ok(response) => Ok(response.body),
                Err(err) if err.status() == Some(404) => Err(Error::not_found(NAME_PARAM, identifier)),
                Err(err) => Err(err),
            };
        }

        // Lookups only read, so several matches are not fatal here
        let mut ctx = RunContext::new(self.transport, config, params);
        check_existence(config, &mut ctx, ExistencePolicy::WarnFirst)?
            .ok_or_else(|| Error::not_found(NAME_PARAM, identifier))
    }

    /// Run a named one-shot action on an existing resource.
    pub fn run_action(
        &self,
        params: &Params,
        action: &str,
        progress: &mut dyn ProgressCallback,
        confirm: &mut dyn ConfirmCallback,
    ) -> Result<Report> {
        let config = self.driver.config();
        let path = config.actions.get(action).ok_or_else(|| {
            let known: Vec<&str> = config.actions.keys().map(String::as_str).collect();
            Error::config(format!(
                "{} has no action '{action}' (available: {})",
                config.resource_type,
                if known.is_empty() { "none".to_string() } else { known.join(", ") }
            ))
        })?;

        let mut ctx = RunContext::new(self.transport, config, params);
        ctx.resource = self.driver.check_existence(&mut ctx)?;
        let resource = ctx.resource.as_ref().ok_or_else(|| {
            Error::not_found(
                NAME_PARAM,
                params.get(NAME_PARAM).and_then(reference_text).unwrap_or_default(),
            )
        })?;

        let plan = Plan::from(Operation::Action(ActionOp {
            action: action.to_string(),
            path: path.clone(),
            path_params: uuid_params(resource_uuid(resource)?),
            payload: None,
            old: Value::Null,
            new: Value::Null,
            wait: None,
        }));
        progress.on_plan(&config.resource_type, &plan);

        self.execute(ctx, &plan, progress, confirm)
    }

    fn execute(
        &self,
        mut ctx: RunContext<'_>,
        plan: &Plan,
        progress: &mut dyn ProgressCallback,
        confirm: &mut dyn ConfirmCallback,
    ) -> Result<Report> {
        let diff = plan.describe();
        let commands = plan.summaries(self.transport.base_url())?;

        if plan.is_empty() || self.options.mode == Mode::Check {
            return Ok(Report {
                changed: !plan.is_empty(),
                resource: ctx.resource,
                diff,
                commands,
                declined: false,
            });
        }

        let config = self.driver.config();
        let name = ctx.param(NAME_PARAM).and_then(reference_text).unwrap_or_default();
        let prompt = format!(
            "Apply {} change(s) to {} '{name}'?",
            plan.len(),
            config.resource_type
        );
        if !confirm.confirm(&prompt) {
            log::info!("{} '{name}': declined", config.resource_type);
            return Ok(Report {
                changed: false,
                resource: ctx.resource,
                diff,
                commands,
                declined: true,
            });
        }

        let total = plan.len();
        let mut stale = false;
        for (index, operation) in plan.operations().iter().enumerate() {
            progress.on_operation_start(index, total, operation);
            let response = operation.execute(self.transport)?;
            stale |= self.absorb(&mut ctx, operation, response, progress)?;
            progress.on_operation_complete(index, operation);
        }

        if stale {
            ctx.resource = self.refetch(&mut ctx)?;
        }

        Ok(Report {
            changed: true,
            resource: ctx.resource,
            diff,
            commands,
            declined: false,
        })
    }

    /// Fold an operation's response into the known resource.
    ///
    /// Returns `true` when the resource must be fetched again at the end.
    fn absorb(
        &self,
        ctx: &mut RunContext<'_>,
        operation: &Operation,
        response: Response,
        progress: &mut dyn ProgressCallback,
    ) -> Result<bool> {
        let wait = match operation.wait() {
            Some(_) if !self.options.wait => {
                log::warn!("not waiting for: {}", operation.description());
                None
            }
            wait => wait,
        };

        match operation {
            Operation::Create(op) => {
                let task = wait
                    .map(|spec| spec.task_id(&response.body, ctx.resource.as_ref()))
                    .transpose()?;
                ctx.resource = if op.submits_order {
                    None
                } else {
                    Some(response.body)
                };
                if let (Some(spec), Some(id)) = (wait, task) {
                    self.settle(ctx, spec, &id, progress)?;
                }
                Ok(false)
            }
            Operation::Update(op) => match (op.merge, response.body) {
                (MergePolicy::Replace, body @ Value::Object(_)) => {
                    ctx.resource = Some(body);
                    Ok(false)
                }
                (MergePolicy::Merge, Value::Object(changes)) => match ctx.resource.as_mut() {
                    Some(Value::Object(current)) => {
                        current.extend(changes);
                        Ok(false)
                    }
                    _ => Ok(true),
                },
                _ => Ok(true),
            },
            Operation::Action(_) => match wait {
                Some(spec) if response.status == 202 => {
                    let id = spec.task_id(&response.body, ctx.resource.as_ref())?;
                    self.settle(ctx, spec, &id, progress)?;
                    Ok(false)
                }
                _ => Ok(true),
            },
            Operation::Delete(_) => {
                let task = wait
                    .map(|spec| spec.task_id(&response.body, ctx.resource.as_ref()))
                    .transpose()?;
                ctx.resource = None;
                if let (Some(spec), Some(id)) = (wait, task) {
                    self.settle(ctx, spec, &id, progress)?;
                }
                Ok(false)
            }
        }
    }

    fn settle(
        &self,
        ctx: &mut RunContext<'_>,
        spec: &WaitSpec,
        id: &str,
        progress: &mut dyn ProgressCallback,
    ) -> Result<()> {
        match poll(self.transport, spec, id, self.options.poll, progress)? {
            PollOutcome::Gone => ctx.resource = None,
            PollOutcome::Stable(polled) => match spec.on_stable {
                OnStable::KeepPolled => ctx.resource = Some(polled),
                OnStable::Refetch => {
                    let fresh = self.driver.check_existence(ctx)?;
                    ctx.resource = fresh;
                }
            },
        }
        Ok(())
    }

    /// Fetch the resource again, by UUID when it is known.
    fn refetch(&self, ctx: &mut RunContext<'_>) -> Result<Option<Value>> {
        let uuid = ctx.resource.as_ref().map(resource_uuid).transpose()?;
        match uuid {
            Some(uuid) => {
                let request = Request::get(self.driver.config().detail_path())
                    .with_path_param(UUID_FIELD, uuid);
                Ok(Some(self.transport.send(&request)?.body))
            }
            None => self.driver.check_existence(ctx),
        }
    }
}
