//! Driver for marketplace resources.
//!
//! Creation submits an order and waits for it; termination is a `POST` to a
//! dedicated endpoint keyed by the marketplace resource's UUID. Updates use
//! the shared planning after priming the resource's offering and project, so
//! dependency filters see the resource's scope even when the user did not
//! repeat it.

use super::{Driver, DriverConfig, NAME_PARAM, RunContext};
use crate::error::{Error, Result};
use crate::operation::{CreateOp, DeleteOp, Operation};
use crate::plan::Plan;
use crate::resolver::OutputFormat;
use crate::value::{UUID_FIELD, str_field};
use crate::wait::{IdSource, OnStable, WaitConfig, WaitSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Value conversion applied to an order attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transformation {
    /// Gigabytes to megabytes.
    GbToMb,
}

impl Transformation {
    /// Apply to `value`; values that cannot be converted are returned as is.
    /// Fractional gigabytes are truncated toward zero.
    pub fn apply(self, value: &Value) -> Value {
        match self {
            Transformation::GbToMb => {
                let gigabytes = match value {
                    Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate_float)),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                match gigabytes.and_then(|gb| gb.checked_mul(1024)) {
                    Some(mb) => Value::from(mb),
                    None => value.clone(),
                }
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn truncate_float(value: f64) -> Option<i64> {
    let whole = value.trunc();
    (whole.is_finite() && whole >= i64::MIN as f64 && whole < i64::MAX as f64).then_some(whole as i64)
}

/// How a marketplace resource is terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerminationConfig {
    #[serde(default = "default_termination_path")]
    pub path: String,
    /// Resource field holding the marketplace resource UUID.
    #[serde(default = "default_termination_id_field")]
    pub id_field: String,
    /// Parameter -> termination attribute name.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Wait until the resource stops answering.
    #[serde(default)]
    pub wait: Option<WaitConfig>,
}

fn default_termination_path() -> String {
    "/api/marketplace-resources/{uuid}/terminate/".to_string()
}

fn default_termination_id_field() -> String {
    "marketplace_resource_uuid".to_string()
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            path: default_termination_path(),
            id_field: default_termination_id_field(),
            attributes: BTreeMap::new(),
            wait: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfig {
    #[serde(flatten)]
    pub driver: DriverConfig,
    #[serde(default = "default_orders_path")]
    pub orders_path: String,
    #[serde(default = "default_order_detail_path")]
    pub order_detail_path: String,
    #[serde(default = "default_project_param")]
    pub project_param: String,
    #[serde(default = "default_offering_param")]
    pub offering_param: String,
    /// Parameters sent as order attributes (`name` is always sent).
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Parameters that must be supplied to order.
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub transformations: BTreeMap<String, Transformation>,
    #[serde(default = "WaitConfig::marketplace_order")]
    pub order_wait: WaitConfig,
    #[serde(default)]
    pub termination: TerminationConfig,
}

fn default_orders_path() -> String {
    "/api/marketplace-orders/".to_string()
}

fn default_order_detail_path() -> String {
    "/api/marketplace-orders/{uuid}/".to_string()
}

fn default_project_param() -> String {
    "project".to_string()
}

fn default_offering_param() -> String {
    "offering".to_string()
}

impl OrderConfig {
    pub fn new(driver: DriverConfig) -> Self {
        Self {
            driver,
            orders_path: default_orders_path(),
            order_detail_path: default_order_detail_path(),
            project_param: default_project_param(),
            offering_param: default_offering_param(),
            attributes: Vec::new(),
            required: Vec::new(),
            transformations: BTreeMap::new(),
            order_wait: WaitConfig::marketplace_order(),
            termination: TerminationConfig::default(),
        }
    }
}

pub struct OrderDriver {
    config: OrderConfig,
}

impl OrderDriver {
    /// Validate `config` and build the driver.
    ///
    /// Update priming defaults to the offering and project parameters.
    pub fn new(mut config: OrderConfig) -> Result<Self> {
        config.driver.validate()?;
        let resource_type = config.driver.resource_type.clone();

        for param in [&config.project_param, &config.offering_param] {
            if !config.driver.resolvers.contains_key(param) {
                return Err(Error::config(format!(
                    "{resource_type}: order parameter '{param}' has no resolver"
                )));
            }
        }
        super::expect_uuid_only(&resource_type, &config.order_detail_path)?;
        super::expect_uuid_only(&resource_type, &config.termination.path)?;

        if config.driver.update.prime_keys.is_empty() {
            config.driver.update.prime_keys =
                vec![config.offering_param.clone(), config.project_param.clone()];
        }
        Ok(Self { config })
    }

    fn attributes(&self, ctx: &mut RunContext<'_>) -> Result<Map<String, Value>> {
        let mut attributes = Map::new();
        if let Some(name) = ctx.param(NAME_PARAM) {
            attributes.insert(NAME_PARAM.to_string(), name.clone());
        }
        for key in &self.config.attributes {
            let Some(value) = ctx.param(key) else {
                continue;
            };
            let resolved = ctx.resolver.resolve(key, value, OutputFormat::Create)?;
            let value = match self.config.transformations.get(key) {
                Some(transformation) => transformation.apply(&resolved),
                None => resolved,
            };
            attributes.insert(key.clone(), value);
        }
        Ok(attributes)
    }
}

impl Driver for OrderDriver {
    fn config(&self) -> &DriverConfig {
        &self.config.driver
    }

    fn plan_creation(&self, ctx: &mut RunContext<'_>) -> Result<Plan> {
        let config = &self.config;

        let mut required = vec![config.project_param.clone(), config.offering_param.clone()];
        required.extend(config.required.iter().cloned());
        let missing: Vec<String> = required
            .into_iter()
            .filter(|name| ctx.param(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::missing(missing, "state 'present' for a new resource"));
        }

        let mut payload = Map::new();
        for (field, key) in [("project", &config.project_param), ("offering", &config.offering_param)] {
            if let Some(value) = ctx.param(key) {
                let resolved = ctx.resolver.resolve(key, value, OutputFormat::Create)?;
                payload.insert(field.to_string(), resolved);
            }
        }
        payload.insert("attributes".to_string(), Value::Object(self.attributes(ctx)?));
        payload.insert("accepting_terms_of_service".to_string(), Value::Bool(true));
        for key in ["plan", "limits"] {
            if let Some(value) = ctx.param(key) {
                payload.insert(key.to_string(), value.clone());
            }
        }

        Ok(Plan::from(Operation::Create(CreateOp {
            path: config.orders_path.clone(),
            path_params: BTreeMap::new(),
            payload: Value::Object(payload),
            submits_order: true,
            wait: Some(WaitSpec {
                polling_path: config.order_detail_path.clone(),
                config: config.order_wait.clone(),
                id_source: IdSource::ResultBody(UUID_FIELD.to_string()),
                on_stable: OnStable::Refetch,
                gone_is_success: false,
            }),
        })))
    }

    fn plan_deletion(&self, ctx: &mut RunContext<'_>) -> Result<Plan> {
        let resource = ctx.require_resource("termination")?;
        let termination = &self.config.termination;

        let id = str_field(&resource, &termination.id_field).ok_or_else(|| {
            Error::InvalidResponse(format!(
                "cannot terminate: resource has no '{}' field",
                termination.id_field
            ))
        })?;

        let mut attributes = Map::new();
        for (param, api_name) in &termination.attributes {
            if let Some(value) = ctx.param(param) {
                attributes.insert(api_name.clone(), value.clone());
            }
        }
        let mut payload = Map::new();
        if !attributes.is_empty() {
            payload.insert("attributes".to_string(), Value::Object(attributes));
        }
        let payload = Value::Object(payload);

        let wait = termination.wait.clone().map(|config| WaitSpec {
            gone_is_success: true,
            ..self.config.driver.resource_wait(config)
        });

        Ok(Plan::from(Operation::Delete(DeleteOp {
            method: DeleteOp::method_for(Some(&payload)),
            path: termination.path.clone(),
            path_params: super::uuid_params(id),
            payload: Some(payload),
            attributes: resource,
            wait,
        })))
    }
}
