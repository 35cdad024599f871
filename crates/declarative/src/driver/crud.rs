//! Driver for resources with plain create, patch and delete endpoints.

use super::{Driver, DriverConfig, RunContext, expect_uuid_only, resource_uuid, uuid_params};
use crate::error::{Error, Result};
use crate::operation::{CreateOp, DeleteOp, Operation};
use crate::plan::Plan;
use crate::resolver::OutputFormat;
use crate::transport::placeholders;
use crate::value::{str_field, uuid_from_url};
use crate::wait::{IdSource, OnStable, WaitConfig, WaitSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Create endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateConfig {
    pub path: String,
    /// Placeholder -> parameter whose resolved UUID fills it.
    #[serde(default)]
    pub path_params: BTreeMap<String, String>,
    /// Parameters sent in the body, resolved when a resolver exists.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Parameters that must be supplied to create.
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub wait: Option<WaitConfig>,
}

impl CreateConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            path_params: BTreeMap::new(),
            fields: Vec::new(),
            required: Vec::new(),
            wait: None,
        }
    }
}

/// Delete endpoint settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteConfig {
    /// Defaults to the detail path.
    #[serde(default)]
    pub path: Option<String>,
    /// Placeholder -> source. `name` is the resource's own UUID; any other
    /// source is a locator field of the resource.
    #[serde(default)]
    pub path_params: BTreeMap<String, String>,
    /// Wait until the resource stops answering.
    #[serde(default)]
    pub wait: Option<WaitConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrudConfig {
    #[serde(flatten)]
    pub driver: DriverConfig,
    pub create: CreateConfig,
    #[serde(default)]
    pub delete: DeleteConfig,
}

pub struct CrudDriver {
    config: CrudConfig,
}

impl CrudDriver {
    /// Validate `config` and build the driver.
    pub fn new(config: CrudConfig) -> Result<Self> {
        config.driver.validate()?;
        let resource_type = &config.driver.resource_type;

        for placeholder in placeholders(&config.create.path) {
            if !config.create.path_params.contains_key(&placeholder) {
                return Err(Error::config(format!(
                    "{resource_type}: create path placeholder '{{{placeholder}}}' has no parameter"
                )));
            }
        }
        for param in config.create.path_params.values() {
            if !config.driver.resolvers.contains_key(param) {
                return Err(Error::config(format!(
                    "{resource_type}: create path parameter '{param}' has no resolver"
                )));
            }
        }

        let delete_path = config
            .delete
            .path
            .clone()
            .unwrap_or_else(|| config.driver.detail_path());
        if config.delete.path_params.is_empty() {
            expect_uuid_only(resource_type, &delete_path)?;
        } else {
            for placeholder in placeholders(&delete_path) {
                if !config.delete.path_params.contains_key(&placeholder) {
                    return Err(Error::config(format!(
                        "{resource_type}: delete path placeholder '{{{placeholder}}}' has no source"
                    )));
                }
            }
        }

        Ok(Self { config })
    }

    fn delete_path_params(&self, resource: &Value) -> Result<BTreeMap<String, String>> {
        if self.config.delete.path_params.is_empty() {
            return Ok(uuid_params(resource_uuid(resource)?));
        }

        let mut params = BTreeMap::new();
        for (placeholder, source) in &self.config.delete.path_params {
            let value = if source == super::NAME_PARAM {
                resource_uuid(resource)?
            } else {
                let url = str_field(resource, source).ok_or_else(|| {
                    Error::InvalidResponse(format!(
                        "cannot build delete path: resource has no '{source}' field"
                    ))
                })?;
                uuid_from_url(url)
                    .ok_or_else(|| {
                        Error::InvalidResponse(format!("cannot take a UUID from '{url}' ({source})"))
                    })?
                    .to_string()
            };
            params.insert(placeholder.clone(), value);
        }
        Ok(params)
    }
}

impl Driver for CrudDriver {
    fn config(&self) -> &DriverConfig {
        &self.config.driver
    }

    fn plan_creation(&self, ctx: &mut RunContext<'_>) -> Result<Plan> {
        let create = &self.config.create;

        let missing: Vec<String> = create
            .required
            .iter()
            .filter(|name| ctx.param(name).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::missing(missing, "state 'present' for a new resource"));
        }

        let mut path_params = BTreeMap::new();
        for (placeholder, source) in &create.path_params {
            let value = ctx
                .param(source)
                .ok_or_else(|| Error::missing(vec![source.clone()], "create path"))?;
            let url = ctx.resolver.resolve_to_url(source, value)?;
            let uuid = uuid_from_url(&url).ok_or_else(|| {
                Error::InvalidResponse(format!("cannot take a UUID from '{url}' ({source})"))
            })?;
            path_params.insert(placeholder.clone(), uuid.to_string());
        }

        let mut payload = Map::new();
        for field in &create.fields {
            if let Some(value) = ctx.param(field) {
                let resolved = ctx.resolver.resolve(field, value, OutputFormat::Create)?;
                payload.insert(field.clone(), resolved);
            }
        }

        let wait = create.wait.clone().map(|config| WaitSpec {
            polling_path: self.config.driver.detail_path(),
            config,
            id_source: IdSource::ResultBody(crate::value::UUID_FIELD.to_string()),
            on_stable: OnStable::KeepPolled,
            gone_is_success: false,
        });

        Ok(Plan::from(Operation::Create(CreateOp {
            path: create.path.clone(),
            path_params,
            payload: Value::Object(payload),
            submits_order: false,
            wait,
        })))
    }

    fn plan_deletion(&self, ctx: &mut RunContext<'_>) -> Result<Plan> {
        let resource = ctx.require_resource("deletion")?;
        let delete = &self.config.delete;

        let wait = delete.wait.clone().map(|config| WaitSpec {
            gone_is_success: true,
            ..self.config.driver.resource_wait(config)
        });

        Ok(Plan::from(Operation::Delete(DeleteOp {
            method: DeleteOp::method_for(None),
            path: delete
                .path
                .clone()
                .unwrap_or_else(|| self.config.driver.detail_path()),
            path_params: self.delete_path_params(&resource)?,
            payload: None,
            attributes: resource,
            wait,
        })))
    }
}
