//! Per-resource-type drivers.
//!
//! A driver knows a resource type's endpoints and turns (desired parameters,
//! current resource) into a [`Plan`]. Drivers are configured with typed,
//! validated structs; the behavior shared by every driver (existence checks
//! and update planning) lives in the [`Driver`] trait's default methods.
//!
//! - [`CrudDriver`]: plain create / patch / delete endpoints
//! - [`OrderDriver`]: marketplace-style provisioning through orders

pub mod crud;
pub mod order;

pub use crud::{CreateConfig, CrudConfig, CrudDriver, DeleteConfig};
pub use order::{OrderConfig, OrderDriver, TerminationConfig, Transformation};

use crate::diff::Change;
use crate::error::{Error, Result};
use crate::normalize::action_value_differs;
use crate::operation::{ActionOp, MergePolicy, Operation, UpdateOp};
use crate::plan::Plan;
use crate::resolver::{OutputFormat, Resolver, ResolverConfig};
use crate::transport::{Query, Request, Transport, placeholders};
use crate::value::{Params, UUID_FIELD, param, reference_text, str_field, uuid_from_url};
use crate::wait::{WaitConfig, WaitSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Parameter that identifies a resource by name.
pub const NAME_PARAM: &str = "name";

/// How an existence check that matches several resources is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistencePolicy {
    /// Fail with `AmbiguousReference`.
    #[default]
    Fatal,
    /// Log a warning and use the first match.
    WarnFirst,
}

/// A collection managed through a dedicated action endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionSpec {
    /// Parameter holding the desired value.
    pub param: String,
    /// Resource field holding the current value (defaults to `param`).
    #[serde(default)]
    pub compare_key: Option<String>,
    /// Action endpoint with a `{uuid}` placeholder.
    pub path: String,
    /// Fields that identify an item of an object list.
    #[serde(default)]
    pub idempotency_keys: Vec<String>,
    /// Values assumed for fields the user left out.
    #[serde(default)]
    pub defaults: Map<String, Value>,
    /// Send `{param: value}` instead of the bare value.
    #[serde(default)]
    pub wrap_in_object: bool,
    /// Compare backend items only on the keys the user supplied.
    #[serde(default)]
    pub filter_keys: bool,
    #[serde(default)]
    pub wait: Option<WaitConfig>,
}

impl ActionSpec {
    pub fn new(param: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            compare_key: None,
            path: path.into(),
            idempotency_keys: Vec::new(),
            defaults: Map::new(),
            wrap_in_object: false,
            filter_keys: false,
            wait: None,
        }
    }

    fn compare_key(&self) -> &str {
        self.compare_key.as_deref().unwrap_or(&self.param)
    }
}

/// How existing resources are updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateConfig {
    /// Patch endpoint (defaults to the detail path).
    #[serde(default)]
    pub path: Option<String>,
    /// Plain fields compared and patched.
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub merge: MergePolicy,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
    /// Related-object fields of the resource fetched before planning.
    #[serde(default)]
    pub prime_keys: Vec<String>,
    #[serde(default = "update_action_format")]
    pub output_format: OutputFormat,
    /// Wait used by actions that do not set their own.
    #[serde(default)]
    pub wait: Option<WaitConfig>,
}

fn update_action_format() -> OutputFormat {
    OutputFormat::UpdateAction
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            path: None,
            fields: Vec::new(),
            merge: MergePolicy::default(),
            actions: Vec::new(),
            prime_keys: Vec::new(),
            output_format: update_action_format(),
            wait: None,
        }
    }
}

/// Settings shared by every driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub resource_type: String,
    /// Collection endpoint used for existence checks.
    pub list_path: String,
    /// Detail endpoint with a `{uuid}` placeholder (defaults to
    /// `<list_path>{uuid}/`).
    #[serde(default)]
    pub detail_path: Option<String>,
    /// Query key for the exact-name existence search.
    #[serde(default = "default_name_query_key")]
    pub name_query_key: String,
    /// Parameter -> query key; the parameter's UUID narrows existence checks.
    #[serde(default)]
    pub check_filters: BTreeMap<String, String>,
    #[serde(default)]
    pub existence: ExistencePolicy,
    #[serde(default)]
    pub resolvers: BTreeMap<String, ResolverConfig>,
    #[serde(default)]
    pub update: UpdateConfig,
    /// One-shot actions: name -> endpoint with a `{uuid}` placeholder.
    #[serde(default)]
    pub actions: BTreeMap<String, String>,
}

fn default_name_query_key() -> String {
    "name_exact".to_string()
}

impl DriverConfig {
    pub fn new(resource_type: impl Into<String>, list_path: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            list_path: list_path.into(),
            detail_path: None,
            name_query_key: default_name_query_key(),
            check_filters: BTreeMap::new(),
            existence: ExistencePolicy::default(),
            resolvers: BTreeMap::new(),
            update: UpdateConfig::default(),
            actions: BTreeMap::new(),
        }
    }

    /// Add a resolver.
    pub fn with_resolver(mut self, param: impl Into<String>, config: ResolverConfig) -> Self {
        self.resolvers.insert(param.into(), config);
        self
    }

    /// Detail endpoint with a `{uuid}` placeholder.
    pub fn detail_path(&self) -> String {
        self.detail_path
            .clone()
            .unwrap_or_else(|| format!("{}/{{uuid}}/", self.list_path.trim_end_matches('/')))
    }

    /// Patch endpoint with a `{uuid}` placeholder.
    pub fn update_path(&self) -> String {
        self.update.path.clone().unwrap_or_else(|| self.detail_path())
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.resource_type.trim().is_empty() {
            return Err(Error::config("resource_type must not be empty"));
        }
        if self.list_path.trim().is_empty() {
            return Err(Error::config(format!(
                "{}: list_path must not be empty",
                self.resource_type
            )));
        }

        for (name, resolver) in &self.resolvers {
            for rule in &resolver.filter_by {
                if !self.resolvers.contains_key(&rule.source_param) {
                    return Err(Error::config(format!(
                        "{}: resolver '{name}' is filtered by '{}', which has no resolver",
                        self.resource_type, rule.source_param
                    )));
                }
            }
        }

        for name in self.check_filters.keys() {
            if !self.resolvers.contains_key(name) {
                return Err(Error::config(format!(
                    "{}: existence filter '{name}' has no resolver",
                    self.resource_type
                )));
            }
        }

        let mut seen = BTreeSet::new();
        for action in &self.update.actions {
            if !seen.insert(action.param.as_str()) {
                return Err(Error::config(format!(
                    "{}: parameter '{}' is managed by more than one action",
                    self.resource_type, action.param
                )));
            }
            expect_uuid_only(&self.resource_type, &action.path)?;
        }
        for path in self.actions.values() {
            expect_uuid_only(&self.resource_type, path)?;
        }
        expect_uuid_only(&self.resource_type, &self.detail_path())?;
        expect_uuid_only(&self.resource_type, &self.update_path())?;
        Ok(())
    }

    /// Wait on the resource's detail endpoint.
    pub fn resource_wait(&self, config: WaitConfig) -> WaitSpec {
        WaitSpec::resource(self.detail_path(), config)
    }
}

/// Fail unless every placeholder of `path` is `{uuid}`.
pub(crate) fn expect_uuid_only(resource_type: &str, path: &str) -> Result<()> {
    match placeholders(path).into_iter().find(|p| p != UUID_FIELD) {
        Some(other) => Err(Error::config(format!(
            "{resource_type}: '{path}' uses '{{{other}}}', only '{{uuid}}' is available here"
        ))),
        None => Ok(()),
    }
}

/// State of one run: the resolver (with its cache) and the resource as
/// currently known.
pub struct RunContext<'a> {
    pub resolver: Resolver<'a>,
    pub resource: Option<Value>,
}

impl<'a> RunContext<'a> {
    pub fn new(transport: &'a dyn Transport, config: &'a DriverConfig, params: &'a Params) -> Self {
        Self {
            resolver: Resolver::new(transport, &config.resolvers, params),
            resource: None,
        }
    }

    pub fn transport(&self) -> &'a dyn Transport {
        self.resolver.transport()
    }

    pub fn params(&self) -> &'a Params {
        self.resolver.params()
    }

    /// A non-null parameter.
    pub fn param(&self, name: &str) -> Option<&'a Value> {
        param(self.params(), name)
    }

    /// The known resource, or a configuration error naming `purpose`.
    pub fn require_resource(&self, purpose: &str) -> Result<Value> {
        self.resource
            .clone()
            .ok_or_else(|| Error::config(format!("{purpose} needs an existing resource")))
    }
}

/// UUID of a backend object.
pub fn resource_uuid(resource: &Value) -> Result<String> {
    str_field(resource, UUID_FIELD)
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidResponse(format!("resource has no '{UUID_FIELD}' field")))
}

/// `{uuid: <uuid>}` path parameters.
pub fn uuid_params(uuid: impl Into<String>) -> BTreeMap<String, String> {
    BTreeMap::from([(UUID_FIELD.to_string(), uuid.into())])
}

/// A per-resource-type plan builder.
pub trait Driver: Send + Sync {
    fn config(&self) -> &DriverConfig;

    /// Find the resource the parameters describe.
    fn check_existence(&self, ctx: &mut RunContext<'_>) -> Result<Option<Value>> {
        let config = self.config();
        check_existence(config, ctx, config.existence)
    }

    /// Plan for an absent resource that should be present.
    fn plan_creation(&self, ctx: &mut RunContext<'_>) -> Result<Plan>;

    /// Plan for a present resource that should stay present.
    fn plan_update(&self, ctx: &mut RunContext<'_>) -> Result<Plan> {
        plan_update(self.config(), ctx)
    }

    /// Plan for a present resource that should be absent.
    fn plan_deletion(&self, ctx: &mut RunContext<'_>) -> Result<Plan>;
}

/// Search the list endpoint by exact name, narrowed by `check_filters`.
pub fn check_existence(
    config: &DriverConfig,
    ctx: &mut RunContext<'_>,
    policy: ExistencePolicy,
) -> Result<Option<Value>> {
    let name = ctx
        .param(NAME_PARAM)
        .and_then(reference_text)
        .ok_or_else(|| Error::missing(vec![NAME_PARAM.to_string()], "existence check"))?;

    let mut query = Query::new();
    query.push(config.name_query_key.as_str(), name.as_str());
    for (filter_param, filter_key) in &config.check_filters {
        let Some(value) = ctx.param(filter_param) else {
            continue;
        };
        let url = ctx.resolver.resolve_to_url(filter_param, value)?;
        let uuid = uuid_from_url(&url).ok_or_else(|| {
            Error::InvalidResponse(format!("cannot take a UUID from '{url}' ({filter_param})"))
        })?;
        query.push(filter_key.as_str(), uuid);
    }

    let response = ctx
        .transport()
        .send(&Request::get(config.list_path.as_str()).with_query(query))?;

    match response.body {
        Value::Array(mut items) => match items.len() {
            0 => Ok(None),
            1 => Ok(Some(items.remove(0))),
            count => match policy {
                ExistencePolicy::Fatal => Err(Error::AmbiguousReference {
                    param: NAME_PARAM.to_string(),
                    value: name,
                    count,
                }),
                ExistencePolicy::WarnFirst => {
                    log::warn!(
                        "{count} {} resources are named '{name}', using the first",
                        config.resource_type
                    );
                    Ok(Some(items.remove(0)))
                }
            },
        },
        Value::Object(_) => Ok(Some(response.body)),
        Value::Null => Ok(None),
        other => Err(Error::InvalidResponse(format!(
            "existence check for '{name}' returned {other}"
        ))),
    }
}

/// Prime related objects, then plan plain-field and action updates.
pub fn plan_update(config: &DriverConfig, ctx: &mut RunContext<'_>) -> Result<Plan> {
    let resource = ctx.require_resource("update planning")?;

    if !config.update.prime_keys.is_empty() {
        ctx.resolver
            .prime_from_resource(&resource, &config.update.prime_keys)?;
        for key in &config.update.prime_keys {
            if let Some(value) = ctx.param(key) {
                ctx.resolver.resolve(key, value, OutputFormat::Create)?;
            }
        }
    }

    let mut plan = Plan::new();
    if let Some(update) = plan_field_update(config, ctx, &resource)? {
        plan.push(update);
    }
    plan.extend(plan_action_updates(config, ctx, &resource)?);
    Ok(plan)
}

/// A single patch of every plain field whose desired value differs.
pub fn plan_field_update(
    config: &DriverConfig,
    ctx: &RunContext<'_>,
    resource: &Value,
) -> Result<Option<Operation>> {
    let changes: Vec<Change> = config
        .update
        .fields
        .iter()
        .filter_map(|field| {
            let new = ctx.param(field)?;
            let old = resource.get(field).cloned().unwrap_or(Value::Null);
            (*new != old).then(|| Change {
                param: field.clone(),
                old,
                new: new.clone(),
            })
        })
        .collect();

    if changes.is_empty() {
        return Ok(None);
    }
    Ok(Some(Operation::Update(UpdateOp {
        path: config.update_path(),
        path_params: uuid_params(resource_uuid(resource)?),
        changes,
        merge: config.update.merge,
    })))
}

/// One action per supplied collection whose normalized value drifted.
pub fn plan_action_updates(
    config: &DriverConfig,
    ctx: &mut RunContext<'_>,
    resource: &Value,
) -> Result<Plan> {
    let mut plan = Plan::new();

    for spec in &config.update.actions {
        let Some(supplied) = ctx.param(&spec.param) else {
            continue;
        };
        let resolved = ctx
            .resolver
            .resolve(&spec.param, supplied, config.update.output_format)?;
        let current = resource
            .get(spec.compare_key())
            .cloned()
            .unwrap_or(Value::Null);

        if !action_value_differs(
            supplied,
            &resolved,
            &current,
            &spec.idempotency_keys,
            &spec.defaults,
            spec.filter_keys,
        ) {
            continue;
        }

        let payload = if spec.wrap_in_object {
            let mut wrapped = Map::new();
            wrapped.insert(spec.param.clone(), resolved.clone());
            Value::Object(wrapped)
        } else {
            resolved.clone()
        };
        let wait = spec
            .wait
            .clone()
            .or_else(|| config.update.wait.clone())
            .map(|wait| config.resource_wait(wait));

        plan.push(Operation::Action(ActionOp {
            action: spec.param.clone(),
            path: spec.path.clone(),
            path_params: uuid_params(resource_uuid(resource)?),
            payload: Some(payload),
            old: current,
            new: resolved,
            wait,
        }));
    }

    Ok(plan)
}

/// Driver configuration as written in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverSpec {
    Crud(CrudConfig),
    Order(OrderConfig),
}

impl DriverSpec {
    /// Validate and build the driver.
    pub fn into_driver(self) -> Result<Box<dyn Driver>> {
        Ok(match self {
            DriverSpec::Crud(config) => Box::new(CrudDriver::new(config)?),
            DriverSpec::Order(config) => Box::new(OrderDriver::new(config)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockTransport};
    use serde_json::json;

    const BASE: &str = "https://api.example.com";

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    fn instance_config() -> DriverConfig {
        let mut config = DriverConfig::new("instance", "/api/instances/")
            .with_resolver("project", ResolverConfig::new("/api/projects/"))
            .with_resolver(
                "security_groups",
                ResolverConfig::new("/api/security-groups/").list(),
            );
        config
            .check_filters
            .insert("project".to_string(), "project_uuid".to_string());
        config.update.fields = vec!["description".to_string()];
        let mut action = ActionSpec::new(
            "security_groups",
            "/api/instances/{uuid}/update_security_groups/",
        );
        action.wrap_in_object = true;
        config.update.actions.push(action);
        config
    }

    #[test]
    fn test_detail_path_default() {
        let config = DriverConfig::new("project", "/api/projects/");
        assert_eq!(config.detail_path(), "/api/projects/{uuid}/");
        assert_eq!(config.update_path(), "/api/projects/{uuid}/");
    }

    #[test]
    fn test_validate_accepts_consistent_config() {
        assert!(instance_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_filter_source() {
        let config = DriverConfig::new("instance", "/api/instances/").with_resolver(
            "image",
            ResolverConfig::new("/api/images/").filtered_by("offering", "scope_uuid", "tenant_uuid"),
        );
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("'offering'")));
    }

    #[test]
    fn test_validate_rejects_check_filter_without_resolver() {
        let mut config = DriverConfig::new("instance", "/api/instances/");
        config
            .check_filters
            .insert("tenant".to_string(), "tenant_uuid".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_action_params() {
        let mut config = instance_config();
        config
            .update
            .actions
            .push(ActionSpec::new("security_groups", "/api/instances/{uuid}/other/"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_placeholder() {
        let mut config = instance_config();
        config.update.actions[0].path = "/api/{tenant}/instances/{uuid}/x/".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("{tenant}"));
    }

    #[test]
    fn test_check_existence_filters_by_uuid() {
        let mock = MockTransport::new(BASE);
        mock.respond_query(
            Method::Get,
            "/api/projects/",
            &[("name_exact", "alpha")],
            200,
            json!([{"url": format!("{BASE}/api/projects/p1/"), "uuid": "p1"}]),
        );
        mock.respond_query(
            Method::Get,
            "/api/instances/",
            &[("name_exact", "vm1"), ("project_uuid", "p1")],
            200,
            json!([{"uuid": "i1", "name": "vm1"}]),
        );
        let config = instance_config();
        let params = params(json!({"name": "vm1", "project": "alpha"}));
        let mut ctx = RunContext::new(&mock, &config, &params);

        let found = check_existence(&config, &mut ctx, ExistencePolicy::Fatal).unwrap();
        assert_eq!(found.unwrap()["uuid"], "i1");
    }

    #[test]
    fn test_check_existence_absent() {
        let mock = MockTransport::new(BASE);
        mock.respond(Method::Get, "/api/instances/", 200, json!([]));
        let config = instance_config();
        let params = params(json!({"name": "vm1"}));
        let mut ctx = RunContext::new(&mock, &config, &params);

        assert!(check_existence(&config, &mut ctx, ExistencePolicy::Fatal).unwrap().is_none());
    }

    #[test]
    fn test_check_existence_ambiguity_policies() {
        let mock = MockTransport::new(BASE);
        mock.respond(
            Method::Get,
            "/api/instances/",
            200,
            json!([{"uuid": "i1"}, {"uuid": "i2"}]),
        );
        let config = instance_config();
        let params = params(json!({"name": "vm1"}));

        let mut ctx = RunContext::new(&mock, &config, &params);
        let err = check_existence(&config, &mut ctx, ExistencePolicy::Fatal).unwrap_err();
        assert!(matches!(err, Error::AmbiguousReference { count: 2, .. }));

        let mut ctx = RunContext::new(&mock, &config, &params);
        let first = check_existence(&config, &mut ctx, ExistencePolicy::WarnFirst).unwrap();
        assert_eq!(first.unwrap()["uuid"], "i1");
    }

    #[test]
    fn test_check_existence_requires_name() {
        let mock = MockTransport::new(BASE);
        let config = instance_config();
        let params = params(json!({}));
        let mut ctx = RunContext::new(&mock, &config, &params);

        let err = check_existence(&config, &mut ctx, ExistencePolicy::Fatal).unwrap_err();
        assert!(matches!(err, Error::MissingParameters { .. }));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_plan_field_update_only_changed_fields() {
        let mock = MockTransport::new(BASE);
        let mut config = instance_config();
        config.update.fields.push("name".to_string());
        let params = params(json!({"name": "vm1", "description": "new"}));
        let ctx = RunContext::new(&mock, &config, &params);
        let resource = json!({"uuid": "i1", "name": "vm1", "description": "old"});

        let op = plan_field_update(&config, &ctx, &resource).unwrap().unwrap();
        match &op {
            Operation::Update(update) => {
                assert_eq!(update.changes.len(), 1);
                assert_eq!(update.changes[0].param, "description");
                assert_eq!(update.changes[0].old, json!("old"));
                assert_eq!(update.changes[0].new, json!("new"));
            }
            other => panic!("Expected update, got {other:?}"),
        }
        assert_eq!(op.request().rendered_path().unwrap(), "/api/instances/i1/");
    }

    #[test]
    fn test_plan_field_update_ignores_unsupplied_fields() {
        let mock = MockTransport::new(BASE);
        let config = instance_config();
        let params = params(json!({"name": "vm1", "description": null}));
        let ctx = RunContext::new(&mock, &config, &params);
        let resource = json!({"uuid": "i1", "description": "kept"});

        assert!(plan_field_update(&config, &ctx, &resource).unwrap().is_none());
    }

    #[test]
    fn test_plan_action_updates_wraps_payload() {
        let mock = MockTransport::new(BASE);
        for (name, uuid) in [("default", "s1"), ("web", "s2")] {
            mock.respond_query(
                Method::Get,
                "/api/security-groups/",
                &[("name_exact", name)],
                200,
                json!([{"url": format!("{BASE}/api/security-groups/{uuid}/")}]),
            );
        }
        let config = instance_config();
        let params = params(json!({"name": "vm1", "security_groups": ["default", "web"]}));
        let mut ctx = RunContext::new(&mock, &config, &params);
        let resource = json!({
            "uuid": "i1",
            "security_groups": [{"url": format!("{BASE}/api/security-groups/s1/"), "name": "default"}]
        });

        let plan = plan_action_updates(&config, &mut ctx, &resource).unwrap();
        assert_eq!(plan.len(), 1);
        let request = plan.operations()[0].request();
        assert_eq!(
            request.rendered_path().unwrap(),
            "/api/instances/i1/update_security_groups/"
        );
        assert_eq!(
            request.body,
            Some(json!({"security_groups": [
                format!("{BASE}/api/security-groups/s1/"),
                format!("{BASE}/api/security-groups/s2/")
            ]}))
        );
    }

    #[test]
    fn test_plan_action_updates_skips_converged() {
        let mock = MockTransport::new(BASE);
        mock.respond_query(
            Method::Get,
            "/api/security-groups/",
            &[("name_exact", "default")],
            200,
            json!([{"url": format!("{BASE}/api/security-groups/s1/")}]),
        );
        let config = instance_config();
        let params = params(json!({"name": "vm1", "security_groups": ["default"]}));
        let mut ctx = RunContext::new(&mock, &config, &params);
        let resource = json!({
            "uuid": "i1",
            "security_groups": [{"url": format!("{BASE}/api/security-groups/s1/"), "name": "default"}]
        });

        assert!(plan_action_updates(&config, &mut ctx, &resource).unwrap().is_empty());
    }

    #[test]
    fn test_plan_update_requires_resource() {
        let mock = MockTransport::new(BASE);
        let config = instance_config();
        let params = params(json!({"name": "vm1"}));
        let mut ctx = RunContext::new(&mock, &config, &params);
        assert!(matches!(
            plan_update(&config, &mut ctx).unwrap_err(),
            Error::Configuration(_)
        ));
    }

    #[test]
    fn test_driver_spec_from_json() {
        let spec: DriverSpec = serde_json::from_value(json!({
            "kind": "crud",
            "resource_type": "project",
            "list_path": "/api/projects/",
            "resolvers": {"customer": {"list_path": "/api/customers/"}},
            "create": {
                "path": "/api/projects/",
                "fields": ["name", "customer"],
                "required": ["customer"]
            }
        }))
        .unwrap();
        let driver = spec.into_driver().unwrap();
        assert_eq!(driver.config().resource_type, "project");
        assert_eq!(
            driver.config().resolvers["customer"].name_query_key,
            "name_exact"
        );
    }
}
