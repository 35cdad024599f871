//! Reference resolution.
//!
//! Users refer to related objects by name, UUID or locator. The backend wants
//! canonical locators. A [`Resolver`] turns the former into the latter,
//! applying dependency filters (an image looked up within the chosen
//! offering's tenant, say) and caching every object it fetches for the rest
//! of the run.

use crate::error::{Error, Result};
use crate::transport::{Query, Request, Response, Transport, join_url};
use crate::value::{
    Params, URL_FIELD, is_locator, is_uuid, param, reference_text, str_field,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Shape requested by the caller when a list parameter is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Payload of a create request or an order.
    Create,
    /// Payload of an update action.
    UpdateAction,
}

/// Narrow a lookup using a field of another, already resolved, object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterRule {
    /// Parameter whose resolved object supplies the filter value.
    pub source_param: String,
    /// Field of that object to read.
    pub source_key: String,
    /// Query key the value is sent under.
    pub target_key: String,
}

/// How one parameter is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    /// Collection endpoint searched by name and fetched by UUID.
    pub list_path: String,
    /// Query key used for exact-name search.
    #[serde(default = "default_name_query_key")]
    pub name_query_key: String,
    /// Not-found message template; `{value}` is replaced by the reference.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Whether the parameter holds a list of references.
    #[serde(default)]
    pub is_list: bool,
    #[serde(default)]
    pub filter_by: Vec<FilterRule>,
    /// For list parameters: wrap each locator as `{key: locator}` in the
    /// given output format.
    #[serde(default)]
    pub item_key: BTreeMap<OutputFormat, String>,
}

fn default_name_query_key() -> String {
    "name_exact".to_string()
}

impl ResolverConfig {
    /// Resolver for `list_path` with default settings.
    pub fn new(list_path: impl Into<String>) -> Self {
        Self {
            list_path: list_path.into(),
            name_query_key: default_name_query_key(),
            error_message: None,
            is_list: false,
            filter_by: Vec::new(),
            item_key: BTreeMap::new(),
        }
    }

    /// Mark the parameter as a list of references.
    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// Add a dependency filter.
    pub fn filtered_by(
        mut self,
        source_param: impl Into<String>,
        source_key: impl Into<String>,
        target_key: impl Into<String>,
    ) -> Self {
        self.filter_by.push(FilterRule {
            source_param: source_param.into(),
            source_key: source_key.into(),
            target_key: target_key.into(),
        });
        self
    }

    /// Wrap list items for `format` as `{key: locator}`.
    pub fn with_item_key(mut self, format: OutputFormat, key: impl Into<String>) -> Self {
        self.item_key.insert(format, key.into());
        self
    }

    /// Set the not-found message template.
    pub fn with_error_message(mut self, template: impl Into<String>) -> Self {
        self.error_message = Some(template.into());
        self
    }

    fn not_found(&self, param: &str, value: &str) -> Error {
        match &self.error_message {
            Some(template) => Error::NotFound {
                param: param.to_string(),
                value: value.to_string(),
                message: template.replace("{value}", value),
            },
            None => Error::not_found(param, value),
        }
    }
}

/// Objects fetched during one run.
///
/// Keyed by (parameter, supplied value) for every resolution, and by
/// parameter name alone for top-level parameters so dependency filters can
/// find them.
#[derive(Debug, Default)]
pub struct ResolverCache {
    by_value: HashMap<(String, String), Value>,
    by_name: HashMap<String, Value>,
    lookups: usize,
}

impl ResolverCache {
    /// Object resolved for a top-level parameter.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.by_name.get(name)
    }

    /// Object resolved for `(name, value)`.
    pub fn get_value(&self, name: &str, value: &str) -> Option<&Value> {
        self.by_value.get(&(name.to_string(), value.to_string()))
    }

    /// Number of backend calls issued by the resolver.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    fn store(&mut self, name: &str, value: &str, object: Value, top_level: bool) {
        if top_level {
            self.by_name.insert(name.to_string(), object.clone());
        }
        self.by_value
            .insert((name.to_string(), value.to_string()), object);
    }
}

/// Resolves user references for one run.
pub struct Resolver<'a> {
    transport: &'a dyn Transport,
    configs: &'a BTreeMap<String, ResolverConfig>,
    params: &'a Params,
    cache: ResolverCache,
}

impl<'a> Resolver<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        configs: &'a BTreeMap<String, ResolverConfig>,
        params: &'a Params,
    ) -> Self {
        Self {
            transport,
            configs,
            params,
            cache: ResolverCache::default(),
        }
    }

    pub fn transport(&self) -> &'a dyn Transport {
        self.transport
    }

    /// Parameters of the run.
    pub fn params(&self) -> &'a Params {
        self.params
    }

    pub fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    /// Object previously resolved for a top-level parameter.
    pub fn cached(&self, name: &str) -> Option<&Value> {
        self.cache.get(name)
    }

    /// Resolve every reference inside `value`.
    ///
    /// Objects are walked key by key with each key as the parameter context;
    /// lists are resolved item by item; scalars of a configured parameter
    /// become locators (or `{item_key: locator}` for list parameters);
    /// everything else passes through unchanged.
    pub fn resolve(&mut self, name: &str, value: &Value, format: OutputFormat) -> Result<Value> {
        let configs = self.configs;
        let config = configs.get(name);
        match value {
            Value::Object(map) => {
                let mut resolved = Map::new();
                for (key, item) in map {
                    resolved.insert(key.clone(), self.resolve(key, item, format)?);
                }
                Ok(Value::Object(resolved))
            }
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    let value = match config {
                        Some(config) if config.is_list && !item.is_object() && !item.is_array() => {
                            self.resolve_single(name, item, config, format)?
                        }
                        _ => self.resolve(name, item, format)?,
                    };
                    resolved.push(value);
                }
                Ok(Value::Array(resolved))
            }
            scalar => match config {
                Some(config) => self.resolve_single(name, scalar, config, format),
                None => Ok(scalar.clone()),
            },
        }
    }

    /// Resolve one scalar reference straight to its locator.
    ///
    /// UUIDs are turned into locators without any backend call and no
    /// dependency filters are applied.
    pub fn resolve_to_url(&mut self, name: &str, value: &Value) -> Result<String> {
        let configs = self.configs;
        let config = configs
            .get(name)
            .ok_or_else(|| Error::config(format!("no resolver configured for parameter '{name}'")))?;
        let text = reference_text(value).ok_or_else(|| {
            Error::config(format!("parameter '{name}' must be a single reference"))
        })?;

        if is_uuid(&text) {
            let path = format!("{}/{}/", config.list_path.trim_matches('/'), text);
            return Ok(join_url(self.transport.base_url(), &path));
        }
        if is_locator(&text) {
            return Ok(text);
        }

        let object = self.lookup(name, &text, config, false)?;
        object_url(&object, name)
    }

    /// Fetch the related objects a resource already points at, so later
    /// dependency filters can use them without knowing the user's input.
    pub fn prime_from_resource(&mut self, resource: &Value, keys: &[String]) -> Result<()> {
        for key in keys {
            if self.cache.by_name.contains_key(key) {
                continue;
            }
            let Some(url) = str_field(resource, key) else {
                continue;
            };
            let response = self.get(&Request::get(url))?;
            if response.body.is_object() {
                log::debug!("primed '{key}' from {url}");
                self.cache.by_name.insert(key.clone(), response.body);
            }
        }
        Ok(())
    }

    fn resolve_single(
        &mut self,
        name: &str,
        value: &Value,
        config: &'a ResolverConfig,
        format: OutputFormat,
    ) -> Result<Value> {
        let Some(text) = reference_text(value) else {
            return Ok(value.clone());
        };
        let object = self.lookup(name, &text, config, true)?;
        let url = object_url(&object, name)?;

        if config.is_list
            && let Some(item_key) = config.item_key.get(&format)
        {
            let mut wrapped = Map::new();
            wrapped.insert(item_key.clone(), Value::String(url));
            return Ok(Value::Object(wrapped));
        }
        Ok(Value::String(url))
    }

    fn lookup(
        &mut self,
        name: &str,
        text: &str,
        config: &'a ResolverConfig,
        with_filters: bool,
    ) -> Result<Value> {
        if let Some(hit) = self.cache.get_value(name, text) {
            log::debug!("cache hit for {name}='{text}'");
            return Ok(hit.clone());
        }

        let object = if is_uuid(text) {
            let path = format!("{}/{}/", config.list_path.trim_end_matches('/'), text);
            self.fetch_one(name, text, config, &path)?
        } else if is_locator(text) {
            self.fetch_one(name, text, config, text)?
        } else {
            let mut query = if with_filters {
                self.dependency_filters(name, config)?
            } else {
                Query::new()
            };
            query.push(config.name_query_key.as_str(), text);
            self.search(name, text, config, query)?
        };

        let top_level = self.params.contains_key(name);
        self.cache.store(name, text, object.clone(), top_level);
        Ok(object)
    }

    fn fetch_one(
        &mut self,
        name: &str,
        text: &str,
        config: &ResolverConfig,
        path: &str,
    ) -> Result<Value> {
        let response = match self.get(&Request::get(path)) {
            Ok(response) => response,
            Err(err) if err.status() == Some(404) => return Err(config.not_found(name, text)),
            Err(err) => return Err(err),
        };
        match response.body {
            Value::Object(_) => Ok(response.body),
            Value::Array(mut items) if items.len() == 1 => Ok(items.remove(0)),
            _ => Err(config.not_found(name, text)),
        }
    }

    fn search(
        &mut self,
        name: &str,
        text: &str,
        config: &ResolverConfig,
        query: Query,
    ) -> Result<Value> {
        let response = self.get(&Request::get(config.list_path.as_str()).with_query(query))?;
        match response.body {
            Value::Array(mut items) => match items.len() {
                0 => Err(config.not_found(name, text)),
                1 => Ok(items.remove(0)),
                count => Err(Error::AmbiguousReference {
                    param: name.to_string(),
                    value: text.to_string(),
                    count,
                }),
            },
            Value::Object(_) => Ok(response.body),
            _ => Err(config.not_found(name, text)),
        }
    }

    fn dependency_filters(&mut self, name: &str, config: &'a ResolverConfig) -> Result<Query> {
        let params = self.params;
        let mut query = Query::new();

        for rule in &config.filter_by {
            let source = match self.cache.get(&rule.source_param) {
                Some(object) => object.clone(),
                None => match param(params, &rule.source_param) {
                    Some(value) => {
                        self.resolve(&rule.source_param, value, OutputFormat::Create)?;
                        self.cache.get(&rule.source_param).cloned().ok_or_else(|| {
                            Error::config(format!(
                                "'{}' (needed to filter '{name}') did not resolve to an object",
                                rule.source_param
                            ))
                        })?
                    }
                    None => {
                        return Err(Error::config(format!(
                            "'{name}' is filtered by '{}', which was neither supplied nor resolved",
                            rule.source_param
                        )));
                    }
                },
            };

            let Some(filter_value) = source.get(&rule.source_key) else {
                let available: Vec<&str> = source
                    .as_object()
                    .map(|o| o.keys().map(String::as_str).collect())
                    .unwrap_or_default();
                return Err(Error::config(format!(
                    "key '{}' not found in resolved '{}' object (needed to filter '{name}'); available keys: {}",
                    rule.source_key,
                    rule.source_param,
                    available.join(", ")
                )));
            };
            query.push_value(&rule.target_key, filter_value);
        }

        Ok(query)
    }

    fn get(&mut self, request: &Request) -> Result<Response> {
        self.cache.lookups += 1;
        log::debug!("resolver GET {} {:?}", request.path, request.query.pairs());
        self.transport.send(request)
    }
}

fn object_url(object: &Value, name: &str) -> Result<String> {
    str_field(object, URL_FIELD)
        .map(str::to_string)
        .ok_or_else(|| {
            Error::InvalidResponse(format!("object resolved for '{name}' has no '{URL_FIELD}' field"))
        })
}
