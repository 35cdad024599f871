//! Manifest loading
//!
//! A manifest names the backend, the drivers for each resource type, and
//! the resources to converge:
//!
//! ```toml
//! [backend]
//! api_url = "https://waldur.example.com"
//!
//! [drivers.project]
//! kind = "crud"
//! resource_type = "project"
//! list_path = "/api/projects/"
//! create = { path = "/api/projects/", fields = ["name", "customer"] }
//! resolvers.customer = { list_path = "/api/customers/" }
//!
//! [[resources]]
//! driver = "project"
//! name = "alpha"
//! customer = "ACME"
//! ```

use anyhow::{Context, Result, bail};
use declarative::{Desired, Driver, DriverSpec, NAME_PARAM, Params};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable read for the API token unless `token_env` says otherwise
pub const DEFAULT_TOKEN_ENV: &str = "CONVERGE_TOKEN";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    pub api_url: String,
    /// Environment variable holding the API token
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Token from the configured environment variable, if set and non-empty
    pub fn token_from_env(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }
}

/// One desired resource
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceEntry {
    /// Key into `[drivers]`
    pub driver: String,
    /// Parameters passed to the driver, including an optional `state`
    #[serde(flatten)]
    pub params: Params,
}

impl ResourceEntry {
    pub fn name(&self) -> Option<&str> {
        self.params.get(NAME_PARAM).and_then(|v| v.as_str())
    }

    /// `driver/name`, used in output and job labels
    pub fn label(&self) -> String {
        format!("{}/{}", self.driver, self.name().unwrap_or("?"))
    }

    pub fn desired(&self) -> declarative::Result<Desired> {
        Desired::from_params(self.params.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub backend: BackendConfig,
    #[serde(default)]
    pub drivers: BTreeMap<String, DriverSpec>,
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let manifest = Self::parse(&content)
            .with_context(|| format!("Invalid manifest {}", path.display()))?;
        log::debug!(
            "Loaded {} driver(s) and {} resource(s) from {}",
            manifest.drivers.len(),
            manifest.resources.len(),
            path.display()
        );
        Ok(manifest)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check resource entries against the declared drivers
    pub fn validate(&self) -> Result<()> {
        if self.backend.api_url.trim().is_empty() {
            bail!("backend.api_url must not be empty");
        }

        let mut seen = BTreeSet::new();
        for (index, entry) in self.resources.iter().enumerate() {
            if !self.drivers.contains_key(&entry.driver) {
                bail!(
                    "resources[{index}]: unknown driver '{}' (declared: {})",
                    entry.driver,
                    self.driver_names().join(", ")
                );
            }
            let Some(name) = entry.name() else {
                bail!("resources[{index}] ({}): missing 'name'", entry.driver);
            };
            entry
                .desired()
                .with_context(|| format!("resources[{index}] ({})", entry.label()))?;
            if !seen.insert((entry.driver.as_str(), name)) {
                bail!("{} is declared more than once", entry.label());
            }
        }
        Ok(())
    }

    pub fn driver_names(&self) -> Vec<&str> {
        self.drivers.keys().map(String::as_str).collect()
    }

    /// Build and validate every driver
    pub fn build_drivers(&self) -> Result<BTreeMap<String, Box<dyn Driver>>> {
        self.drivers
            .iter()
            .map(|(name, spec)| {
                let driver = spec
                    .clone()
                    .into_driver()
                    .with_context(|| format!("driver '{name}'"))?;
                Ok((name.clone(), driver))
            })
            .collect()
    }

    /// Resource entries, optionally narrowed to one driver or one `driver/name`
    pub fn select(&self, target: Option<&str>) -> Result<Vec<&ResourceEntry>> {
        let Some(target) = target else {
            return Ok(self.resources.iter().collect());
        };
        let (driver, name) = match target.split_once('/') {
            Some((driver, name)) => (driver, Some(name)),
            None => (target, None),
        };
        let selected: Vec<&ResourceEntry> = self
            .resources
            .iter()
            .filter(|entry| entry.driver == driver)
            .filter(|entry| name.is_none_or(|name| entry.name() == Some(name)))
            .collect();
        if selected.is_empty() {
            bail!("No resources match '{target}'");
        }
        Ok(selected)
    }
}

// ============================================================================
// Tests
// ============================================================================
