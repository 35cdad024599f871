//! Command implementations

pub mod inspect;
pub mod reconcile;
pub mod validate;

use anyhow::{Context as AnyhowContext, Result, anyhow};
use declarative::{Driver, Job};
use restkit::{ClientConfig, HttpTransport};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::Context;
use crate::config::Manifest;
use crate::paths;

/// Manifest path from `--manifest` or the config directory
pub fn manifest_path(ctx: &Context) -> Result<PathBuf> {
    match &ctx.manifest {
        Some(path) => Ok(paths::expand(&path.to_string_lossy())),
        None => paths::default_manifest(),
    }
}

pub fn load_manifest(ctx: &Context) -> Result<Manifest> {
    Manifest::load(&manifest_path(ctx)?)
}

/// A loaded manifest with its drivers and a connected transport
pub struct Session {
    pub manifest: Manifest,
    pub drivers: BTreeMap<String, Box<dyn Driver>>,
    pub transport: HttpTransport,
}

impl Session {
    pub fn open(ctx: &Context) -> Result<Self> {
        let manifest = load_manifest(ctx)?;
        let drivers = manifest.build_drivers()?;

        let backend = &manifest.backend;
        let mut client = ClientConfig::new(backend.api_url.as_str()).with_timeout(backend.timeout());
        match ctx.token.clone().or_else(|| backend.token_from_env()) {
            Some(token) => client = client.with_token(token),
            None => log::warn!(
                "No API token (set {} or pass --token); sending anonymous requests",
                backend.token_env
            ),
        }

        Ok(Self {
            manifest,
            drivers,
            transport: HttpTransport::new(client),
        })
    }

    pub fn driver(&self, name: &str) -> Result<&dyn Driver> {
        self.drivers.get(name).map(|driver| &**driver).ok_or_else(|| {
            anyhow!(
                "Unknown driver '{name}' (declared: {})",
                self.manifest.driver_names().join(", ")
            )
        })
    }

    /// Jobs for the resources selected by `target`
    pub fn jobs(&self, target: Option<&str>) -> Result<Vec<Job<'_>>> {
        self.manifest
            .select(target)?
            .into_iter()
            .map(|entry| {
                Ok(Job {
                    label: entry.label(),
                    driver: self.driver(&entry.driver)?,
                    desired: entry
                        .desired()
                        .with_context(|| format!("resource {}", entry.label()))?,
                })
            })
            .collect()
    }
}
