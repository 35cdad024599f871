//! `validate`: load the manifest and build every driver without contacting
//! the backend

use anyhow::Result;
use declarative::DriverSpec;

use super::{load_manifest, manifest_path};
use crate::Context;
use crate::config::Manifest;
use crate::ui;

fn kind(spec: &DriverSpec) -> &'static str {
    match spec {
        DriverSpec::Crud(_) => "crud",
        DriverSpec::Order(_) => "order",
    }
}

/// Resources declared per driver, in driver order
fn resource_counts(manifest: &Manifest) -> Vec<(&str, usize)> {
    manifest
        .driver_names()
        .into_iter()
        .map(|name| {
            let count = manifest
                .resources
                .iter()
                .filter(|entry| entry.driver == name)
                .count();
            (name, count)
        })
        .collect()
}

pub fn run(ctx: &Context) -> Result<()> {
    let path = manifest_path(ctx)?;
    let manifest = load_manifest(ctx)?;
    manifest.build_drivers()?;

    if ctx.quiet {
        return Ok(());
    }
    ui::header(&format!("Manifest {}", path.display()));
    ui::kv("backend", &manifest.backend.api_url);
    ui::kv("token from", &manifest.backend.token_env);
    for (name, count) in resource_counts(&manifest) {
        let spec = &manifest.drivers[name];
        ui::kv(name, &format!("{} driver, {count} resource(s)", kind(spec)));
    }
    println!();
    ui::success(&format!(
        "{} driver(s) and {} resource(s) are valid",
        manifest.drivers.len(),
        manifest.resources.len()
    ));
    Ok(())
}
