use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use stagehand_core::{PackageCatalog, UninstallCatalog};

pub fn load_package_catalog(path: &Path) -> Result<PackageCatalog> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read package catalog: {}", path.display()))?;
    PackageCatalog::from_json_str(&raw)
        .with_context(|| format!("invalid package catalog: {}", path.display()))
}

pub fn load_uninstall_catalog(path: &Path) -> Result<UninstallCatalog> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read uninstall catalog: {}", path.display()))?;
    UninstallCatalog::from_json_str(&raw)
        .with_context(|| format!("invalid uninstall catalog: {}", path.display()))
}
