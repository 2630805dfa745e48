use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// One installable entry in the package catalog. `winget` is the reference
/// id handed to the package manager CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageEntry {
    pub name: String,
    pub category: String,
    pub winget: String,
}

/// Read-only mapping of display identifiers to package-manager metadata,
/// loaded from a JSON object keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageCatalog {
    entries: BTreeMap<String, PackageEntry>,
}

impl PackageCatalog {
    pub fn from_json_str(input: &str) -> Result<Self> {
        let entries: BTreeMap<String, PackageEntry> =
            serde_json::from_str(input).context("failed to parse package catalog")?;
        for (identifier, entry) in &entries {
            if entry.winget.trim().is_empty() {
                return Err(anyhow!(
                    "catalog entry '{identifier}' has an empty package reference"
                ));
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, identifier: &str) -> Option<&PackageEntry> {
        self.entries.get(identifier)
    }

    pub fn package_ref(&self, identifier: &str) -> Option<&str> {
        self.entries
            .get(identifier)
            .map(|entry| entry.winget.as_str())
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Distinct category labels in sorted order.
    pub fn categories(&self) -> Vec<String> {
        let mut categories = self
            .entries
            .values()
            .map(|entry| entry.category.clone())
            .collect::<Vec<_>>();
        categories.sort();
        categories.dedup();
        categories
    }

    pub fn in_category<'a>(&'a self, category: &str) -> Vec<(&'a String, &'a PackageEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.category == category)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One uninstallable entry. `managed` routes removal through the package
/// manager; otherwise the registry uninstall string is used. The optional
/// display name overrides the internal name when matching registry
/// DisplayName values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UninstallEntry {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub managed: bool,
}

impl UninstallEntry {
    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Read-only list of uninstallable entries, loaded from a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallCatalog {
    entries: Vec<UninstallEntry>,
}

impl UninstallCatalog {
    pub fn from_json_str(input: &str) -> Result<Self> {
        let entries: Vec<UninstallEntry> =
            serde_json::from_str(input).context("failed to parse uninstall catalog")?;
        for entry in &entries {
            if entry.name.trim().is_empty() {
                return Err(anyhow!("uninstall catalog entry has an empty name"));
            }
        }
        Ok(Self { entries })
    }

    pub fn find(&self, name: &str) -> Option<&UninstallEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    pub fn entries(&self) -> impl Iterator<Item = &UninstallEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
