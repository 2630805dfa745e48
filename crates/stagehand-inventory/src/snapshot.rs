use std::process::Command;
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

/// Snapshot of the package manager's installed listing, fetched at most once
/// per inventory and matched by lower-cased substring.
///
/// Substring matching deliberately trades precision for coverage: display
/// names in the listing rarely match catalog identifiers exactly, so a short
/// query like "Foo" will also match "FooBar". Callers treat the answer as a
/// hint, not proof.
pub struct InstalledInventory {
    fetcher: Box<dyn Fn() -> Result<String> + Send + Sync>,
    snapshot: OnceLock<String>,
}

impl InstalledInventory {
    pub fn new(fetcher: impl Fn() -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            snapshot: OnceLock::new(),
        }
    }

    /// Inventory backed by the `winget list` output of the host.
    pub fn from_package_manager() -> Self {
        Self::new(fetch_manager_listing)
    }

    /// Whether the listing mentions `name`, ignoring case. Blank queries
    /// never match. The first call populates the snapshot; a failed fetch
    /// degrades to an empty snapshot so every later query answers false.
    pub fn is_installed(&self, name: &str) -> bool {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.snapshot().contains(&needle)
    }

    /// Whether the snapshot holds any listing text at all. False both before
    /// the manager has anything installed and after a failed fetch.
    pub fn has_listing(&self) -> bool {
        !self.snapshot().is_empty()
    }

    fn snapshot(&self) -> &str {
        self.snapshot.get_or_init(|| match (self.fetcher)() {
            Ok(raw) => {
                debug!(bytes = raw.len(), "captured installed package listing");
                raw.to_lowercase()
            }
            Err(err) => {
                warn!("failed to capture installed package listing: {err:#}");
                String::new()
            }
        })
    }
}

fn fetch_manager_listing() -> Result<String> {
    let output = Command::new("winget")
        .args(["list", "--accept-source-agreements", "--disable-interactivity"])
        .output()
        .context("failed to run 'winget list'")?;
    if !output.status.success() {
        return Err(anyhow!("'winget list' reported {}", output.status));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
