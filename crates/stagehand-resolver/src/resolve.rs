use std::fs;
use std::path::{Path, PathBuf};

use stagehand_core::{OperationKind, PackageCatalog, UninstallCatalog, WorkItem};
use thiserror::Error;
use tracing::{debug, warn};

use crate::library::InstallerLibrary;

/// Accepted installer extensions, in preference order: when a program folder
/// holds several installer types, the earliest class wins.
pub const INSTALLER_EXTENSIONS: [&str; 3] = ["exe", "msi", "msix"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no installer with a recognized extension was found for '{identifier}'")]
    NotFound { identifier: String },
    #[error("'{identifier}' is not present in the catalog")]
    UnknownPackage { identifier: String },
}

impl ResolveError {
    fn not_found(identifier: &str) -> Self {
        Self::NotFound {
            identifier: identifier.to_string(),
        }
    }

    fn unknown_package(identifier: &str) -> Self {
        Self::UnknownPackage {
            identifier: identifier.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAction {
    /// Run a local installer file as a child process.
    RunInstaller(PathBuf),
    ManagerInstall { package_ref: String },
    ManagerUpdate { package_ref: String },
    ManagerUninstall { package_ref: String },
    /// Look up the uninstall command by display name under the registry
    /// uninstall keys.
    RegistryUninstall { display_name: String },
}

/// Locates the executable or package reference behind a work item. Read-only:
/// filesystem and catalog lookups, no side effects.
pub fn resolve(
    item: &WorkItem,
    library: &InstallerLibrary,
    packages: &PackageCatalog,
    uninstalls: &UninstallCatalog,
) -> Result<ResolvedAction, ResolveError> {
    let identifier = item.identifier.as_str();
    let action = match item.kind {
        OperationKind::Install => {
            if item.package_ref.is_some() {
                let package_ref = packages
                    .package_ref(identifier)
                    .ok_or_else(|| ResolveError::unknown_package(identifier))?;
                ResolvedAction::ManagerInstall {
                    package_ref: package_ref.to_string(),
                }
            } else {
                let path = match &item.resolved_path {
                    Some(path) => path.clone(),
                    None => find_library_installer(library, identifier)?,
                };
                ResolvedAction::RunInstaller(path)
            }
        }
        OperationKind::Update => {
            let package_ref = packages
                .package_ref(identifier)
                .ok_or_else(|| ResolveError::unknown_package(identifier))?;
            ResolvedAction::ManagerUpdate {
                package_ref: package_ref.to_string(),
            }
        }
        OperationKind::Uninstall => {
            let entry = uninstalls
                .find(identifier)
                .ok_or_else(|| ResolveError::unknown_package(identifier))?;
            if entry.managed {
                // Catalog ref when the app is also installable through the
                // manager; the display label doubles as the manager query
                // otherwise.
                let package_ref = packages
                    .package_ref(identifier)
                    .unwrap_or(entry.display_label());
                ResolvedAction::ManagerUninstall {
                    package_ref: package_ref.to_string(),
                }
            } else {
                ResolvedAction::RegistryUninstall {
                    display_name: entry.display_label().to_string(),
                }
            }
        }
    };

    debug!(identifier, ?action, "resolved work item");
    Ok(action)
}

fn find_library_installer(
    library: &InstallerLibrary,
    program: &str,
) -> Result<PathBuf, ResolveError> {
    let category = library
        .category_of(program)
        .map_err(|err| {
            warn!(program, "failed to scan installer library: {err:#}");
            ResolveError::not_found(program)
        })?
        .ok_or_else(|| ResolveError::not_found(program))?;

    let program_dir = library.program_dir(&category, program);
    find_preferred_installer(&program_dir).ok_or_else(|| ResolveError::not_found(program))
}

/// Picks the first installer by extension preference, file names sorted
/// within each extension class so the choice is deterministic. Read failures
/// are logged and degrade to "no installer found".
pub(crate) fn find_preferred_installer(dir: &Path) -> Option<PathBuf> {
    let reader = match fs::read_dir(dir) {
        Ok(reader) => reader,
        Err(err) => {
            warn!(dir = %dir.display(), "failed to read program folder: {err}");
            return None;
        }
    };
    let mut files = Vec::new();
    for entry in reader {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(err) => {
                warn!(dir = %dir.display(), "failed to read directory entry: {err}");
                continue;
            }
        };
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    for extension in INSTALLER_EXTENSIONS {
        if let Some(path) = files.iter().find(|path| {
            path.extension()
                .and_then(|value| value.to_str())
                .map(|value| value.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        }) {
            return Some(path.clone());
        }
    }

    None
}
