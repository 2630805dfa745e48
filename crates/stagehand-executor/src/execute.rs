use std::io;
use std::process::Command;

use anyhow::{Context, Result};
use stagehand_core::{
    FailureReason, ItemOutcome, OperationExecutor, PackageCatalog, UninstallCatalog, WorkItem,
};
use stagehand_inventory::{
    enumerate_uninstall_entries, find_uninstall_command, UninstallKeyEntry,
};
use stagehand_resolver::{resolve, InstallerLibrary, ResolvedAction};
use tracing::info;

use crate::run::{run_blocking, RunReport};

/// Windows reports a declined elevation prompt as this OS error when
/// spawning a binary whose manifest requires administrator rights.
pub const ELEVATION_DENIED_OS_ERROR: i32 = 740;

/// Emitted by the package manager when an upgrade finds nothing to do; the
/// exit code is non-zero even though the package is already current.
pub const NO_NEWER_VERSIONS_MARKER: &str = "No newer package versions are available";

/// Emitted by the package manager when an uninstall query matches nothing.
pub const MANAGER_NOT_FOUND_MARKER: &str = "No installed package found";

/// Executes work items one at a time: resolves each to a concrete action,
/// spawns the child process, and classifies the result. Classified failures
/// come back as [`ItemOutcome::Failed`]; only unclassified errors (a manager
/// binary that cannot start, a broken runner) are returned as `Err` and
/// abort the batch.
pub struct BatchExecutor<Runner = fn(&mut Command) -> io::Result<RunReport>> {
    library: InstallerLibrary,
    packages: PackageCatalog,
    uninstalls: UninstallCatalog,
    registry_entries: Option<Vec<UninstallKeyEntry>>,
    runner: Runner,
}

impl BatchExecutor {
    pub fn new(
        library: InstallerLibrary,
        packages: PackageCatalog,
        uninstalls: UninstallCatalog,
    ) -> Self {
        Self::with_runner(library, packages, uninstalls, run_blocking)
    }
}

impl<Runner> BatchExecutor<Runner>
where
    Runner: FnMut(&mut Command) -> io::Result<RunReport>,
{
    pub fn with_runner(
        library: InstallerLibrary,
        packages: PackageCatalog,
        uninstalls: UninstallCatalog,
        runner: Runner,
    ) -> Self {
        Self {
            library,
            packages,
            uninstalls,
            registry_entries: None,
            runner,
        }
    }

    /// Pre-seeds the registry uninstall entries instead of enumerating them
    /// from the live registry on first use.
    pub fn with_registry_entries(mut self, entries: Vec<UninstallKeyEntry>) -> Self {
        self.registry_entries = Some(entries);
        self
    }

    fn registry_entries(&mut self) -> &[UninstallKeyEntry] {
        self.registry_entries
            .get_or_insert_with(enumerate_uninstall_entries)
    }

    /// Runs the command, classifying a declined elevation prompt as `None`.
    /// Any other spawn failure is unclassified and propagates.
    fn run_classified(
        &mut self,
        command: &mut Command,
        context_message: &str,
    ) -> Result<Option<RunReport>> {
        match (self.runner)(command) {
            Ok(report) => Ok(Some(report)),
            Err(err) if err.raw_os_error() == Some(ELEVATION_DENIED_OS_ERROR) => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("{context_message}: command failed to start"))
            }
        }
    }

    fn run_installer(&mut self, path: &std::path::Path) -> Result<ItemOutcome> {
        info!(installer = %path.display(), "launching installer");
        let mut command = Command::new(path);
        let Some(report) = self.run_classified(
            &mut command,
            &format!("installer '{}'", path.display()),
        )?
        else {
            return Ok(ItemOutcome::Failed(FailureReason::ElevationDenied));
        };
        if report.success {
            return Ok(ItemOutcome::Succeeded);
        }
        Ok(ItemOutcome::Failed(FailureReason::NonZeroExit {
            status: report.status,
        }))
    }

    fn run_manager_install(&mut self, package_ref: &str) -> Result<ItemOutcome> {
        info!(package_ref, "installing through the package manager");
        let mut command = manager_command("install", package_ref);
        let Some(report) =
            self.run_classified(&mut command, &format!("manager install of '{package_ref}'"))?
        else {
            return Ok(ItemOutcome::Failed(FailureReason::ElevationDenied));
        };
        if report.success {
            return Ok(ItemOutcome::Succeeded);
        }
        Ok(ItemOutcome::Failed(FailureReason::NonZeroExit {
            status: report.status,
        }))
    }

    fn run_manager_update(&mut self, package_ref: &str) -> Result<ItemOutcome> {
        info!(package_ref, "updating through the package manager");
        let mut command = manager_command("upgrade", package_ref);
        let Some(report) =
            self.run_classified(&mut command, &format!("manager update of '{package_ref}'"))?
        else {
            return Ok(ItemOutcome::Failed(FailureReason::ElevationDenied));
        };
        // An already-current package exits non-zero but is not a failure.
        if report.success || report.mentions(NO_NEWER_VERSIONS_MARKER) {
            return Ok(ItemOutcome::Succeeded);
        }
        Ok(ItemOutcome::Failed(FailureReason::NonZeroExit {
            status: report.status,
        }))
    }

    fn run_manager_uninstall(&mut self, package_ref: &str) -> Result<ItemOutcome> {
        info!(package_ref, "uninstalling through the package manager");
        let mut command = manager_command("uninstall", package_ref);
        let Some(report) = self.run_classified(
            &mut command,
            &format!("manager uninstall of '{package_ref}'"),
        )?
        else {
            return Ok(ItemOutcome::Failed(FailureReason::ElevationDenied));
        };
        // Success requires a clean exit and no "not found" class output; the
        // manager sometimes exits zero while matching nothing.
        if report.mentions(MANAGER_NOT_FOUND_MARKER) {
            return Ok(ItemOutcome::Failed(FailureReason::NotFoundOutput));
        }
        if report.success {
            return Ok(ItemOutcome::Succeeded);
        }
        Ok(ItemOutcome::Failed(FailureReason::NonZeroExit {
            status: report.status,
        }))
    }

    fn run_registry_uninstall(&mut self, display_name: &str) -> Result<ItemOutcome> {
        let uninstall_string = {
            let entries = self.registry_entries();
            match find_uninstall_command(entries, display_name) {
                Some(entry) => entry
                    .uninstall_string
                    .clone()
                    .unwrap_or_default(),
                None => {
                    return Ok(ItemOutcome::Failed(
                        FailureReason::UninstallCommandNotFound,
                    ));
                }
            }
        };

        info!(display_name, command = %uninstall_string, "running registry uninstall command");
        let mut command = shell_command(&uninstall_string);
        let Some(report) = self.run_classified(
            &mut command,
            &format!("registry uninstall of '{display_name}'"),
        )?
        else {
            return Ok(ItemOutcome::Failed(FailureReason::ElevationDenied));
        };
        if report.success {
            return Ok(ItemOutcome::Succeeded);
        }
        Ok(ItemOutcome::Failed(FailureReason::NonZeroExit {
            status: report.status,
        }))
    }
}

impl<Runner> OperationExecutor for BatchExecutor<Runner>
where
    Runner: FnMut(&mut Command) -> io::Result<RunReport> + Send,
{
    fn execute(&mut self, item: &WorkItem) -> Result<ItemOutcome> {
        let action = match resolve(item, &self.library, &self.packages, &self.uninstalls) {
            Ok(action) => action,
            Err(err) => {
                return Ok(ItemOutcome::Failed(FailureReason::Unresolved(
                    err.to_string(),
                )));
            }
        };

        match action {
            ResolvedAction::RunInstaller(path) => self.run_installer(&path),
            ResolvedAction::ManagerInstall { package_ref } => {
                self.run_manager_install(&package_ref)
            }
            ResolvedAction::ManagerUpdate { package_ref } => self.run_manager_update(&package_ref),
            ResolvedAction::ManagerUninstall { package_ref } => {
                self.run_manager_uninstall(&package_ref)
            }
            ResolvedAction::RegistryUninstall { display_name } => {
                self.run_registry_uninstall(&display_name)
            }
        }
    }
}

fn manager_command(verb: &str, package_ref: &str) -> Command {
    let mut command = Command::new("winget");
    command.arg(verb).arg(package_ref);
    // The agreement flags only exist on the install verb; uninstall and
    // upgrade reject them.
    if verb == "install" {
        command.args(["--accept-package-agreements", "--accept-source-agreements"]);
    }
    command
}

/// Uninstall strings are full command lines recorded by the vendor, so they
/// go through the platform shell rather than a direct spawn.
fn shell_command(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(command_line);
        command
    } else {
        let mut command = Command::new("sh");
        command.arg("-c").arg(command_line);
        command
    }
}
