//! Read-only views of what is already installed on the host: a lazily
//! fetched package-manager listing and the registry uninstall keys.

mod registry;
mod snapshot;

pub use registry::{
    enumerate_uninstall_entries, enumerate_uninstall_entries_with_query, find_uninstall_command,
    parse_reg_query_output, registry_reports_installed, UninstallKeyEntry, UNINSTALL_KEY_PATHS,
};
pub use snapshot::InstalledInventory;
