//! Runs resolved operations as child processes: local installer binaries,
//! package manager invocations, and registry uninstall commands.

mod execute;
mod run;

pub use execute::{
    BatchExecutor, ELEVATION_DENIED_OS_ERROR, MANAGER_NOT_FOUND_MARKER, NO_NEWER_VERSIONS_MARKER,
};
pub use run::{run_blocking, RunReport};
