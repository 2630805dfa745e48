use std::env;
use std::path::PathBuf;

pub const LIBRARY_ENV: &str = "STAGEHAND_LIBRARY";
pub const CATALOG_ENV: &str = "STAGEHAND_CATALOG";
pub const UNINSTALL_CATALOG_ENV: &str = "STAGEHAND_UNINSTALL_CATALOG";

const DEFAULT_LIBRARY_ROOT: &str = "Programs";
const DEFAULT_CATALOG: &str = "packages.json";
const DEFAULT_UNINSTALL_CATALOG: &str = "uninstall.json";

/// Resolved input locations: the installer library tree and the two JSON
/// catalogs. Flags win over environment variables, which win over the
/// defaults relative to the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub library_root: PathBuf,
    pub catalog_path: PathBuf,
    pub uninstall_catalog_path: PathBuf,
}

impl Config {
    pub fn resolve(
        library_flag: Option<PathBuf>,
        catalog_flag: Option<PathBuf>,
        uninstall_catalog_flag: Option<PathBuf>,
    ) -> Self {
        Self::resolve_with_env(library_flag, catalog_flag, uninstall_catalog_flag, |name| {
            env::var_os(name).map(PathBuf::from)
        })
    }

    pub(crate) fn resolve_with_env(
        library_flag: Option<PathBuf>,
        catalog_flag: Option<PathBuf>,
        uninstall_catalog_flag: Option<PathBuf>,
        mut lookup: impl FnMut(&str) -> Option<PathBuf>,
    ) -> Self {
        Self {
            library_root: library_flag
                .or_else(|| lookup(LIBRARY_ENV))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LIBRARY_ROOT)),
            catalog_path: catalog_flag
                .or_else(|| lookup(CATALOG_ENV))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG)),
            uninstall_catalog_path: uninstall_catalog_flag
                .or_else(|| lookup(UNINSTALL_CATALOG_ENV))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UNINSTALL_CATALOG)),
        }
    }
}
