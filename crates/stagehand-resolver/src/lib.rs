mod library;
mod resolve;

pub use library::InstallerLibrary;
pub use resolve::{resolve, ResolveError, ResolvedAction, INSTALLER_EXTENSIONS};

#[cfg(test)]
mod tests;
