use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Install,
    Uninstall,
    Update,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::Update => "update",
        }
    }
}

/// One selected entry turned into queued work. Immutable once enqueued;
/// `package_ref` marks items routed through the package manager instead of
/// the local installer library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub identifier: String,
    pub kind: OperationKind,
    pub resolved_path: Option<PathBuf>,
    pub package_ref: Option<String>,
}

impl WorkItem {
    pub fn new(identifier: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            resolved_path: None,
            package_ref: None,
        }
    }

    pub fn with_package_ref(mut self, package_ref: impl Into<String>) -> Self {
        self.package_ref = Some(package_ref.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub identifier: String,
    pub success: bool,
    pub detail: Option<String>,
}

/// Classified, non-fatal ways a single operation can fail. Anything outside
/// this set is an unclassified error and aborts the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("process reported {status}")]
    NonZeroExit { status: String },
    #[error("elevation was denied by the operating system")]
    ElevationDenied,
    #[error("package manager reported no matching installed package")]
    NotFoundOutput,
    #[error("no uninstall command was found under the registry uninstall keys")]
    UninstallCommandNotFound,
    #[error("target resolution failed: {0}")]
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded,
    Failed(FailureReason),
}

impl ItemOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}
