mod catalog;
mod item;
mod queue;

pub use catalog::{PackageCatalog, PackageEntry, UninstallCatalog, UninstallEntry};
pub use item::{FailureReason, ItemOutcome, OperationKind, OperationResult, WorkItem};
pub use queue::{BatchObserver, BatchSummary, OperationExecutor, QueueDriver, QueueState};
