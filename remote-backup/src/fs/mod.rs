//! Remote tree snapshots and local file state.

pub mod metadata;
pub mod snapshot;

pub use metadata::LocalFileState;
pub use snapshot::{take_snapshot, RemoteNode, Snapshot};
