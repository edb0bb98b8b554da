//! Incremental file sync: plan against the local archive, then apply.

pub mod apply;
pub mod plan;

pub use apply::{apply_plan, SyncStats};
pub use plan::{plan_sync, should_pull, SyncPlan};
