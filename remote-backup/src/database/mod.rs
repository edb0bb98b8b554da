//! MySQL dumps and retention of dated dump directories.

pub mod command;
pub mod dump;
pub mod retention;

pub use dump::{bucket_name, dump_databases, list_databases, DumpedDatabase};
pub use retention::{prune, RetentionBucket};
