//! Process-level concerns: signal handling and interrupt cleanup.

pub mod shutdown;
