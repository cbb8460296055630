//! Command implementations

pub mod run;
pub mod sync;

pub use run::{Driver, RunSummary, ShutdownHandle};
pub use sync::SyncEngine;
