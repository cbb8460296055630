//! # dirmirror - One-way directory mirroring
//!
//! Keeps a replica directory identical to a source directory. Every pass
//! inventories both trees, compares file contents by BLAKE3 digest, copies
//! new and changed files, and removes replica files the source no longer has.
//! Passes repeat on a fixed interval until interrupted.

// Module declarations
pub mod commands;
pub mod config;
pub mod diff;
pub mod executor;
pub mod hash;
pub mod logging;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use commands::{Driver, SyncEngine};
pub use config::Config;
pub use executor::{EventSink, SyncEvent, SyncReport};
pub use types::{Digest, FileEntry, FileTree, MirrorError, SyncAction};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
