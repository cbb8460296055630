//! Core type definitions for dirmirror

mod action;
mod entry;
mod error;
mod tree;

pub use action::SyncAction;
pub use entry::{Digest, FileEntry};
pub use error::MirrorError;
pub use tree::FileTree;
