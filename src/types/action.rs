//! SyncAction - decisions produced by the diff engine

use super::FileEntry;
use std::path::PathBuf;

/// Sync action determined by diff engine
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// Copy new file (exists in source, missing in replica)
    Create(FileEntry),

    /// Overwrite existing file (digests differ)
    Update(FileEntry),

    /// Remove replica file (missing in source)
    Delete(PathBuf),

    /// Digests equal, nothing to do
    Unchanged(PathBuf),
}

impl SyncAction {
    /// Relative path this action targets
    pub fn path(&self) -> &PathBuf {
        match self {
            SyncAction::Create(entry) | SyncAction::Update(entry) => &entry.path,
            SyncAction::Delete(path) | SyncAction::Unchanged(path) => path,
        }
    }

    /// Short label used in events and logs
    pub fn action_name(&self) -> &'static str {
        match self {
            SyncAction::Create(_) => "Create",
            SyncAction::Update(_) => "Update",
            SyncAction::Delete(_) => "Delete",
            SyncAction::Unchanged(_) => "Unchanged",
        }
    }

    /// Create or Update
    pub fn is_transfer(&self) -> bool {
        matches!(self, SyncAction::Create(_) | SyncAction::Update(_))
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, SyncAction::Delete(_))
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, SyncAction::Unchanged(_))
    }
}
