//! FileTree - inventory of one directory tree

use super::{Digest, FileEntry};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Inventory of a directory tree
#[derive(Debug, Clone, PartialEq)]
pub struct FileTree {
    /// Map: relative_path → FileEntry
    pub entries: HashMap<PathBuf, FileEntry>,

    /// Aggregate statistics
    pub total_size: u64,
    pub total_files: usize,
    pub total_dirs: usize,

    /// Scan metadata
    pub scan_duration: Duration,
    pub root_path: PathBuf,

    /// Symlinks that are not inventoried as files (dangling, or pointing at
    /// a directory). Only replica scans record them, so they can be removed.
    pub stray_links: Vec<PathBuf>,
}

impl FileTree {
    /// Create a new empty FileTree
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            entries: HashMap::new(),
            total_size: 0,
            total_files: 0,
            total_dirs: 0,
            scan_duration: Duration::from_secs(0),
            root_path,
            stray_links: Vec::new(),
        }
    }

    /// Insert a file entry into the tree
    ///
    /// Updates aggregate statistics (total_size, total_files).
    /// If the path already exists, the old entry is replaced and statistics are adjusted.
    pub fn insert(&mut self, path: PathBuf, entry: FileEntry) {
        if let Some(old_entry) = self.entries.get(&path) {
            self.total_size = self.total_size.saturating_sub(old_entry.size);
            self.total_files = self.total_files.saturating_sub(1);
        }

        self.total_size += entry.size;
        self.total_files += 1;
        self.entries.insert(path, entry);
    }

    pub fn get(&self, path: &Path) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Record a computed digest. Returns false if the path is not in the tree.
    pub fn set_digest(&mut self, path: &Path, digest: Digest) -> bool {
        match self.entries.get_mut(path) {
            Some(entry) => {
                entry.digest = Some(digest);
                true
            }
            None => false,
        }
    }

    /// Paths whose digest has not been computed yet
    pub fn unhashed_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.has_digest())
            .map(|(path, _)| path)
    }

    /// True when every entry carries a digest (vacuously true when empty)
    pub fn is_fully_hashed(&self) -> bool {
        self.entries.values().all(FileEntry::has_digest)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterator over all entries (path, FileEntry pairs)
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &FileEntry)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.keys()
    }

    pub fn set_scan_duration(&mut self, duration: Duration) {
        self.scan_duration = duration;
    }

    pub fn add_stray_link(&mut self, path: PathBuf) {
        self.stray_links.push(path);
    }

    /// Called during directory scanning to track the number of directories traversed
    pub fn increment_dirs(&mut self) {
        self.total_dirs += 1;
    }
}
