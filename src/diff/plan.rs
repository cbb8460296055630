//! DiffPlan generation

use crate::diff::compare_files;
use crate::types::{FileTree, MirrorError, SyncAction};

/// Diff plan containing actions and statistics
#[derive(Debug, Clone, PartialEq)]
pub struct DiffPlan {
    /// List of sync actions to execute
    pub actions: Vec<SyncAction>,

    /// Aggregate statistics about the plan
    pub stats: PlanStats,
}

impl DiffPlan {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            stats: PlanStats::default(),
        }
    }

    /// Add an action to the plan and update statistics
    pub fn add_action(&mut self, action: SyncAction) {
        match &action {
            SyncAction::Create(entry) => {
                self.stats.create_count += 1;
                self.stats.transfer_bytes += entry.size;
            }
            SyncAction::Update(entry) => {
                self.stats.update_count += 1;
                self.stats.transfer_bytes += entry.size;
            }
            SyncAction::Delete(_) => {
                self.stats.delete_count += 1;
            }
            SyncAction::Unchanged(_) => {
                self.stats.unchanged_count += 1;
            }
        }

        self.actions.push(action);
    }

    /// Sort actions by path for deterministic output
    pub fn sort_by_path(&mut self) {
        self.actions.sort_by(|a, b| a.path().cmp(b.path()));
    }

    /// Create/Update actions, in plan order
    pub fn transfers(&self) -> impl Iterator<Item = &SyncAction> {
        self.actions.iter().filter(|a| a.is_transfer())
    }

    /// Delete actions, in plan order
    pub fn deletes(&self) -> impl Iterator<Item = &SyncAction> {
        self.actions.iter().filter(|a| a.is_delete())
    }

    /// True when applying the plan would not touch the replica
    pub fn is_noop(&self) -> bool {
        self.stats.create_count == 0 && self.stats.update_count == 0 && self.stats.delete_count == 0
    }
}

impl Default for DiffPlan {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about a diff plan
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanStats {
    pub create_count: usize,
    pub update_count: usize,
    pub delete_count: usize,
    pub unchanged_count: usize,

    /// Bytes to copy (Create + Update), from scan-time sizes
    pub transfer_bytes: u64,
}

/// Generate a sync plan by comparing source and replica inventories
///
/// Every source path becomes Create, Update or Unchanged; every replica path
/// absent from the source becomes Delete, and so does every stray replica
/// symlink. Both trees must be fully hashed.
///
/// # Example
/// ```
/// use dirmirror::diff::generate_sync_plan;
/// use dirmirror::types::{Digest, FileEntry, FileTree};
/// use std::path::PathBuf;
///
/// let mut src = FileTree::new(PathBuf::from("src"));
/// let dest = FileTree::new(PathBuf::from("dst"));
/// src.insert(
///     PathBuf::from("new.txt"),
///     FileEntry::new(PathBuf::from("new.txt"), 4).with_digest(Digest::from_bytes([7; 32])),
/// );
///
/// let plan = generate_sync_plan(&src, &dest).unwrap();
/// assert_eq!(plan.stats.create_count, 1);
/// ```
pub fn generate_sync_plan(src_tree: &FileTree, dest_tree: &FileTree) -> Result<DiffPlan, MirrorError> {
    for tree in [src_tree, dest_tree] {
        if !tree.is_fully_hashed() {
            return Err(MirrorError::Validation(format!(
                "inventory of {} has {} unhashed entries",
                tree.root_path.display(),
                tree.unhashed_paths().count()
            )));
        }
    }

    let mut plan = DiffPlan::new();

    for (path, src_entry) in src_tree.iter() {
        match dest_tree.get(path) {
            None => plan.add_action(SyncAction::Create(src_entry.clone())),
            Some(dest_entry) => plan.add_action(compare_files(src_entry, dest_entry)?),
        }
    }

    for path in dest_tree.paths().chain(&dest_tree.stray_links) {
        if !src_tree.contains(path) {
            plan.add_action(SyncAction::Delete(path.clone()));
        }
    }

    plan.sort_by_path();

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Digest, FileEntry};
    use std::path::PathBuf;

    fn create_test_entry(name: &str, size: u64) -> FileEntry {
        FileEntry::new(PathBuf::from(name), size)
    }

    #[test]
    fn test_new_plan() {
        let plan = DiffPlan::new();
        assert!(plan.actions.is_empty());
        assert!(plan.is_noop());
    }

    #[test]
    fn test_add_actions_updates_stats() {
        let mut plan = DiffPlan::new();

        plan.add_action(SyncAction::Create(create_test_entry("new.txt", 1000)));
        plan.add_action(SyncAction::Update(create_test_entry("update.txt", 2000)));
        plan.add_action(SyncAction::Delete(PathBuf::from("old.txt")));
        plan.add_action(SyncAction::Unchanged(PathBuf::from("same.txt")));

        assert_eq!(plan.stats.create_count, 1);
        assert_eq!(plan.stats.update_count, 1);
        assert_eq!(plan.stats.delete_count, 1);
        assert_eq!(plan.stats.unchanged_count, 1);
        assert_eq!(plan.stats.transfer_bytes, 3000);
        assert!(!plan.is_noop());
    }

    #[test]
    fn test_unchanged_only_is_noop() {
        let mut plan = DiffPlan::new();
        plan.add_action(SyncAction::Unchanged(PathBuf::from("a")));
        plan.add_action(SyncAction::Unchanged(PathBuf::from("b")));
        assert!(plan.is_noop());
    }

    #[test]
    fn test_sort_by_path() {
        let mut plan = DiffPlan::new();

        plan.add_action(SyncAction::Create(create_test_entry("z.txt", 100)));
        plan.add_action(SyncAction::Delete(PathBuf::from("a.txt")));
        plan.add_action(SyncAction::Create(create_test_entry("m.txt", 300)));

        plan.sort_by_path();

        assert_eq!(plan.actions[0].path(), &PathBuf::from("a.txt"));
        assert_eq!(plan.actions[1].path(), &PathBuf::from("m.txt"));
        assert_eq!(plan.actions[2].path(), &PathBuf::from("z.txt"));
    }

    #[test]
    fn test_transfers_and_deletes_partition_the_plan() {
        let mut plan = DiffPlan::new();
        plan.add_action(SyncAction::Create(create_test_entry("c", 1)));
        plan.add_action(SyncAction::Delete(PathBuf::from("d")));
        plan.add_action(SyncAction::Unchanged(PathBuf::from("u")));
        plan.add_action(SyncAction::Update(create_test_entry("p", 1)));

        assert_eq!(plan.transfers().count(), 2);
        assert_eq!(plan.deletes().count(), 1);
    }

    #[test]
    fn test_generate_refuses_unhashed_inventory() {
        let mut src = FileTree::new(PathBuf::from("src"));
        src.insert(PathBuf::from("a"), create_test_entry("a", 1));
        let dest = FileTree::new(PathBuf::from("dst"));

        let err = generate_sync_plan(&src, &dest).unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_generate_classifies_every_path() {
        let d = |b: u8| Digest::from_bytes([b; 32]);
        let mut src = FileTree::new(PathBuf::from("src"));
        let mut dest = FileTree::new(PathBuf::from("dst"));

        src.insert(PathBuf::from("new"), create_test_entry("new", 1).with_digest(d(1)));
        src.insert(PathBuf::from("same"), create_test_entry("same", 1).with_digest(d(2)));
        src.insert(PathBuf::from("changed"), create_test_entry("changed", 1).with_digest(d(3)));
        dest.insert(PathBuf::from("same"), create_test_entry("same", 1).with_digest(d(2)));
        dest.insert(PathBuf::from("changed"), create_test_entry("changed", 1).with_digest(d(4)));
        dest.insert(PathBuf::from("extra"), create_test_entry("extra", 1).with_digest(d(5)));

        let plan = generate_sync_plan(&src, &dest).unwrap();

        assert_eq!(plan.stats.create_count, 1);
        assert_eq!(plan.stats.update_count, 1);
        assert_eq!(plan.stats.unchanged_count, 1);
        assert_eq!(plan.stats.delete_count, 1);
        assert_eq!(plan.actions.len(), 4);
    }

    #[test]
    fn test_generate_deletes_stray_links() {
        let mut src = FileTree::new(PathBuf::from("src"));
        let mut dest = FileTree::new(PathBuf::from("dst"));
        let digest = Digest::from_bytes([1; 32]);
        src.insert(PathBuf::from("now_a_file"), create_test_entry("now_a_file", 1).with_digest(digest));
        dest.add_stray_link(PathBuf::from("dangling"));
        dest.add_stray_link(PathBuf::from("now_a_file"));

        let plan = generate_sync_plan(&src, &dest).unwrap();

        assert_eq!(plan.stats.delete_count, 1);
        assert_eq!(plan.actions[0], SyncAction::Delete(PathBuf::from("dangling")));
        assert_eq!(plan.stats.create_count, 1);
    }
}
