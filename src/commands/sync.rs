//! One synchronization pass

use crate::config::Config;
use crate::diff::{generate_sync_plan, DiffPlan};
use crate::executor::{apply_plan, ApplyContext, EventSink, HashPool, SyncReport};
use crate::scanner::{scan_directory, TreeRole};
use crate::types::{FileTree, MirrorError};
use indicatif::{HumanBytes, HumanDuration};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Runs passes between a fixed source and replica.
///
/// Owns the hashing pool so every pass reuses the same workers.
pub struct SyncEngine {
    source: PathBuf,
    replica: PathBuf,
    pool: HashPool,
    prune_empty_dirs: bool,
}

impl SyncEngine {
    pub fn new(
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        workers: usize,
    ) -> Result<Self, MirrorError> {
        Ok(Self {
            source: source.into(),
            replica: replica.into(),
            pool: HashPool::new(workers)?,
            prune_empty_dirs: true,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, MirrorError> {
        let mut engine = Self::new(&config.source, &config.replica, config.workers)?;
        engine.prune_empty_dirs = config.prune_empty_dirs;
        Ok(engine)
    }

    pub fn with_prune_empty_dirs(mut self, prune: bool) -> Self {
        self.prune_empty_dirs = prune;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn replica(&self) -> &Path {
        &self.replica
    }

    /// Inventory both trees, hash them, diff, and apply.
    ///
    /// Errors returned here abort the pass before the replica is touched
    /// (missing source, scan or hash failure). Per-file copy and remove
    /// failures are reported to `sink` and counted in the report instead.
    pub fn run_pass(&self, sink: &dyn EventSink) -> Result<SyncReport, MirrorError> {
        let started = Instant::now();

        if !self.source.exists() {
            return Err(MirrorError::SourceMissing {
                path: self.source.clone(),
            });
        }

        let src_tree = self.inventory(&self.source, TreeRole::Source)?;
        let dest_tree = self.inventory(&self.replica, TreeRole::Replica)?;

        let plan = generate_sync_plan(&src_tree, &dest_tree)?;
        debug!("{}", format_plan_preview(&plan));

        let ctx = ApplyContext {
            source_root: self.source.clone(),
            replica_root: self.replica.clone(),
            prune_empty_dirs: self.prune_empty_dirs,
        };
        let mut report = apply_plan(&plan, &ctx, sink);
        report.source_files = src_tree.len();
        report.replica_files = dest_tree.len();
        report.duration = started.elapsed();

        if report.changes() == 0 && report.is_clean() {
            debug!("{}", format_pass_summary(&report));
        } else {
            info!("{}", format_pass_summary(&report));
        }

        Ok(report)
    }

    fn inventory(&self, root: &Path, role: TreeRole) -> Result<FileTree, MirrorError> {
        let mut tree = scan_directory(root, role)?;
        let stats = self.pool.hash_tree(&mut tree)?;
        debug!(
            "Inventoried {} files ({}) under {} in {}, hashed with {} workers",
            stats.completed,
            HumanBytes(tree.total_size),
            root.display(),
            HumanDuration(tree.scan_duration),
            stats.workers
        );
        Ok(tree)
    }
}

fn format_plan_preview(plan: &DiffPlan) -> String {
    format!(
        "Plan: create {} update {} delete {} unchanged {} ({} to transfer)",
        plan.stats.create_count,
        plan.stats.update_count,
        plan.stats.delete_count,
        plan.stats.unchanged_count,
        HumanBytes(plan.stats.transfer_bytes)
    )
}

fn format_pass_summary(report: &SyncReport) -> String {
    if report.changes() == 0 && report.is_clean() {
        return format!(
            "Replica already in sync ({} files checked in {})",
            report.source_files,
            HumanDuration(report.duration)
        );
    }

    let mut summary = format!(
        "Pass complete: {} created, {} updated, {} removed, {} unchanged, {} failed | {} copied in {}",
        report.created,
        report.updated,
        report.removed,
        report.unchanged,
        report.failed,
        HumanBytes(report.bytes_copied),
        HumanDuration(report.duration)
    );
    if report.pruned_dirs > 0 {
        summary.push_str(&format!(" | {} empty directories pruned", report.pruned_dirs));
    }
    summary
}
