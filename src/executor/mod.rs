//! Executor module for replica mutations

pub mod copy;
pub mod pool;

use crate::diff::DiffPlan;
use crate::types::{MirrorError, SyncAction};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub use copy::copy_file_atomic;
pub use pool::{HashJob, HashPool, PoolStats};

/// Events emitted while applying a plan.
///
/// `Display` renders the log line for the event.
#[derive(Debug)]
pub enum SyncEvent<'a> {
    /// File copied to a path that had no replica file.
    Created {
        src: &'a Path,
        dst: &'a Path,
        bytes: u64,
    },
    /// Replica file overwritten with differing source content.
    Updated {
        src: &'a Path,
        dst: &'a Path,
        bytes: u64,
    },
    /// Replica entry removed (extraneous file, or a blocker in a copy's way).
    Removed { path: &'a Path },
    /// Directory left empty by removals was deleted.
    DirectoryPruned { path: &'a Path },
    /// A copy or remove failed; the pass continued.
    Failed { error: &'a MirrorError },
}

impl SyncEvent<'_> {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncEvent::Failed { .. })
    }
}

impl fmt::Display for SyncEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::Created { src, dst, .. } => {
                write!(f, "Created {} from {}", dst.display(), src.display())
            }
            SyncEvent::Updated { src, dst, .. } => {
                write!(f, "Updated {} from {}", dst.display(), src.display())
            }
            SyncEvent::Removed { path } => write!(f, "Removed {}", path.display()),
            SyncEvent::DirectoryPruned { path } => {
                write!(f, "Pruned empty directory {}", path.display())
            }
            SyncEvent::Failed { error } => write!(f, "{}", error),
        }
    }
}

/// Receiver of sync events.
///
/// Constructed once by the caller and passed by reference into every pass.
/// Any `Fn(&SyncEvent)` closure is a sink.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &SyncEvent<'_>);
}

impl<F> EventSink for F
where
    F: Fn(&SyncEvent<'_>) + Send + Sync,
{
    fn record(&self, event: &SyncEvent<'_>) {
        self(event)
    }
}

/// Per-pass outcome counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub pruned_dirs: usize,
    pub failed: usize,
    /// Aggregate copied bytes (Create + Update).
    pub bytes_copied: u64,
    /// Source files hashed this pass.
    pub source_files: usize,
    /// Replica files hashed this pass.
    pub replica_files: usize,
    /// Relative paths of failed operations.
    pub failed_paths: Vec<PathBuf>,
    pub duration: Duration,
}

impl SyncReport {
    /// No per-file operation failed.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Number of replica mutations performed.
    pub fn changes(&self) -> usize {
        self.created + self.updated + self.removed
    }
}

/// Roots and switches for applying a plan.
#[derive(Debug, Clone)]
pub struct ApplyContext {
    pub source_root: PathBuf,
    pub replica_root: PathBuf,
    /// Remove directories emptied by deletions (never the replica root).
    pub prune_empty_dirs: bool,
}

/// Apply a plan to the replica
///
/// Copy phase first (every Create/Update), then delete phase (every Delete).
/// Each per-file failure is reported to the sink as `Failed`, counted, and
/// skipped; nothing is rolled back. The source tree is only ever read.
pub fn apply_plan(plan: &DiffPlan, ctx: &ApplyContext, sink: &dyn EventSink) -> SyncReport {
    let mut report = SyncReport {
        unchanged: plan.stats.unchanged_count,
        ..Default::default()
    };
    let mut prune_candidates: BTreeSet<PathBuf> = BTreeSet::new();
    // Relative paths removed as blockers; deletes at or below them are done.
    let mut cleared: Vec<PathBuf> = Vec::new();

    for action in plan.transfers() {
        let relative = action.path();
        let src = ctx.source_root.join(relative);
        let dst = ctx.replica_root.join(relative);

        match clear_blockers(&ctx.replica_root, relative, sink, &mut report) {
            Ok(Some(blocker)) => cleared.push(blocker),
            Ok(None) => {}
            Err(err) => {
                record_failure(&mut report, sink, relative, err);
                continue;
            }
        }

        match copy_file_atomic(&src, &dst) {
            Ok(bytes) => {
                report.bytes_copied += bytes;
                let event = match action {
                    SyncAction::Update(_) => {
                        report.updated += 1;
                        SyncEvent::Updated { src: &src, dst: &dst, bytes }
                    }
                    _ => {
                        report.created += 1;
                        SyncEvent::Created { src: &src, dst: &dst, bytes }
                    }
                };
                sink.record(&event);
            }
            Err(err) => record_failure(&mut report, sink, relative, err),
        }
    }

    for action in plan.deletes() {
        let relative = action.path();
        let path = ctx.replica_root.join(relative);

        if cleared.iter().any(|blocker| relative.starts_with(blocker)) {
            debug!("{} already removed with its blocker", path.display());
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                report.removed += 1;
                sink.record(&SyncEvent::Removed { path: &path });
                if let Some(parent) = path.parent() {
                    prune_candidates.insert(parent.to_path_buf());
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} already removed", path.display());
            }
            Err(source) => {
                let err = MirrorError::Remove {
                    path: path.clone(),
                    source,
                };
                record_failure(&mut report, sink, relative, err);
            }
        }
    }

    if ctx.prune_empty_dirs {
        prune_empty_dirs(&ctx.replica_root, prune_candidates, sink, &mut report);
    }

    report
}

fn record_failure(report: &mut SyncReport, sink: &dyn EventSink, relative: &Path, err: MirrorError) {
    report.failed += 1;
    report.failed_paths.push(relative.to_path_buf());
    sink.record(&SyncEvent::Failed { error: &err });
}

/// Remove replica entries whose type prevents placing a file at `relative`:
/// a non-directory at any ancestor position, or a directory at the path
/// itself. Neither can be a source path, since the source holds a directory
/// (resp. a file) there. Returns the relative path of the removed blocker.
fn clear_blockers(
    replica_root: &Path,
    relative: &Path,
    sink: &dyn EventSink,
    report: &mut SyncReport,
) -> Result<Option<PathBuf>, MirrorError> {
    let ancestors: Vec<&Path> = relative
        .ancestors()
        .skip(1)
        .filter(|a| !a.as_os_str().is_empty())
        .collect();

    for ancestor in ancestors.into_iter().rev() {
        let path = replica_root.join(ancestor);
        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => continue,
            Ok(_) => {
                fs::remove_file(&path).map_err(|source| MirrorError::Remove {
                    path: path.clone(),
                    source,
                })?;
                report.removed += 1;
                sink.record(&SyncEvent::Removed { path: &path });
                return Ok(Some(ancestor.to_path_buf()));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(MirrorError::Remove { path, source }),
        }
    }

    let dst = replica_root.join(relative);
    if let Ok(meta) = fs::symlink_metadata(&dst) {
        if meta.is_dir() {
            fs::remove_dir_all(&dst).map_err(|source| MirrorError::Remove {
                path: dst.clone(),
                source,
            })?;
            report.removed += 1;
            sink.record(&SyncEvent::Removed { path: &dst });
            return Ok(Some(relative.to_path_buf()));
        }
    }

    Ok(None)
}

/// Walk up from each candidate, removing empty directories until a non-empty
/// one or the replica root is reached.
fn prune_empty_dirs(
    replica_root: &Path,
    candidates: BTreeSet<PathBuf>,
    sink: &dyn EventSink,
    report: &mut SyncReport,
) {
    // Deepest first so children go before parents.
    for start in candidates.into_iter().rev() {
        let mut current = start.as_path();
        while current != replica_root && current.starts_with(replica_root) {
            if fs::remove_dir(current).is_err() {
                break;
            }
            report.pruned_dirs += 1;
            sink.record(&SyncEvent::DirectoryPruned { path: current });
            current = match current.parent() {
                Some(parent) => parent,
                None => break,
            };
        }
    }
}
