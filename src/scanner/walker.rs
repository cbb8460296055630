//! Recursive directory walker

use crate::types::{FileEntry, FileTree, MirrorError};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Which side of the mirror a scan inventories
///
/// The two sides differ in how they treat trouble below the root. A source
/// entry that cannot be read must fail the scan, otherwise its replica copy
/// would look extraneous and get deleted. A replica entry that cannot be read
/// is only a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeRole {
    Source,
    Replica,
}

/// Scan a directory and build a FileTree with unset digests
///
/// Walks the tree recursively with the `ignore` crate, all of its filters
/// disabled: hidden files, `.gitignore` and friends are mirrored like any
/// other file.
///
/// Symlink policy: links are not followed into directories. A link that
/// resolves to a regular file is inventoried as a file (its content is what
/// gets hashed and copied). Links to directories and dangling links are
/// skipped in the source; in the replica they are recorded in
/// `FileTree::stray_links` so the link itself can be removed.
///
/// # Errors
/// * `root_path` missing → `Ok` with an empty tree
/// * `root_path` not a directory → `MirrorError::Validation`
/// * `root_path` unreadable → `MirrorError::Scan`
/// * Errors below the root → `MirrorError::Scan` for [`TreeRole::Source`],
///   logged and skipped for [`TreeRole::Replica`]
pub fn scan_directory(root_path: &Path, role: TreeRole) -> Result<FileTree, MirrorError> {
    let start_time = Instant::now();
    let mut tree = FileTree::new(root_path.to_path_buf());

    match fs::metadata(root_path) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(MirrorError::Validation(format!(
                "{} exists but is not a directory",
                root_path.display()
            )))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} does not exist, treating as empty", root_path.display());
            return Ok(tree);
        }
        Err(source) => {
            return Err(MirrorError::Scan {
                path: root_path.to_path_buf(),
                source,
            })
        }
    }

    // The walker only reports an unreadable root as an entry error, which
    // would otherwise look like an empty tree.
    fs::read_dir(root_path).map_err(|source| MirrorError::Scan {
        path: root_path.to_path_buf(),
        source,
    })?;

    let walker = ignore::WalkBuilder::new(root_path)
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .build();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) if role == TreeRole::Source => return Err(traversal_error(root_path, &e)),
            Err(e) => {
                warn!(
                    "Error during directory traversal: {}. Scan will continue with remaining files.",
                    e
                );
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        let file_type = match entry.file_type() {
            Some(ft) => ft,
            None => continue,
        };

        if file_type.is_dir() {
            tree.increment_dirs();
            continue;
        }

        let relative_path = match entry.path().strip_prefix(root_path) {
            Ok(p) => p.to_path_buf(),
            Err(_) => {
                warn!(
                    "Failed to calculate relative path for {}. File will be skipped.",
                    entry.path().display()
                );
                continue;
            }
        };

        let file_entry = if file_type.is_symlink() {
            match fs::metadata(entry.path()) {
                Ok(target) if target.is_file() => {
                    FileEntry::new_linked(relative_path.clone(), target.len())
                }
                Ok(_) if role == TreeRole::Replica => {
                    debug!("Symlink {} does not point at a file", entry.path().display());
                    tree.add_stray_link(relative_path);
                    continue;
                }
                Err(e) if role == TreeRole::Replica => {
                    debug!("Dangling symlink {}: {}", entry.path().display(), e);
                    tree.add_stray_link(relative_path);
                    continue;
                }
                Ok(_) => {
                    warn!(
                        "Skipping symlink {}: target is not a regular file",
                        entry.path().display()
                    );
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(
                        "Skipping dangling symlink {}: {}",
                        entry.path().display(),
                        e
                    );
                    continue;
                }
                Err(source) => {
                    return Err(MirrorError::Scan {
                        path: entry.path().to_path_buf(),
                        source,
                    })
                }
            }
        } else if file_type.is_file() {
            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(e) => {
                    let vanished = e.io_error().map(io::Error::kind) == Some(ErrorKind::NotFound);
                    if role == TreeRole::Source && !vanished {
                        return Err(traversal_error(root_path, &e));
                    }
                    warn!(
                        "Failed to read metadata for {}: {}. The file may have been deleted during scan.",
                        entry.path().display(),
                        e
                    );
                    continue;
                }
            };
            FileEntry::new(relative_path.clone(), size)
        } else {
            // pipes, sockets, devices
            debug!("Skipping special file {}", entry.path().display());
            continue;
        };

        tree.insert(relative_path, file_entry);
    }

    tree.set_scan_duration(start_time.elapsed());
    debug!(
        "Scanned {}: {} files, {} dirs in {:?}",
        root_path.display(),
        tree.total_files,
        tree.total_dirs,
        tree.scan_duration
    );

    Ok(tree)
}

/// Turn a walker error into `MirrorError::Scan`, keeping the io error kind
fn traversal_error(root_path: &Path, err: &ignore::Error) -> MirrorError {
    let path = failing_path(err).unwrap_or_else(|| root_path.to_path_buf());
    let source = match err.io_error() {
        Some(io_err) => io::Error::new(io_err.kind(), io_err.to_string()),
        None => io::Error::other(err.to_string()),
    };
    MirrorError::Scan { path, source }
}

fn failing_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            failing_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.clone()),
        _ => None,
    }
}
