//! File comparison logic

use crate::types::{FileEntry, MirrorError, SyncAction};

/// Compare a source entry with the replica entry at the same relative path
///
/// Content identity is decided by digest alone: sizes and timestamps are not
/// consulted. Both entries must already be hashed; comparing against an unset
/// digest is refused rather than guessed.
pub fn compare_files(src: &FileEntry, dest: &FileEntry) -> Result<SyncAction, MirrorError> {
    let (src_digest, dest_digest) = match (src.digest, dest.digest) {
        (Some(s), Some(d)) => (s, d),
        _ => {
            return Err(MirrorError::Validation(format!(
                "cannot compare {} before both sides are hashed",
                src.path.display()
            )))
        }
    };

    if src_digest == dest_digest {
        Ok(SyncAction::Unchanged(src.path.clone()))
    } else {
        Ok(SyncAction::Update(src.clone()))
    }
}
