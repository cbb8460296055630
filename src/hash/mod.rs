//! Hashing utilities

use crate::types::{Digest, MirrorError};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read size per chunk when streaming a file into the hasher
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Compute the BLAKE3 digest of a file
///
/// The file is streamed in 64KB chunks, so memory use does not grow with
/// file size. Open and read failures surface as `MirrorError::Hash` carrying
/// the path; no placeholder digest is ever returned.
///
/// # Example
/// ```no_run
/// use dirmirror::hash::compute_hash;
/// use std::path::Path;
///
/// let digest = compute_hash(Path::new("file.txt"))?;
/// println!("{}", digest);
/// # Ok::<(), dirmirror::types::MirrorError>(())
/// ```
pub fn compute_hash(file_path: &Path) -> Result<Digest, MirrorError> {
    let hash_err = |source| MirrorError::Hash {
        path: file_path.to_path_buf(),
        source,
    };

    let mut file = File::open(file_path).map_err(hash_err)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(hash_err(e)),
        };

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Digest::from_bytes(*hasher.finalize().as_bytes()))
}
