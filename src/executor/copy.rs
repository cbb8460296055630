//! Atomic file copy implementation

use crate::types::MirrorError;
use filetime::FileTime;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Suffix of in-flight copies. A leftover from a crashed copy is an ordinary
/// extraneous replica file and is removed by the next pass.
pub const PART_SUFFIX: &str = ".dirmirror-part";

/// Temporary names tried per copy before giving up
const MAX_PART_ATTEMPTS: u32 = 16;

const COPY_BUFFER_SIZE: usize = 128 * 1024;

/// Copy a file atomically using the write-then-rename strategy
///
/// 1. Create the destination's parent chain (idempotent)
/// 2. Stream `src` into a hidden `.part` sibling of `dest`
/// 3. Flush and sync to disk
/// 4. Carry over permissions, access and modification times
/// 5. Rename over `dest`, replacing any existing file
///
/// A reader of `dest` sees either the old content or the new content, never a
/// partial file. The `.part` file is created exclusively, so an existing file
/// that happens to carry the temporary name is never overwritten; the next
/// free name from [`part_path_for`] is used instead. On failure the `.part`
/// file is removed.
///
/// # Returns
/// * `Ok(u64)` - Number of bytes copied
/// * `Err(MirrorError::Copy)` - carrying both paths and the IO cause
///
/// # Example
/// ```no_run
/// use dirmirror::executor::copy_file_atomic;
/// use std::path::Path;
///
/// let bytes = copy_file_atomic(Path::new("source.txt"), Path::new("replica/dest.txt"))?;
/// # Ok::<(), dirmirror::types::MirrorError>(())
/// ```
pub fn copy_file_atomic(src: &Path, dest: &Path) -> Result<u64, MirrorError> {
    let copy_error = |source| MirrorError::Copy {
        src: src.to_path_buf(),
        dst: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(copy_error)?;
    }

    let src_file = File::open(src).map_err(copy_error)?;
    let (part_path, part_file) = create_part_file(dest).map_err(copy_error)?;

    let result = copy_via_part(src_file, part_file, &part_path, dest);
    if result.is_err() {
        let _ = fs::remove_file(&part_path);
    }

    result.map_err(copy_error)
}

fn copy_via_part(
    mut src_file: File,
    mut part_file: File,
    part_path: &Path,
    dest: &Path,
) -> io::Result<u64> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = match src_file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        part_file.write_all(&buffer[..bytes_read])?;
        total_bytes += bytes_read as u64;
    }

    part_file.sync_all()?;

    // Drop the file handle before rename (required on Windows)
    drop(part_file);

    let src_metadata = src_file.metadata()?;
    fs::set_permissions(part_path, src_metadata.permissions())?;
    filetime::set_file_times(
        part_path,
        FileTime::from_last_access_time(&src_metadata),
        FileTime::from_last_modification_time(&src_metadata),
    )?;

    fs::rename(part_path, dest)?;

    Ok(total_bytes)
}

/// Create the first temporary sibling of `dest` that does not exist yet
fn create_part_file(dest: &Path) -> io::Result<(PathBuf, File)> {
    for attempt in 0..MAX_PART_ATTEMPTS {
        let part_path = part_path_for(dest, attempt);
        match OpenOptions::new().write(true).create_new(true).open(&part_path) {
            Ok(file) => return Ok((part_path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free temporary name next to {}", dest.display()),
    ))
}

/// `dir/name.ext` → `dir/.name.ext.dirmirror-part` for attempt 0,
/// `dir/.name.ext.<attempt>.dirmirror-part` after that
pub fn part_path_for(dest: &Path, attempt: u32) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(dest.file_name().unwrap_or_default());
    if attempt > 0 {
        name.push(format!(".{attempt}"));
    }
    name.push(PART_SUFFIX);
    dest.with_file_name(name)
}
