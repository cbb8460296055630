//! Size-rotating log file

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name used when the configured log destination is a directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "logfile.log";

/// Resolve the configured log destination to a file path.
///
/// An existing directory gets `logfile.log` inside it; anything else is taken
/// as the file itself.
pub fn resolve_log_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(DEFAULT_LOG_FILE_NAME)
    } else {
        path.to_path_buf()
    }
}

/// Append-only log file that rolls over by size.
///
/// Before a write that would push the file past `max_bytes`, the file is
/// shifted to `<file>.1`, `<file>.1` to `<file>.2` and so on, keeping at most
/// `backups` old files. With zero backups the file is truncated instead.
#[derive(Debug)]
pub struct RotatingFileWriter {
    path: PathBuf,
    file: File,
    size: u64,
    max_bytes: u64,
    backups: usize,
}

impl RotatingFileWriter {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backups: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = open_append(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path,
            file,
            size,
            max_bytes: max_bytes.max(1),
            backups,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<file>.<index>`
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backups == 0 {
            self.file = File::create(&self.path)?;
            self.size = 0;
            return Ok(());
        }

        let oldest = self.backup_path(self.backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = open_append(&self.path)?;
        self.size = 0;
        Ok(())
    }
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.size > 0 && self.size + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.size += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
