//! Configuration management

use crate::logging::resolve_log_file;
use crate::types::MirrorError;
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Default log rotation threshold (5 MiB)
pub const DEFAULT_LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Default number of rotated log files kept
pub const DEFAULT_LOG_BACKUPS: usize = 2;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(
    name = "dirmirror",
    version,
    about = "Keep a replica directory identical to a source directory"
)]
pub struct Cli {
    /// Directory to mirror from (never modified)
    pub source: Option<PathBuf>,

    /// Directory kept identical to the source
    pub replica: Option<PathBuf>,

    /// Seconds between synchronization passes
    #[arg(short, long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Log file, or a directory to hold logfile.log
    #[arg(short, long = "log", value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// TOML file with default settings (flags override it)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of files hashed concurrently
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Run a single pass and exit
    #[arg(long)]
    pub once: bool,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Settings read from a TOML file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub source: Option<PathBuf>,
    pub replica: Option<PathBuf>,
    pub interval: Option<u64>,
    pub log_path: Option<PathBuf>,
    pub workers: Option<usize>,
    pub log_max_bytes: Option<u64>,
    pub log_backups: Option<usize>,
    pub prune_empty_dirs: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, MirrorError> {
        let text = fs::read_to_string(path).map_err(|e| {
            MirrorError::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
            .map_err(|e| MirrorError::Config(format!("invalid config file {}: {}", path.display(), e)))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Global configuration for dirmirror
#[derive(Debug, Clone)]
pub struct Config {
    /// Source directory
    pub source: PathBuf,

    /// Replica directory
    pub replica: PathBuf,

    /// Seconds between passes
    pub interval_secs: u64,

    /// Log destination as given (file or directory)
    pub log_path: PathBuf,

    /// Concurrent hashers
    pub workers: usize,

    /// Rotate the log file past this size
    pub log_max_bytes: u64,

    /// Rotated log files kept
    pub log_backups: usize,

    /// Remove directories emptied by deletions
    pub prune_empty_dirs: bool,

    /// Single pass, then exit
    pub once: bool,

    /// Debug-level logging
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            replica: PathBuf::new(),
            interval_secs: 60,
            log_path: PathBuf::new(),
            workers: num_cpus::get(),
            log_max_bytes: DEFAULT_LOG_MAX_BYTES,
            log_backups: DEFAULT_LOG_BACKUPS,
            prune_empty_dirs: true,
            once: false,
            verbose: false,
        }
    }
}

impl Config {
    pub fn new(
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        interval_secs: u64,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: source.into(),
            replica: replica.into(),
            interval_secs,
            log_path: log_path.into(),
            ..Default::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Log file path with the directory form resolved.
    pub fn log_file(&self) -> PathBuf {
        resolve_log_file(&self.log_path)
    }

    /// Merge a config file (if any) under the command-line flags.
    pub fn from_sources(cli: Cli, file: Option<FileConfig>) -> Result<Self, MirrorError> {
        let file = file.unwrap_or_default();
        let defaults = Config::default();

        let source = require(cli.source.or(file.source), "source")?;
        let replica = require(cli.replica.or(file.replica), "replica")?;
        let interval_secs = require(cli.interval.or(file.interval), "interval")?;
        let log_path = require(cli.log.or(file.log_path), "log")?;

        Ok(Self {
            source,
            replica,
            interval_secs,
            log_path,
            workers: cli.workers.or(file.workers).unwrap_or(defaults.workers),
            log_max_bytes: file.log_max_bytes.unwrap_or(defaults.log_max_bytes),
            log_backups: file.log_backups.unwrap_or(defaults.log_backups),
            prune_empty_dirs: file.prune_empty_dirs.unwrap_or(defaults.prune_empty_dirs),
            once: cli.once,
            verbose: cli.verbose,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), MirrorError> {
        if !self.source.exists() {
            return Err(MirrorError::Config(format!(
                "Source path does not exist: {}",
                self.source.display()
            )));
        }

        if !self.source.is_dir() {
            return Err(MirrorError::Config(format!(
                "Source path is not a directory: {}",
                self.source.display()
            )));
        }

        if self.replica.exists() && !self.replica.is_dir() {
            return Err(MirrorError::Config(format!(
                "Replica path exists and is not a directory: {}",
                self.replica.display()
            )));
        }

        if self.interval_secs == 0 {
            return Err(MirrorError::Config(
                "Interval must be a positive number of seconds".to_string(),
            ));
        }

        if self.workers == 0 {
            return Err(MirrorError::Config("Workers must be at least 1".to_string()));
        }

        if self.log_max_bytes == 0 {
            return Err(MirrorError::Config(
                "log_max_bytes must be greater than zero".to_string(),
            ));
        }

        let source = absolute_path(&self.source)?;
        let replica = absolute_path(&self.replica)?;

        if source == replica {
            return Err(MirrorError::Config(
                "Source and replica cannot be the same".to_string(),
            ));
        }

        if replica.starts_with(&source) {
            return Err(MirrorError::Config(format!(
                "Replica {} is inside source {}",
                self.replica.display(),
                self.source.display()
            )));
        }

        if source.starts_with(&replica) {
            return Err(MirrorError::Config(format!(
                "Source {} is inside replica {}",
                self.source.display(),
                self.replica.display()
            )));
        }

        let log_file = absolute_path(&self.log_file())?;
        if log_file.starts_with(&source) || log_file.starts_with(&replica) {
            return Err(MirrorError::Config(format!(
                "Log file {} must be outside the source and replica trees",
                log_file.display()
            )));
        }

        Ok(())
    }
}

impl TryFrom<Cli> for Config {
    type Error = MirrorError;

    /// Load the optional config file, merge, and validate.
    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let file = cli.config.as_deref().map(FileConfig::load).transpose()?;
        let config = Config::from_sources(cli, file)?;
        config.validate()?;
        Ok(config)
    }
}

fn require<T>(value: Option<T>, name: &str) -> Result<T, MirrorError> {
    value.ok_or_else(|| {
        MirrorError::Config(format!(
            "missing required setting `{name}` (pass it on the command line or in --config)"
        ))
    })
}

/// Canonical form of `path`, for paths that may not exist yet.
///
/// The deepest existing ancestor is canonicalized and the remaining
/// components are appended lexically.
fn absolute_path(path: &Path) -> Result<PathBuf, MirrorError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut existing = joined.as_path();
    let mut rest: Vec<Component<'_>> = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut result = canonical;
            for component in rest.iter().rev() {
                match component {
                    Component::ParentDir => {
                        result.pop();
                    }
                    Component::CurDir => {}
                    other => result.push(other.as_os_str()),
                }
            }
            return Ok(result);
        }

        match (existing.parent(), existing.components().next_back()) {
            (Some(parent), Some(last)) => {
                rest.push(last);
                existing = parent;
            }
            _ => return Ok(joined),
        }
    }
}
