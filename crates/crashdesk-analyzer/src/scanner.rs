//! Dump-file discovery
//!
//! Walks the configured crash-dump locations for `.dmp` files, validates
//! size and extension, and returns candidates newest-first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::Result;

/// Default cap on dump size considered for analysis (100 MiB)
pub const DEFAULT_MAX_DUMP_SIZE: u64 = 100 * 1024 * 1024;

/// Where and what to scan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    pub locations: Vec<PathBuf>,
    pub max_dump_size: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { locations: Vec::new(), max_dump_size: DEFAULT_MAX_DUMP_SIZE }
    }
}

/// A candidate dump file found on disk
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DumpFile {
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Scans the configured locations for analyzable dump files
pub struct FileScanner {
    config: ScanConfig,
}

impl FileScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Walk every configured location. Missing directories are skipped,
    /// unreadable entries are logged and dropped.
    pub fn scan(&self) -> Result<Vec<DumpFile>> {
        let mut found = Vec::new();
        for location in &self.config.locations {
            if !location.is_dir() {
                tracing::debug!(location = %location.display(), "dump location absent, skipping");
                continue;
            }
            for entry in WalkDir::new(location).max_depth(1).into_iter() {
                let entry = match entry {
                    Ok(e) => e,
                    Err(err) => {
                        tracing::warn!(location = %location.display(), %err, "skipping unreadable entry");
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !has_dump_extension(entry.path()) {
                    continue;
                }
                match self.describe(entry.path()) {
                    Ok(Some(dump)) => found.push(dump),
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(path = %entry.path().display(), %err, "failed to stat dump file");
                    }
                }
            }
        }
        found.sort_by(|a, b| b.modified.cmp(&a.modified));
        tracing::info!(count = found.len(), "dump scan completed");
        Ok(found)
    }

    fn describe(&self, path: &Path) -> Result<Option<DumpFile>> {
        let meta = path.metadata()?;
        let size = meta.len();
        if size == 0 || size > self.config.max_dump_size {
            return Ok(None);
        }
        let modified: DateTime<Utc> = meta.modified()?.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Some(DumpFile { path: path.to_path_buf(), filename, size, modified }))
    }
}

fn has_dump_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("dmp"))
        .unwrap_or(false)
}
