//! Dataset file discovery.
//!
//! This module finds the dataset files to load under a data path,
//! respecting configuration for extensions, excludes and size limits.

use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration for dataset scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["csv"])
    pub extensions: Vec<String>,
    /// Names to exclude (e.g., ["archive", "tmp"])
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: u64,
    /// Maximum number of files to load
    pub max_files: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["csv".to_string()],
            excludes: vec!["archive".to_string(), "tmp".to_string()],
            max_file_size: 256 * 1024 * 1024, // 256MB
            max_files: None,
        }
    }
}

impl From<&crate::config::DataConfig> for ScanConfig {
    fn from(config: &crate::config::DataConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
            max_files: Some(config.max_files),
        }
    }
}

/// A dataset file found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFile {
    /// Absolute or caller-relative path.
    pub path: PathBuf,
    /// Path relative to the scan root.
    pub relative: String,
    /// File size in bytes
    pub size: u64,
}

/// Scanner for discovering dataset files.
pub struct DatasetScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl DatasetScanner {
    /// Create a new scanner rooted at a file or directory.
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Scan for all matching files, sorted by relative path.
    ///
    /// A root that is itself a file is returned as-is, whatever its
    /// extension.
    pub fn scan(&self) -> Result<Vec<DatasetFile>> {
        if !self.root.exists() {
            return Err(anyhow!("Data path not found: {}", self.root.display()));
        }

        if self.root.is_file() {
            let size = fs::metadata(&self.root)?.len();
            return Ok(vec![DatasetFile {
                path: self.root.clone(),
                relative: self
                    .root
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                size,
            }]);
        }

        let mut files = Vec::new();
        self.walk_dir(&self.root, &mut files)?;
        files.sort_by(|a, b| a.relative.cmp(&b.relative));

        // Apply max_files limit if set
        if let Some(max) = self.config.max_files {
            if files.len() > max {
                warn!(
                    "Found {} dataset files, loading the first {}",
                    files.len(),
                    max
                );
                files.truncate(max);
            }
        }

        Ok(files)
    }

    /// Paths of all matching files.
    pub fn paths(&self) -> Result<Vec<PathBuf>> {
        Ok(self.scan()?.into_iter().map(|f| f.path).collect())
    }

    /// Check if a file matches scan criteria.
    pub fn matches(&self, path: &Path) -> bool {
        // Check if excluded
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if self.is_excluded(name) {
                return false;
            }
        }

        // Check extension
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !self.config.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            return false;
        }

        // Check file size
        match fs::metadata(path) {
            Ok(metadata) => {
                if metadata.len() > self.config.max_file_size {
                    warn!("Skipping oversized dataset: {}", path.display());
                    return false;
                }
            }
            Err(_) => return false,
        }

        true
    }

    /// Check if a name matches exclusion patterns.
    fn is_excluded(&self, name: &str) -> bool {
        // Hidden files and spreadsheet lock files
        if name.starts_with('.') || name.starts_with("~$") {
            return true;
        }

        // Explicit excludes
        self.config.excludes.iter().any(|pattern| name == pattern)
    }

    /// Walk directory recursively.
    fn walk_dir(&self, dir: &Path, files: &mut Vec<DatasetFile>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                debug!("Cannot read directory {}: {}", dir.display(), e);
                return Ok(());
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();

            // Skip excluded
            if self.is_excluded(&name) {
                continue;
            }

            if path.is_dir() {
                self.walk_dir(&path, files)?;
            } else if path.is_file() && self.matches(&path) {
                if let Ok(metadata) = fs::metadata(&path) {
                    let rel_path = path.strip_prefix(&self.root).unwrap_or(&path);

                    files.push(DatasetFile {
                        relative: rel_path.to_string_lossy().to_string(),
                        path: path.clone(),
                        size: metadata.len(),
                    });
                }
            }
        }

        Ok(())
    }
}
