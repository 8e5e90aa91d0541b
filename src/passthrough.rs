//! Passthrough copy.
//!
//! Each configured path (relative to the input dir) is copied unmodified into
//! the output dir, keeping its relative location:
//!
//! ```text
//! src/css/style.css        → _site/css/style.css
//! src/images/covers/a.jpg  → _site/images/covers/a.jpg
//! src/robots.txt           → _site/robots.txt   (a single file works too)
//! ```
//!
//! A configured path that doesn't exist is reported and skipped. Unchanged
//! files are skipped via the [`cache`](crate::cache) manifest.

use crate::cache::{self, CacheManifest, CacheStats};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PassthroughError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot walk passthrough directory: {0}")]
    Walk(#[from] walkdir::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PassthroughError + '_ {
    move |source| PassthroughError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// What the passthrough stage did.
#[derive(Debug, Default)]
pub struct PassthroughReport {
    /// Output-relative paths of every passthrough file, copied or unchanged.
    pub files: Vec<String>,
    /// Configured paths that don't exist in the input dir.
    pub missing: Vec<String>,
    pub stats: CacheStats,
}

/// Copy every passthrough path from `input_dir` to `output_dir`.
pub fn copy_passthrough(
    input_dir: &Path,
    output_dir: &Path,
    paths: &[String],
    use_cache: bool,
) -> Result<PassthroughReport, PassthroughError> {
    fs::create_dir_all(output_dir).map_err(io_error(output_dir))?;
    let previous = if use_cache {
        CacheManifest::load(output_dir)
    } else {
        CacheManifest::empty()
    };
    let mut manifest = CacheManifest::empty();
    let mut report = PassthroughReport::default();

    for configured in paths {
        let source = input_dir.join(configured);
        if !source.exists() {
            warn!(path = %configured, "passthrough path not found, skipping");
            report.missing.push(configured.clone());
            continue;
        }

        for entry in WalkDir::new(&source).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = relative_output(input_dir, entry.path());
            let hash = cache::hash_file(entry.path()).map_err(io_error(entry.path()))?;

            if previous.is_fresh(&rel, &hash, output_dir) {
                debug!(file = %rel, "unchanged");
                report.stats.hit();
            } else {
                let dest = output_dir.join(&rel);
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent).map_err(io_error(parent))?;
                }
                fs::copy(entry.path(), &dest).map_err(io_error(&dest))?;
                debug!(file = %rel, "copied");
                report.stats.miss();
            }

            manifest.insert(rel.clone(), hash);
            report.files.push(rel);
        }
    }

    manifest
        .save(output_dir)
        .map_err(io_error(&cache::manifest_path(output_dir)))?;
    Ok(report)
}

fn relative_output(input_dir: &Path, path: &Path) -> String {
    path.strip_prefix(input_dir)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
