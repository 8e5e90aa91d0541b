//! Passthrough copy cache for incremental builds.
//!
//! Sites tend to carry a pile of static assets (fonts, cover art, scripts)
//! that rarely change between builds. This module lets the passthrough stage
//! skip files whose content hasn't changed since the last build.
//!
//! ## Cache keys
//!
//! Entries map an output path (relative to the output dir) to the SHA-256 of
//! the source file that was copied there. Content-based rather than
//! mtime-based so it survives `git checkout` (which resets modification
//! times).
//!
//! A cache hit requires:
//! 1. An entry for the output path with a matching source hash
//! 2. The previously-copied output file still exists on disk
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<output_dir>/.passthrough-cache.json`, so
//! it travels with the output directory when cached in CI. Each build writes
//! a fresh manifest containing only the files it copied or kept, so entries
//! for removed assets don't accumulate.
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to `build` to copy every file again. This loads an empty
//! manifest; existing output files are overwritten.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the output directory.
const MANIFEST_FILENAME: &str = ".passthrough-cache.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// On-disk manifest mapping output paths to source content hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: BTreeMap<String, String>,
}

impl CacheManifest {
    /// Create an empty manifest (used for `--no-cache` or first build).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Load from the output directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(output_dir: &Path) -> Self {
        let content = match std::fs::read_to_string(manifest_path(output_dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(m) if m.version == MANIFEST_VERSION => m,
            _ => Self::empty(),
        }
    }

    /// Save to the output directory.
    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(output_dir), json)
    }

    /// Whether `output_path` already holds the content hashed as `source_hash`.
    pub fn is_fresh(&self, output_path: &str, source_hash: &str, output_dir: &Path) -> bool {
        self.entries
            .get(output_path)
            .is_some_and(|hash| hash == source_hash)
            && output_dir.join(output_path).is_file()
    }

    /// Record the content now held by `output_path`.
    pub fn insert(&mut self, output_path: String, source_hash: String) {
        self.entries.insert(output_path, source_hash);
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub unchanged: u32,
    pub copied: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.unchanged += 1;
    }

    pub fn miss(&mut self) {
        self.copied += 1;
    }

    pub fn total(&self) -> u32 {
        self.unchanged + self.copied
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unchanged > 0 {
            write!(
                f,
                "{} unchanged, {} copied ({} total)",
                self.unchanged,
                self.copied,
                self.total()
            )
        } else {
            write!(f, "{} copied", self.copied)
        }
    }
}

/// Resolve the cache manifest path for an output directory.
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}
