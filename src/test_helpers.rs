//! Shared test utilities for the showshelf test suite.
//!
//! Provides fixture setup, post builders, bulk extractors, and lookups into a
//! built output directory.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let report = build(tmp.path(), &BuildOptions::default()).unwrap();
//!
//! let home = read_output(&tmp.path().join("_site"), "index.html");
//! assert!(home.contains("Frieren"));
//!
//! let posts = vec![post_with("Monster", |p| p.rating = Some(9.0))];
//! assert_eq!(titles(&posts), vec!["Monster"]);
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::types::Post;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
}

// =========================================================================
// Post builders and extractors
// =========================================================================

/// A post titled `title`, customized by `f`.
pub fn post_with(title: &str, f: impl FnOnce(&mut Post)) -> Post {
    let mut post = Post::titled(title);
    f(&mut post);
    post
}

/// All post titles in order.
pub fn titles(posts: &[Post]) -> Vec<&str> {
    posts.iter().map(|p| p.title.as_str()).collect()
}

/// All post slugs in order; unassigned slugs show as `""`.
pub fn slugs(posts: &[Post]) -> Vec<&str> {
    posts.iter().map(|p| p.slug.as_deref().unwrap_or("")).collect()
}

// =========================================================================
// Output lookups (panic with a clear message on miss)
// =========================================================================

/// Every file under `dir`, as sorted `/`-separated relative paths.
pub fn output_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(dir)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}

/// Read a generated file. Panics with the list of generated files if missing.
pub fn read_output(dir: &Path, rel: &str) -> String {
    fs::read_to_string(dir.join(rel)).unwrap_or_else(|_| {
        let files = output_files(dir);
        panic!("output '{rel}' not found. Available: {files:?}")
    })
}
