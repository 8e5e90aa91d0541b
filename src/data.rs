//! Catalog data loading.
//!
//! The whole catalog comes from one JSON file, `<input>/<data>/posts.json`.
//! Editors and export scripts disagree on its shape, so the loader accepts:
//!
//! ```text
//! [ {..}, {..} ]                    # plain array
//! { "posts": [ {..}, {..} ] }       # wrapped array
//! { "frieren": {..}, "mob": {..} }  # keyed object → its values, in file order
//! null                              # nothing
//! ```
//!
//! A missing or malformed file never fails the build: [`load_posts_data`] logs
//! a warning and hands back an empty catalog so the rest of the site still
//! renders. [`read_posts`] is the strict variant used by `check`.

use crate::types::Post;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// File name of the catalog inside the data directory.
pub const POSTS_FILE: &str = "posts.json";

#[derive(Error, Debug)]
pub enum DataError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Normalize any accepted document shape into a list of raw entries.
pub fn ensure_array(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            if matches!(map.get("posts"), Some(Value::Array(_)))
                && let Some(Value::Array(items)) = map.remove("posts")
            {
                return items;
            }
            map.into_iter().map(|(_, v)| v).collect()
        }
        _ => Vec::new(),
    }
}

/// Turn a parsed document into posts, dropping entries that aren't objects.
pub fn posts_from_value(data: Value) -> Vec<Post> {
    ensure_array(data)
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            if !entry.is_object() {
                debug!(index, "skipping non-object catalog entry");
                return None;
            }
            match serde_json::from_value::<Post>(entry) {
                Ok(post) => Some(post),
                Err(e) => {
                    warn!(index, error = %e, "skipping unreadable catalog entry");
                    None
                }
            }
        })
        .collect()
}

/// Parse catalog JSON text.
pub fn parse_posts(json: &str) -> Result<Vec<Post>, DataError> {
    let data: Value = serde_json::from_str(json)?;
    Ok(posts_from_value(data))
}

/// Read and parse the catalog file, reporting any failure.
pub fn read_posts(path: &Path) -> Result<Vec<Post>, DataError> {
    let content = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_posts(&content)
}

/// Read the catalog file, falling back to an empty catalog on any failure.
pub fn load_posts_data(path: &Path) -> Vec<Post> {
    match read_posts(path) {
        Ok(posts) => {
            debug!(count = posts.len(), path = %path.display(), "loaded catalog");
            posts
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "catalog unavailable, using empty list");
            Vec::new()
        }
    }
}
