//! Build configuration.
//!
//! Handles loading, validating, and merging `config.toml` from the project
//! root. Stock defaults describe the conventional layout, so a project that
//! follows it needs no config file at all:
//!
//! ```text
//! project/
//! ├── config.toml              # Optional, overrides stock defaults
//! └── src/                     # input
//!     ├── _data/posts.json     # catalog (data dir)
//!     ├── _includes/           # layouts and partials (includes dir)
//!     │   ├── base.njk
//!     │   └── post.njk         # post page layout
//!     ├── css/                 # passthrough
//!     ├── index.njk            # → _site/index.html
//!     └── about.md             # → _site/about/index.html
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! input = "src"
//! output = "_site"
//! includes = "_includes"       # relative to input
//! data = "_data"               # relative to input
//! template_formats = ["njk", "html", "md"]
//! passthrough = ["css", "js", "images", "assets"]
//!
//! [site]
//! title = "Anime Catalog"
//! base_url = "/"
//!
//! [collections]
//! top_airing = 20
//! recommended = 9
//! popular = 10
//!
//! [post_pages]
//! enabled = true
//! prefix = "posts"
//! layout = "post.njk"
//! ```
//!
//! The user file is merged key-by-key over the stock defaults, so a file
//! containing only `[site] title = "..."` keeps every other default.
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the config file in the project root.
pub const CONFIG_FILE: &str = "config.toml";

/// Template formats the renderer understands.
pub const KNOWN_TEMPLATE_FORMATS: &[&str] = &["njk", "html", "md"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `config.toml`.
///
/// All fields have defaults. Directory names are relative to the project root
/// (`input`, `output`) or to the input directory (`includes`, `data`,
/// `passthrough` entries).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory holding templates, data and static files.
    pub input: String,
    /// Directory the site is written to.
    pub output: String,
    /// Layouts and partials, relative to `input`. Never rendered as pages.
    pub includes: String,
    /// Data files, relative to `input`. Never rendered as pages.
    pub data: String,
    /// File extensions rendered as pages.
    pub template_formats: Vec<String>,
    /// Files or directories (relative to `input`) copied verbatim.
    pub passthrough: Vec<String>,
    /// Layout (in `includes`) wrapping markdown pages without their own layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown_layout: Option<String>,
    pub site: SiteMeta,
    pub collections: CollectionsConfig,
    pub post_pages: PostPagesConfig,
    pub theme: ThemeConfig,
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            input: "src".to_string(),
            output: "_site".to_string(),
            includes: "_includes".to_string(),
            data: "_data".to_string(),
            template_formats: KNOWN_TEMPLATE_FORMATS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            passthrough: ["css", "js", "images", "assets"]
                .map(String::from)
                .to_vec(),
            markdown_layout: None,
            site: SiteMeta::default(),
            collections: CollectionsConfig::default(),
            post_pages: PostPagesConfig::default(),
            theme: ThemeConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("input", &self.input),
            ("output", &self.output),
            ("includes", &self.includes),
            ("data", &self.data),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.input == self.output {
            return Err(ConfigError::Validation(
                "output must differ from input".into(),
            ));
        }
        for (key, value) in [("includes", &self.includes), ("data", &self.data)] {
            if !is_nested_relative(value) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a relative path inside the input directory"
                )));
            }
        }
        if self.template_formats.is_empty() {
            return Err(ConfigError::Validation(
                "template_formats must not be empty".into(),
            ));
        }
        if let Some(unknown) = self
            .template_formats
            .iter()
            .find(|f| !KNOWN_TEMPLATE_FORMATS.contains(&f.as_str()))
        {
            return Err(ConfigError::Validation(format!(
                "unknown template format '{unknown}' (expected one of: {})",
                KNOWN_TEMPLATE_FORMATS.join(", ")
            )));
        }
        if let Some(bad) = self.passthrough.iter().find(|p| !is_nested_relative(p)) {
            return Err(ConfigError::Validation(format!(
                "passthrough entry '{bad}' must be a relative path inside the input directory"
            )));
        }
        if self.post_pages.enabled && !is_nested_relative(&self.post_pages.prefix) {
            return Err(ConfigError::Validation(
                "post_pages.prefix must be a non-empty relative path".into(),
            ));
        }
        Ok(())
    }

    pub fn input_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.input)
    }

    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.output)
    }

    pub fn includes_dir(&self, root: &Path) -> PathBuf {
        self.input_dir(root).join(&self.includes)
    }

    pub fn data_dir(&self, root: &Path) -> PathBuf {
        self.input_dir(root).join(&self.data)
    }

    /// Location of the catalog file.
    pub fn posts_path(&self, root: &Path) -> PathBuf {
        self.data_dir(root).join(crate::data::POSTS_FILE)
    }

    pub fn is_template_format(&self, ext: &str) -> bool {
        self.template_formats
            .iter()
            .any(|f| f.eq_ignore_ascii_case(ext))
    }
}

/// A non-empty relative path that cannot climb out of its base directory.
fn is_nested_relative(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Site-wide values exposed to every template as `site`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteMeta {
    pub title: String,
    pub description: String,
    /// Prefix for every generated URL. Must end with `/`.
    pub base_url: String,
    /// `lang` attribute of the built-in theme pages.
    pub language: String,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            title: "Anime Catalog".to_string(),
            description: String::new(),
            base_url: "/".to_string(),
            language: "en".to_string(),
        }
    }
}

/// Sizes of the computed collections.
///
/// The hero collection is always capped at
/// [`HERO_LIMIT`](crate::collections::HERO_LIMIT) and is not configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionsConfig {
    pub top_airing: usize,
    pub recommended: usize,
    pub popular: usize,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            top_airing: 20,
            recommended: 9,
            popular: 10,
        }
    }
}

/// One generated page per post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostPagesConfig {
    pub enabled: bool,
    /// Output directory for post pages: `<prefix>/<slug>/index.html`.
    pub prefix: String,
    /// Layout in `includes`. The built-in theme is used when it doesn't exist.
    pub layout: String,
}

impl Default for PostPagesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: "posts".to_string(),
            layout: "post.njk".to_string(),
        }
    }
}

/// Colors of the built-in theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    pub light: ColorScheme,
    pub dark: ColorScheme,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    pub background: String,
    /// Card and header background.
    pub surface: String,
    pub text: String,
    /// Secondary text: years, episode counts, captions.
    pub text_muted: String,
    /// Ratings, badges and links.
    pub accent: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#f6f6f8".to_string(),
            surface: "#ffffff".to_string(),
            text: "#16161d".to_string(),
            text_muted: "#6b6b7b".to_string(),
            accent: "#e4405f".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#0f0f14".to_string(),
            surface: "#1a1a23".to_string(),
            text: "#ececf1".to_string(),
            text_muted: "#9a9aab".to_string(),
            accent: "#ff6b81".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

/// Parallel rendering settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of render threads. When absent, defaults to the number
    /// of CPU cores. Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_threads: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least one
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_threads
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SiteConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so arrays such
///   as `passthrough` are replaced, not appended to.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file doesn't exist, `Err` if it isn't valid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the project root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# showshelf configuration
# ======================
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error.

# Directory holding templates, data and static files.
input = "src"

# Directory the site is written to.
output = "_site"

# Layouts and partials, relative to input. Never rendered as pages.
includes = "_includes"

# Data directory, relative to input. The catalog is <data>/posts.json.
data = "_data"

# File extensions rendered as pages. Supported: njk, html, md.
template_formats = ["njk", "html", "md"]

# Files or directories (relative to input) copied to the output unchanged.
passthrough = ["css", "js", "images", "assets"]

# Layout in the includes directory wrapping markdown pages that don't name
# their own. Without it, markdown pages use the built-in theme.
# markdown_layout = "page.njk"

# ---------------------------------------------------------------------------
# Site values, available in every template as `site`
# ---------------------------------------------------------------------------
[site]
title = "Anime Catalog"
description = ""
base_url = "/"
language = "en"

# ---------------------------------------------------------------------------
# Computed collections (the hero is always at most 5 entries)
# ---------------------------------------------------------------------------
[collections]
# Airing and upcoming posts, most popular first.
top_airing = 20
# Ranked by rating * 10 + popularity.
recommended = 9
# Most viewed posts.
popular = 10

# ---------------------------------------------------------------------------
# One page per post at <prefix>/<slug>/index.html
# ---------------------------------------------------------------------------
[post_pages]
enabled = true
prefix = "posts"
# Layout in the includes directory; the built-in theme is used if missing.
layout = "post.njk"

# ---------------------------------------------------------------------------
# Built-in theme colors
# ---------------------------------------------------------------------------
[theme.light]
background = "#f6f6f8"
surface = "#ffffff"
text = "#16161d"
text_muted = "#6b6b7b"
accent = "#e4405f"

[theme.dark]
background = "#0f0f14"
surface = "#1a1a23"
text = "#ececf1"
text_muted = "#9a9aab"
accent = "#ff6b81"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum render threads. Omit to use every CPU core.
# max_threads = 4
"##
}

/// CSS custom properties for the built-in theme.
pub fn generate_theme_css(theme: &ThemeConfig) -> String {
    format!(
        r#":root {{
{light}
}}

@media (prefers-color-scheme: dark) {{
    :root {{
{dark}
    }}
}}"#,
        light = scheme_properties(&theme.light, "    "),
        dark = scheme_properties(&theme.dark, "        "),
    )
}

fn scheme_properties(scheme: &ColorScheme, indent: &str) -> String {
    [
        ("--color-bg", &scheme.background),
        ("--color-surface", &scheme.surface),
        ("--color-text", &scheme.text),
        ("--color-text-muted", &scheme.text_muted),
        ("--color-accent", &scheme.accent),
    ]
    .iter()
    .map(|(name, value)| format!("{indent}{name}: {value};"))
    .collect::<Vec<_>>()
    .join("\n")
}
