//! Build orchestration.
//!
//! One build is a straight line:
//!
//! ```text
//! config.toml           → SiteConfig           (config::load_config)
//! <data>/posts.json     → Vec<Post>            (data::load_posts_data)
//! Vec<Post>             → Collections          (slugs, urls, named lists)
//! templates + posts     → <output>/**.html     (render::render_site)
//! passthrough paths     → <output>/...         (passthrough::copy_passthrough)
//! ```
//!
//! Every stage owns its state for the duration of the call; nothing survives
//! between builds except the passthrough cache manifest in the output dir.

use crate::collections::Collections;
use crate::config::{self, ConfigError, SiteConfig};
use crate::data::{self, DataError};
use crate::passthrough::{self, PassthroughError, PassthroughReport};
use crate::render::{self, RenderError, RenderedFile, Site};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Passthrough(#[from] PassthroughError),
}

/// Per-invocation overrides from the command line.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Replaces `output` from config.toml (relative to the project root).
    pub output: Option<String>,
    /// Skip passthrough files that haven't changed since the last build.
    pub use_cache: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            output: None,
            use_cache: true,
        }
    }
}

/// Everything a finished build produced.
#[derive(Debug)]
pub struct BuildReport {
    pub output_dir: PathBuf,
    pub posts: usize,
    pub collections: Vec<(&'static str, usize)>,
    pub rendered: Vec<RenderedFile>,
    pub passthrough: PassthroughReport,
}

/// Result of validating a project without writing output.
#[derive(Debug)]
pub struct CheckReport {
    pub posts: usize,
    pub pages: Vec<String>,
    pub outputs: usize,
    pub collections: Vec<(&'static str, usize)>,
    pub missing_passthrough: Vec<String>,
}

/// Load and validate the config with CLI overrides applied.
pub fn site_config(root: &Path, options: &BuildOptions) -> Result<SiteConfig, ConfigError> {
    let mut config = config::load_config(root)?;
    if let Some(output) = &options.output {
        config.output = output.clone();
        config.validate()?;
    }
    Ok(config)
}

/// Collections computed from the catalog.
///
/// A missing or unreadable catalog yields empty collections.
pub fn load_collections(root: &Path, config: &SiteConfig) -> Collections {
    let posts = data::load_posts_data(&config.posts_path(root));
    Collections::build(posts, config)
}

/// Config plus the collections computed from the catalog.
pub fn load_site(
    root: &Path,
    options: &BuildOptions,
) -> Result<(SiteConfig, Collections), BuildError> {
    let config = site_config(root, options)?;
    let collections = load_collections(root, &config);
    Ok((config, collections))
}

/// Run a full build.
pub fn build(root: &Path, options: &BuildOptions) -> Result<BuildReport, BuildError> {
    let config = site_config(root, options)?;
    build_with(root, &config, options.use_cache)
}

/// Run a full build with an already loaded config.
pub fn build_with(
    root: &Path,
    config: &SiteConfig,
    use_cache: bool,
) -> Result<BuildReport, BuildError> {
    let collections = load_collections(root, config);
    let output_dir = config.output_dir(root);
    info!(output = %output_dir.display(), posts = collections.all.len(), "building site");

    let rendered = render::render_site(root, config, &collections)?;
    info!(files = rendered.len(), "rendered templates");

    let passthrough = passthrough::copy_passthrough(
        &config.input_dir(root),
        &output_dir,
        &config.passthrough,
        use_cache,
    )?;
    info!(stats = %passthrough.stats, "copied passthrough files");

    Ok(BuildReport {
        output_dir,
        posts: collections.all.len(),
        collections: collections.summary(),
        rendered,
        passthrough,
    })
}

/// Validate config, catalog, and templates without writing anything.
///
/// Unlike `build`, a missing or malformed catalog is an error here.
pub fn check(root: &Path, options: &BuildOptions) -> Result<CheckReport, BuildError> {
    let config = site_config(root, options)?;
    check_with(root, &config)
}

/// [`check`] with an already loaded config.
pub fn check_with(root: &Path, config: &SiteConfig) -> Result<CheckReport, BuildError> {
    let posts = data::read_posts(&config.posts_path(root))?;
    let collections = Collections::build(posts, config);

    let site = Site::new(root, config, &collections)?;
    let pages = site.discover_pages()?;
    let outputs = site.validate(&pages)?;

    let input_dir = config.input_dir(root);
    let missing_passthrough = config
        .passthrough
        .iter()
        .filter(|p| !input_dir.join(p).exists())
        .cloned()
        .collect();

    Ok(CheckReport {
        posts: collections.all.len(),
        pages: pages.into_iter().map(|p| p.source).collect(),
        outputs,
        collections: collections.summary(),
        missing_passthrough,
    })
}
