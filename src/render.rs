//! Template rendering.
//!
//! Renders every template under the input directory, one page per post, and
//! the built-in home page when the input has none of its own.
//!
//! ## Page discovery
//!
//! Files whose extension is one of `template_formats` are pages. Files and
//! directories whose name starts with `_` or `.` are skipped, as are the
//! includes dir, the data dir, and every passthrough path.
//!
//! ## Output paths
//!
//! ```text
//! src/index.njk                → _site/index.html
//! src/about.md                 → _site/about/index.html
//! src/shows/index.html         → _site/shows/index.html
//! src/search-data.json.njk     → _site/search-data.json
//! permalink = "/feed.xml"      → _site/feed.xml
//! permalink = "/top/"          → _site/top/index.html
//! (post with slug frieren)     → _site/posts/frieren/index.html
//! ```
//!
//! ## Front matter
//!
//! A page may start with TOML between `+++` lines:
//!
//! ```text
//! +++
//! title = "About"
//! layout = "base.njk"
//! permalink = "/about-us/"
//! tagline = "Everything airing"     # free keys end up in page.data
//! +++
//! ```
//!
//! ## Template context
//!
//! Every template sees `site` (the `[site]` config), `posts` (every post, with
//! slugs and URLs), `collections` and `page`. Post layouts also get `post`;
//! layouts get the wrapped output as `content`. The `url(path)` function
//! prefixes a site path with `base_url`; `current_year()` returns the year.
//!
//! Markdown pages are rendered as templates first, then converted with
//! pulldown-cmark, then wrapped in their layout (or `markdown_layout`, or the
//! built-in page). `.njk` and `.html` output is HTML-escaped; `.md` is not.

use crate::collections::Collections;
use crate::config::SiteConfig;
use crate::data::POSTS_FILE;
use crate::filters;
use crate::theme;
use crate::types::Post;
use chrono::Datelike;
use minijinja::value::Value;
use minijinja::{AutoEscape, Environment, ErrorKind, context};
use pulldown_cmark::{Options, Parser, html as md_html};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

const FENCE: &str = "+++";

/// Layout chains longer than this are treated as cycles.
const MAX_LAYOUT_DEPTH: usize = 8;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot walk input directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("invalid front matter in {page}: {source}")]
    FrontMatter {
        page: String,
        source: toml::de::Error,
    },
    #[error("template error in {name}: {source}")]
    Template {
        name: String,
        source: minijinja::Error,
    },
    #[error("layout '{layout}' used by {page} not found in includes")]
    MissingLayout { layout: String, page: String },
    #[error("layout chain starting at {page} is too deep (cycle?)")]
    LayoutCycle { page: String },
    #[error("permalink '{permalink}' in {page} leaves the output directory")]
    BadPermalink { permalink: String, page: String },
    #[error("{output} would be written by both {first} and {second}")]
    DuplicateOutput {
        output: String,
        first: String,
        second: String,
    },
}

fn template_error(name: &str) -> impl FnOnce(minijinja::Error) -> RenderError + '_ {
    move |source| RenderError::Template {
        name: name.to_string(),
        source,
    }
}

/// Parsed `+++` block at the top of a page or layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub layout: Option<String>,
    pub permalink: Option<String>,
    #[serde(flatten)]
    pub data: toml::Table,
}

/// A template discovered in the input directory.
#[derive(Debug, Clone)]
pub struct Page {
    /// Path relative to the input dir, `/`-separated.
    pub source: String,
    /// Lower-cased extension (`njk`, `html`, `md`).
    pub format: String,
    pub front: FrontMatter,
    /// Template text after the front matter.
    pub body: String,
}

impl Page {
    pub fn parse(source: &str, format: &str, text: &str) -> Result<Self, RenderError> {
        let (front, body) = split_front_matter(text);
        let front = match front {
            Some(toml_text) => {
                toml::from_str(toml_text).map_err(|source_err| RenderError::FrontMatter {
                    page: source.to_string(),
                    source: source_err,
                })?
            }
            None => FrontMatter::default(),
        };
        Ok(Self {
            source: source.to_string(),
            format: format.to_ascii_lowercase(),
            front,
            body: body.to_string(),
        })
    }

    pub fn is_markdown(&self) -> bool {
        self.format == "md"
    }

    /// Front matter title, or the first `# ` heading of a markdown page.
    pub fn title(&self) -> Option<&str> {
        self.front.title.as_deref().or_else(|| {
            if self.is_markdown() {
                first_heading(&self.body)
            } else {
                None
            }
        })
    }
}

/// `page` as seen by templates.
#[derive(Debug, Serialize)]
struct PageContext<'a> {
    title: Option<&'a str>,
    url: String,
    source: &'a str,
    output: &'a str,
    format: &'a str,
    data: &'a toml::Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Page,
    Post,
    Home,
}

/// One file written by the render stage.
#[derive(Debug, Clone)]
pub struct RenderedFile {
    /// Path relative to the output dir.
    pub output: String,
    /// Template path, post title, or `built-in theme`.
    pub source: String,
    pub kind: OutputKind,
}

enum Job<'p> {
    Page(&'p Page),
    Post(&'p Post),
    Home,
}

struct Planned<'p> {
    job: Job<'p>,
    output: String,
}

/// Template environment plus everything needed to render one build.
pub struct Site<'a> {
    config: &'a SiteConfig,
    collections: &'a Collections,
    env: Environment<'static>,
    input_dir: PathBuf,
    /// Paths under the input dir that are never rendered.
    excluded: Vec<PathBuf>,
    /// Every file in the includes dir → the layout it names in front matter.
    layouts: HashMap<String, Option<String>>,
    posts_source: String,
    css: String,
}

impl<'a> Site<'a> {
    pub fn new(
        root: &Path,
        config: &'a SiteConfig,
        collections: &'a Collections,
    ) -> Result<Self, RenderError> {
        let input_dir = config.input_dir(root);
        let includes_dir = config.includes_dir(root);
        let layouts = scan_layouts(&includes_dir)?;
        debug!(count = layouts.len(), "found includes");

        let mut env = Environment::new();
        env.set_loader(includes_loader(includes_dir.clone()));
        env.set_auto_escape_callback(auto_escape_for);
        filters::register(&mut env, &config.collections);
        let base_url = config.site.base_url.clone();
        env.add_function("url", move |path: &str| site_url(&base_url, path));
        env.add_function("current_year", current_year);
        env.add_global("site", Value::from_serialize(&config.site));
        env.add_global("posts", Value::from_serialize(&collections.all));
        env.add_global("collections", Value::from_serialize(collections));

        let mut excluded = vec![includes_dir, config.data_dir(root)];
        excluded.extend(config.passthrough.iter().map(|p| input_dir.join(p)));

        Ok(Self {
            config,
            collections,
            env,
            input_dir,
            excluded,
            layouts,
            posts_source: format!("{}/{}", config.data.trim_end_matches('/'), POSTS_FILE),
            css: theme::theme_css(config),
        })
    }

    /// Every renderable template under the input dir, in path order.
    pub fn discover_pages(&self) -> Result<Vec<Page>, RenderError> {
        if !self.input_dir.is_dir() {
            warn!(path = %self.input_dir.display(), "input directory not found, no pages to render");
            return Ok(Vec::new());
        }

        let walker = WalkDir::new(&self.input_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !(is_private(e.file_name()) || self.excluded.iter().any(|x| x == e.path()))
            });

        let mut pages = Vec::new();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(format) = path.extension().and_then(OsStr::to_str) else {
                continue;
            };
            if !self.config.is_template_format(format) {
                continue;
            }
            let source = relative_name(&self.input_dir, path);
            let text = fs::read_to_string(path).map_err(|e| RenderError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            pages.push(Page::parse(&source, format, &text)?);
        }
        debug!(count = pages.len(), "discovered pages");
        Ok(pages)
    }

    /// Assign an output path to everything that will be written, rejecting
    /// collisions.
    fn plan<'p>(&'p self, pages: &'p [Page]) -> Result<Vec<Planned<'p>>, RenderError> {
        let mut claimed: BTreeMap<String, String> = BTreeMap::new();
        let mut planned = Vec::new();

        for page in pages {
            let output = output_path(&page.source, page.front.permalink.as_deref()).ok_or_else(
                || RenderError::BadPermalink {
                    permalink: page.front.permalink.clone().unwrap_or_default(),
                    page: page.source.clone(),
                },
            )?;
            claim(&mut claimed, &output, &page.source)?;
            planned.push(Planned {
                job: Job::Page(page),
                output,
            });
        }

        if self.config.post_pages.enabled {
            for post in &self.collections.all {
                let slug = post.slug.as_deref().unwrap_or("post");
                let output = post_output(&self.config.post_pages.prefix, slug);
                claim(&mut claimed, &output, &format!("post '{}'", post.title))?;
                planned.push(Planned {
                    job: Job::Post(post),
                    output,
                });
            }
        }

        if !claimed.contains_key("index.html") {
            planned.push(Planned {
                job: Job::Home,
                output: "index.html".to_string(),
            });
        }

        Ok(planned)
    }

    /// Render a discovered page to its final HTML.
    pub fn render_page(&self, page: &Page, output: &str) -> Result<String, RenderError> {
        let ctx = PageContext {
            title: page.title(),
            url: page_url(&self.config.site.base_url, output),
            source: &page.source,
            output,
            format: &page.format,
            data: &page.front.data,
        };

        let mut html = self
            .env
            .render_named_str(&page.source, &page.body, context! { page => &ctx })
            .map_err(template_error(&page.source))?;
        if page.is_markdown() {
            html = markdown_to_html(&html);
        }

        let layout = page.front.layout.as_deref().or(if page.is_markdown() {
            self.config.markdown_layout.as_deref()
        } else {
            None
        });

        match layout {
            Some(layout) => self.apply_layouts(layout, html, &ctx, None, &page.source),
            None if page.is_markdown() => Ok(theme::content_page(
                self.config,
                ctx.title.unwrap_or_default(),
                &html,
                &self.css,
            )
            .into_string()),
            None => Ok(html),
        }
    }

    /// Render the detail page of one post.
    pub fn render_post(&self, post: &Post, output: &str) -> Result<String, RenderError> {
        let Some(layout) = self.resolve_layout(&self.config.post_pages.layout) else {
            return Ok(theme::post_page(self.config, post, &self.css).into_string());
        };

        let data = toml::Table::new();
        let ctx = PageContext {
            title: Some(&post.title),
            url: page_url(&self.config.site.base_url, output),
            source: &self.posts_source,
            output,
            format: "njk",
            data: &data,
        };

        let html = self
            .env
            .get_template(&layout)
            .and_then(|t| t.render(context! { post => post, page => &ctx }))
            .map_err(template_error(&layout))?;

        match self.layouts.get(&layout).cloned().flatten() {
            Some(parent) => self.apply_layouts(&parent, html, &ctx, Some(post), &layout),
            None => Ok(html),
        }
    }

    /// Wrap `content` in `first` and whatever layouts it names in turn.
    fn apply_layouts(
        &self,
        first: &str,
        content: String,
        page: &PageContext<'_>,
        post: Option<&Post>,
        origin: &str,
    ) -> Result<String, RenderError> {
        let mut content = content;
        let mut next = Some(first.to_string());
        let mut depth = 0;

        while let Some(requested) = next {
            depth += 1;
            if depth > MAX_LAYOUT_DEPTH {
                return Err(RenderError::LayoutCycle {
                    page: origin.to_string(),
                });
            }
            let name = self
                .resolve_layout(&requested)
                .ok_or_else(|| RenderError::MissingLayout {
                    layout: requested.clone(),
                    page: origin.to_string(),
                })?;
            content = self
                .env
                .get_template(&name)
                .and_then(|t| {
                    t.render(context! {
                        page => page,
                        post => post,
                        content => Value::from_safe_string(content),
                    })
                })
                .map_err(template_error(&name))?;
            next = self.layouts.get(&name).cloned().flatten();
        }

        Ok(content)
    }

    /// Includes-relative name of a layout; the extension may be omitted.
    fn resolve_layout(&self, name: &str) -> Option<String> {
        let name = name.trim().trim_start_matches('/');
        if self.layouts.contains_key(name) {
            return Some(name.to_string());
        }
        self.config
            .template_formats
            .iter()
            .map(|ext| format!("{name}.{ext}"))
            .find(|candidate| self.layouts.contains_key(candidate))
    }

    /// Render everything in memory without writing, reporting the first
    /// problem. Returns the number of files a build would write.
    pub fn validate(&self, pages: &[Page]) -> Result<usize, RenderError> {
        let planned = self.plan(pages)?;
        planned
            .par_iter()
            .try_for_each(|item| self.render_job(item).map(drop))?;
        Ok(planned.len())
    }

    /// Render and write every page, post page, and the fallback home page.
    pub fn render_all(
        &self,
        pages: &[Page],
        output_dir: &Path,
    ) -> Result<Vec<RenderedFile>, RenderError> {
        let planned = self.plan(pages)?;

        planned
            .par_iter()
            .map(|item| {
                let (file, html) = self.render_job(item)?;
                write_output(output_dir, &item.output, &html)?;
                debug!(output = %item.output, "rendered");
                Ok(file)
            })
            .collect()
    }

    fn render_job(&self, item: &Planned<'_>) -> Result<(RenderedFile, String), RenderError> {
        let (html, source, kind) = match item.job {
            Job::Page(page) => (
                self.render_page(page, &item.output)?,
                page.source.clone(),
                OutputKind::Page,
            ),
            Job::Post(post) => (
                self.render_post(post, &item.output)?,
                post.title.clone(),
                OutputKind::Post,
            ),
            Job::Home => (
                theme::home_page(self.config, self.collections, &self.css).into_string(),
                "built-in theme".to_string(),
                OutputKind::Home,
            ),
        };
        let file = RenderedFile {
            output: item.output.clone(),
            source,
            kind,
        };
        Ok((file, html))
    }
}

/// Render the whole site into the configured output directory.
pub fn render_site(
    root: &Path,
    config: &SiteConfig,
    collections: &Collections,
) -> Result<Vec<RenderedFile>, RenderError> {
    let site = Site::new(root, config, collections)?;
    let pages = site.discover_pages()?;
    site.render_all(&pages, &config.output_dir(root))
}

fn claim(
    claimed: &mut BTreeMap<String, String>,
    output: &str,
    source: &str,
) -> Result<(), RenderError> {
    if let Some(first) = claimed.get(output) {
        return Err(RenderError::DuplicateOutput {
            output: output.to_string(),
            first: first.clone(),
            second: source.to_string(),
        });
    }
    claimed.insert(output.to_string(), source.to_string());
    Ok(())
}

fn write_output(output_dir: &Path, rel: &str, html: &str) -> Result<(), RenderError> {
    let path = output_dir.join(rel);
    let io_err = |source| RenderError::Io {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(&path, html).map_err(io_err)
}

// ============================================================================
// Template environment
// ============================================================================

fn auto_escape_for(name: &str) -> AutoEscape {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "njk" || ext == "html" || ext == "htm" => AutoEscape::Html,
        _ => AutoEscape::None,
    }
}

/// Loads layouts and partials from the includes dir, front matter stripped.
fn includes_loader(
    dir: PathBuf,
) -> impl Fn(&str) -> Result<Option<String>, minijinja::Error> + Send + Sync + 'static {
    move |name| {
        let Some(path) = safe_join(&dir, name) else {
            return Ok(None);
        };
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(split_front_matter(&text).1.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(minijinja::Error::new(
                ErrorKind::InvalidOperation,
                format!("cannot load template {name}"),
            )
            .with_source(e)),
        }
    }
}

/// Join a template name onto `dir`, refusing names that climb out of it.
fn safe_join(dir: &Path, name: &str) -> Option<PathBuf> {
    let mut path = dir.to_path_buf();
    for part in name.split('/') {
        match part {
            "" | "." => {}
            ".." => return None,
            part if part.contains('\\') => return None,
            part => path.push(part),
        }
    }
    Some(path)
}

/// Every file in the includes dir with the layout its front matter names.
fn scan_layouts(includes_dir: &Path) -> Result<HashMap<String, Option<String>>, RenderError> {
    let mut layouts = HashMap::new();
    if !includes_dir.is_dir() {
        return Ok(layouts);
    }
    for entry in WalkDir::new(includes_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = relative_name(includes_dir, entry.path());
        let text = fs::read_to_string(entry.path()).map_err(|e| RenderError::Io {
            path: entry.path().to_path_buf(),
            source: e,
        })?;
        let parent = match split_front_matter(&text).0 {
            Some(toml_text) => toml::from_str::<FrontMatter>(toml_text)
                .map_err(|source| RenderError::FrontMatter {
                    page: name.clone(),
                    source,
                })?
                .layout,
            None => None,
        };
        layouts.insert(name, parent);
    }
    Ok(layouts)
}

// ============================================================================
// Paths and text helpers
// ============================================================================

fn is_private(name: &OsStr) -> bool {
    name.to_str()
        .is_some_and(|n| n.starts_with('_') || n.starts_with('.'))
}

fn relative_name(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split `+++` front matter from the template body.
///
/// Returns `(None, text)` when the text doesn't open with a fence line or the
/// closing fence is missing.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(rest) = text.strip_prefix(FENCE) else {
        return (None, text);
    };
    let Some(rest) = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, text)
}

/// Output path of a page, relative to the output dir.
///
/// Returns `None` when a permalink tries to leave the output dir.
pub fn output_path(source: &str, permalink: Option<&str>) -> Option<String> {
    if let Some(permalink) = permalink {
        let permalink = permalink.trim();
        let mut parts = Vec::new();
        for part in permalink.split('/') {
            match part {
                "" | "." => {}
                ".." => return None,
                part => parts.push(part),
            }
        }
        if parts.is_empty() || permalink.ends_with('/') {
            parts.push("index.html");
        }
        return Some(parts.join("/"));
    }

    let (dir, file) = source.rsplit_once('/').unwrap_or(("", source));
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    let out = if stem.contains('.') {
        stem.to_string()
    } else if stem == "index" {
        "index.html".to_string()
    } else {
        format!("{stem}/index.html")
    };
    Some(if dir.is_empty() {
        out
    } else {
        format!("{dir}/{out}")
    })
}

/// Output path of a post page.
pub fn post_output(prefix: &str, slug: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{slug}/index.html")
    } else {
        format!("{prefix}/{slug}/index.html")
    }
}

/// Public URL of an output file: `about/index.html` → `/about/`.
pub fn page_url(base_url: &str, output: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = output.strip_suffix("index.html").unwrap_or(output);
    format!("{base}/{path}")
}

/// Prefix a site path with `base_url`; absolute URLs pass through.
pub fn site_url(base_url: &str, path: &str) -> String {
    if path.contains("://") || path.starts_with("//") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// The current local year, for copyright lines: `{{ current_year() }}`.
pub fn current_year() -> String {
    chrono::Local::now().year().to_string()
}

fn first_heading(markdown: &str) -> Option<&str> {
    markdown
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(str::trim)
}

pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(markdown, options);
    let mut html = String::new();
    md_html::push_html(&mut html, parser);
    html
}
