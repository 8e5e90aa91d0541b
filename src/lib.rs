//! # Showshelf
//!
//! A small static site generator for anime and show catalogs. One JSON file
//! is the catalog; templates decide how it looks; the generator computes the
//! lists every catalog site needs (what's airing, what's new, what to watch
//! next) and hands them to the templates.
//!
//! # Architecture: One Build, Four Stages
//!
//! ```text
//! 1. Load      config.toml + _data/posts.json  →  SiteConfig + Vec<Post>
//! 2. Compute   Vec<Post>                       →  Collections (slugs, urls, lists)
//! 3. Render    templates + Collections         →  _site/**/*.html
//! 4. Copy      passthrough paths               →  _site/css, _site/js, ...
//! ```
//!
//! All per-build state (the slug registry, the template environment, the
//! passthrough manifest being written) is created by the build and dropped
//! with it. Nothing is shared between builds except the passthrough cache
//! file in the output directory.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Runs a build or a check end to end, owns the top-level error type |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation, theme CSS |
//! | [`data`] | Reads the catalog, accepting the document shapes editors actually produce |
//! | [`types`] | The [`Post`](types::Post) record and its lenient deserializers |
//! | [`slug`] | `slugify` and the per-build [`SlugRegistry`](slug::SlugRegistry) |
//! | [`collections`] | Hero, top airing, latest, recommended, popular and friends |
//! | [`filters`] | Template filters: formatting, slicing, post-aware sorting |
//! | [`render`] | Page discovery, front matter, layouts, minijinja rendering |
//! | [`theme`] | Built-in Maud pages used when the project doesn't provide its own |
//! | [`passthrough`] | Verbatim copy of static files into the output |
//! | [`cache`] | Content-hash manifest so unchanged static files aren't copied again |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Templates at Runtime, Theme at Compile Time
//!
//! Site authors write their pages as Jinja-style templates (`.njk`, `.html`)
//! or markdown, rendered with [minijinja](https://docs.rs/minijinja). The
//! fallback pages the generator ships itself are [Maud](https://maud.lambda.xyz/)
//! markup compiled into the binary, so an empty project still produces a
//! working site and the built-in theme can never go missing.
//!
//! ## A Broken Catalog Doesn't Break the Site
//!
//! A missing or malformed `posts.json` logs a warning and builds with an empty
//! catalog. Individual entries with odd values (`"rating": "8.9"`,
//! `"featured": "true"`) are read leniently; entries that aren't objects are
//! dropped. `showshelf check` is the strict counterpart and reports those
//! problems as errors.
//!
//! ## Stable Slugs
//!
//! Slugs come from the catalog `id`, an explicit `slug`, or the title (with
//! the season appended from season 2 on). Collisions get `-2`, `-3`, ... in
//! catalog order, so reordering the catalog is the only thing that can move a
//! page.

pub mod cache;
pub mod collections;
pub mod config;
pub mod data;
pub mod filters;
pub mod output;
pub mod passthrough;
pub mod pipeline;
pub mod render;
pub mod slug;
pub mod theme;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
