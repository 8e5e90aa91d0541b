//! CLI output formatting.
//!
//! Output is information-first: every rendered file leads with what it is
//! (template path or post title, with a positional index), followed by `→`
//! and where it was written.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Pages
//! 001 about.md → about/index.html
//! 002 index.njk → index.html
//!
//! Posts
//! 001 Frieren → posts/frieren/index.html
//! 002 Monster → posts/monster/index.html
//!
//! Passthrough (2 copied)
//!     css/style.css
//!     js/app.js
//!     Missing: images
//!
//! Built 2 pages, 2 post pages into _site
//! ```
//!
//! ## Check
//!
//! ```text
//! Catalog: 2 posts
//! Pages
//! 001 about.md
//! 002 index.njk
//! Collections
//!     hero: 1
//!     top_airing: 1
//! Missing passthrough: images
//! OK: 4 files would be written
//! ```
//!
//! ## Collections
//!
//! ```text
//! hero (1)
//!     001 Frieren → /posts/frieren/
//! top_airing (0)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::collections::Collections;
use crate::pipeline::{BuildReport, CheckReport};
use crate::render::{OutputKind, RenderedFile};
use crate::types::Post;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Untitled posts show their slug in parens.
fn post_label(post: &Post) -> String {
    if post.title.trim().is_empty() {
        format!("({})", post.slug.as_deref().unwrap_or("untitled"))
    } else {
        post.title.clone()
    }
}

fn rendered_section(lines: &mut Vec<String>, heading: &str, files: &[&RenderedFile]) {
    if files.is_empty() {
        return;
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(heading.to_string());
    for (i, file) in files.iter().enumerate() {
        lines.push(format!(
            "{} {} \u{2192} {}",
            format_index(i + 1),
            file.source,
            file.output
        ));
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let of_kind = |kind: OutputKind| {
        report
            .rendered
            .iter()
            .filter(|f| f.kind == kind)
            .collect::<Vec<_>>()
    };
    let pages = of_kind(OutputKind::Page);
    let posts = of_kind(OutputKind::Post);

    let mut lines = Vec::new();
    if report.rendered.iter().any(|f| f.kind == OutputKind::Home) {
        lines.push("Home (built-in theme) \u{2192} index.html".to_string());
    }
    rendered_section(&mut lines, "Pages", &pages);
    rendered_section(&mut lines, "Posts", &posts);

    let passthrough = &report.passthrough;
    if !passthrough.files.is_empty() || !passthrough.missing.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("Passthrough ({})", passthrough.stats));
        for file in &passthrough.files {
            lines.push(format!("{}{}", indent(1), file));
        }
        if !passthrough.missing.is_empty() {
            lines.push(format!(
                "{}Missing: {}",
                indent(1),
                passthrough.missing.join(", ")
            ));
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Built {}, {} into {}",
        plural(pages.len(), "page", "pages"),
        plural(posts.len(), "post page", "post pages"),
        report.output_dir.display()
    ));
    lines
}

pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = vec![format!("Catalog: {}", plural(report.posts, "post", "posts"))];

    if !report.pages.is_empty() {
        lines.push("Pages".to_string());
        for (i, page) in report.pages.iter().enumerate() {
            lines.push(format!("{} {}", format_index(i + 1), page));
        }
    }

    lines.push("Collections".to_string());
    for (name, size) in report.collections.iter().filter(|(name, _)| *name != "all") {
        lines.push(format!("{}{}: {}", indent(1), name, size));
    }

    if !report.missing_passthrough.is_empty() {
        lines.push(format!(
            "Missing passthrough: {}",
            report.missing_passthrough.join(", ")
        ));
    }
    lines.push(format!(
        "OK: {} would be written",
        plural(report.outputs, "file", "files")
    ));
    lines
}

pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Collections
// ============================================================================

/// Every named collection with its members, in display order.
pub fn format_collections(collections: &Collections) -> Vec<String> {
    let named: [(&str, &[Post]); 9] = [
        ("hero", collections.hero.as_slice()),
        ("top_airing", collections.top_airing.as_slice()),
        ("latest", collections.latest.as_slice()),
        ("recommended", collections.recommended.as_slice()),
        ("popular", collections.popular.as_slice()),
        ("featured", collections.featured.as_slice()),
        ("movies", collections.movies.as_slice()),
        ("series", collections.series.as_slice()),
        ("completed", collections.completed.as_slice()),
    ];

    let mut lines = Vec::new();
    for (name, posts) in named {
        lines.push(format!("{} ({})", name, posts.len()));
        for (i, post) in posts.iter().enumerate() {
            lines.push(format!(
                "{}{} {} \u{2192} {}",
                indent(1),
                format_index(i + 1),
                post_label(post),
                post.url.as_deref().unwrap_or("-")
            ));
        }
    }
    lines
}

pub fn print_collections(collections: &Collections) {
    for line in format_collections(collections) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
