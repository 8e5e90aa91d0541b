//! Built-in theme.
//!
//! Fills in whatever the input directory doesn't provide itself:
//!
//! - the home page, when there is no `index.*` template
//! - post pages, when the configured post layout is missing from the includes
//! - the page wrapper for markdown without a layout
//!
//! Styles come from `static/theme.css`, embedded at compile time, prefixed
//! with the color custom properties generated from the `[theme]` config.

use crate::collections::Collections;
use crate::config::{self, SiteConfig, SiteMeta};
use crate::filters::{format_compact, format_episodes, format_rating};
use crate::types::Post;
use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS_STATIC: &str = include_str!("../static/theme.css");

/// Full stylesheet for built-in pages.
pub fn theme_css(config: &SiteConfig) -> String {
    format!(
        "{}\n\n{}",
        config::generate_theme_css(&config.theme),
        CSS_STATIC
    )
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(
    site: &SiteMeta,
    title: &str,
    css: &str,
    body_class: Option<&str>,
    content: Markup,
) -> Markup {
    let full_title = if title.is_empty() || title == site.title {
        site.title.clone()
    } else {
        format!("{title} · {}", site.title)
    };

    html! {
        (DOCTYPE)
        html lang=(site.language) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (full_title) }
                @if !site.description.is_empty() {
                    meta name="description" content=(site.description);
                }
                style { (PreEscaped(css)) }
            }
            body class=[body_class] {
                (site_header(site))
                (content)
            }
        }
    }
}

fn site_header(site: &SiteMeta) -> Markup {
    html! {
        header.site-header {
            a.site-title href=(site.base_url) { (site.title) }
        }
    }
}

/// One catalog entry as a linked card.
fn post_card(post: &Post) -> Markup {
    html! {
        article.post-card {
            a href=[post.url.as_deref()] {
                h3.post-title { (post.title) }
            }
            p.post-meta {
                @if let Some(year) = post.year {
                    span.post-year { (year) }
                }
                @if let Some(kind) = &post.kind {
                    span.post-kind { (kind) }
                }
                span.post-rating { "★ " (format_rating(post.rating)) }
            }
        }
    }
}

/// A titled grid of cards; nothing at all when `posts` is empty.
fn post_section(id: &str, heading: &str, posts: &[Post]) -> Markup {
    html! {
        @if !posts.is_empty() {
            section.post-section id=(id) {
                h2 { (heading) }
                div.post-grid {
                    @for post in posts {
                        (post_card(post))
                    }
                }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Home page with the hero carousel and one section per collection.
pub fn home_page(config: &SiteConfig, collections: &Collections, css: &str) -> Markup {
    let content = html! {
        main.home-page {
            @if !collections.hero.is_empty() {
                section.hero {
                    @for post in &collections.hero {
                        a.hero-slide href=[post.url.as_deref()] {
                            h2 { (post.title) }
                            @if let Some(status) = &post.status {
                                span.hero-status { (status) }
                            }
                        }
                    }
                }
            }
            (post_section("top-airing", "Top Airing", &collections.top_airing))
            (post_section("latest", "Latest", &collections.latest))
            (post_section("recommended", "Recommended", &collections.recommended))
            (post_section("popular", "Popular", &collections.popular))
            @if collections.all.is_empty() {
                p.empty-catalog { "The catalog is empty." }
            }
        }
    };

    base_document(&config.site, "", css, Some("home"), content)
}

/// Detail page for a single post.
pub fn post_page(config: &SiteConfig, post: &Post, css: &str) -> Markup {
    let details: Vec<(&str, String)> = [
        ("Year", post.year.map(|y| y.to_string())),
        ("Type", post.kind.clone()),
        ("Status", post.status.clone()),
        ("Season", post.season_number.map(|n| n.to_string())),
        ("Episodes", Some(format_episodes(post.episodes.map(u64::from)))),
        ("Rating", Some(format_rating(post.rating))),
        ("Views", post.views.map(|v| format_compact(Some(v as f64)))),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.map(|v| (label, v)))
    .collect();

    let content = html! {
        main.post-page {
            article {
                h1 { (post.title) }
                @if post.featured {
                    span.badge { "Featured" }
                }
                dl.post-details {
                    @for (label, value) in &details {
                        dt { (label) }
                        dd { (value) }
                    }
                }
            }
            a.back-link href=(config.site.base_url) { "← Back to catalog" }
        }
    };

    base_document(&config.site, &post.title, css, Some("post"), content)
}

/// Wrapper for already-rendered HTML (markdown pages without a layout).
pub fn content_page(config: &SiteConfig, title: &str, body_html: &str, css: &str) -> Markup {
    let content = html! {
        main.content-page {
            article.content {
                (PreEscaped(body_html))
            }
        }
    };

    base_document(&config.site, title, css, None, content)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn catalog() -> Collections {
        let posts = vec![
            post_with("Frieren", |p| {
                p.featured = true;
                p.status = Some("Airing".into());
                p.rating = Some(9.3);
                p.year = Some(2023);
            }),
            post_with("Monster", |p| {
                p.rating = Some(8.9);
                p.kind = Some("TV".into());
            }),
        ];
        Collections::build(posts, &SiteConfig::default())
    }

    #[test]
    fn theme_css_starts_with_color_properties() {
        let css = theme_css(&SiteConfig::default());
        assert!(css.starts_with(":root {"));
        assert!(css.contains("--color-accent"));
        assert!(css.contains(".post-card"));
    }

    #[test]
    fn home_page_renders_hero_and_sections() {
        let html = home_page(&SiteConfig::default(), &catalog(), "").into_string();
        assert!(html.contains("<title>Anime Catalog</title>"));
        assert!(html.contains("hero-slide"));
        assert!(html.contains(r#"href="/posts/frieren/""#));
        assert!(html.contains(r#"id="top-airing""#));
        assert!(html.contains(r#"id="recommended""#));
        assert!(!html.contains("The catalog is empty."));
    }

    #[test]
    fn home_page_skips_empty_sections() {
        let collections = Collections::build(Vec::new(), &SiteConfig::default());
        let html = home_page(&SiteConfig::default(), &collections, "").into_string();
        assert!(!html.contains("post-section"));
        assert!(html.contains("The catalog is empty."));
    }

    #[test]
    fn post_page_lists_known_details() {
        let collections = catalog();
        let html = post_page(&SiteConfig::default(), &collections.all[0], "").into_string();
        assert!(html.contains("<title>Frieren · Anime Catalog</title>"));
        assert!(html.contains("<dt>Rating</dt><dd>9.3</dd>"));
        assert!(html.contains("<dt>Episodes</dt><dd>? episodes</dd>"));
        assert!(!html.contains("<dt>Views</dt>"));
        assert!(html.contains("Featured"));
    }

    #[test]
    fn post_page_escapes_titles() {
        let post = Post::titled("<b>Bold</b>");
        let html = post_page(&SiteConfig::default(), &post, "").into_string();
        assert!(html.contains("&lt;b&gt;Bold&lt;/b&gt;"));
        assert!(!html.contains("<b>Bold</b>"));
    }

    #[test]
    fn content_page_keeps_rendered_html() {
        let html =
            content_page(&SiteConfig::default(), "About", "<p>Hi</p>", "").into_string();
        assert!(html.contains(r#"<article class="content"><p>Hi</p></article>"#));
    }
}
