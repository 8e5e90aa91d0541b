//! Named, computed lists of posts exposed to templates.
//!
//! Each helper is a single filter → sort → truncate pass over the catalog.
//! Sorts are stable, so posts that tie keep their order from the data file,
//! and a missing value sorts after any present one. The recommendation score
//! is the exception: it counts missing values as zero.
//!
//! [`Collections::build`] is the only place slugs are assigned: it owns the
//! [`SlugRegistry`] for the duration of one build, gives every post a unique
//! slug and URL, then computes the collections from the enriched posts.

use crate::config::SiteConfig;
use crate::slug::{SlugRegistry, base_slug, slugify};
use crate::types::Post;
use serde::Serialize;
use std::cmp::Ordering;

/// Upper bound on the hero carousel.
pub const HERO_LIMIT: usize = 5;

/// Size of the `top_airing` and `recommended` template filters when the
/// template doesn't pass one.
pub const FILTER_LIMIT: usize = 20;

/// Every collection available to templates as `collections.<name>`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Collections {
    /// All posts in data-file order, with slugs and URLs assigned.
    pub all: Vec<Post>,
    pub hero: Vec<Post>,
    pub top_airing: Vec<Post>,
    pub latest: Vec<Post>,
    pub recommended: Vec<Post>,
    pub popular: Vec<Post>,
    pub featured: Vec<Post>,
    pub movies: Vec<Post>,
    pub series: Vec<Post>,
    pub completed: Vec<Post>,
}

impl Collections {
    /// Assign slugs and URLs, then compute every collection.
    pub fn build(posts: Vec<Post>, config: &SiteConfig) -> Self {
        let all = assign_slugs(posts, &config.site.base_url, &config.post_pages.prefix);
        let sizes = &config.collections;

        Self {
            hero: get_hero(&all),
            top_airing: get_top_airing(&all, sizes.top_airing),
            latest: sort_latest(&all),
            recommended: get_recommended(&all, sizes.recommended),
            popular: get_popular(&all, sizes.popular),
            featured: all.iter().filter(|p| p.featured).cloned().collect(),
            movies: get_by_type(&all, "movie"),
            series: all
                .iter()
                .filter(|p| p.is_kind("tv") || p.is_kind("series"))
                .cloned()
                .collect(),
            completed: get_completed(&all),
            all,
        }
    }

    /// `(name, size)` of every collection, in display order.
    pub fn summary(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("all", self.all.len()),
            ("hero", self.hero.len()),
            ("top_airing", self.top_airing.len()),
            ("latest", self.latest.len()),
            ("recommended", self.recommended.len()),
            ("popular", self.popular.len()),
            ("featured", self.featured.len()),
            ("movies", self.movies.len()),
            ("series", self.series.len()),
            ("completed", self.completed.len()),
        ]
    }
}

/// Give every post a unique slug, the URL of its page and its watch link.
///
/// A fresh registry is used per call, so two builds never share state.
pub fn assign_slugs(posts: Vec<Post>, base_url: &str, prefix: &str) -> Vec<Post> {
    let mut registry = SlugRegistry::new();
    posts
        .into_iter()
        .map(|mut post| {
            let slug = registry.claim(&base_slug(&post));
            post.url = Some(post_url(base_url, prefix, &slug));
            post.watch_link = Some(post_url(base_url, "watch", &slug));
            post.slug = Some(slug);
            post
        })
        .collect()
}

/// `/<prefix>/<slug>/` under the site's base URL.
pub fn post_url(base_url: &str, prefix: &str, slug: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{base}/{slug}/")
    } else {
        format!("{base}/{prefix}/{slug}/")
    }
}

// ============================================================================
// Ordering helpers
// ============================================================================

/// Descending order for optional floats, `None` last.
fn desc_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Descending order for optional integers, `None` last.
fn desc<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn by_popularity(a: &Post, b: &Post) -> Ordering {
    desc_f64(a.popularity, b.popularity).then_with(|| desc_f64(a.rating, b.rating))
}

fn by_rating(a: &Post, b: &Post) -> Ordering {
    desc_f64(a.rating, b.rating).then_with(|| desc_f64(a.popularity, b.popularity))
}

fn by_recency(a: &Post, b: &Post) -> Ordering {
    desc(a.year, b.year).then_with(|| desc(a.season_number, b.season_number))
}

/// `rating * 10 + popularity`, missing values counting as zero.
pub fn rec_score(post: &Post) -> f64 {
    post.rating.unwrap_or(0.0) * 10.0 + post.popularity.unwrap_or(0.0)
}

fn by_rec_score(a: &Post, b: &Post) -> Ordering {
    rec_score(b).total_cmp(&rec_score(a))
}

fn by_views(a: &Post, b: &Post) -> Ordering {
    desc(a.views, b.views).then_with(|| desc_f64(a.popularity, b.popularity))
}

fn sorted_by(posts: impl Iterator<Item = Post>, cmp: fn(&Post, &Post) -> Ordering) -> Vec<Post> {
    let mut posts: Vec<Post> = posts.collect();
    posts.sort_by(cmp);
    posts
}

// ============================================================================
// Collection helpers
// ============================================================================

/// Posts for the hero carousel, at most [`HERO_LIMIT`].
///
/// Featured posts win and keep their data-file order. Without any, the most
/// popular posts are used.
pub fn get_hero(posts: &[Post]) -> Vec<Post> {
    let featured: Vec<Post> = posts
        .iter()
        .filter(|p| p.featured)
        .take(HERO_LIMIT)
        .cloned()
        .collect();
    if !featured.is_empty() {
        return featured;
    }
    let mut hero = sorted_by(posts.iter().cloned(), by_popularity);
    hero.truncate(HERO_LIMIT);
    hero
}

/// Airing and upcoming posts, most popular first.
pub fn get_top_airing(posts: &[Post], limit: usize) -> Vec<Post> {
    let airing = posts
        .iter()
        .filter(|p| p.is_airing() || p.is_upcoming())
        .cloned();
    let mut airing = sorted_by(airing, by_popularity);
    airing.truncate(limit);
    airing
}

/// Every post, newest year first, later seasons before earlier ones.
pub fn sort_latest(posts: &[Post]) -> Vec<Post> {
    sorted_by(posts.iter().cloned(), by_recency)
}

/// Every post, best rated first.
pub fn sort_by_rating(posts: &[Post]) -> Vec<Post> {
    sorted_by(posts.iter().cloned(), by_rating)
}

/// Posts ranked by [`rec_score`].
pub fn get_recommended(posts: &[Post], limit: usize) -> Vec<Post> {
    let mut recommended = sorted_by(posts.iter().cloned(), by_rec_score);
    recommended.truncate(limit);
    recommended
}

/// Most viewed posts.
pub fn get_popular(posts: &[Post], limit: usize) -> Vec<Post> {
    let mut popular = sorted_by(posts.iter().cloned(), by_views);
    popular.truncate(limit);
    popular
}

/// Posts that have finished airing, in data-file order.
pub fn get_completed(posts: &[Post]) -> Vec<Post> {
    posts.iter().filter(|p| p.is_completed()).cloned().collect()
}

/// Posts whose `type` matches `kind`, case-insensitively.
pub fn get_by_type(posts: &[Post], kind: &str) -> Vec<Post> {
    posts.iter().filter(|p| p.is_kind(kind)).cloned().collect()
}

/// The entry for season `season` of the show titled `title`.
///
/// Matches when the entry's title contains the show title and either names
/// the season ("... Season 2") or carries the matching `seasonNumber`.
pub fn find_season(posts: &[Post], title: &str, season: u32) -> Option<Post> {
    let wanted = slugify(title);
    if wanted.is_empty() {
        return None;
    }
    let marker = format!("-season-{season}-");
    posts
        .iter()
        .find(|p| {
            let slug = format!("-{}-", slugify(&p.title));
            slug.contains(&format!("-{wanted}-"))
                && (slug.contains(&marker) || p.season_number == Some(season))
        })
        .cloned()
}

/// Stand-in for a season the catalog doesn't have yet.
pub fn season_placeholder(title: &str, season: u32) -> Post {
    Post {
        title: format!("{title} - Season {season}"),
        slug: Some(slugify(&format!("{title} season {season}"))),
        episodes: Some(0),
        season_number: Some(season),
        ..Post::default()
    }
}

/// [`find_season`], falling back to a [`season_placeholder`].
pub fn get_season_data(posts: &[Post], title: &str, season: u32) -> Post {
    find_season(posts, title, season).unwrap_or_else(|| season_placeholder(title, season))
}

/// Slug of the matching season entry, or the slug its page would get.
pub fn get_season_slug(posts: &[Post], title: &str, season: u32) -> String {
    let found = get_season_data(posts, title, season);
    match found.slug {
        Some(slug) => slug,
        None => slugify(&found.title),
    }
}
