//! Template filters.
//!
//! Everything here is a pure function exposed to templates by name:
//!
//! ```text
//! {{ post.title | slugify }}                      → "attack-on-titan"
//! {% for p in posts | sort_latest | limit(6) %}   → six newest posts
//! {% for p in posts | where("type", "movie") %}   → movies only
//! {{ post.rating | rating }}  {{ post.views | compact }}  {{ post.episodes | episodes }}
//! {{ post.synopsis | truncate(120) }}             → first 120 characters + "..."
//! {{ post.synopsis | truncate }}                  → first 200 characters + "..."
//! <script>const posts = {{ posts | dump }};</script>
//! {% set s2 = posts | season(post.title, 2) %}    → the entry, or none
//! {% set s3 = posts | season_data(post.title, 3) %}  → the entry, or a placeholder
//! {{ posts | season_slug(post.title, 2) }}        → "frieren-season-2"
//! ```
//!
//! Post-aware filters (`hero`, `top_airing`, `recommended`, `popular`,
//! `sort_latest`, `sort_rating`, `by_type`, `season`, `season_data`,
//! `season_slug`) accept any list of post-shaped values, so they compose with
//! the generic ones (`where`, `sort_by`, `limit`). `top_airing` and
//! `recommended` return at most 20 posts unless given a size; `popular` uses
//! the `[collections]` config.

use crate::collections;
use crate::config::CollectionsConfig;
use crate::slug;
use crate::types::Post;
use minijinja::value::{Value, ViaDeserialize};
use minijinja::{Environment, Error, ErrorKind};
use std::cmp::Ordering;

/// Length used by `truncate` when none is given.
const DEFAULT_TRUNCATE: usize = 200;

/// Register every filter on `env`.
pub fn register(env: &mut Environment<'_>, config: &CollectionsConfig) {
    env.add_filter("slugify", |s: &str| slug::slugify(s));
    env.add_filter("limit", limit);
    env.add_filter("sort_by", sort_by);
    env.add_filter("where", where_eq);
    env.add_filter("rating", |v: Value| format_rating(as_number(&v)));
    env.add_filter("compact", |v: Value| format_compact(as_number(&v)));
    env.add_filter("episodes", |v: Value| {
        format_episodes(as_number(&v).filter(|n| *n >= 0.0).map(|n| n as u64))
    });
    env.add_filter("truncate", |v: Value, length: Option<usize>| match v.as_str() {
        Some(s) => Value::from(truncate(s, length.unwrap_or(DEFAULT_TRUNCATE))),
        None => v,
    });
    env.add_filter("json", to_json);
    env.add_filter("dump", to_json);

    env.add_filter("sort_latest", |posts: ViaDeserialize<Vec<Post>>| {
        Value::from_serialize(collections::sort_latest(&posts))
    });
    env.add_filter("sort_rating", |posts: ViaDeserialize<Vec<Post>>| {
        Value::from_serialize(collections::sort_by_rating(&posts))
    });
    env.add_filter("hero", |posts: ViaDeserialize<Vec<Post>>| {
        Value::from_serialize(collections::get_hero(&posts))
    });
    env.add_filter("by_type", |posts: ViaDeserialize<Vec<Post>>, kind: &str| {
        Value::from_serialize(collections::get_by_type(&posts, kind))
    });
    env.add_filter(
        "season",
        |posts: ViaDeserialize<Vec<Post>>, title: &str, season: u32| {
            Value::from_serialize(collections::find_season(&posts, title, season))
        },
    );
    env.add_filter(
        "season_data",
        |posts: ViaDeserialize<Vec<Post>>, title: &str, season: u32| {
            Value::from_serialize(collections::get_season_data(&posts, title, season))
        },
    );
    env.add_filter(
        "season_slug",
        |posts: ViaDeserialize<Vec<Post>>, title: &str, season: u32| {
            collections::get_season_slug(&posts, title, season)
        },
    );
    env.add_filter(
        "top_airing",
        |posts: ViaDeserialize<Vec<Post>>, n: Option<usize>| {
            Value::from_serialize(collections::get_top_airing(
                &posts,
                n.unwrap_or(collections::FILTER_LIMIT),
            ))
        },
    );
    env.add_filter(
        "recommended",
        |posts: ViaDeserialize<Vec<Post>>, n: Option<usize>| {
            Value::from_serialize(collections::get_recommended(
                &posts,
                n.unwrap_or(collections::FILTER_LIMIT),
            ))
        },
    );

    let popular = config.popular;
    env.add_filter(
        "popular",
        move |posts: ViaDeserialize<Vec<Post>>, n: Option<usize>| {
            Value::from_serialize(collections::get_popular(&posts, n.unwrap_or(popular)))
        },
    );
}

/// First `n` items of any sequence.
fn limit(value: Value, n: usize) -> Result<Value, Error> {
    Ok(Value::from(value.try_iter()?.take(n).collect::<Vec<_>>()))
}

/// Sort a sequence by an attribute. Items without the attribute go last in
/// both directions.
fn sort_by(value: Value, field: &str, reverse: Option<bool>) -> Result<Value, Error> {
    let reverse = reverse.unwrap_or(false);
    let mut items: Vec<(Value, Value)> = value
        .try_iter()?
        .map(|item| {
            let key = item.get_attr(field).unwrap_or(Value::UNDEFINED);
            (key, item)
        })
        .collect();

    items.sort_by(|(a, _), (b, _)| {
        let missing = |v: &Value| v.is_undefined() || v.is_none();
        match (missing(a), missing(b)) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) if reverse => b.cmp(a),
            (false, false) => a.cmp(b),
        }
    });

    Ok(Value::from(
        items.into_iter().map(|(_, item)| item).collect::<Vec<_>>(),
    ))
}

/// Items whose attribute equals `expected`. Strings compare case-insensitively.
fn where_eq(value: Value, field: &str, expected: Value) -> Result<Value, Error> {
    let matches = |actual: &Value| match (actual.as_str(), expected.as_str()) {
        (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => *actual == expected,
    };
    Ok(Value::from(
        value
            .try_iter()?
            .filter(|item| item.get_attr(field).is_ok_and(|v| matches(&v)))
            .collect::<Vec<_>>(),
    ))
}

/// Cut `s` to `length` characters, marking the cut with `...`.
pub fn truncate(s: &str, length: usize) -> String {
    match s.char_indices().nth(length) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

/// JSON text safe to embed in HTML and `<script>` blocks.
fn to_json(value: Value) -> Result<Value, Error> {
    let json = serde_json::to_string(&value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, format!("cannot serialize: {e}")))?;
    let json = json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\'', "\\u0027");
    Ok(Value::from_safe_string(json))
}

/// Numeric view of a template value; numeric strings count.
fn as_number(value: &Value) -> Option<f64> {
    if let Some(s) = value.as_str() {
        return s.trim().parse::<f64>().ok();
    }
    if value.is_undefined() || value.is_none() {
        return None;
    }
    f64::try_from(value.clone()).ok().filter(|n| n.is_finite())
}

/// `8.66` → `"8.7"`; missing → `"N/A"`.
pub fn format_rating(rating: Option<f64>) -> String {
    match rating {
        Some(r) => format!("{r:.1}"),
        None => "N/A".to_string(),
    }
}

/// Short human count: `950`, `1.2K`, `3.4M`, `2B`.
pub fn format_compact(count: Option<f64>) -> String {
    let Some(n) = count else {
        return "0".to_string();
    };
    const UNITS: &[(f64, &str)] = &[(1e9, "B"), (1e6, "M"), (1e3, "K")];
    for &(scale, unit) in UNITS {
        if n.abs() >= scale {
            let scaled = format!("{:.1}", n / scale);
            let scaled = scaled.strip_suffix(".0").unwrap_or(&scaled);
            return format!("{scaled}{unit}");
        }
    }
    format!("{}", n.round() as i64)
}

/// `"12 episodes"`, `"1 episode"`, `"? episodes"` when unknown.
pub fn format_episodes(episodes: Option<u64>) -> String {
    match episodes {
        Some(1) => "1 episode".to_string(),
        Some(n) => format!("{n} episodes"),
        None => "? episodes".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;
    use serde_json::json;

    fn env() -> Environment<'static> {
        let mut env = Environment::new();
        register(&mut env, &CollectionsConfig::default());
        env
    }

    fn render(template: &str, ctx: Value) -> String {
        env().render_str(template, ctx).unwrap()
    }

    fn catalog() -> Value {
        Value::from_serialize(json!([
            { "title": "Old Movie", "type": "movie", "year": 1999, "rating": 8.9, "views": 50 },
            { "title": "New Show", "type": "TV", "year": 2024, "rating": 7.1, "status": "Airing", "views": 900 },
            { "title": "Mid Show", "type": "tv", "year": 2015, "rating": 9.2, "status": "airing", "featured": true },
        ]))
    }

    #[test]
    fn slugify_filter() {
        assert_eq!(render("{{ 'Attack on Titan' | slugify }}", context! {}), "attack-on-titan");
    }

    #[test]
    fn limit_takes_prefix() {
        assert_eq!(render("{{ [1, 2, 3] | limit(2) | join(',') }}", context! {}), "1,2");
        assert_eq!(render("{{ [1] | limit(5) | length }}", context! {}), "1");
    }

    #[test]
    fn sort_latest_filter() {
        let out = render(
            "{% for p in posts | sort_latest %}{{ p.title }};{% endfor %}",
            context! { posts => catalog() },
        );
        assert_eq!(out, "New Show;Mid Show;Old Movie;");
    }

    #[test]
    fn sort_by_missing_values_go_last() {
        let out = render(
            "{% for p in posts | sort_by('views', true) %}{{ p.title }};{% endfor %}",
            context! { posts => catalog() },
        );
        assert_eq!(out, "New Show;Old Movie;Mid Show;");

        let out = render(
            "{% for p in posts | sort_by('views') %}{{ p.title }};{% endfor %}",
            context! { posts => catalog() },
        );
        assert_eq!(out, "Old Movie;New Show;Mid Show;");
    }

    #[test]
    fn where_matches_case_insensitively() {
        let out = render(
            "{{ posts | where('type', 'tv') | length }}",
            context! { posts => catalog() },
        );
        assert_eq!(out, "2");
    }

    #[test]
    fn collection_filters_compose() {
        let out = render(
            "{% for p in posts | top_airing(1) %}{{ p.title }}{% endfor %}|\
             {% for p in posts | hero %}{{ p.title }}{% endfor %}|\
             {% for p in posts | recommended %}{{ p.title }};{% endfor %}|\
             {% for p in posts | popular(1) %}{{ p.title }}{% endfor %}",
            context! { posts => catalog() },
        );
        assert_eq!(out, "Mid Show|Mid Show|Mid Show;Old Movie;New Show;|New Show");
    }

    #[test]
    fn formatting_filters() {
        let out = render(
            "{{ 8.66 | rating }} {{ none | rating }} {{ 1234567 | compact }} {{ '12' | episodes }}",
            context! {},
        );
        assert_eq!(out, "8.7 N/A 1.2M 12 episodes");
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("Frieren", 20), "Frieren");
        assert_eq!(truncate("Frieren", 4), "Frie...");
        assert_eq!(truncate("Pokémon", 4), "Poké...");
        assert_eq!(
            render("{{ 'abcdef' | truncate(3) }}", context! {}),
            "abc..."
        );
    }

    #[test]
    fn truncate_defaults_to_two_hundred() {
        let long = "x".repeat(250);
        let out = render("{{ text | truncate }}", context! { text => long });
        assert_eq!(out.len(), DEFAULT_TRUNCATE + 3);
        assert!(out.ends_with("x..."));
    }

    #[test]
    fn dump_escapes_markup() {
        let out = render(
            "{{ data | dump }}",
            context! { data => json!({ "title": "</script>" }) },
        );
        assert_eq!(out, r#"{"title":"\u003c/script\u003e"}"#);
    }

    #[test]
    fn post_lookup_filters() {
        let out = render(
            "{% for p in posts | by_type('movie') %}{{ p.title }}{% endfor %}|\
             {% for p in posts | sort_rating %}{{ p.title }};{% endfor %}|\
             {{ (posts | season('mid show', 1)) is none }}",
            context! { posts => catalog() },
        );
        assert_eq!(out, "Old Movie|Mid Show;Old Movie;New Show;|true");
    }

    #[test]
    fn top_airing_filter_keeps_upcoming() {
        let posts = Value::from_serialize(json!([
            { "title": "Later", "status": "Upcoming", "popularity": 99 },
            { "title": "Now", "status": "ongoing", "popularity": 90, "rating": 9.9 },
            { "title": "Gone", "status": "completed", "popularity": 100 },
        ]));
        let out = render(
            "{% for p in posts | top_airing %}{{ p.title }};{% endfor %}",
            context! { posts => posts },
        );
        assert_eq!(out, "Later;Now;");
    }

    #[test]
    fn recommended_filter_ranks_by_score() {
        let posts = Value::from_serialize(json!([
            { "title": "Niche", "rating": 9, "popularity": 5 },
            { "title": "Viral", "rating": 7, "popularity": 95 },
        ]));
        let out = render(
            "{% for p in posts | recommended %}{{ p.title }};{% endfor %}",
            context! { posts => posts },
        );
        assert_eq!(out, "Viral;Niche;");
    }

    #[test]
    fn season_data_filter_finds_or_fills_in() {
        let posts = Value::from_serialize(json!([
            { "title": "Frieren", "slug": "frieren" },
            { "title": "Frieren Season 2", "slug": "frieren-s2", "year": 2026 },
        ]));
        let out = render(
            "{% set s2 = posts | season_data('Frieren', 2) %}{{ s2.title }} ({{ s2.year }})|\
             {% set s3 = posts | season_data('Frieren', 3) %}{{ s3.title }} {{ s3.episodes }} {{ s3.rating | rating }}",
            context! { posts => posts },
        );
        assert_eq!(out, "Frieren Season 2 (2026)|Frieren - Season 3 0 N/A");
    }

    #[test]
    fn season_slug_filter() {
        let posts = Value::from_serialize(json!([
            { "title": "Frieren Season 2", "slug": "frieren-s2" },
        ]));
        let out = render(
            "{{ posts | season_slug('Frieren', 2) }} {{ posts | season_slug('Frieren', 3) }}",
            context! { posts => posts },
        );
        assert_eq!(out, "frieren-s2 frieren-season-3");
    }

    #[test]
    fn format_compact_thresholds() {
        assert_eq!(format_compact(Some(950.0)), "950");
        assert_eq!(format_compact(Some(1_000.0)), "1K");
        assert_eq!(format_compact(Some(1_240.0)), "1.2K");
        assert_eq!(format_compact(Some(3_400_000.0)), "3.4M");
        assert_eq!(format_compact(Some(2e9)), "2B");
        assert_eq!(format_compact(None), "0");
    }

    #[test]
    fn format_episodes_pluralizes() {
        assert_eq!(format_episodes(Some(1)), "1 episode");
        assert_eq!(format_episodes(Some(24)), "24 episodes");
        assert_eq!(format_episodes(None), "? episodes");
    }

    #[test]
    fn format_rating_one_decimal() {
        assert_eq!(format_rating(Some(9.0)), "9.0");
        assert_eq!(format_rating(None), "N/A");
    }
}
