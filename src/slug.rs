//! URL slugs for catalog entries.
//!
//! Every post page lives at `/<prefix>/<slug>/`, so slugs must be unique within
//! a build. Uniqueness is tracked by a [`SlugRegistry`] that the build creates,
//! fills while assigning slugs, and drops with the rest of the build state:
//!
//! ```text
//! "Spy x Family"             → spy-x-family
//! "Spy x Family" (season 2)  → spy-x-family-season-2
//! "Spy x Family!"            → spy-x-family-2      (collision)
//! ```

use crate::types::Post;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Slug used when a post has neither a slug nor a usable title.
const FALLBACK_SLUG: &str = "post";

/// Lower-case ASCII slug of `input`.
///
/// Characters are transliterated to ASCII first, then every run of characters
/// outside `[a-z0-9_]` becomes a single `-`. Leading and trailing separators
/// are dropped, so surrounding whitespace disappears and an already-slugified
/// string maps to itself.
pub fn slugify(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    let mut need_dash = false;
    for ch in input.chars() {
        for b in deunicode::deunicode_char(ch).unwrap_or("-").bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }
                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => need_dash = !output.is_empty(),
            }
        }
    }

    output
}

/// The slug a post asks for before collisions are resolved.
///
/// A catalog `id` wins, then an explicit `slug`. Otherwise the title is used,
/// with the season appended for second and later seasons so that sequels
/// don't all collide with the first season.
pub fn base_slug(post: &Post) -> String {
    let id = match post.extra.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    for explicit in [id.as_deref(), post.slug.as_deref()].into_iter().flatten() {
        let slug = slugify(explicit);
        if !slug.is_empty() {
            return slug;
        }
    }

    match post.season_number {
        Some(n) if n > 1 => slugify(&format!("{} season {}", post.title, n)),
        _ => slugify(&post.title),
    }
}

/// Hands out unique slugs for one build.
///
/// Tracks how many times each base slug has been requested. The first claim of
/// `x` gets `x`, later claims get `x-2`, `x-3`, ... A generated suffix that
/// happens to equal another post's base slug is skipped.
#[derive(Debug, Default)]
pub struct SlugRegistry {
    counts: HashMap<String, usize>,
    taken: HashSet<String>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a unique slug derived from `base`.
    pub fn claim(&mut self, base: &str) -> String {
        let base = if base.is_empty() { FALLBACK_SLUG } else { base };
        let count = self.counts.entry(base.to_string()).or_insert(0);
        loop {
            *count += 1;
            let candidate = if *count == 1 {
                base.to_string()
            } else {
                format!("{base}-{count}")
            };
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Number of slugs handed out so far.
    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_joins_words() {
        assert_eq!(slugify("Attack on Titan"), "attack-on-titan");
    }

    #[test]
    fn trims_and_collapses_separators() {
        assert_eq!(slugify("  Re:Zero -- Starting   Life  "), "re-zero-starting-life");
    }

    #[test]
    fn transliterates_non_ascii() {
        assert_eq!(slugify("Pokémon"), "pokemon");
        assert_eq!(slugify("Café Terrace"), "cafe-terrace");
    }

    #[test]
    fn keeps_underscores() {
        assert_eq!(slugify("snake_case title"), "snake_case-title");
    }

    #[test]
    fn empty_input_passes_through() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("   "), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn idempotent_on_slugified_input() {
        for input in ["Attack on Titan", "Re:Zero", "Pokémon 2019", "a_b-c", "86"] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn base_slug_prefers_explicit_slug() {
        let mut post = Post::titled("Jujutsu Kaisen");
        post.slug = Some("JJK".to_string());
        assert_eq!(base_slug(&post), "jjk");
    }

    #[test]
    fn base_slug_prefers_catalog_id() {
        let mut post = Post::titled("Jujutsu Kaisen");
        post.slug = Some("jjk".to_string());
        post.extra.insert("id".to_string(), serde_json::json!(4417));
        assert_eq!(base_slug(&post), "4417");
    }

    #[test]
    fn base_slug_falls_back_to_title_when_explicit_is_blank() {
        let mut post = Post::titled("Jujutsu Kaisen");
        post.slug = Some("???".to_string());
        assert_eq!(base_slug(&post), "jujutsu-kaisen");
    }

    #[test]
    fn base_slug_appends_later_seasons() {
        let mut post = Post::titled("Vinland Saga");
        post.season_number = Some(2);
        assert_eq!(base_slug(&post), "vinland-saga-season-2");

        post.season_number = Some(1);
        assert_eq!(base_slug(&post), "vinland-saga");
    }

    #[test]
    fn registry_first_claim_is_bare() {
        let mut slugs = SlugRegistry::new();
        assert_eq!(slugs.claim("bleach"), "bleach");
    }

    #[test]
    fn registry_numbers_collisions() {
        let mut slugs = SlugRegistry::new();
        assert_eq!(slugs.claim("bleach"), "bleach");
        assert_eq!(slugs.claim("bleach"), "bleach-2");
        assert_eq!(slugs.claim("bleach"), "bleach-3");
        assert_eq!(slugs.len(), 3);
    }

    #[test]
    fn registry_skips_suffix_taken_by_another_base() {
        let mut slugs = SlugRegistry::new();
        assert_eq!(slugs.claim("monster-2"), "monster-2");
        assert_eq!(slugs.claim("monster"), "monster");
        assert_eq!(slugs.claim("monster"), "monster-3");
    }

    #[test]
    fn registry_empty_base_uses_fallback() {
        let mut slugs = SlugRegistry::new();
        assert_eq!(slugs.claim(""), "post");
        assert_eq!(slugs.claim(""), "post-2");
    }

    #[test]
    fn registry_starts_empty() {
        assert!(SlugRegistry::new().is_empty());
    }
}
