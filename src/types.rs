//! Shared types used across the build stages.
//!
//! A [`Post`] is read from the data file, enriched with a unique slug and URL
//! by [`collections`](crate::collections), and serialized into every template
//! context. Field names on the wire match the data file (`seasonNumber`,
//! `type`), so templates see the same keys the catalog editors write.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single catalog entry (show, movie, season).
///
/// Every field is optional in the source document. Numbers may be written as
/// JSON numbers or numeric strings, and `featured` accepts booleans, `0`/`1`
/// and `"true"`/`"false"`. Values that cannot be interpreted are treated as
/// absent rather than failing the whole data file.
///
/// Fields the generator does not know about are kept in [`Post::extra`] and
/// flattened back into the template context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    /// Explicit slug from the data file; replaced by the unique slug once the
    /// collections are built.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub slug: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_i32",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<i32>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<f64>,
    /// Popularity score, higher is more popular.
    #[serde(
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub popularity: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub views: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    /// `type` in the data file: `tv`, `movie`, `ova`, ...
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub featured: bool,
    #[serde(
        default,
        deserialize_with = "lenient::opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub season_number: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub episodes: Option<u32>,
    /// Site-relative URL of the post page, assigned during the build.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,
    /// `/watch/<slug>/` under the site's base URL, assigned during the build.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub watch_link: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const AIRING_STATUSES: &[&str] = &["airing", "currently airing", "ongoing"];
const UPCOMING_STATUSES: &[&str] = &["upcoming", "not yet aired"];
const COMPLETED_STATUSES: &[&str] = &["completed", "finished", "finished airing"];

impl Post {
    /// Convenience constructor used by tests and fixtures.
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn is_airing(&self) -> bool {
        self.status_in(AIRING_STATUSES)
    }

    pub fn is_upcoming(&self) -> bool {
        self.status_in(UPCOMING_STATUSES)
    }

    pub fn is_completed(&self) -> bool {
        self.status_in(COMPLETED_STATUSES)
    }

    /// Case-insensitive match on the `type` field.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|k| k.trim().eq_ignore_ascii_case(kind))
    }

    fn status_in(&self, statuses: &[&str]) -> bool {
        self.status.as_deref().is_some_and(|s| {
            let s = s.trim();
            statuses.iter().any(|known| s.eq_ignore_ascii_case(known))
        })
    }
}

/// Deserializers that accept whatever shape the data file happens to use.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite())
    }

    fn whole(value: &Value) -> Option<f64> {
        number(value).filter(|n| n.fract() == 0.0)
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(number(&Value::deserialize(d)?))
    }

    pub fn opt_i32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
        Ok(whole(&Value::deserialize(d)?)
            .filter(|n| *n >= i32::MIN as f64 && *n <= i32::MAX as f64)
            .map(|n| n as i32))
    }

    pub fn opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(whole(&Value::deserialize(d)?)
            .filter(|n| *n >= 0.0 && *n <= u32::MAX as f64)
            .map(|n| n as u32))
    }

    pub fn opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let value = Value::deserialize(d)?;
        if let Some(n) = value.as_u64() {
            return Ok(Some(n));
        }
        Ok(whole(&value).filter(|n| *n >= 0.0).map(|n| n as u64))
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(opt_string(d)?.unwrap_or_default())
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Value::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "1"
            ),
            _ => false,
        })
    }
}
