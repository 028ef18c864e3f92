/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login and token refresh
/// - `users`: Staff user administration
/// - `blogs`: Blog posts and their publish transitions
/// - `events`: Events, RSVP and publish transitions
/// - `photos`: Photo gallery

pub mod auth;
pub mod blogs;
pub mod events;
pub mod health;
pub mod photos;
pub mod users;

use serde::{Deserialize, Deserializer};

/// Default page size for list endpoints
pub const DEFAULT_LIMIT: i64 = 100;

/// Largest page size a client may ask for
pub const MAX_LIMIT: i64 = 500;

/// `?limit=&offset=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// Limit clamped to `1..=MAX_LIMIT`
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Distinguishes an absent field from an explicit `null`
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// missing gives `None`, `null` gives `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims surrounding whitespace while deserializing, so that validation sees
/// the value that will be stored
///
/// Use with `#[serde(deserialize_with = "trimmed")]`.
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

/// Query-string truthiness used by list filters (`1`, `true`, `yes`)
pub fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Query-string id filter; anything that is not an integer is ignored
pub fn parse_id(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Non-empty, trimmed query-string text filter
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        image: Option<Option<String>>,
    }

    #[test]
    fn test_pagination_defaults_and_bounds() {
        let page = Pagination::default();
        assert_eq!(page.limit(), DEFAULT_LIMIT);
        assert_eq!(page.offset(), 0);

        let page = Pagination {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(page.limit(), MAX_LIMIT);
        assert_eq!(page.offset(), 0);

        let page = Pagination {
            limit: Some(0),
            offset: Some(20),
        };
        assert_eq!(page.limit(), 1);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.image, None);

        let cleared: Patch = serde_json::from_str(r#"{"image": null}"#).unwrap();
        assert_eq!(cleared.image, Some(None));

        let set: Patch = serde_json::from_str(r#"{"image": "a.jpg"}"#).unwrap();
        assert_eq!(set.image, Some(Some("a.jpg".to_string())));
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(Some("1")));
        assert!(is_truthy(Some("TRUE")));
        assert!(is_truthy(Some("yes")));
        assert!(!is_truthy(Some("on")));
        assert!(!is_truthy(Some("")));
        assert!(!is_truthy(None));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(Some("42")), Some(42));
        assert_eq!(parse_id(Some("abc")), None);
        assert_eq!(parse_id(None), None);
    }
}
