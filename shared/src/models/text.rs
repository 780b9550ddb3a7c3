//! Optional text fields
//!
//! `description` and `contact` on tickets are nullable. An empty (or
//! whitespace-only) string and `null` mean the same thing: the field is unset.
//! Titles are required and are never normalized to `None`.

use serde::{Deserialize, Deserializer};

/// Collapse blank strings to `None`, trimming surrounding whitespace.
pub fn normalize(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Deserialize an optional text patch field.
///
/// - field absent: `None` (keep the stored value)
/// - `null` or `""`: `Some(None)` (clear the stored value)
/// - `"text"`: `Some(Some("text"))`
///
/// Use together with `#[serde(default)]`.
pub fn deserialize_patch<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(Some(normalize(value)))
}

/// Deserialize an optional text field on create payloads, normalizing blanks.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(normalize(value))
}
