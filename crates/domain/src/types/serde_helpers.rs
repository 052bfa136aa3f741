//! Serde helpers for platform payloads
//!
//! Install events arrive as form fields, so numbers such as `AUTH_EXPIRES`
//! are often strings.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    String(String),
}

/// Deserialize an optional integer given either as a JSON number or as a
/// decimal string. Blank strings become `None`.
///
/// # Errors
/// Fails if a non-blank string does not parse as `i64`.
pub fn lenient_i64_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::String(s)) => {
            s.trim().parse::<i64>().map(Some).map_err(serde::de::Error::custom)
        }
    }
}
