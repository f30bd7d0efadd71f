//! Common types and utilities shared across handlers and services
use chrono::Utc;
use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Deserializer};

static RECORD_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("record id pattern is valid"));

/// Generates a 24-character lowercase hex identifier.
///
/// The first 4 bytes are the big-endian unix timestamp in seconds, the
/// remaining 8 are random, so ids sort roughly by creation time.
pub fn new_record_id() -> String {
    let mut bytes = [0u8; 12];
    let secs = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
    bytes[..4].copy_from_slice(&secs.to_be_bytes());
    rand::thread_rng().fill_bytes(&mut bytes[4..]);
    hex::encode(bytes)
}

/// True when `value` has the shape of a generated record id.
pub fn is_record_id(value: &str) -> bool {
    RECORD_ID_RE.is_match(value)
}

/// Canonical form used as primary key
pub fn normalize_record_id(value: &str) -> Option<String> {
    is_record_id(value).then(|| value.to_ascii_lowercase())
}

pub fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .and_then(|v| if v.is_empty() { None } else { Some(v) })
}

/// Deserializer for patch fields that can be cleared.
///
/// Use with `#[serde(default, deserialize_with = "...")]`: an absent field
/// stays `None`, `null` becomes `Some(None)` and a value `Some(Some(v))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        limit: Option<Option<i32>>,
    }

    #[test]
    fn generated_ids_are_record_ids() {
        for _ in 0..32 {
            let id = new_record_id();
            assert_eq!(id.len(), 24);
            assert!(is_record_id(&id));
            assert_eq!(id, id.to_ascii_lowercase());
        }
    }

    #[test]
    fn rejects_non_hex_and_wrong_length() {
        assert!(!is_record_id("HP-1001"));
        assert!(!is_record_id("abc"));
        assert!(!is_record_id("zzzzzzzzzzzzzzzzzzzzzzzz"));
        assert!(is_record_id("65A1B2C3D4E5F60718293A4B"));
        assert_eq!(
            normalize_record_id("65A1B2C3D4E5F60718293A4B").as_deref(),
            Some("65a1b2c3d4e5f60718293a4b")
        );
    }

    #[test]
    fn blank_optional_strings_become_none() {
        assert_eq!(normalize_optional_string(Some("  ".into())), None);
        assert_eq!(
            normalize_optional_string(Some(" x ".into())).as_deref(),
            Some("x")
        );
        assert_eq!(normalize_optional_string(None), None);
    }

    #[test]
    fn double_option_tells_null_from_absent() {
        let absent: Patch = serde_json::from_value(json!({})).unwrap();
        assert_eq!(absent.limit, None);

        let cleared: Patch = serde_json::from_value(json!({ "limit": null })).unwrap();
        assert_eq!(cleared.limit, Some(None));

        let set: Patch = serde_json::from_value(json!({ "limit": 5 })).unwrap();
        assert_eq!(set.limit, Some(Some(5)));
    }
}
