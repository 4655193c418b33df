//! Stored Media Reference Decoding
//!
//! A node's media column has accumulated several historical representations:
//! a JSON array of storage keys (the canonical form), a bare path string, a
//! base64-encoded path string, and raw binary blobs. This module maps every
//! representation to one canonical `Vec<String>` of keys at the read
//! boundary, so no variant-specific handling leaks past it.
//!
//! Decoding is best-effort and never fails: legacy data is inherently
//! inconsistent, and an unrecognizable value contributes nothing rather
//! than poisoning an otherwise valid record.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::warn;

/// Raw value of a persisted media reference, before normalization.
///
/// Covers every representation observed in historical data. Writers only
/// ever produce the canonical JSON-array form; readers must accept all of
/// these.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredMediaValue {
    /// Column was NULL or missing
    Absent,
    /// A text value: canonical JSON array, a bare path, or base64 text
    Text(String),
    /// An already-decoded list of keys
    List(Vec<String>),
    /// A raw binary payload (decoded as UTF-8 text and re-dispatched)
    Binary(Vec<u8>),
}

impl StoredMediaValue {
    /// Normalize this stored value into canonical storage keys.
    ///
    /// Every branch that cannot produce a valid key yields nothing; this
    /// method never errors. Order of surviving keys is preserved.
    pub fn normalize(self) -> Vec<String> {
        match self {
            StoredMediaValue::Absent => Vec::new(),
            StoredMediaValue::List(keys) => filter_keys(keys),
            StoredMediaValue::Text(text) => normalize_text(&text),
            StoredMediaValue::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => normalize_text(&text),
                Err(_) => {
                    warn!("Discarding non-UTF-8 binary media reference");
                    Vec::new()
                }
            },
        }
    }
}

/// Normalize a raw stored value into canonical keys (convenience wrapper).
pub fn normalize_stored_value(raw: StoredMediaValue) -> Vec<String> {
    raw.normalize()
}

/// Drop empty/blank entries, keeping order.
fn filter_keys(keys: Vec<String>) -> Vec<String> {
    keys.into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Decode a single text value.
///
/// Tried in order: canonical JSON array, JSON string, bare path, base64
/// path. A value with no path markers that also fails base64 decoding is
/// silently discarded as invalid legacy data.
fn normalize_text(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    // Canonical writes are JSON arrays; legacy writers sometimes stored a
    // JSON string instead of a bare one.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match value {
            serde_json::Value::Array(entries) => {
                let keys = entries
                    .into_iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect();
                return filter_keys(keys);
            }
            serde_json::Value::String(s) => return normalize_single(&s),
            serde_json::Value::Null => return Vec::new(),
            _ => {}
        }
    }

    normalize_single(trimmed)
}

/// Decode a single non-JSON string: direct path, or base64-encoded path.
fn normalize_single(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if looks_like_path(trimmed) {
        return vec![trimmed.to_string()];
    }

    // No path markers: the only remaining legal legacy form is a
    // base64-encoded path.
    match BASE64.decode(trimmed) {
        Ok(decoded) => match String::from_utf8(decoded) {
            Ok(candidate) if looks_like_path(candidate.trim()) => {
                vec![candidate.trim().to_string()]
            }
            _ => {
                warn!("Discarding base64 media reference that does not decode to a path");
                Vec::new()
            }
        },
        Err(_) => {
            warn!("Discarding unrecognized media reference");
            Vec::new()
        }
    }
}

/// A value is path-like if it carries a path separator or a URL scheme.
fn looks_like_path(value: &str) -> bool {
    value.starts_with('/')
        || value.starts_with("http")
        || value.contains('/')
        || value.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_is_empty() {
        assert!(StoredMediaValue::Absent.normalize().is_empty());
    }

    #[test]
    fn test_list_filters_blank_entries() {
        let raw = StoredMediaValue::List(vec![
            "team_profiles/a.jpg".to_string(),
            String::new(),
            "  ".to_string(),
            "team_profiles/b.png".to_string(),
        ]);

        assert_eq!(
            raw.normalize(),
            vec![
                "team_profiles/a.jpg".to_string(),
                "team_profiles/b.png".to_string()
            ]
        );
    }

    #[test]
    fn test_canonical_json_array() {
        let raw =
            StoredMediaValue::Text(r#"["team_profiles/a.jpg","team_profiles/b.jpg"]"#.to_string());

        assert_eq!(
            raw.normalize(),
            vec![
                "team_profiles/a.jpg".to_string(),
                "team_profiles/b.jpg".to_string()
            ]
        );
    }

    #[test]
    fn test_json_array_with_nulls_and_blanks() {
        let raw = StoredMediaValue::Text(r#"[null, "", "gallery/x.webp", 42]"#.to_string());

        assert_eq!(raw.normalize(), vec!["gallery/x.webp".to_string()]);
    }

    #[test]
    fn test_bare_path_string() {
        let raw = StoredMediaValue::Text("team_profiles/photo.jpg".to_string());
        assert_eq!(raw.normalize(), vec!["team_profiles/photo.jpg".to_string()]);

        let raw = StoredMediaValue::Text("/defaults/avatar.png".to_string());
        assert_eq!(raw.normalize(), vec!["/defaults/avatar.png".to_string()]);

        let raw = StoredMediaValue::Text("https://cdn.example.org/a.png".to_string());
        assert_eq!(
            raw.normalize(),
            vec!["https://cdn.example.org/a.png".to_string()]
        );
    }

    #[test]
    fn test_base64_encoded_path() {
        // "team_profiles/old.jpg"
        let encoded = BASE64.encode("team_profiles/old.jpg");
        let raw = StoredMediaValue::Text(encoded);

        assert_eq!(raw.normalize(), vec!["team_profiles/old.jpg".to_string()]);
    }

    #[test]
    fn test_base64_decoding_to_non_path_is_discarded() {
        // Valid base64, but the payload has no path markers
        let encoded = BASE64.encode("notapath");
        let raw = StoredMediaValue::Text(encoded);

        assert!(raw.normalize().is_empty());
    }

    #[test]
    fn test_invalid_base64_is_discarded() {
        let raw = StoredMediaValue::Text("not base64!!".to_string());
        assert!(raw.normalize().is_empty());
    }

    #[test]
    fn test_empty_and_null_text() {
        assert!(StoredMediaValue::Text(String::new()).normalize().is_empty());
        assert!(StoredMediaValue::Text("   ".to_string())
            .normalize()
            .is_empty());
        assert!(StoredMediaValue::Text("null".to_string())
            .normalize()
            .is_empty());
    }

    #[test]
    fn test_json_string_variant() {
        let raw = StoredMediaValue::Text(r#""team_profiles/quoted.jpg""#.to_string());
        assert_eq!(
            raw.normalize(),
            vec!["team_profiles/quoted.jpg".to_string()]
        );
    }

    #[test]
    fn test_binary_utf8_path() {
        let raw = StoredMediaValue::Binary(b"team_profiles/blob.jpg".to_vec());
        assert_eq!(raw.normalize(), vec!["team_profiles/blob.jpg".to_string()]);
    }

    #[test]
    fn test_binary_invalid_utf8_is_discarded() {
        let raw = StoredMediaValue::Binary(vec![0xff, 0xfe, 0x00, 0x80]);
        assert!(raw.normalize().is_empty());
    }

    #[test]
    fn test_binary_garbage_text_is_discarded() {
        let raw = StoredMediaValue::Binary(b"garbage".to_vec());
        assert!(raw.normalize().is_empty());
    }
}
