//! Hex payload helpers
//!
//! The graph API ships protobuf `Any` payloads as hex strings. String
//! wrappers are plain UTF-8 once decoded; Struct wrappers carry a few bytes
//! of protobuf framing in front of an embedded JSON document, which
//! [`extract_json_from_hex`] locates by bracket matching.

use serde_json::Value;

/// Shortest string treated as a hex payload
pub const MIN_HEX_LEN: usize = 20;

/// True for even-length strings of at least [`MIN_HEX_LEN`] hex digits
pub fn is_hex_string(s: &str) -> bool {
    s.len() >= MIN_HEX_LEN && s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Decode hex digit pairs as UTF-8 text
///
/// Invalid UTF-8 becomes replacement characters. Input that is not valid hex
/// at all is returned unchanged.
pub fn hex_to_string(hex: &str) -> String {
    match hex::decode(hex) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::debug!(error = %e, len = hex.len(), "hex decode failed, keeping original");
            hex.to_string()
        }
    }
}

/// Pull the first complete JSON object or array out of a hex payload
///
/// Returns `None` when the bytes are not hex, contain no `{`/`[`, the
/// brackets never balance, or the balanced fragment does not parse.
pub fn extract_json_from_hex(hex: &str) -> Option<Value> {
    let bytes = hex::decode(hex).ok()?;
    let text = String::from_utf8_lossy(&bytes);

    let start = text.find(['{', '['])?;
    let fragment = balanced_fragment(&text[start..])?;

    match serde_json::from_str(fragment) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, len = fragment.len(), "embedded JSON did not parse");
            None
        }
    }
}

/// Prefix of `text` up to and including the bracket that closes `text[0]`
///
/// Brackets inside string literals are ignored; a backslash escapes the
/// character that follows it.
fn balanced_fragment(text: &str) -> Option<&str> {
    let mut chars = text.char_indices();
    let (_, open) = chars.next()?;
    let close = match open {
        '{' => '}',
        '[' => ']',
        _ => return None,
    };

    let mut depth = 1usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in chars {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            _ if c == open => depth += 1,
            _ if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_hex_string() {
        assert!(is_hex_string("0a1b2c3d4e5f6A7B8C9D"));
        // too short
        assert!(!is_hex_string("0a1b2c"));
        // odd length
        assert!(!is_hex_string("0a1b2c3d4e5f6a7b8c9d0"));
        // non-hex character
        assert!(!is_hex_string("0a1b2c3d4e5f6a7b8c9g"));
    }

    #[test]
    fn test_hex_to_string() {
        assert_eq!(hex_to_string(&hex::encode("héllo wörld")), "héllo wörld");
        assert_eq!(hex_to_string("zz"), "zz");
        // invalid UTF-8 is replaced, not rejected
        assert_eq!(hex_to_string("ff41"), "\u{fffd}A");
    }

    #[test]
    fn test_extract_skips_protobuf_framing() {
        let mut bytes = vec![0x0a, 0x2b, 0x12];
        bytes.extend_from_slice(br#"{"columns":["a"],"rows":[[1]]}"#);
        bytes.extend_from_slice(&[0x18, 0x01]);

        let extracted = extract_json_from_hex(&hex::encode(bytes)).unwrap();
        assert_eq!(extracted, json!({"columns": ["a"], "rows": [[1]]}));
    }

    #[test]
    fn test_extract_ignores_brackets_in_strings() {
        let doc = r#"{"a":"he said \"{nested}\"","b":["]"]}"#;
        let extracted = extract_json_from_hex(&hex::encode(format!("xx{doc}trailing"))).unwrap();
        assert_eq!(
            extracted,
            json!({"a": "he said \"{nested}\"", "b": ["]"]})
        );
    }

    #[test]
    fn test_extract_array_payload() {
        let extracted = extract_json_from_hex(&hex::encode("\u{1}[1,[2,3]]")).unwrap();
        assert_eq!(extracted, json!([1, [2, 3]]));
    }

    #[test]
    fn test_extract_failures_return_none() {
        // no bracket at all
        assert_eq!(extract_json_from_hex(&hex::encode("plain text only")), None);
        // truncated
        assert_eq!(extract_json_from_hex(&hex::encode(r#"{"a":{"b":1}"#)), None);
        // balanced but not JSON
        assert_eq!(extract_json_from_hex(&hex::encode("{not json}")), None);
        // not hex
        assert_eq!(extract_json_from_hex("xyz"), None);
    }
}
