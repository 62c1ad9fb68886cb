//! Recursive wire value decoder
//!
//! Turns API payloads that mix hex-encoded protobuf `Any` values, protobuf
//! `Value` objects and JSON-in-strings into plain JSON trees. Decoding never
//! fails: whatever cannot be interpreted is returned as it came in.

use std::borrow::Cow;

use serde_json::{Map, Value};

use super::hex::{extract_json_from_hex, hex_to_string, is_hex_string};
use super::shape::{is_truthy, wrapped_parts, Shape, WrapperType};
use super::DECODED_FLAG;

/// Decode every wire-encoded value inside `input`
pub fn decode(input: &Value) -> Value {
    match input {
        Value::String(s) => decode_string(s),
        Value::Array(items) => Value::Array(items.iter().map(decode).collect()),
        Value::Object(map) => decode_object(map),
        Value::Null | Value::Bool(_) | Value::Number(_) => input.clone(),
    }
}

/// True when a wrapped or direct protobuf value occurs anywhere in `input`,
/// including inside strings holding JSON
pub fn has_wire_value(input: &Value) -> bool {
    match input {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => has_wire_value(&parsed),
            _ => false,
        },
        Value::Array(items) => items.iter().any(has_wire_value),
        Value::Object(map) => {
            Shape::classify(map).is_protobuf() || map.values().any(has_wire_value)
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}

fn decode_string(s: &str) -> Value {
    if let Ok(Value::Object(parsed)) = serde_json::from_str::<Value>(s) {
        if let Some((type_url, value)) = wrapped_parts(&parsed) {
            let decoded = decode_wrapped(type_url, value);
            if !decoded.is_null() {
                return decoded;
            }
        }
    }

    if is_hex_string(s) {
        if let Some(extracted) = extract_json_from_hex(s) {
            return extracted;
        }
    }

    Value::String(s.to_string())
}

fn decode_object(map: &Map<String, Value>) -> Value {
    match Shape::classify(map) {
        Shape::Wrapped { type_url, value } => decode_wrapped(type_url, value),
        Shape::Direct(map) => decode_direct(map),
        Shape::Envelope { start, end, value } => decode_envelope(start, end, value)
            .unwrap_or_else(|| decode_plain(map)),
        Shape::Plain(map) => decode_plain(map),
    }
}

fn decode_plain(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), decode(value)))
            .collect(),
    )
}

/// Decode a protobuf `Any` by the value type its `typeUrl` names
pub fn decode_wrapped(type_url: &str, value: &Value) -> Value {
    match (WrapperType::from_type_url(type_url), value) {
        (WrapperType::String, Value::String(hex)) => Value::String(hex_to_string(hex)),
        (WrapperType::Number, Value::String(s)) => parse_float_prefix(s)
            .and_then(number_value)
            .unwrap_or_else(|| value.clone()),
        (WrapperType::Bool, _) => Value::Bool(match value {
            Value::Bool(b) => *b,
            Value::String(s) => s == "true",
            Value::Number(n) => n.as_f64() == Some(1.0),
            _ => false,
        }),
        (WrapperType::Struct, Value::String(s)) if is_hex_string(s) => {
            extract_json_from_hex(s).unwrap_or_else(|| value.clone())
        }
        (WrapperType::Struct, Value::Object(_) | Value::Array(_) | Value::Null) => decode(value),
        _ => {
            if WrapperType::from_type_url(type_url) == WrapperType::Unrecognized {
                tracing::debug!(type_url, "unrecognized wrapper type, keeping raw value");
            }
            value.clone()
        }
    }
}

fn decode_direct(map: &Map<String, Value>) -> Value {
    for key in ["stringValue", "numberValue", "boolValue"] {
        if let Some(value) = map.get(key) {
            return value.clone();
        }
    }
    if map.contains_key("nullValue") {
        return Value::Null;
    }

    if let Some(structure) = map.get("structValue").filter(|v| is_truthy(v)) {
        return match structure.get("fields") {
            Some(Value::Object(fields)) => decode_plain(fields),
            _ => decode(structure),
        };
    }

    if let Some(list) = map.get("listValue").filter(|v| is_truthy(v)) {
        return match list.get("values") {
            Some(Value::Array(values)) => Value::Array(values.iter().map(decode).collect()),
            _ => Value::Array(Vec::new()),
        };
    }

    Value::Object(map.clone())
}

/// Try to decode the payload of a `{start, end, value}` attribute value
///
/// Returns `None` when nothing inside `value` decodes to an object or array;
/// the caller then treats the envelope as a plain object.
fn decode_envelope(start: &Value, end: &Value, value: &Value) -> Option<Value> {
    let mut candidate = Cow::Borrowed(value);

    if let Value::String(s) = value {
        match serde_json::from_str::<Value>(s) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => candidate = Cow::Owned(parsed),
            Ok(_) => {}
            Err(_) if is_hex_string(s) => {
                if let Some(extracted @ (Value::Object(_) | Value::Array(_))) =
                    extract_json_from_hex(s)
                {
                    return Some(decoded_envelope(start, end, extracted));
                }
            }
            Err(_) => {}
        }
    }

    let (type_url, inner) = candidate.as_object().and_then(wrapped_parts)?;
    match decode_wrapped(type_url, inner) {
        decoded @ (Value::Object(_) | Value::Array(_)) => {
            Some(decoded_envelope(start, end, decoded))
        }
        _ => None,
    }
}

fn decoded_envelope(start: &Value, end: &Value, value: Value) -> Value {
    let mut map = Map::new();
    map.insert("start".to_string(), start.clone());
    map.insert("end".to_string(), end.clone());
    map.insert("value".to_string(), value);
    map.insert(DECODED_FLAG.to_string(), Value::Bool(true));
    Value::Object(map)
}

/// Leading-number parse with `parseFloat` semantics: `"12.5kg"` is 12.5,
/// `"abc"` is `None`
fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |at: usize| {
        bytes
            .get(at..)
            .map_or(0, |rest| rest.iter().take_while(|b| b.is_ascii_digit()).count())
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = digits_from(end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits_from(end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digits_from(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }

    s[..end].parse().ok()
}

/// Integral values stay integers so they compare equal to JSON literals;
/// infinities have no JSON form
fn number_value(f: f64) -> Option<Value> {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if f.fract() == 0.0 && f.abs() <= MAX_SAFE {
        Some(Value::from(f as i64))
    } else {
        serde_json::Number::from_f64(f).map(Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn hex_json(value: &Value) -> String {
        hex::encode(serde_json::to_string(value).unwrap())
    }

    #[test]
    fn test_string_wrapper() {
        let wrapped = json!({
            "typeUrl": "type.googleapis.com/google.protobuf.StringValue",
            "value": hex::encode("Ministry of Finance")
        });
        assert_eq!(decode(&wrapped), json!("Ministry of Finance"));
    }

    #[test]
    fn test_number_wrappers() {
        let int = json!({"typeUrl": "google.protobuf.Int64Value", "value": "42"});
        assert_eq!(decode(&int), json!(42));

        let float = json!({"typeUrl": "google.protobuf.DoubleValue", "value": "2.5e1 units"});
        assert_eq!(decode(&float), json!(25));

        let already = json!({"typeUrl": "google.protobuf.FloatValue", "value": 1.25});
        assert_eq!(decode(&already), json!(1.25));

        // unparseable text stays visible instead of turning into null
        let garbage = json!({"typeUrl": "google.protobuf.Int32Value", "value": "n/a"});
        assert_eq!(decode(&garbage), json!("n/a"));

        let overflow = json!({"typeUrl": "google.protobuf.DoubleValue", "value": "1e999"});
        assert_eq!(decode(&overflow), json!("1e999"));
    }

    #[test]
    fn test_bool_wrapper() {
        let url = "google.protobuf.BoolValue";
        for (raw, expected) in [
            (json!(true), true),
            (json!("true"), true),
            (json!(1), true),
            (json!("1"), false),
            (json!(0), false),
            (json!(null), false),
        ] {
            assert_eq!(decode(&json!({"typeUrl": url, "value": raw})), json!(expected));
        }
    }

    #[test]
    fn test_struct_wrapper_hex_and_object() {
        let doc = json!({"columns": ["year", "amount"], "rows": [[2023, 10.5]]});
        let hex = json!({"typeUrl": "google.protobuf.Struct", "value": hex_json(&doc)});
        assert_eq!(decode(&hex), doc);

        let inline = json!({
            "typeUrl": "google.protobuf.Struct",
            "value": {"inner": {"stringValue": "x"}}
        });
        assert_eq!(decode(&inline), json!({"inner": "x"}));

        // short, non-hex string falls through untouched
        let short = json!({"typeUrl": "google.protobuf.Struct", "value": "abc"});
        assert_eq!(decode(&short), json!("abc"));
    }

    #[test]
    fn test_unknown_wrapper_returns_value() {
        let v = json!({"typeUrl": "acme.Custom", "value": {"keep": "me"}});
        assert_eq!(decode(&v), json!({"keep": "me"}));
    }

    #[test]
    fn test_direct_values() {
        assert_eq!(decode(&json!({"stringValue": "a"})), json!("a"));
        assert_eq!(decode(&json!({"numberValue": 3})), json!(3));
        assert_eq!(decode(&json!({"boolValue": false})), json!(false));
        assert_eq!(decode(&json!({"nullValue": "NULL_VALUE"})), Value::Null);

        let structure = json!({"structValue": {"fields": {
            "name": {"stringValue": "Budget"},
            "tags": {"listValue": {"values": [{"stringValue": "a"}, {"numberValue": 2}]}}
        }}});
        assert_eq!(decode(&structure), json!({"name": "Budget", "tags": ["a", 2]}));

        assert_eq!(decode(&json!({"structValue": {}})), json!({}));
        assert_eq!(decode(&json!({"listValue": {}})), json!([]));
    }

    #[test]
    fn test_string_holding_wrapped_json() {
        let inner = json!({
            "typeUrl": "google.protobuf.StringValue",
            "value": hex::encode("hello")
        });
        let s = Value::String(inner.to_string());
        assert_eq!(decode(&s), json!("hello"));
    }

    #[test]
    fn test_bare_hex_string() {
        let doc = json!({"k": [1, 2, 3]});
        assert_eq!(decode(&Value::String(hex_json(&doc))), doc);

        // hex-looking but no JSON inside: unchanged
        let opaque = "00112233445566778899aabb";
        assert_eq!(decode(&json!(opaque)), json!(opaque));
    }

    #[test]
    fn test_envelope_with_wrapped_json_string() {
        let doc = json!({"columns": ["a"], "rows": [["x"]]});
        let wrapped = json!({"typeUrl": "google.protobuf.Struct", "value": hex_json(&doc)});
        let envelope = json!({
            "start": "2024-01-01T00:00:00Z",
            "end": null,
            "value": wrapped.to_string()
        });

        assert_eq!(
            decode(&envelope),
            json!({
                "start": "2024-01-01T00:00:00Z",
                "end": null,
                "value": doc,
                "decoded": true
            })
        );
    }

    #[test]
    fn test_envelope_with_hex_value() {
        let doc = json!({"columns": ["a"], "rows": []});
        let envelope = json!({"start": "s", "end": "e", "value": hex_json(&doc)});
        let decoded = decode(&envelope);
        assert_eq!(decoded["decoded"], json!(true));
        assert_eq!(decoded["value"], doc);
    }

    #[test]
    fn test_envelope_with_scalar_value_falls_through() {
        let envelope = json!({
            "start": "s",
            "end": "e",
            "value": json!({
                "typeUrl": "google.protobuf.StringValue",
                "value": hex::encode("plain")
            }).to_string()
        });
        // the wrapped string decodes to a scalar, so the envelope is kept
        // as-is with its value decoded in place
        assert_eq!(
            decode(&envelope),
            json!({"start": "s", "end": "e", "value": "plain"})
        );
    }

    #[test]
    fn test_plain_values_are_stable() {
        let plain = json!({
            "id": "e1",
            "name": "Department",
            "count": 3,
            "flags": [true, null, "text", "123"],
            "nested": {"a": {"b": []}}
        });
        let once = decode(&plain);
        assert_eq!(once, plain);
        assert_eq!(decode(&once), plain);
    }

    #[test]
    fn test_has_wire_value() {
        assert!(!has_wire_value(&json!({"a": [1, "b", null]})));
        assert!(has_wire_value(&json!({"a": [{"numberValue": 1}]})));
        assert!(has_wire_value(&json!([
            json!({"typeUrl": "x", "value": 1}).to_string()
        ])));
        assert!(!has_wire_value(&json!("{not json")));
    }

    #[test]
    fn test_parse_float_prefix() {
        assert_eq!(parse_float_prefix("  -3.5e2xyz"), Some(-350.0));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("7."), Some(7.0));
        assert_eq!(parse_float_prefix("1e"), Some(1.0));
        assert_eq!(parse_float_prefix("-"), None);
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix(""), None);
    }
}
