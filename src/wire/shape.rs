//! Key-presence classification of wire objects
//!
//! Every JSON object coming off the wire is inspected once and mapped to one
//! of a closed set of shapes. The decoder then dispatches on the shape
//! instead of probing for individual keys all over the place.

use serde_json::{Map, Value};

/// Keys of the protobuf `Value` oneof
pub const DIRECT_VALUE_KEYS: [&str; 6] = [
    "stringValue",
    "numberValue",
    "boolValue",
    "structValue",
    "listValue",
    "nullValue",
];

/// Recognized object shapes, in dispatch order
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    /// `{ typeUrl: string, value }` - a protobuf `Any`
    Wrapped { type_url: &'a str, value: &'a Value },
    /// `{ stringValue | numberValue | ... }` - a protobuf `Value`
    Direct(&'a Map<String, Value>),
    /// `{ start, end, value }` - a time-bounded attribute value
    Envelope {
        start: &'a Value,
        end: &'a Value,
        value: &'a Value,
    },
    /// Anything else
    Plain(&'a Map<String, Value>),
}

impl<'a> Shape<'a> {
    pub fn classify(map: &'a Map<String, Value>) -> Self {
        if let Some((type_url, value)) = wrapped_parts(map) {
            return Shape::Wrapped { type_url, value };
        }
        if DIRECT_VALUE_KEYS.iter().any(|key| map.contains_key(*key)) {
            return Shape::Direct(map);
        }
        if let (Some(start), Some(end), Some(value)) =
            (map.get("start"), map.get("end"), map.get("value"))
        {
            return Shape::Envelope { start, end, value };
        }
        Shape::Plain(map)
    }

    /// Wrapped and direct values are the protobuf encodings proper
    pub fn is_protobuf(&self) -> bool {
        matches!(self, Shape::Wrapped { .. } | Shape::Direct(_))
    }
}

/// `(typeUrl, value)` when the object is a wrapped value
pub fn wrapped_parts(map: &Map<String, Value>) -> Option<(&str, &Value)> {
    let type_url = map.get("typeUrl")?.as_str()?;
    let value = map.get("value")?;
    Some((type_url, value))
}

/// Value type named by a wrapper's `typeUrl`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperType {
    String,
    Number,
    Bool,
    Struct,
    Unrecognized,
}

impl WrapperType {
    pub fn from_type_url(type_url: &str) -> Self {
        if type_url.contains("StringValue") {
            WrapperType::String
        } else if ["Int", "Float", "Double"]
            .iter()
            .any(|tag| type_url.contains(tag))
        {
            WrapperType::Number
        } else if type_url.contains("BoolValue") {
            WrapperType::Bool
        } else if type_url.contains("Struct") {
            WrapperType::Struct
        } else {
            WrapperType::Unrecognized
        }
    }
}

/// JavaScript-style truthiness, used where the API mixes `null`, `0` and
/// empty strings for "absent"
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
