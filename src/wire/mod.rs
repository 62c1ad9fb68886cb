//! Wire value decoding
//!
//! The graph API answers with JSON in which protobuf values appear in three
//! disguises: `{typeUrl, value}` wrappers whose value is a hex string,
//! protobuf `Value` objects (`stringValue`, `structValue`, ...), and
//! `{start, end, value}` attribute envelopes whose value is one of the above,
//! sometimes serialized once more into a JSON string.
//!
//! [`decode`] flattens all of them into plain JSON. The decoded tree is a
//! `serde_json::Value`; anything no shape matched is kept verbatim, so no
//! data is ever dropped.

pub mod decode;
pub mod hex;
pub mod shape;

pub use decode::{decode, decode_wrapped, has_wire_value};
pub use hex::{extract_json_from_hex, hex_to_string, is_hex_string};
pub use shape::{Shape, WrapperType};

/// Decoded plain-data tree
pub type WireValue = serde_json::Value;

/// Marker added to attribute envelopes whose payload was decoded
pub const DECODED_FLAG: &str = "decoded";
