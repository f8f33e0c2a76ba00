//! JSON helpers
//!
//! Canonical serialization for sign documents plus the decimal-string field
//! helpers used by the amino-style envelopes.

use crate::error::{WalletError, WalletResult};
use serde_json::Value;

/// Serialize with object keys sorted recursively and no insignificant whitespace.
///
/// Strings use the minimal escape set: `"` `\` and the C0 controls. Everything
/// else, including non-ASCII, is written as raw UTF-8.
pub fn canonical_json_bytes(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_canonical(value, &mut out);
    out
}

pub fn canonical_json_string(value: &Value) -> String {
    let mut out = String::new();
    write_canonical_str(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    let mut s = String::new();
    write_canonical_str(value, &mut s);
    out.extend_from_slice(s.as_bytes());
}

fn write_canonical_str(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_escaped(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical_str(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_escaped(key, out);
                out.push(':');
                if let Some(v) = map.get(key) {
                    write_canonical_str(v, out);
                }
            }
            out.push('}');
        }
    }
}

fn write_escaped(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Parse a decimal-string field such as `"account_number": "1"`
pub fn parse_decimal_u64(field: &str, value: &str) -> WalletResult<u64> {
    value.parse::<u64>().map_err(|_| {
        WalletError::invalid_transaction(format!("{} must be a decimal string", field))
            .with_details(value.to_string())
    })
}

/// Parse hex with an optional `0x` prefix
pub fn parse_hex_bytes(hex_str: &str) -> WalletResult<Vec<u8>> {
    let cleaned = hex_str.trim_start_matches("0x").trim_start_matches("0X");
    Ok(hex::decode(cleaned)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_sorted_recursively() {
        let v = json!({"z": 1, "a": {"y": [ {"b": 2, "a": 1} ], "x": null}});
        assert_eq!(
            canonical_json_string(&v),
            r#"{"a":{"x":null,"y":[{"a":1,"b":2}]},"z":1}"#
        );
    }

    #[test]
    fn test_escapes() {
        let v = json!({"memo": "a\"b\\c\n\u{1}é"});
        assert_eq!(
            canonical_json_string(&v),
            "{\"memo\":\"a\\\"b\\\\c\\n\\u0001é\"}"
        );
    }

    #[test]
    fn test_bytes_match_string() {
        let v = json!({"chain_id": "binancehub-2", "sequence": "0"});
        assert_eq!(canonical_json_bytes(&v), canonical_json_string(&v).into_bytes());
    }

    #[test]
    fn test_parse_decimal_u64() {
        assert_eq!(parse_decimal_u64("sequence", "42").unwrap(), 42);
        assert!(parse_decimal_u64("sequence", "0x2a").is_err());
        assert!(parse_decimal_u64("sequence", "").is_err());
    }

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("0x0aff").unwrap(), vec![0x0a, 0xff]);
        assert!(parse_hex_bytes("zz").is_err());
    }
}
