//! ASCII-safe JSON for HTTP header values.

use serde::Serialize;
use std::fmt::Write;

use dropline_common::Result;

/// Serialize `value` as JSON that is safe to send as an HTTP header.
///
/// Every UTF-16 code unit at or above U+007F is written as a `\uXXXX`
/// escape, so the result is pure printable ASCII and decodes back to the
/// same JSON value.
pub fn http_header_safe_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    let mut out = String::with_capacity(json.len());
    let mut units = [0u16; 2];

    for c in json.chars() {
        if (c as u32) < 0x7f {
            out.push(c);
            continue;
        }
        for unit in c.encode_utf16(&mut units) {
            // Writing to a String cannot fail
            let _ = write!(out, "\\u{:04x}", unit);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    #[test]
    fn test_ascii_passthrough() {
        let arg = json!({"path": "/photo.png", "autorename": true});
        assert_eq!(
            http_header_safe_json(&arg).unwrap(),
            serde_json::to_string(&arg).unwrap()
        );
    }

    #[test]
    fn test_escapes_non_ascii() {
        let arg = json!({"path": "/café.txt"});
        assert_eq!(
            http_header_safe_json(&arg).unwrap(),
            "{\"path\":\"/caf\\u00e9.txt\"}"
        );
    }

    #[test]
    fn test_escapes_delete_and_astral() {
        let arg = json!({"path": "/\u{7f}😀"});
        assert_eq!(
            http_header_safe_json(&arg).unwrap(),
            "{\"path\":\"/\\u007f\\ud83d\\ude00\"}"
        );
    }

    proptest! {
        #[test]
        fn test_header_round_trip(name in "\\PC{0,32}") {
            let arg = json!({"path": format!("/{}", name), "autorename": true});
            let header = http_header_safe_json(&arg).unwrap();

            prop_assert!(header.bytes().all(|b| (0x20..0x7f).contains(&b)));
            let decoded: Value = serde_json::from_str(&header).unwrap();
            prop_assert_eq!(decoded, arg);
        }
    }
}
