//! Locate the first JSON object embedded in free-form model output.
//!
//! The scan walks from each `{` to its matching `}`, tracking string literals
//! and escapes so braces inside strings do not count. The first balanced
//! candidate that parses as an object wins. Fenced blocks and surrounding
//! prose need no special handling.

use serde_json::{Map, Value};

/// Upper bound on candidate openings tried before giving up.
const MAX_CANDIDATES: usize = 32;

/// Return the first syntactically valid JSON object in `raw`.
pub fn first_json_object(raw: &str) -> Option<Map<String, Value>> {
    let bytes = raw.as_bytes();
    let mut from = 0;

    for _ in 0..MAX_CANDIDATES {
        let start = from + raw[from..].find('{')?;
        if let Some(end) = matching_brace(bytes, start) {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&raw[start..=end]) {
                return Some(map);
            }
        }
        from = start + 1;
    }
    None
}

/// Index of the `}` that closes the `{` at `start`. Operates on bytes: the
/// structural characters are ASCII, so multi-byte UTF-8 never matches them.
fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
