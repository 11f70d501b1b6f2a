//! Page envelope helpers

use serde_json::Value;

/// The continuation reference of a raw page.
///
/// Only a non-empty string counts as present. A missing field, JSON `null`,
/// a non-string value and `""` all mean the chain has ended.
pub fn next_reference(page: &Value) -> Option<&str> {
    page.get("next")
        .and_then(Value::as_str)
        .filter(|next| !next.is_empty())
}
