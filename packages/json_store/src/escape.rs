//! Quote escaping applied to every document before it is persisted.
//!
//! Each `"` in a string leaf becomes `&quot;` and each `'` becomes `&apos;`.  Object keys are left
//! alone.  The entities contain no quotes, so escaping an already-escaped document changes
//! nothing.

use std::borrow::Cow;

use serde_json::value::Value as JsonValue;

pub fn escape_str(s: &str) -> Cow<'_, str> {
    if !s.contains(['"', '\'']) {
        return Cow::Borrowed(s);
    }

    let mut escaped = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Escapes every string leaf of `value` in place.
pub fn escape(value: &mut JsonValue) {
    match value {
        JsonValue::String(s) => {
            if s.contains(['"', '\'']) {
                let escaped = escape_str(s).into_owned();
                *s = escaped;
            }
        }
        JsonValue::Array(arr) => arr.iter_mut().for_each(escape),
        JsonValue::Object(map) => map.values_mut().for_each(escape),
        JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escapes_both_quote_kinds() {
        assert_eq!(
            escape_str(r#"O'Brien said "hi""#),
            "O&apos;Brien said &quot;hi&quot;"
        );
    }

    #[test]
    fn unquoted_strings_are_borrowed() {
        assert!(matches!(escape_str("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn escapes_nested_leaves() {
        let mut value = json!({
            "name": "O'Brien",
            "quotes": ["say \"hi\"", {"inner": "it's"}],
            "count": 3,
            "ok": true,
            "nothing": null,
        });
        escape(&mut value);
        assert_eq!(
            value,
            json!({
                "name": "O&apos;Brien",
                "quotes": ["say &quot;hi&quot;", {"inner": "it&apos;s"}],
                "count": 3,
                "ok": true,
                "nothing": null,
            })
        );
    }

    #[test]
    fn keys_are_not_escaped() {
        let mut value = json!({"it's": "fine"});
        escape(&mut value);
        assert_eq!(value, json!({"it's": "fine"}));
    }

    #[test]
    fn scalar_documents_are_escaped() {
        let mut value = json!("'");
        escape(&mut value);
        assert_eq!(value, json!("&apos;"));
    }

    #[test]
    fn escaping_twice_is_a_no_op() {
        let mut value = json!(["\"a\""]);
        escape(&mut value);
        let once = value.clone();
        escape(&mut value);
        assert_eq!(value, once);
    }
}
