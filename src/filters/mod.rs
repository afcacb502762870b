//! Filters transform a referenced value before it is written, e.g.
//! `{name|h}`.

mod builtins;

use std::collections::BTreeMap;

use crate::Value;

pub type FilterFn = dyn Fn(Value) -> Value + Send + Sync + 'static;

/// Registers the builtin filters.
///
/// - `s` disables the automatic filters
/// - `h` escapes HTML
/// - `j` escapes a JavaScript string
/// - `u` is `encodeURI`
/// - `uc` is `encodeURIComponent`
/// - `js` encodes as JSON
/// - `jp` parses JSON
pub(crate) fn builtins(filters: &mut BTreeMap<String, Box<FilterFn>>) {
    let mut add = |name: &str, f: fn(Value) -> Value| {
        filters.insert(name.to_owned(), Box::new(f));
    };
    add("s", |v| v);
    add("h", |v| map_str(v, builtins::escape_html));
    add("j", |v| map_str(v, builtins::escape_js));
    add("u", |v| map_str(v, builtins::encode_uri));
    add("uc", |v| map_str(v, builtins::encode_uri_component));
    add("js", builtins::json_encode);
    add("jp", builtins::json_decode);
}

/// Applies a string transformation to the written form of a scalar.
fn map_str(value: Value, f: fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        Value::Integer(_) | Value::Float(_) | Value::Bool(_) => {
            Value::String(f(&value.to_string()))
        }
        value => value,
    }
}
