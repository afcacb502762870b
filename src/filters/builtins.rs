use crate::Value;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn escape_js(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c => out.push(c),
        }
    }
    out
}

/// Characters that `encodeURI` leaves alone on top of the alphanumerics.
const URI_RESERVED: &str = "-_.!~*'();/?:@&=+$,#";

/// Characters that `encodeURIComponent` leaves alone on top of the
/// alphanumerics.
const URI_COMPONENT_RESERVED: &str = "-_.!~*'()";

pub fn encode_uri(s: &str) -> String {
    percent_encode(s, URI_RESERVED)
}

pub fn encode_uri_component(s: &str) -> String {
    percent_encode(s, URI_COMPONENT_RESERVED)
}

fn percent_encode(s: &str, keep: &str) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || keep.as_bytes().contains(&b) {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

pub fn json_encode(value: Value) -> Value {
    match serde_json::to_string(&value) {
        Ok(s) => Value::String(s),
        Err(err) => {
            tracing::warn!("failed to encode JSON: {err}");
            Value::None
        }
    }
}

pub fn json_decode(value: Value) -> Value {
    let s = match &value {
        Value::String(s) => s,
        _ => return value,
    };
    match serde_json::from_str::<serde_json::Value>(s) {
        Ok(v) => Value::from(v),
        Err(err) => {
            tracing::warn!("failed to decode JSON: {err}");
            Value::None
        }
    }
}
