//! Helpers for the quote feeds' JSONP-era payload shapes.
//!
//! The upstream endpoints predate JSON APIs: most wrap their body in a
//! `callback({...});` shell, one ships a whole JavaScript file of `var`
//! declarations, and numeric columns report `'-'` for "no value". These
//! helpers normalize all of that before serde sees anything.

use serde_json::Value;

/// Strip a JSONP wrapper, returning the inner JSON text.
///
/// `jsonpgz({"fundcode":"..."});` → `{"fundcode":"..."}`.
/// Returns None when the body has no recognizable wrapper.
pub fn unwrap_jsonp(body: &str) -> Option<&str> {
    let start = body.find('(')? + 1;
    let end = body.rfind(')')?;
    if end <= start {
        return None;
    }
    Some(body[start..end].trim())
}

/// Extract a JSON array assigned to a `var` in a JavaScript body:
/// `var Data_netWorthTrend = [ ... ];` → `[ ... ]`.
pub fn extract_js_array<'a>(body: &'a str, var_name: &str) -> Option<&'a str> {
    let at = body.find(var_name)?;
    let rest = &body[at..];
    let open = rest.find('[')?;
    let close = rest.find("];")?;
    if close < open {
        return None;
    }
    Some(&rest[open..=close])
}

/// Extract a double-quoted string value following `key:"` in a JavaScript
/// object literal, honoring backslash escapes. Used for the holdings feed,
/// whose payload embeds an HTML fragment as `content:"<table ...>"`.
pub fn extract_quoted(body: &str, key: &str) -> Option<String> {
    let needle = format!("{key}:\"");
    let start = body.find(&needle)? + needle.len();
    let bytes = body.as_bytes();
    let mut out = String::new();
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => {
                out.push(bytes[i + 1] as char);
                i += 2;
            }
            b'"' => return Some(out),
            _ => {
                // Multi-byte chars: push the whole char, advance by its width
                let ch = body[i..].chars().next()?;
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    None
}

/// Lenient numeric field read: numbers pass through, numeric strings parse,
/// `'-'` / empty / null / absent all become None. Quote feeds use `'-'` for
/// suspended or unreported columns and those must never overwrite real data.
pub fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s == "-" {
                None
            } else {
                s.parse().ok()
            }
        }
        _ => None,
    }
}

/// Strip HTML tags from a fragment, returning the concatenated text content.
pub fn strip_tags(fragment: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for ch in fragment.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}
