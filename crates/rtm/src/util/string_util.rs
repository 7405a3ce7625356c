// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! String helpers for configuration values.

/// Split on `delim`, trimming each field. Empty input yields no fields.
pub fn split(input: &str, delim: &str) -> Vec<String> {
    if input.trim().is_empty() {
        return Vec::new();
    }
    input.split(delim).map(|s| s.trim().to_string()).collect()
}

/// Trim and lowercase.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// `true` for `yes`, `false` for `no` (case-insensitive), `default`
/// otherwise.
pub fn to_bool(s: &str, yes: &str, no: &str, default: bool) -> bool {
    let v = normalize(s);
    if v == normalize(yes) {
        true
    } else if v == normalize(no) {
        false
    } else {
        default
    }
}

/// Shorthand for the `YES`/`NO` flags used throughout the configuration.
pub fn is_yes(s: &str) -> bool {
    to_bool(s, "YES", "NO", false)
}

pub fn is_absolute_path(path: &str) -> bool {
    path.starts_with('/')
        || path.starts_with("\\\\")
        || (path.len() > 2
            && path.as_bytes()[0].is_ascii_alphabetic()
            && &path.as_bytes()[1..3] == b":\\")
}

/// `scheme://rest` with a non-empty scheme.
pub fn is_url(s: &str) -> bool {
    matches!(s.find("://"), Some(pos) if pos > 0)
}

/// Join with `", "`.
pub fn flatten(values: &[String]) -> String {
    values.join(", ")
}

/// Drop duplicates, keeping first occurrences in order.
pub fn unique_sv(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// Escape tabs, newlines, carriage returns, quotes and backslashes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape`]. Unknown escapes keep the escaped character.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
