// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Glob-style URL pattern matching.
//!
//! `**` matches any run of characters including `/`; `*` matches any run
//! of characters except `/` (one subdomain label or one path segment).
//! Every other character is literal. The scheme is ignored on both sides
//! and the match is anchored to the whole string.

use regex::Regex;
use tracing::debug;

/// Remove a leading `scheme://` if present.
pub fn strip_scheme(input: &str) -> &str {
    match input.find("://") {
        Some(idx)
            if idx > 0
                && input[..idx]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
        {
            &input[idx + 3..]
        }
        _ => input,
    }
}

/// Compile a scheme-stripped pattern into an anchored regex.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let body = strip_scheme(pattern.trim());
    let mut expr = String::with_capacity(body.len() * 2 + 2);
    expr.push('^');

    let mut chars = body.chars().peekable();
    let mut buf = [0u8; 4];
    while let Some(c) = chars.next() {
        if c == '*' {
            if chars.peek() == Some(&'*') {
                chars.next();
                expr.push_str(".*");
            } else {
                expr.push_str("[^/]*");
            }
        } else {
            expr.push_str(&regex::escape(c.encode_utf8(&mut buf)));
        }
    }

    expr.push('$');
    Regex::new(&expr)
}

/// Whether `url` matches `pattern`. Empty inputs never match.
pub fn matches_url_pattern(url: &str, pattern: &str) -> bool {
    let url = url.trim();
    let pattern = pattern.trim();
    if url.is_empty() || pattern.is_empty() {
        return false;
    }

    match compile_pattern(pattern) {
        Ok(re) => re.is_match(strip_scheme(url)),
        Err(e) => {
            debug!(pattern, error = %e, "unusable url pattern");
            false
        }
    }
}
