//! Stylesheet rewriting.
//!
//! A single forward scan over the text recognizes `url(...)` tokens and
//! `@import` rules while skipping comments and string literals, so URL-like
//! text inside either is never touched. Rewritten references are
//! re-serialized in canonical form: `url("...")` for tokens and
//! `@import "..."` for rules, regardless of how the source spelled them.

use std::borrow::Cow;
use std::ops::Range;

use crate::codec::{self, RewriteContext};

/// Rewrites every routable reference in a stylesheet.
///
/// Applies to standalone stylesheets, `<style>` element text and inline
/// `style` attributes alike. References that are excluded or fail to
/// resolve are left exactly as written.
pub fn rewrite_css(css: &str, ctx: &RewriteContext) -> String {
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len() + css.len() / 4);
    let mut copy_from = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_comment(bytes, i);
            }
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
            }
            b'@' if is_import_at(bytes, i) => match rewrite_import_at(css, i, ctx) {
                Some((replacement, end)) => {
                    out.push_str(&css[copy_from..i]);
                    out.push_str(&replacement);
                    copy_from = end;
                    i = end;
                }
                None => i += "@import".len(),
            },
            b'u' | b'U' if is_url_start(bytes, i) => match rewrite_url_at(css, i, ctx) {
                Some((replacement, end)) => {
                    out.push_str(&css[copy_from..i]);
                    out.push_str(&replacement);
                    copy_from = end;
                    i = end;
                }
                None => i += "url(".len(),
            },
            _ => i += 1,
        }
    }

    out.push_str(&css[copy_from..]);
    out
}

/// Rewrites the `url(...)` token starting at `start`. Returns the
/// serialized replacement and the index just past the closing paren, or
/// `None` when the token never closes.
fn rewrite_url_at(css: &str, start: usize, ctx: &RewriteContext) -> Option<(String, usize)> {
    let (range, end) = read_url_argument(css.as_bytes(), start)?;
    let reference = &css[range];
    let routed = codec::resolve_and_encode(reference, ctx);
    if routed == reference {
        // Untouched references keep their original spelling.
        return Some((css[start..end].to_string(), end));
    }
    Some((format!("url(\"{}\")", escape_css_string(&routed)), end))
}

/// Rewrites the `@import` rule starting at `start`, consuming only the
/// keyword and its URL. Media queries after the URL stay in place.
fn rewrite_import_at(css: &str, start: usize, ctx: &RewriteContext) -> Option<(String, usize)> {
    let bytes = css.as_bytes();
    let i = skip_whitespace(bytes, start + "@import".len());
    if i >= bytes.len() {
        return None;
    }
    let (range, end) = match bytes[i] {
        b'"' | b'\'' => read_quoted(bytes, i)?,
        b'u' | b'U' if is_url_start(bytes, i) => read_url_argument(bytes, i)?,
        _ => return None,
    };
    let reference = &css[range];
    let routed = codec::resolve_and_encode(reference, ctx);
    if routed == reference {
        return Some((css[start..end].to_string(), end));
    }
    Some((format!("@import \"{}\"", escape_css_string(&routed)), end))
}

/// Reads the argument of a `url(...)` token, quoted or raw. Returns the
/// byte range of the reference and the index just past `)`.
fn read_url_argument(bytes: &[u8], start: usize) -> Option<(Range<usize>, usize)> {
    let i = skip_whitespace(bytes, start + "url(".len());
    if i >= bytes.len() {
        return None;
    }
    match bytes[i] {
        b'"' | b'\'' => {
            let (range, after) = read_quoted(bytes, i)?;
            let close = skip_whitespace(bytes, after);
            if close >= bytes.len() || bytes[close] != b')' {
                return None;
            }
            Some((range, close + 1))
        }
        _ => {
            let value_start = i;
            let mut j = i;
            while j < bytes.len() && bytes[j] != b')' {
                j += 1;
            }
            if j >= bytes.len() {
                return None;
            }
            let mut value_end = j;
            while value_end > value_start && bytes[value_end - 1].is_ascii_whitespace() {
                value_end -= 1;
            }
            Some((value_start..value_end, j + 1))
        }
    }
}

/// Reads a quoted string starting at the opening quote. Returns the range
/// of the content and the index just past the closing quote.
fn read_quoted(bytes: &[u8], start: usize) -> Option<(Range<usize>, usize)> {
    let quote = bytes[start];
    let mut j = start + 1;
    while j < bytes.len() && bytes[j] != quote {
        if bytes[j] == b'\\' {
            j += 2;
        } else {
            j += 1;
        }
    }
    if j >= bytes.len() {
        return None;
    }
    Some((start + 1..j, j + 1))
}

fn skip_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn is_import_at(bytes: &[u8], i: usize) -> bool {
    const KEYWORD: &[u8] = b"@import";
    if bytes.len() < i + KEYWORD.len() || !bytes[i..i + KEYWORD.len()].eq_ignore_ascii_case(KEYWORD)
    {
        return false;
    }
    match bytes.get(i + KEYWORD.len()) {
        Some(&next) => !is_ident_byte(next),
        None => true,
    }
}

fn is_url_start(bytes: &[u8], i: usize) -> bool {
    const OPEN: &[u8] = b"url(";
    if bytes.len() < i + OPEN.len() || !bytes[i..i + OPEN.len()].eq_ignore_ascii_case(OPEN) {
        return false;
    }
    i == 0 || !is_ident_byte(bytes[i - 1])
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn escape_css_string(value: &str) -> Cow<'_, str> {
    if !value.contains(['"', '\\']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    Cow::Owned(escaped)
}
