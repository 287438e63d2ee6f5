//! Save-path templating
//!
//! Templates use `{token}` placeholders. Date/time tokens mirror the familiar
//! strftime codes (`{Y}` → `%Y`, `{f}` → microseconds, ...) and are rendered
//! against the timestamp captured when the request was built. The `{url}`
//! token expands to a slug of the source URL so several cameras can share a
//! save directory without clobbering each other.
//!
//! `{{` and `}}` render as literal braces.

use chrono::{DateTime, FixedOffset};
use std::fmt::Write;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown template token '{{{0}}}'")]
    UnknownToken(String),

    #[error("template token '{{{0}}}' has no value (no source supplied)")]
    MissingValue(String),

    #[error("unclosed '{{' at byte {0}")]
    UnclosedBrace(usize),

    #[error("unmatched '}}' at byte {0}")]
    UnmatchedBrace(usize),

    #[error("failed to format token '{{{0}}}'")]
    Format(String),
}

/// Token name used for the slugified source URL
pub const URL_TOKEN: &str = "url";

/// Map a date/time token to its chrono format specifier.
fn strftime_spec(token: &str) -> Option<&'static str> {
    let spec = match token {
        "a" => "%a",
        "A" => "%A",
        "w" => "%w",
        "d" => "%d",
        "b" => "%b",
        "B" => "%B",
        "m" => "%m",
        "y" => "%y",
        "Y" => "%Y",
        "H" => "%H",
        "I" => "%I",
        "p" => "%p",
        "M" => "%M",
        "S" => "%S",
        "f" => "%6f",
        "z" => "%z",
        "Z" => "%Z",
        "j" => "%j",
        "U" => "%U",
        "W" => "%W",
        "c" => "%c",
        "x" => "%x",
        "X" => "%X",
        _ => return None,
    };
    Some(spec)
}

/// Render `template` against a timestamp and an optional source string.
///
/// The output depends only on the arguments, so rendering the same template
/// twice with the same timestamp always yields the same path.
pub fn render(
    template: &str,
    at: &DateTime<FixedOffset>,
    source: Option<&str>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }

                let mut token = String::new();
                let mut closed = false;
                for (_, tc) in chars.by_ref() {
                    if tc == '}' {
                        closed = true;
                        break;
                    }
                    token.push(tc);
                }
                if !closed {
                    return Err(TemplateError::UnclosedBrace(pos));
                }

                render_token(&token, at, source, &mut out)?;
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(TemplateError::UnmatchedBrace(pos));
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

fn render_token(
    token: &str,
    at: &DateTime<FixedOffset>,
    source: Option<&str>,
    out: &mut String,
) -> Result<(), TemplateError> {
    if token == URL_TOKEN {
        let source = source.ok_or_else(|| TemplateError::MissingValue(token.to_string()))?;
        out.push_str(&slugify(source));
        return Ok(());
    }

    let spec =
        strftime_spec(token).ok_or_else(|| TemplateError::UnknownToken(token.to_string()))?;
    write!(out, "{}", at.format(spec)).map_err(|_| TemplateError::Format(token.to_string()))
}

/// Turn an arbitrary string into something safe to use as a path segment.
///
/// Lowercases, replaces every run of characters that are not word characters,
/// whitespace or hyphens with a single hyphen, trims surrounding whitespace,
/// then collapses runs of whitespace/hyphens into one hyphen.
/// `slugify(slugify(s)) == slugify(s)` for every `s`.
pub fn slugify(value: &str) -> String {
    let lowered = value.to_lowercase();

    let mut replaced = String::with_capacity(lowered.len());
    let mut in_run = false;
    for c in lowered.chars() {
        if is_word_char(c) || c.is_whitespace() || c == '-' {
            replaced.push(c);
            in_run = false;
        } else if !in_run {
            replaced.push('-');
            in_run = true;
        }
    }

    let mut slug = String::with_capacity(replaced.len());
    let mut in_sep = false;
    for c in replaced.trim().chars() {
        if c.is_whitespace() || c == '-' {
            if !in_sep {
                slug.push('-');
                in_sep = true;
            }
        } else {
            slug.push(c);
            in_sep = false;
        }
    }

    slug
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
