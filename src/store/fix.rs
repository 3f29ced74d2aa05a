use std::path::{Path, MAIN_SEPARATOR};
use anyhow::Result;
use regex::{Captures, Regex};
use super::resolve_inside;

pub const REPLACEMENT: &str = "{...}";

/// Replace delimited occurrences of `base` in `text` with `{...}`.
///
/// An occurrence is replaced when the sub path following `base` is empty
/// or names an existing file or directory below `base`.
pub fn replace_base_path(text: &str, base: &Path) -> Result<String> {
    let mut text = text.to_owned();

    if text.is_empty() {
        return Ok(text);
    }

    let escaped = regex::escape(&base.to_string_lossy());

    for (start, end) in delimiters() {
        let pattern = format!("(?m)({}){}(.*?)({})", start, escaped, end);
        let regex   = Regex::new(&pattern)?;

        text = regex.replace_all(&text, |caps: &Captures| {
            let start = &caps[1];
            let sub   = &caps[2];
            let end   = &caps[3];
            match exists(base, sub) {
                true  => format!("{}{}{}{}", start, REPLACEMENT, sub, end),
                false => caps[0].to_owned(),
            }
        }).into_owned();
    }

    Ok(text)
}

fn exists(base: &Path, sub: &str) -> bool {
    let sub = sub.strip_prefix(MAIN_SEPARATOR).unwrap_or(sub);
    sub.is_empty() || resolve_inside(base, sub).map(|path| path.exists()).unwrap_or(false)
}

fn delimiters() -> Vec<(String, String)> {
    let literal = LITERAL.iter().map(|(start, end)| {
        (regex::escape(start), regex::escape(end))
    });

    let anchored = ANCHORED.iter().map(|(start, end)| {
        (start.to_string(), end.to_string())
    });

    let mut pairs = literal.chain(anchored).collect::<Vec<_>>();
    pairs.sort();
    pairs
}

const LITERAL: &[(&str, &str)] = &[
    (" ", " "),
    ("'", "'"),
    ("(", ")"),
    ("{", "}"),
    ("[", "]"),
    ("<", ">"),
    ("`", "`"),
    (",", " "),
    (",", ","),
    ("\"", "\""),
    (";", " "),
    (";", ";"),
    (" ", ". "),
];

const ANCHORED: &[(&str, &str)] = &[
    ("^", "$"),
    ("^", " "),
    (" ", "$"),
    ("^", ","),
    (",", "$"),
    ("^", ";"),
    (";", "$"),
    ("^", r"\. "),
    ("^", r"\.$"),
];
