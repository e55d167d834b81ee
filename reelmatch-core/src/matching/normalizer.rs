//! Title cleanup for scraped source titles.
//!
//! Scraped titles carry upload noise: release years glued to the front,
//! cast lists in parentheses, container extensions, and channel boilerplate
//! such as "Full Movie". [`normalize`] strips that noise down to a name the
//! metadata provider can search for.

use once_cell::sync::Lazy;
use regex::Regex;

const YEAR: &str = r"(?:18[89]\d|19\d{2}|20\d{2})";

static FILE_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\.(?:mp4|m4v|avi|3gp|3g2|mkv|mov|wmv|flv|webm|mpe?g|ogv|ogg|divx|vob|ts)$",
    )
    .expect("file extension regex should compile")
});
static SEPARATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[._]+").expect("separator regex should compile")
});
static BRACKETED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[^\]]*\]").expect("bracket regex should compile")
});
static BOILERPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\(?\b(?:full\s+(?:length\s+)?(?:movie|film)|public\s+domain(?:\s+(?:movie|film))?|free\s+(?:movie|film)|classic\s+(?:movie|film)|complete\s+(?:movie|film)|hd|hq|1080p|720p|480p|4k|colou?rized|remastered)\b\)?",
    )
    .expect("boilerplate regex should compile")
});
static CREDIT_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*\([^()]*(?:,|&|\band\b|\bstarring\b|\bwith\b|\bfeat\b)[^()]*\)",
    )
    .expect("credit list regex should compile")
});
static PAREN_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\s*\(\s*({YEAR})\s*\)"))
        .expect("parenthesized year regex should compile")
});
static TRAILING_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\s*[-–—|:]\s*({YEAR})\s*$"))
        .expect("trailing year regex should compile")
});
static LEADING_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^[(\[]?({YEAR})[)\]]?(?:\s*[-–—:|.]\s*|\s+)(\S.*)$"
    ))
    .expect("leading year regex should compile")
});
static EMPTY_PARENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\s*\)").expect("empty parens regex should compile")
});

fn is_edge_noise(c: char) -> bool {
    c.is_whitespace()
        || matches!(c, '-' | '–' | '—' | ':' | '|' | ',' | ';' | '/' | '~')
}

/// Produces a matchable movie name from a raw source title.
///
/// Idempotent, and never returns an empty string for non-blank input: if
/// cleanup would remove everything, the trimmed input is returned as-is.
pub fn normalize(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let next = clean_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }

    if current.is_empty() {
        raw.trim().to_string()
    } else {
        current
    }
}

/// Release year embedded in a raw title, either as a leading token
/// (`"1999 The Matrix"`), in parentheses (`"Detour (1945)"`), or after a
/// trailing separator (`"Detour - 1945"`).
pub fn extract_year(raw: &str) -> Option<u16> {
    let trimmed = raw.trim();
    let trimmed = FILE_EXTENSION.replace(trimmed, "");
    LEADING_YEAR
        .captures(&trimmed)
        .or_else(|| PAREN_YEAR.captures(&trimmed))
        .or_else(|| TRAILING_YEAR.captures(&trimmed))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn clean_pass(input: &str) -> String {
    let mut name = input.trim().to_string();

    name = FILE_EXTENSION.replace(&name, "").into_owned();

    // Filename-style titles ("His_Girl_Friday") have no spaces at all.
    if !name.contains(char::is_whitespace) && SEPARATORS.is_match(&name) {
        name = SEPARATORS.replace_all(&name, " ").into_owned();
    }

    name = BRACKETED.replace_all(&name, " ").into_owned();
    name = BOILERPLATE.replace_all(&name, " ").into_owned();
    name = CREDIT_LIST.replace_all(&name, " ").into_owned();
    name = PAREN_YEAR.replace_all(&name, " ").into_owned();
    name = TRAILING_YEAR.replace(&name, "").into_owned();
    name = EMPTY_PARENS.replace_all(&name, " ").into_owned();

    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(is_edge_noise);

    match LEADING_YEAR.captures(trimmed) {
        Some(caps) => caps
            .get(2)
            .map(|rest| rest.as_str().trim_matches(is_edge_noise).to_string())
            .unwrap_or_default(),
        None => trimmed.to_string(),
    }
}
