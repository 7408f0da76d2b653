//! Text cleaning shared by the lexical index, the query classifier and
//! entity extraction.
//!
//! Cleaning drops mention tokens (`@user`), hashtag tokens (`#tag`) and URL
//! tokens, lowercases what remains, and splits it into word tokens (runs of
//! alphanumerics and `_`).

use crate::model::post::Entities;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_url_token(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    lower.contains("http://") || lower.contains("https://") || lower.starts_with("www.")
}

/// Lowercased word tokens of `text` with mentions, hashtags and URLs removed.
///
/// ```
/// use gaiwan_core::text::tokenize;
///
/// let tokens = tokenize("Hey @Bob, what's #New at https://x.com? Rust!");
/// assert_eq!(tokens, vec!["hey", "what", "s", "at", "rust"]);
/// ```
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for raw in text.split_whitespace() {
        if is_url_token(raw) {
            continue;
        }

        let mut current = String::new();
        let mut skipping = false;
        for c in raw.chars() {
            if c == '@' || c == '#' {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                skipping = true;
            } else if is_word_char(c) {
                if !skipping {
                    current.extend(c.to_lowercase());
                }
            } else {
                skipping = false;
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
        }
        if !current.is_empty() {
            tokens.push(current);
        }
    }
    tokens
}

/// [`tokenize`] joined back with single spaces.
#[must_use]
pub fn clean_text(text: &str) -> String {
    tokenize(text).join(" ")
}

/// Read mentions, hashtags and URLs off raw text.
///
/// Mentions and hashtags are lowercased; URLs lose their query string.
#[must_use]
pub fn extract_entities(text: &str) -> Entities {
    let mut entities = Entities::default();

    for raw in text.split_whitespace() {
        if let Some(start) = raw.find("http://").or_else(|| raw.find("https://")) {
            let url = &raw[start..];
            let url = url.split('?').next().unwrap_or(url);
            let url = url.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '/');
            if !url.is_empty() {
                entities.urls.insert(url.to_string());
            }
            continue;
        }

        let mut chars = raw.char_indices().peekable();
        while let Some((idx, c)) = chars.next() {
            if c != '@' && c != '#' {
                continue;
            }
            let rest = &raw[idx + c.len_utf8()..];
            let word: String = rest
                .chars()
                .take_while(|&ch| is_word_char(ch))
                .flat_map(char::to_lowercase)
                .collect();
            if word.is_empty() {
                continue;
            }
            if c == '@' {
                entities.mentions.insert(word);
            } else {
                entities.hashtags.insert(word);
            }
            while chars.peek().is_some_and(|&(_, ch)| is_word_char(ch)) {
                chars.next();
            }
        }
    }

    entities
}

/// Host part of a URL, lowercased, without a leading `www.`.
///
/// Returns `None` for strings with no host.
#[must_use]
pub fn url_domain(url: &str) -> Option<String> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest
        .split(|c| matches!(c, '/' | '?' | '#' | ':'))
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let host = host.strip_prefix("www.").map_or(host.as_str(), |h| h);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}
