//! Token text utilities.
//!
//! HTML escaping of sentence material and conversion of Penn Treebank
//! bracket tokens (`-LRB-`, `-RCB-`…) back to plain characters.
use std::collections::HashMap;

use lazy_static::lazy_static;

lazy_static! {
    /// PTB escaped brackets and their plain form.
    static ref PTB_REPLACEMENTS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("-LRB-", "(");
        m.insert("-RRB-", ")");
        m.insert("-LSB-", "[");
        m.insert("-RSB-", "]");
        m.insert("-LCB-", "{");
        m.insert("-RCB-", "}");
        m
    };
}

/// Replace HTML special characters by entities.
///
/// Backticks are rendered as apostrophes.
/// Escaping is done character by character and is not idempotent:
/// `&` coming from a previous escaping is escaped again.
pub fn html_escape(text: &str) -> String {
    let mut ret = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => ret.push_str("&amp;"),
            '"' => ret.push_str("&quot;"),
            '\'' | '`' => ret.push_str("&apos;"),
            '>' => ret.push_str("&gt;"),
            '<' => ret.push_str("&lt;"),
            c => ret.push(c),
        }
    }
    ret
}

/// Convert a single PTB token back to normal.
pub fn ptb_token(token: &str) -> &str {
    PTB_REPLACEMENTS.get(token).copied().unwrap_or(token)
}

/// Convert special PTB tokens of a whitespace-separated text back to normal.
///
/// Whitespace is normalized to single spaces.
pub fn ptb2text(text: &str) -> String {
    text.split_whitespace()
        .map(ptb_token)
        .collect::<Vec<_>>()
        .join(" ")
}
