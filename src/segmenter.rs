//! Atom segmentation.
//!
//! Splits a paragraph into ordered, sentence-like atomic spans while
//! preserving byte offsets into the source document.
//!
//! ## Guarantees
//!
//! - Offsets are strictly increasing and spans never overlap.
//! - Concatenating span texts in order reproduces the paragraph text
//!   modulo whitespace (spans are whitespace-trimmed slices, nothing
//!   else is dropped or rewritten).
//! - No split occurs inside a citation marker (parenthetical author-year
//!   or bracketed note reference), a decimal number, or after a known
//!   abbreviation; the marker stays inside its enclosing atom.
//! - Sentences containing a colon outside parentheses are split at the
//!   first such colon, with the colon kept on the left span.
//!
//! Segmentation is a pure function of the paragraph text; it performs no
//! I/O and holds no state.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// An atomic span produced by segmentation: the text plus its absolute
/// byte offsets in the document (end exclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomSpan {
    /// Whitespace-trimmed span text.
    pub text: String,
    /// Absolute byte offset of the span start.
    pub start_offset: u64,
    /// Absolute byte offset one past the span end.
    pub end_offset: u64,
}

/// Abbreviations that end with a period mid-sentence.
/// Compared case-insensitively against the token preceding the period.
const ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "cf", "etc", "vs", "viz", "ibid", "ch", "sec", "fig", "no", "vol", "p", "pp",
    "ed", "eds", "trans", "dr", "prof", "mr", "mrs", "ms", "st",
];

/// Characters that may close a sentence after its terminal punctuation.
const CLOSERS: &[char] = &['"', '\'', ')', ']', '\u{201d}', '\u{2019}'];

/// Characters that may open a new sentence.
const OPENERS: &[char] = &['"', '\'', '(', '[', '\u{201c}', '\u{2018}'];

fn citation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Parenthetical author-year citations and bracketed note markers.
        Regex::new(r"\([^()]*[0-9]{4}[^()]*\)|\[\^?[0-9]+\]").expect("citation pattern compiles")
    })
}

/// Split a paragraph into ordered atomic spans.
///
/// `base_offset` is the absolute byte offset of the paragraph start in
/// the source document (inherited from the hierarchy node); returned
/// offsets are absolute.
pub fn segment(paragraph_text: &str, base_offset: u64) -> Vec<AtomSpan> {
    let protected: Vec<(usize, usize)> = citation_re()
        .find_iter(paragraph_text)
        .map(|m| (m.start(), m.end()))
        .collect();

    let boundaries = find_boundaries(paragraph_text, &protected);

    let mut spans = Vec::new();
    let mut prev = 0usize;
    for cut in boundaries.into_iter().chain(std::iter::once(paragraph_text.len())) {
        if let Some(span) = trim_segment(paragraph_text, prev, cut, base_offset) {
            spans.push(span);
        }
        prev = cut;
    }
    spans
}

/// Byte indices at which the paragraph splits, in ascending order.
fn find_boundaries(text: &str, protected: &[(usize, usize)]) -> Vec<usize> {
    let mut boundaries = Vec::new();
    let mut paren_depth = 0usize;

    for (i, c) in text.char_indices() {
        if in_protected(protected, i) {
            continue;
        }
        match c {
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '.' | '!' | '?' => {
                if c == '.' && is_non_terminal_period(text, i) {
                    continue;
                }
                if let Some(cut) = sentence_cut(text, i, protected) {
                    boundaries.push(cut);
                }
            }
            ':' if paren_depth == 0 => {
                // Colon split only when prose follows; leaves times and
                // ratios like 12:30 intact.
                if next_char(text, i + 1).is_some_and(|n| n.is_whitespace()) {
                    boundaries.push(i + 1);
                }
            }
            _ => {}
        }
    }

    boundaries.dedup();
    boundaries
}

/// Whether a period at byte index `i` is part of a decimal number, a
/// known abbreviation, or a single-letter initial.
fn is_non_terminal_period(text: &str, i: usize) -> bool {
    let prev = prev_char(text, i);
    let next = next_char(text, i + 1);

    if prev.is_some_and(|p| p.is_ascii_digit()) && next.is_some_and(|n| n.is_ascii_digit()) {
        return true;
    }

    let token = token_before(text, i);
    if token.len() == 1 && token.chars().all(|c| c.is_alphabetic() && c.is_uppercase()) {
        return true;
    }
    let lowered = token.to_ascii_lowercase();
    ABBREVIATIONS.contains(&lowered.as_str())
}

/// Given terminal punctuation at byte index `i`, return the byte index to
/// cut at, or `None` when the punctuation does not end a sentence.
///
/// Closing quotes/brackets and trailing citation markers are pulled into
/// the current sentence before the boundary is placed.
fn sentence_cut(text: &str, i: usize, protected: &[(usize, usize)]) -> Option<usize> {
    // Terminal punctuation is ASCII, one byte.
    let mut end = i + 1;
    loop {
        if let Some(c) = next_char(text, end) {
            if CLOSERS.contains(&c) {
                end += c.len_utf8();
                continue;
            }
        }
        if let Some(span_end) = protected_span_starting_at(protected, end) {
            end = span_end;
            continue;
        }
        break;
    }

    match next_char(text, end) {
        None => None, // end of paragraph; the tail segment covers it
        Some(c) if !c.is_whitespace() => None,
        Some(_) => {
            let rest = text[end..].trim_start();
            let starts_sentence = rest
                .chars()
                .next()
                .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit() || OPENERS.contains(&c));
            starts_sentence.then_some(end)
        }
    }
}

fn trim_segment(text: &str, start: usize, end: usize, base_offset: u64) -> Option<AtomSpan> {
    let segment = &text[start..end];
    let trimmed_start = segment.trim_start();
    let lead = segment.len() - trimmed_start.len();
    let trimmed = trimmed_start.trim_end();
    if trimmed.is_empty() {
        return None;
    }
    let s = start + lead;
    Some(AtomSpan {
        text: trimmed.to_string(),
        start_offset: base_offset + s as u64,
        end_offset: base_offset + (s + trimmed.len()) as u64,
    })
}

fn in_protected(protected: &[(usize, usize)], i: usize) -> bool {
    let idx = protected.partition_point(|&(_, end)| end <= i);
    protected.get(idx).is_some_and(|&(start, _)| start <= i)
}

/// End of the protected span beginning exactly at byte index `i`, if any.
fn protected_span_starting_at(protected: &[(usize, usize)], i: usize) -> Option<usize> {
    let idx = protected.partition_point(|&(start, _)| start < i);
    protected
        .get(idx)
        .filter(|&&(start, _)| start == i)
        .map(|&(_, end)| end)
}

fn prev_char(text: &str, i: usize) -> Option<char> {
    text[..i].chars().next_back()
}

fn next_char(text: &str, i: usize) -> Option<char> {
    text.get(i..).and_then(|rest| rest.chars().next())
}

/// The alphanumeric token (dots included) immediately before byte index `i`.
fn token_before(text: &str, i: usize) -> &str {
    let bytes = text.as_bytes();
    let mut start = i;
    while start > 0 {
        let b = bytes[start - 1];
        if b.is_ascii_alphanumeric() || b == b'.' {
            start -= 1;
        } else {
            break;
        }
    }
    &text[start..i]
}
