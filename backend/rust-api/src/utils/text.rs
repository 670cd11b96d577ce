//! Text canonicalization and similarity helpers for answer grading.
//!
//! Everything here is pure and deterministic; grading paths go through
//! `normalize` first so that comparisons never see raw user input.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// Similarity at or above this counts as the reference answer itself.
pub const NEAR_EXACT_THRESHOLD: f64 = 0.9;
/// Word-overlap / similarity at or above this counts as "close".
pub const CLOSE_THRESHOLD: f64 = 0.7;
/// Short-answer near-miss threshold.
pub const SHORT_ANSWER_NEAR_THRESHOLD: f64 = 0.8;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Canonicalizes a string for comparison: lowercase, trimmed, internal
/// whitespace collapsed, locale grapheme variants folded, punctuation
/// stripped except the apostrophe (load-bearing in Uzbek Latin: o', g').
pub fn normalize(input: &str, locale: &str) -> String {
    let uzbek = is_uzbek(locale);
    let mut out = String::with_capacity(input.len());

    for ch in input.trim().to_lowercase().chars() {
        let ch = if uzbek { fold_uzbek_variant(ch) } else { ch };
        if ch == '\'' || !is_strippable(ch) {
            out.push(ch);
        }
    }

    WHITESPACE.replace_all(out.trim(), " ").into_owned()
}

fn is_uzbek(locale: &str) -> bool {
    let locale = locale.to_ascii_lowercase();
    locale == "uz" || locale.starts_with("uz-") || locale.starts_with("uz_")
}

/// Uzbek Latin text uses several code points interchangeably for the
/// apostrophe in o'/g' and the glottal stop; all fold to U+0027.
fn fold_uzbek_variant(ch: char) -> char {
    match ch {
        '\u{2018}' | '\u{2019}' | '\u{02BB}' | '\u{02BC}' | '`' | '\u{00B4}' => '\'',
        _ => ch,
    }
}

fn is_strippable(ch: char) -> bool {
    ch.is_ascii_punctuation()
        || matches!(
            ch,
            '«' | '»'
                | '—'
                | '–'
                | '…'
                | '“'
                | '”'
                | '„'
                | '\u{2018}'
                | '\u{2019}'
                | '¿'
                | '¡'
        )
}

/// Classical Levenshtein distance over characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];

    for (i, a_ch) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_ch) in b_chars.iter().enumerate() {
            let cost = if a_ch == b_ch { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// `1 - distance / max(len)`. Both empty: 1. Exactly one empty: 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    match (a_len, b_len) {
        (0, 0) => 1.0,
        (0, _) | (_, 0) => 0.0,
        _ => 1.0 - edit_distance(a, b) as f64 / a_len.max(b_len) as f64,
    }
}

/// Fraction of reference words present in the answer. Inputs are expected to
/// be normalized already.
pub fn word_overlap(answer: &str, reference: &str) -> f64 {
    let reference_words: Vec<&str> = reference.split_whitespace().collect();
    if reference_words.is_empty() {
        return if answer.split_whitespace().next().is_none() {
            1.0
        } else {
            0.0
        };
    }

    let answer_words: HashSet<&str> = answer.split_whitespace().collect();
    let hits = reference_words
        .iter()
        .filter(|word| answer_words.contains(**word))
        .count();

    hits as f64 / reference_words.len() as f64
}
