//! Fuzzy text similarity for `doc.contains_fuzzy`.
//!
//! Scores are in `[0, 1]`: the larger of token Jaccard and character-bigram
//! Dice over normalized text. A document is scored as a whole and paragraph
//! by paragraph, and the best score wins, so a matching paragraph in a long
//! README is not diluted by the rest of the file.

use std::collections::BTreeSet;

/// Lowercase, drop punctuation, collapse whitespace runs to single spaces.
///
/// Punctuation is removed rather than treated as a word break, so
/// `"Don't"` and `"dont"` normalize alike.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = true;
        } else if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        }
    }
    out
}

fn tokens(normalized: &str) -> BTreeSet<&str> {
    normalized.split(' ').filter(|t| !t.is_empty()).collect()
}

fn bigrams(normalized: &str) -> BTreeSet<(char, char)> {
    let chars: Vec<char> = normalized.chars().collect();
    chars.windows(2).map(|pair| (pair[0], pair[1])).collect()
}

/// Token-set Jaccard index of two normalized strings.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let (a, b) = (tokens(a), tokens(b));
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Sørensen–Dice coefficient over character-bigram sets of two normalized strings.
pub fn dice(a: &str, b: &str) -> f64 {
    let (a, b) = (bigrams(a), bigrams(b));
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * a.intersection(&b).count() as f64 / total as f64
}

/// Similarity of two raw strings.
pub fn score(a: &str, b: &str) -> f64 {
    let (a, b) = (normalize(a), normalize(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    jaccard(&a, &b).max(dice(&a, &b))
}

/// Best score of `expected` against the whole document or any of its paragraphs.
pub fn best_score(document: &str, expected: &str) -> f64 {
    paragraphs(document)
        .map(|paragraph| score(paragraph, expected))
        .fold(score(document, expected), f64::max)
}

/// Blank-line separated blocks, trimmed, empties skipped.
fn paragraphs(document: &str) -> impl Iterator<Item = &str> {
    let mut blocks = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;
    for line in document.split_inclusive('\n') {
        if line.trim().is_empty() {
            if let Some(begin) = start.take() {
                blocks.push(&document[begin..offset]);
            }
        } else if start.is_none() {
            start = Some(offset);
        }
        offset += line.len();
    }
    if let Some(begin) = start {
        blocks.push(&document[begin..]);
    }
    blocks.into_iter().map(str::trim)
}
