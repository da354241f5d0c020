//! Fuzzy matching for contact names and message bodies, on top of strsim.
//!
//! Two scorers live here:
//! - [`name_score`]: token-aware 0..1 score used by the contact directory
//! - [`weighted_ratio`]: whole-string 0..100 score used by message search
//!
//! CHANGELOG:
//! - 10/19/2026 - Token prefix scoring, name cleaning, weighted ratio for search
//! - 01/10/2026 - Initial stub

use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;
use strsim::normalized_levenshtein;

/// Default threshold for contact matching (0.0 - 1.0).
pub const DEFAULT_THRESHOLD: f64 = 0.6;

const EXACT_TOKEN: f64 = 0.95;
const QUERY_PREFIX_OF_TOKEN: f64 = 0.85;
const TOKEN_PREFIX_OF_QUERY: f64 = 0.80;

static EMOJI: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"[\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}\x{2B00}-\x{2BFF}\x{FE0F}\x{200D}]").ok()
});

static PUNCTUATION: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[^\w\s'\-]").ok());

/// A candidate that cleared the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    pub candidate: String,
    pub value: T,
    pub score: f64,
}

/// Lowercase, drop emoji and punctuation (apostrophes and hyphens stay),
/// collapse whitespace.
pub fn clean(text: &str) -> String {
    let mut out = text.to_lowercase();
    if let Some(re) = EMOJI.as_ref() {
        out = re.replace_all(&out, "").into_owned();
    }
    if let Some(re) = PUNCTUATION.as_ref() {
        out = re.replace_all(&out, "").into_owned();
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Edit-distance similarity in 0..1.
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b)
}

fn char_len(s: &str) -> f64 {
    s.chars().count() as f64
}

/// Best per-token score of an already-cleaned query against a cleaned candidate.
fn token_score(query: &str, candidate: &str) -> f64 {
    candidate
        .split_whitespace()
        .map(|token| {
            if token == query {
                EXACT_TOKEN
            } else if token.starts_with(query) {
                QUERY_PREFIX_OF_TOKEN * char_len(query) / char_len(token)
            } else if query.starts_with(token) {
                TOKEN_PREFIX_OF_QUERY * char_len(token) / char_len(query)
            } else {
                similarity(query, token)
            }
        })
        .fold(0.0, f64::max)
}

/// Score a raw query against a raw candidate name.
pub fn name_score(query: &str, candidate: &str, threshold: f64) -> f64 {
    let query = clean(query);
    let candidate = clean(candidate);
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if query == candidate {
        return 1.0;
    }

    let best_token = token_score(&query, &candidate);
    let multi_word = query.contains(' ');
    if multi_word || best_token < threshold {
        best_token.max(similarity(&query, &candidate))
    } else {
        best_token
    }
}

/// Keep candidates scoring at or above `threshold`, best first.
///
/// Equal scores keep their input order.
pub fn fuzzy_match<T, I>(query: &str, candidates: I, threshold: f64) -> Vec<Scored<T>>
where
    I: IntoIterator<Item = (String, T)>,
{
    let mut matches: Vec<Scored<T>> = candidates
        .into_iter()
        .filter_map(|(candidate, value)| {
            let score = name_score(query, &candidate, threshold);
            (score >= threshold).then_some(Scored {
                candidate,
                value,
                score,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    matches
}

// ============================================================================
// Message search scoring
// ============================================================================

/// Token sort ratio: compare with words in sorted order (0..1).
fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let mut a_tokens: Vec<&str> = a.split_whitespace().collect();
    let mut b_tokens: Vec<&str> = b.split_whitespace().collect();
    a_tokens.sort_unstable();
    b_tokens.sort_unstable();
    similarity(&a_tokens.join(" "), &b_tokens.join(" "))
}

/// Best alignment of the shorter string against equal-length windows of the longer.
fn partial_ratio(shorter: &str, longer: &str) -> f64 {
    let needle: Vec<char> = shorter.chars().collect();
    let hay: Vec<char> = longer.chars().collect();
    if needle.is_empty() || needle.len() > hay.len() {
        return 0.0;
    }

    let mut best: f64 = 0.0;
    for window in hay.windows(needle.len()) {
        let window: String = window.iter().collect();
        best = best.max(similarity(shorter, &window));
        if best >= 1.0 {
            break;
        }
    }
    best
}

/// Weighted whole-string similarity on a 0..100 scale.
///
/// Only identical cleaned strings reach 100: reordered or partial matches are
/// scaled down (token sort x0.95, partial x0.90).
pub fn weighted_ratio(a: &str, b: &str) -> f64 {
    let a = clean(a);
    let b = clean(b);
    if a == b {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut score = similarity(&a, &b);
    score = score.max(token_sort_ratio(&a, &b) * 0.95);

    let (shorter, longer) = if char_len(&a) <= char_len(&b) {
        (&a, &b)
    } else {
        (&b, &a)
    };
    if char_len(longer) / char_len(shorter) >= 1.5 {
        score = score.max(partial_ratio(shorter, longer) * 0.90);
    }

    score * 100.0
}
