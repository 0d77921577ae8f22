//! Collapsing catalog entries that belong to the same series.

use super::scoring::ScoredCandidate;
use crate::query::{fold_for_match, fullwidth_digits_to_ascii};
use ahash::AHashMap;
use regex::Regex;
use std::sync::LazyLock;

/// Trailing volume indicators, stripped repeatedly until none match.
static VOLUME_SUFFIXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\s*[(（]\d+[)）]\s*$",
        r"\s*第?\d+巻\s*$",
        r"(?i)\s*\bvol\.?\s*\d+\s*$",
        r"\s*\d+\s*$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid suffix regex"))
    .collect()
});

/// Canonical stem of a title used to group volumes of one series.
///
/// `"ONE PIECE 108"`, `"ONE PIECE（107）"` and `"one piece 第1巻"` all map to
/// `"onepiece"`.
pub fn series_key(title: &str) -> String {
    let mut stem = fullwidth_digits_to_ascii(title);

    loop {
        let before = stem.len();
        for suffix in VOLUME_SUFFIXES.iter() {
            if let Some(found) = suffix.find(&stem) {
                stem.truncate(found.start());
            }
        }
        if stem.len() == before {
            break;
        }
    }

    fold_for_match(&stem)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Keep only the highest-scoring candidate of each series.
///
/// Ties keep the first candidate seen. The result is sorted by score,
/// descending, and is always a subset of the input.
pub fn dedupe(candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    let input_len = candidates.len();
    let mut slots: AHashMap<String, usize> = AHashMap::with_capacity(input_len);
    let mut kept: Vec<ScoredCandidate> = Vec::with_capacity(input_len);

    for candidate in candidates {
        let key = series_key(&candidate.item.title);
        match slots.get(&key) {
            Some(&slot) => {
                if candidate.score > kept[slot].score {
                    kept[slot] = candidate;
                }
            }
            None => {
                slots.insert(key, kept.len());
                kept.push(candidate);
            }
        }
    }

    kept.sort_by(|a, b| b.score.cmp(&a.score));
    tracing::debug!(input = input_len, output = kept.len(), "Deduplicated series");
    kept
}
