//! Search relevance and ranking.
//!
//! Each candidate is scored by a fixed set of named signals whose point values
//! come from [`ScoringWeights`]. The per-signal breakdown is kept next to the
//! total so every ranking decision can be explained after the fact.

use super::candidate::CatalogItem;
use crate::config::ScoringWeights;
use crate::query::{NormalizedQuery, extract_volume, fold_for_match};
use serde::Serialize;
use std::sync::LazyLock;

/// Reformatted editions of a series that already exists in its base format.
pub const EDITION_MARKERS: &[&str] = &[
    "文庫版",
    "新装版",
    "愛蔵版",
    "完全版",
    "豪華版",
    "ワイド版",
    "新書版",
    "コンビニ版",
    "pocket edition",
    "deluxe edition",
];

/// Derivative works that should not outrank the main series.
pub const SPINOFF_MARKERS: &[&str] = &[
    "ガイドブック",
    "ファンブック",
    "ノベライズ",
    "小説版",
    "キャラクターブック",
    "外伝",
    "スピンオフ",
    "guidebook",
    "fanbook",
];

/// Keywords that exclude a candidate outright.
pub const ADULT_KEYWORDS: &[&str] = &[
    "成人向け",
    "成年コミック",
    "アダルト",
    "18禁",
    "r18",
    "r-18",
    "官能",
];

static FOLDED_EDITION_MARKERS: LazyLock<Vec<String>> =
    LazyLock::new(|| EDITION_MARKERS.iter().map(|m| fold_for_match(m)).collect());

static COMPACT_SPINOFF_MARKERS: LazyLock<Vec<String>> =
    LazyLock::new(|| SPINOFF_MARKERS.iter().map(|m| compact(&fold_for_match(m))).collect());

static FOLDED_ADULT_KEYWORDS: LazyLock<Vec<String>> =
    LazyLock::new(|| ADULT_KEYWORDS.iter().map(|m| fold_for_match(m)).collect());

/// Signed point contributions. The total score is their sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub exact_title_match: i32,
    pub target_volume_match: i32,
    pub volume_one_bonus: i32,
    pub short_title_bonus: i32,
    pub edition_format_penalty: i32,
    pub spinoff_penalty: i32,
    pub adult_content_penalty: i32,
}

impl ScoreBreakdown {
    pub const fn total(&self) -> i32 {
        self.exact_title_match
            .saturating_add(self.target_volume_match)
            .saturating_add(self.volume_one_bonus)
            .saturating_add(self.short_title_bonus)
            .saturating_add(self.edition_format_penalty)
            .saturating_add(self.spinoff_penalty)
            .saturating_add(self.adult_content_penalty)
    }
}

/// A catalog item together with its score and the volume read from its title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredCandidate {
    pub item: CatalogItem,
    pub breakdown: ScoreBreakdown,
    pub score: i32,
    pub volume_number: Option<u32>,
}

/// Score one candidate against a normalized query term.
///
/// Pure and total: malformed or empty titles simply earn fewer signals.
pub fn score(
    candidate: CatalogItem,
    query: &str,
    target_volume: Option<u32>,
    weights: &ScoringWeights,
) -> ScoredCandidate {
    let folded_title = fold_for_match(&candidate.title);
    let folded_query = fold_for_match(query);
    let volume_number = extract_volume(&candidate.title);

    let mut breakdown = ScoreBreakdown::default();

    if title_matches(&folded_title, &folded_query) {
        breakdown.exact_title_match = weights.exact_title_match;
    }

    match target_volume {
        Some(target) if volume_number == Some(target) => {
            breakdown.target_volume_match = weights.target_volume_match;
        }
        None if volume_number == Some(1) => {
            breakdown.volume_one_bonus = weights.volume_one_bonus;
        }
        _ => {}
    }

    if candidate.title.chars().count() <= weights.short_title_max_chars {
        breakdown.short_title_bonus = weights.short_title_bonus;
    }

    if FOLDED_EDITION_MARKERS
        .iter()
        .any(|marker| folded_title.contains(marker.as_str()))
    {
        breakdown.edition_format_penalty = weights.edition_format_penalty;
    }

    let compact_title = compact(&folded_title);
    if COMPACT_SPINOFF_MARKERS
        .iter()
        .any(|marker| compact_title.contains(marker.as_str()))
    {
        breakdown.spinoff_penalty = weights.spinoff_penalty;
    }

    if FOLDED_ADULT_KEYWORDS
        .iter()
        .any(|keyword| folded_title.contains(keyword.as_str()))
    {
        breakdown.adult_content_penalty = weights.adult_content_penalty;
    }

    ScoredCandidate {
        item: candidate,
        score: breakdown.total(),
        breakdown,
        volume_number,
    }
}

/// Score every item, drop those below `exclude_below`, and sort best-first.
///
/// The sort is stable, so equal scores keep upstream order.
pub fn rank(
    items: Vec<CatalogItem>,
    query: &NormalizedQuery,
    weights: &ScoringWeights,
    exclude_below: i32,
) -> Vec<ScoredCandidate> {
    let total = items.len();
    let mut ranked: Vec<ScoredCandidate> = items
        .into_iter()
        .map(|item| score(item, &query.normalized, query.target_volume, weights))
        .filter(|candidate| candidate.score >= exclude_below)
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));

    tracing::debug!(
        query = %query.normalized,
        scored = total,
        kept = ranked.len(),
        "Ranked candidates"
    );

    ranked
}

/// Contiguous match, or every query token inside some title token.
///
/// Both inputs must already be folded. An empty query never matches.
fn title_matches(folded_title: &str, folded_query: &str) -> bool {
    let folded_query = folded_query.trim();
    if folded_query.is_empty() {
        return false;
    }
    if folded_title.contains(folded_query) {
        return true;
    }

    let title_tokens: Vec<&str> = folded_title.split_whitespace().collect();
    folded_query
        .split_whitespace()
        .all(|token| title_tokens.iter().any(|t| t.contains(token)))
}

/// Remove whitespace and middle dots so spacing variants compare equal.
fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '・' | '･' | '·'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use assert2::check;
    use rstest::rstest;

    fn weights() -> ScoringWeights {
        ScoringWeights::default()
    }

    fn scored(title: &str, query: &str, target: Option<u32>) -> ScoredCandidate {
        score(CatalogItem::titled(title), query, target, &weights())
    }

    #[rstest]
    #[case("ONE PIECE 108", "ONE PIECE", true)]
    #[case("ＯＮＥ　ＰＩＥＣＥ １", "one piece", true)]
    #[case("しんげきのきょじん 1", "シンゲキノキョジン", true)]
    #[case("Kaisen Jujutsu 3", "jujutsu kaisen", true)]
    #[case("Jujutsu 3", "jujutsu kaisen", false)]
    #[case("ONE PIECE", "", false)]
    #[case("", "ONE PIECE", false)]
    fn test_exact_title_signal(#[case] title: &str, #[case] query: &str, #[case] matched: bool) {
        let candidate = scored(title, query, None);
        check!((candidate.breakdown.exact_title_match == 100) == matched);
    }

    #[rstest]
    #[case("ONE PIECE")]
    #[case("")]
    #[case("18禁 特装版 ガイドブック 1")]
    fn test_empty_query_never_matches(#[case] title: &str) {
        for target in [None, Some(1), Some(108)] {
            check!(scored(title, "", target).breakdown.exact_title_match == 0);
        }
    }

    #[test]
    fn test_target_volume_dominates() {
        let wanted = scored("ONE PIECE 108", "ONE PIECE", Some(108));
        let opener = scored("ONE PIECE 1", "ONE PIECE", Some(108));
        check!(wanted.breakdown.target_volume_match == 500);
        check!(opener.breakdown.volume_one_bonus == 0);
        check!(wanted.score > opener.score);
        check!(wanted.volume_number == Some(108));
    }

    #[test]
    fn test_volume_one_bonus_only_without_target() {
        check!(scored("ONE PIECE 1", "ONE PIECE", None).breakdown.volume_one_bonus == 30);
        check!(scored("ONE PIECE 1", "ONE PIECE", Some(2)).breakdown.volume_one_bonus == 0);
        check!(scored("ONE PIECE 2", "ONE PIECE", None).breakdown.volume_one_bonus == 0);
    }

    #[rstest]
    #[case("鬼滅の刃 1", true)]
    #[case("", true)]
    #[case("鬼滅の刃 公式ファンブック 鬼殺隊見聞録 特別収録短編つき豪華仕様", false)]
    fn test_short_title_bonus(#[case] title: &str, #[case] expected: bool) {
        check!((scored(title, "x", None).breakdown.short_title_bonus == 20) == expected);
    }

    #[rstest]
    #[case("ドラゴンボール 完全版 1")]
    #[case("ベルセルク 愛蔵版")]
    #[case("寄生獣 新装版 3")]
    fn test_edition_penalty(#[case] title: &str) {
        check!(scored(title, "x", None).breakdown.edition_format_penalty == -30);
    }

    #[rstest]
    #[case("呪術廻戦 公式ファンブック")]
    #[case("呪術廻戦 ファン・ブック")]
    #[case("呪術廻戦 ファン ブック")]
    #[case("NARUTO 外伝 七代目火影")]
    #[case("進撃の巨人 キャラクター・ブック")]
    #[case("鬼滅の刃 ノベライズ")]
    fn test_spinoff_penalty_survives_spacing_variants(#[case] title: &str) {
        check!(scored(title, "x", None).breakdown.spinoff_penalty == -80);
    }

    #[rstest]
    #[case("某作品 成人向け 1")]
    #[case("Something R18 Edition")]
    #[case("ｱﾀﾞﾙﾄ作品")]
    fn test_adult_content_is_always_excluded(#[case] title: &str) {
        let thresholds = Thresholds::default();
        // Every positive signal at once still cannot lift it above the floor.
        let candidate = score(CatalogItem::titled(title), title, Some(1), &weights());
        check!(candidate.breakdown.adult_content_penalty == -100_000);
        check!(candidate.score < thresholds.ambiguous);
    }

    #[test]
    fn test_total_is_sum_of_breakdown() {
        let candidate = scored("ドラゴンボール 完全版 1", "ドラゴンボール", None);
        let b = candidate.breakdown;
        check!(b.exact_title_match == 100);
        check!(b.volume_one_bonus == 30);
        check!(b.short_title_bonus == 20);
        check!(b.edition_format_penalty == -30);
        check!(candidate.score == 120);
    }

    #[test]
    fn test_total_saturates() {
        let b = ScoreBreakdown {
            exact_title_match: i32::MAX,
            target_volume_match: i32::MAX,
            ..ScoreBreakdown::default()
        };
        check!(b.total() == i32::MAX);
    }

    #[test]
    fn test_rank_filters_and_sorts() {
        let query = NormalizedQuery {
            original: "ONE PIECE 2".into(),
            normalized: "ONE PIECE".into(),
            target_volume: Some(2),
            was_alias_resolved: false,
            alias_key: None,
        };
        let items = vec![
            CatalogItem::titled("ONE PIECE 1"),
            CatalogItem::titled("ONE PIECE R18 2"),
            CatalogItem::titled("ONE PIECE 2"),
            CatalogItem::titled("ONE PIECE FILM GUIDEBOOK"),
        ];

        let ranked = rank(items, &query, &weights(), Thresholds::default().ambiguous);
        let titles: Vec<&str> = ranked.iter().map(|c| c.item.title.as_str()).collect();
        check!(titles == vec!["ONE PIECE 2", "ONE PIECE 1", "ONE PIECE FILM GUIDEBOOK"]);
    }
}
