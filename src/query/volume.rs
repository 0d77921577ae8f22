//! Volume-number extraction from titles and queries.
//!
//! Both extractors are an ordered list of [`VolumePattern`]s evaluated in
//! sequence. The first pattern that yields an in-range number wins. Keeping the
//! order in one slice makes precedence auditable and lets each pattern be
//! tested on its own.

use super::kana::fullwidth_digits_to_ascii;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Largest volume number accepted from a catalog title.
pub const MAX_TITLE_VOLUME: u32 = 1500;

/// Largest volume number accepted from a user query.
pub const MAX_QUERY_VOLUME: u32 = 999;

/// Qualifiers that turn a trailing number into something other than a volume
/// ("Part 2", "Season 3", "その2").
static PART_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bpart|\bpt\.?|\bseason|その|第)\s*$").expect("valid regex")
});

/// A named volume matcher.
///
/// Group 1 of `regex` captures the digits unless a `volume` group is named.
/// A `marker` group, when present, narrows the span to what gets stripped.
pub(crate) struct VolumePattern {
    pub(crate) name: &'static str,
    regex: Regex,
    /// Returns `true` when a match must be rejected given the text before it.
    reject_if_preceded_by: Option<&'static LazyLock<Regex>>,
}

impl VolumePattern {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("valid volume regex"),
            reject_if_preceded_by: None,
        }
    }

    fn rejecting(mut self, qualifier: &'static LazyLock<Regex>) -> Self {
        self.reject_if_preceded_by = Some(qualifier);
        self
    }

    /// First acceptable match of this pattern in `text`.
    fn find(&self, text: &str, max: u32) -> Option<VolumeMatch> {
        self.regex.captures_iter(text).find_map(|caps| {
            let whole = caps.name("marker").or_else(|| caps.get(0))?;
            let digits = caps.name("volume").or_else(|| caps.get(1))?;
            let volume: u32 = digits.as_str().parse().ok()?;
            if volume > max {
                return None;
            }
            if let Some(qualifier) = self.reject_if_preceded_by
                && qualifier.is_match(&text[..whole.start()])
            {
                return None;
            }
            Some(VolumeMatch {
                volume,
                span: whole.range(),
                pattern: self.name,
            })
        })
    }
}

/// A volume number located in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMatch {
    pub volume: u32,
    /// Byte range of the whole marker, including surrounding syntax.
    pub span: Range<usize>,
    /// Name of the pattern that matched, for diagnostics.
    pub pattern: &'static str,
}

// Latin letters must not precede the marker ("Revol.3"), anything else may
// ("ベルセルクVol.41").
const VOL_MARKER: &str = r"(?i)(?:^|[^a-z0-9_])(?P<marker>vol\.?\s*(?P<volume>\d+))";
const NO_MARKER: &str = r"(?i)(?:^|[^a-z0-9_])(?P<marker>no\.?\s*(?P<volume>\d+))";

/// Title patterns, highest priority first.
static TITLE_PATTERNS: LazyLock<Vec<VolumePattern>> = LazyLock::new(|| {
    vec![
        VolumePattern::new("trailing_number", r"\s(\d+)\s*$"),
        VolumePattern::new("parenthesized", r"[(（](\d+)[)）]"),
        VolumePattern::new("kan", r"第?(\d+)巻"),
        VolumePattern::new("vol", VOL_MARKER),
        VolumePattern::new("no", NO_MARKER),
        // Low confidence; four digits would be a year.
        VolumePattern::new("bare_trailing", r"(?:^|\D)(\d{1,3})$"),
    ]
});

/// Query patterns, highest priority first.
static QUERY_PATTERNS: LazyLock<Vec<VolumePattern>> = LazyLock::new(|| {
    vec![
        VolumePattern::new("kan", r"第?(\d+)巻"),
        VolumePattern::new("trailing_number", r"\s(\d+)$").rejecting(&PART_QUALIFIER),
        VolumePattern::new("parenthesized", r"[(（](\d+)[)）]"),
        VolumePattern::new("vol", VOL_MARKER),
    ]
});

fn first_match(patterns: &[VolumePattern], text: &str, max: u32) -> Option<VolumeMatch> {
    patterns.iter().find_map(|pattern| pattern.find(text, max))
}

/// Extract a volume number from a catalog title.
///
/// Full-width digits are accepted. Returns `None` when no pattern yields a
/// number in `0..=1500`.
pub fn extract_volume(title: &str) -> Option<u32> {
    let title = fullwidth_digits_to_ascii(title);
    first_match(&TITLE_PATTERNS, &title, MAX_TITLE_VOLUME).map(|m| m.volume)
}

/// Locate the target volume in a query whose digits are already ASCII.
///
/// The returned span is what the normalizer strips from the query.
pub(crate) fn find_query_volume(text: &str) -> Option<VolumeMatch> {
    first_match(&QUERY_PATTERNS, text, MAX_QUERY_VOLUME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rstest::rstest;

    #[rstest]
    #[case("ONE PIECE 108", Some(108))]
    #[case("進撃の巨人(34)", Some(34))]
    #[case("鬼滅の刃 23巻", Some(23))]
    #[case("random text", None)]
    #[case("ＯＮＥ ＰＩＥＣＥ １０８", Some(108))]
    #[case("キングダム（70）", Some(70))]
    #[case("ドラゴンボール 第1巻", Some(1))]
    #[case("Berserk Vol.41", Some(41))]
    #[case("BLAME! vol 3", Some(3))]
    #[case("Record No.7", Some(7))]
    #[case("ハイキュー!!45", Some(45))]
    #[case("こち亀 0", Some(0))]
    #[case("Annual 1200", Some(1200))]
    #[case("ベルセルクVol.41", Some(41))]
    #[case("宇宙兄弟vol3", Some(3))]
    #[case("探偵No.12", Some(12))]
    #[case("Revol.3 特装版", None)]
    fn test_extract_volume(#[case] title: &str, #[case] expected: Option<u32>) {
        check!(extract_volume(title) == expected);
    }

    #[rstest]
    #[case("Artbook 2023")]
    #[case("Collection 1999")]
    #[case("Catalog 99999999999999999999")]
    #[case("")]
    fn test_years_and_overflow_are_not_volumes(#[case] title: &str) {
        check!(extract_volume(title).is_none());
    }

    #[test]
    fn test_trailing_number_outranks_parenthesized() {
        check!(extract_volume("作品(2) 5") == Some(5));
    }

    #[rstest]
    #[case("呪術廻戦 第12巻", 12, "kan")]
    #[case("呪術廻戦 12", 12, "trailing_number")]
    #[case("呪術廻戦(12)", 12, "parenthesized")]
    #[case("Jujutsu Kaisen Vol.12", 12, "vol")]
    #[case("巻 7巻 8", 7, "kan")]
    #[case("ベルセルクVol.41", 41, "vol")]
    #[case("進撃の巨人VOL.34", 34, "vol")]
    fn test_query_volume_patterns(
        #[case] query: &str,
        #[case] volume: u32,
        #[case] pattern: &str,
    ) {
        let_assert!(Some(found) = find_query_volume(query));
        check!(found.volume == volume);
        check!(found.pattern == pattern);
    }

    #[rstest]
    #[case("JoJo Part 4")]
    #[case("Attack on Titan Season 3")]
    #[case("Golden Kamuy pt. 2")]
    #[case("よつばと その2")]
    fn test_part_qualifier_blocks_trailing_number(#[case] query: &str) {
        check!(find_query_volume(query).is_none());
    }

    #[test]
    fn test_query_range_is_tighter_than_title_range() {
        check!(find_query_volume("Series 1200").is_none());
        check!(extract_volume("Series 1200") == Some(1200));
    }

    #[test]
    fn test_glued_marker_span_excludes_title() {
        let query = "ベルセルクVol.41";
        let_assert!(Some(found) = find_query_volume(query));
        check!(&query[found.span] == "Vol.41");
    }

    #[test]
    fn test_query_span_covers_marker() {
        let query = "鬼滅の刃 第23巻";
        let_assert!(Some(found) = find_query_volume(query));
        check!(&query[found.span] == "第23巻");
    }
}
