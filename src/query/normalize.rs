//! Query normalization: raw user text to a canonical search term.

use super::alias::AliasTable;
use super::kana::{fullwidth_digits_to_ascii, normalize_kana};
use super::volume::find_query_volume;
use crate::config::Config;
use serde::Serialize;

/// A user query after cleaning, volume extraction and alias resolution.
///
/// Invariant: `normalized` holds at most the configured maximum number of
/// characters and contains no control characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedQuery {
    /// The raw text as received.
    pub original: String,
    /// Canonical search term sent upstream and matched against titles.
    pub normalized: String,
    pub target_volume: Option<u32>,
    pub was_alias_resolved: bool,
    /// Alias key that matched, for diagnostics.
    pub alias_key: Option<String>,
}

impl NormalizedQuery {
    /// Key under which identical in-flight searches are coalesced.
    ///
    /// The target volume is part of the key because it changes ranking.
    pub fn coalescing_key(&self) -> String {
        match self.target_volume {
            Some(volume) => format!("{}#{}", self.normalized, volume),
            None => self.normalized.clone(),
        }
    }
}

/// Outcome of parsing a raw query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedQuery {
    Ok(NormalizedQuery),
    /// Nothing remained after cleaning and volume extraction.
    EmptyQuery(NormalizedQuery),
    Failure(QueryRejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRejection {
    /// The text has no letter or digit to search for (e.g. `"!!!"`).
    NoSearchableText(NormalizedQuery),
}

impl QueryRejection {
    pub const fn query(&self) -> &NormalizedQuery {
        match self {
            Self::NoSearchableText(query) => query,
        }
    }
}

/// Turns raw query text into [`NormalizedQuery`] values.
#[derive(Debug, Clone)]
pub struct QueryNormalizer {
    aliases: AliasTable,
    max_length: usize,
}

impl QueryNormalizer {
    pub fn new(aliases: AliasTable, max_length: usize) -> Self {
        Self {
            aliases,
            max_length: max_length.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            AliasTable::with_overrides(&config.aliases),
            config.query.max_length,
        )
    }

    pub const fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Normalize a raw query. Never fails; degenerate input yields an empty
    /// `normalized` string.
    pub fn normalize(&self, raw: &str) -> NormalizedQuery {
        // Volume extraction sees the full text; only the remainder is cut.
        let digits = fullwidth_digits_to_ascii(&clean_text(raw));

        let (stripped, target_volume) = match find_query_volume(&digits) {
            Some(found) => {
                let mut rest = String::with_capacity(digits.len());
                rest.push_str(&digits[..found.span.start]);
                rest.push(' ');
                rest.push_str(&digits[found.span.end..]);
                (clean_text(&rest), Some(found.volume))
            }
            None => (digits, None),
        };
        let stripped = truncate_chars(&stripped, self.max_length);

        let kana = normalize_kana(&stripped);

        let (normalized, alias_key) = match self.aliases.resolve(&kana, &stripped) {
            Some(resolution) => {
                tracing::debug!(
                    key = resolution.key,
                    canonical = resolution.canonical,
                    tier = ?resolution.tier,
                    "Resolved alias"
                );
                (
                    clean_text(resolution.canonical),
                    Some(resolution.key.to_string()),
                )
            }
            None => (kana, None),
        };

        NormalizedQuery {
            original: raw.to_string(),
            normalized: truncate_chars(&normalized, self.max_length),
            target_volume,
            was_alias_resolved: alias_key.is_some(),
            alias_key,
        }
    }

    /// Normalize and classify degenerate input as typed variants.
    pub fn parse(&self, raw: &str) -> ParsedQuery {
        let query = self.normalize(raw);
        if query.normalized.is_empty() {
            ParsedQuery::EmptyQuery(query)
        } else if !query.normalized.chars().any(char::is_alphanumeric) {
            ParsedQuery::Failure(QueryRejection::NoSearchableText(query))
        } else {
            ParsedQuery::Ok(query)
        }
    }
}

/// Drop control characters, collapse whitespace runs (including U+3000) and trim.
fn clean_text(text: &str) -> String {
    let without_controls: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();
    without_controls.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep at most `max` characters, cutting only on `char` boundaries.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => text[..byte_index].trim_end().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rstest::rstest;

    fn normalizer() -> QueryNormalizer {
        QueryNormalizer::new(AliasTable::builtin(), 100)
    }

    #[rstest]
    #[case("ONE PIECE 108巻", "ONE PIECE", Some(108))]
    #[case("ダンジョン飯 第２３巻", "ダンジョン飯", Some(23))]
    #[case("キングダム　７０", "キングダム", Some(70))]
    #[case("ダンダダン(3)", "ダンダダン", Some(3))]
    #[case("Berserk Vol.41", "Berserk", Some(41))]
    #[case("JoJo Part 4", "JoJo Part 4", None)]
    #[case("Collection 1999", "Collection 1999", None)]
    fn test_volume_extraction(
        #[case] raw: &str,
        #[case] normalized: &str,
        #[case] volume: Option<u32>,
    ) {
        let query = normalizer().normalize(raw);
        check!(query.target_volume == volume);
        check!(query.normalized == normalized);
        check!(!query.was_alias_resolved);
    }

    #[rstest]
    #[case("ワンピ 105", "ONE PIECE", "ワンピ", Some(105))]
    #[case("きめつ　２３巻", "鬼滅の刃", "きめつ", Some(23))]
    #[case("鬼滅の刃 第２３巻", "鬼滅の刃", "鬼滅", Some(23))]
    #[case("ハガレン", "鋼の錬金術師", "ハガレン", None)]
    #[case("ﾊｶﾞﾚﾝ", "鋼の錬金術師", "ハガレン", None)]
    fn test_alias_resolution(
        #[case] raw: &str,
        #[case] canonical: &str,
        #[case] key: &str,
        #[case] volume: Option<u32>,
    ) {
        let query = normalizer().normalize(raw);
        check!(query.normalized == canonical);
        check!(query.was_alias_resolved);
        check!(query.alias_key.as_deref() == Some(key));
        check!(query.target_volume == volume);
        check!(query.original == raw);
    }

    #[test]
    fn test_hiragana_query_becomes_katakana() {
        let query = normalizer().normalize("ちいかわ");
        check!(query.normalized == "チイカワ");
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let normalizer = QueryNormalizer::new(AliasTable::default(), 5);
        let query = normalizer.normalize("葬送のフリーレン完全版セット");
        check!(query.normalized.chars().count() <= 5);
        check!(query.normalized == "葬送ノフリ");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\u{0}\u{7}\t\n")]
    #[case("🦀🦀🦀")]
    #[case("ｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞｶﾞ")]
    fn test_normalized_length_and_controls(#[case] raw: &str) {
        let normalizer = QueryNormalizer::new(AliasTable::builtin(), 20);
        let query = normalizer.normalize(raw);
        check!(query.normalized.chars().count() <= 20);
        check!(!query.normalized.chars().any(char::is_control));
    }

    #[rstest]
    #[case("とても長いシリーズ名です 23巻", "トテモ長イシリーズ名", Some(23))]
    #[case("とても長いシリーズ名です 第２３巻", "トテモ長イシリーズ名", Some(23))]
    #[case("ABCDEFG 1999", "ABCDEFG 19", None)]
    #[case("ABCDEFGHIJ Vol.4", "ABCDEFGHIJ", Some(4))]
    fn test_volume_survives_truncation(
        #[case] raw: &str,
        #[case] normalized: &str,
        #[case] volume: Option<u32>,
    ) {
        let query = QueryNormalizer::new(AliasTable::default(), 10).normalize(raw);
        check!(query.target_volume == volume);
        check!(query.normalized == normalized);
    }

    #[test]
    fn test_control_characters_are_removed() {
        let query = normalizer().normalize("ダン\u{0}ジョン\t飯\u{1b}");
        check!(query.normalized == "ダンジョン 飯");
    }

    #[test]
    fn test_parse_variants() {
        let normalizer = normalizer();

        let_assert!(ParsedQuery::Ok(query) = normalizer.parse("キングダム 70"));
        check!(query.target_volume == Some(70));

        let_assert!(ParsedQuery::EmptyQuery(query) = normalizer.parse("  3巻 "));
        check!(query.target_volume == Some(3));

        let_assert!(ParsedQuery::EmptyQuery(_) = normalizer.parse(""));

        let_assert!(ParsedQuery::Failure(rejection) = normalizer.parse("!!! ???"));
        check!(rejection.query().normalized == "!!! ???");
    }

    #[test]
    fn test_coalescing_key_includes_volume() {
        let normalizer = normalizer();
        let first = normalizer.normalize("キングダム 1");
        let plain = normalizer.normalize("キングダム");
        check!(first.coalescing_key() == "キングダム#1");
        check!(plain.coalescing_key() == "キングダム");
    }
}
