//! Alias dictionary mapping abbreviations and alternate spellings to canonical
//! series titles.

use super::kana::fold_for_match;
use std::collections::BTreeMap;

/// Curated built-in aliases. Config entries are merged over these.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("ワンピ", "ONE PIECE"),
    ("ワンピース", "ONE PIECE"),
    ("鬼滅", "鬼滅の刃"),
    ("きめつ", "鬼滅の刃"),
    ("進撃", "進撃の巨人"),
    ("呪術", "呪術廻戦"),
    ("ヒロアカ", "僕のヒーローアカデミア"),
    ("チェンソー", "チェンソーマン"),
    ("スパイファミリー", "SPY×FAMILY"),
    ("スパファミ", "SPY×FAMILY"),
    ("ハガレン", "鋼の錬金術師"),
    ("ジョジョ", "ジョジョの奇妙な冒険"),
    ("こち亀", "こちら葛飾区亀有公園前派出所"),
    ("ハンタ", "HUNTER×HUNTER"),
    ("ハンターハンター", "HUNTER×HUNTER"),
    ("ドラゴンボール", "DRAGON BALL"),
    ("スラダン", "SLAM DUNK"),
    ("スラムダンク", "SLAM DUNK"),
    ("ゴールデンカムイ", "ゴールデンカムイ"),
    ("フリーレン", "葬送のフリーレン"),
    ("薬屋", "薬屋のひとりごと"),
    ("推しの子", "【推しの子】"),
    ("よう実", "ようこそ実力至上主義の教室へ"),
    ("このすば", "この素晴らしい世界に祝福を!"),
    ("リゼロ", "Re:ゼロから始める異世界生活"),
];

/// Which lookup tier produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasTier {
    /// Exact match on the script-normalized query.
    ExactNormalized,
    /// Exact match on the query as typed (before character normalization).
    ExactOriginal,
    /// One string contains the other; the shortest key wins.
    Substring,
}

/// Result of a successful alias lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasResolution<'a> {
    pub key: &'a str,
    pub canonical: &'a str,
    pub tier: AliasTier,
}

#[derive(Debug, Clone)]
struct AliasEntry {
    key: String,
    folded_key: String,
    key_chars: usize,
    canonical: String,
}

/// Read-only alias dictionary, built once at startup.
///
/// Entries are kept sorted by key so that lookups are deterministic.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

impl AliasTable {
    /// The built-in curated dictionary.
    pub fn builtin() -> Self {
        Self::from_pairs(
            BUILTIN_ALIASES
                .iter()
                .map(|(key, canonical)| ((*key).to_string(), (*canonical).to_string())),
        )
    }

    /// Built-in dictionary with `overrides` merged on top.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let merged: BTreeMap<String, String> = BUILTIN_ALIASES
            .iter()
            .map(|(key, canonical)| ((*key).to_string(), (*canonical).to_string()))
            .chain(overrides.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect();
        Self::from_pairs(merged)
    }

    /// Build a table from arbitrary pairs. Later duplicates replace earlier ones.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let unique: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(key, canonical)| (key.trim().to_string(), canonical))
            .filter(|(key, _)| !key.is_empty())
            .collect();

        let entries = unique
            .into_iter()
            .map(|(key, canonical)| AliasEntry {
                folded_key: fold_for_match(&key),
                key_chars: key.chars().count(),
                key,
                canonical,
            })
            .collect();

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a query against the table.
    ///
    /// `normalized` is the script-normalized query text and `original` the same
    /// text before character normalization. Tiers are tried in order: exact on
    /// `normalized`, exact on `original`, then substring in either direction
    /// with the shortest matching key winning.
    pub fn resolve(&self, normalized: &str, original: &str) -> Option<AliasResolution<'_>> {
        let folded = fold_for_match(normalized.trim());
        if folded.is_empty() {
            return None;
        }

        if let Some(entry) = self.entries.iter().find(|e| e.folded_key == folded) {
            return Some(entry.resolution(AliasTier::ExactNormalized));
        }

        let original = original.trim();
        if let Some(entry) = self.entries.iter().find(|e| e.key == original) {
            return Some(entry.resolution(AliasTier::ExactOriginal));
        }

        // Strict `<` keeps the lexicographically first key among equal lengths.
        let mut best: Option<&AliasEntry> = None;
        for entry in &self.entries {
            if entry.folded_key.is_empty() {
                continue;
            }
            let contains = folded.contains(&entry.folded_key) || entry.folded_key.contains(&folded);
            if contains && best.is_none_or(|b| entry.key_chars < b.key_chars) {
                best = Some(entry);
            }
        }

        best.map(|entry| entry.resolution(AliasTier::Substring))
    }
}

impl AliasEntry {
    fn resolution(&self, tier: AliasTier) -> AliasResolution<'_> {
        AliasResolution {
            key: &self.key,
            canonical: &self.canonical,
            tier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rstest::rstest;

    fn table(pairs: &[(&str, &str)]) -> AliasTable {
        AliasTable::from_pairs(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        )
    }

    // Precedence matrix: each row names the tier that must win.
    #[rstest]
    // Exact on normalized text beats everything, even a shorter substring key.
    #[case(&[("ハガレン", "鋼の錬金術師"), ("ハガ", "Other")], "ハガレン", "ハガレン", "ハガレン", AliasTier::ExactNormalized)]
    // Hiragana key reaches exact tier through folding.
    #[case(&[("きめつ", "鬼滅の刃")], "キメツ", "きめつ", "きめつ", AliasTier::ExactNormalized)]
    // Original text matches a key whose folded form differs from the normalized text.
    #[case(&[("Ｒｅ：ゼロ", "Re:ゼロから始める異世界生活")], "zzz", "Ｒｅ：ゼロ", "Ｒｅ：ゼロ", AliasTier::ExactOriginal)]
    // Forward substring: query contains the key.
    #[case(&[("ヒロアカ", "僕のヒーローアカデミア")], "ヒロアカ 映画", "ヒロアカ 映画", "ヒロアカ", AliasTier::Substring)]
    // Reverse substring: key contains the query.
    #[case(&[("ハンターハンター", "HUNTER×HUNTER")], "ハンター", "ハンター", "ハンターハンター", AliasTier::Substring)]
    // Shortest key wins among several substring hits.
    #[case(&[("ワンピース", "ONE PIECE"), ("ワンピ", "ONE PIECE")], "ワンピース 新刊", "ワンピース 新刊", "ワンピ", AliasTier::Substring)]
    fn test_resolution_precedence(
        #[case] pairs: &[(&str, &str)],
        #[case] normalized: &str,
        #[case] original: &str,
        #[case] expected_key: &str,
        #[case] expected_tier: AliasTier,
    ) {
        let table = table(pairs);
        let_assert!(Some(resolution) = table.resolve(normalized, original));
        check!(resolution.key == expected_key);
        check!(resolution.tier == expected_tier);
    }

    #[test]
    fn test_equal_length_keys_resolve_deterministically() {
        let table = table(&[("ビービー", "B"), ("エーエー", "A")]);
        let_assert!(Some(resolution) = table.resolve("エーエービービー", "エーエービービー"));
        check!(resolution.key == "エーエー");
    }

    #[test]
    fn test_short_key_swallows_unrelated_query() {
        // Known weakness of substring matching: a short key inside an
        // unrelated query still resolves.
        let table = table(&[("薬屋", "薬屋のひとりごと")]);
        let_assert!(Some(resolution) = table.resolve("町の薬屋さん", "町の薬屋さん"));
        check!(resolution.canonical == "薬屋のひとりごと");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("完全に無関係なタイトル")]
    fn test_unresolvable(#[case] query: &str) {
        check!(AliasTable::builtin().resolve(query, query).is_none());
    }

    #[test]
    fn test_overrides_replace_builtin_entries() {
        let mut overrides = BTreeMap::new();
        overrides.insert("鬼滅".to_string(), "鬼滅の刃 外伝".to_string());
        overrides.insert("新しい".to_string(), "新しいシリーズ".to_string());

        let table = AliasTable::with_overrides(&overrides);
        check!(table.len() == AliasTable::builtin().len() + 1);
        let_assert!(Some(resolution) = table.resolve("鬼滅", "鬼滅"));
        check!(resolution.canonical == "鬼滅の刃 外伝");
    }
}
