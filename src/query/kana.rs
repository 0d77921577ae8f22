//! Script and width normalization for Japanese and Latin text.
//!
//! Catalog titles and user queries mix full-width digits, half-width katakana,
//! hiragana and katakana spellings of the same word. These helpers map all of
//! them onto a single form so that substring comparisons are script-invariant.

/// Offset between a hiragana codepoint and its katakana counterpart.
const HIRAGANA_TO_KATAKANA: u32 = 0x60;

/// Offset between full-width ASCII (U+FF01..U+FF5E) and ASCII.
const FULLWIDTH_ASCII_OFFSET: u32 = 0xFEE0;

/// Full-width equivalents of U+FF66..=U+FF9D, in codepoint order.
const HALFWIDTH_KATAKANA: &[char] = &[
    'ヲ', 'ァ', 'ィ', 'ゥ', 'ェ', 'ォ', 'ャ', 'ュ', 'ョ', 'ッ', 'ー', 'ア', 'イ', 'ウ', 'エ', 'オ', 'カ',
    'キ', 'ク', 'ケ', 'コ', 'サ', 'シ', 'ス', 'セ', 'ソ', 'タ', 'チ', 'ツ', 'テ', 'ト', 'ナ', 'ニ', 'ヌ',
    'ネ', 'ノ', 'ハ', 'ヒ', 'フ', 'ヘ', 'ホ', 'マ', 'ミ', 'ム', 'メ', 'モ', 'ヤ', 'ユ', 'ヨ', 'ラ', 'リ',
    'ル', 'レ', 'ロ', 'ワ', 'ン',
];

const HALFWIDTH_VOICED_MARK: char = '\u{FF9E}';
const HALFWIDTH_SEMI_VOICED_MARK: char = '\u{FF9F}';

/// Convert full-width digits (`０`-`９`) to ASCII digits. Everything else is kept.
pub fn fullwidth_digits_to_ascii(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => shift_down(c, FULLWIDTH_ASCII_OFFSET),
            _ => c,
        })
        .collect()
}

/// Half-width katakana to full-width, then hiragana to katakana.
///
/// Half-width voiced marks are composed into the preceding kana where a
/// precomposed form exists (`ｶﾞ` → `ガ`, `ﾊﾟ` → `パ`).
pub fn normalize_kana(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            HALFWIDTH_VOICED_MARK => match out.pop() {
                Some(prev) => match voiced(prev) {
                    Some(composed) => out.push(composed),
                    None => {
                        out.push(prev);
                        out.push('゛');
                    }
                },
                None => out.push('゛'),
            },
            HALFWIDTH_SEMI_VOICED_MARK => match out.pop() {
                Some(prev) => match semi_voiced(prev) {
                    Some(composed) => out.push(composed),
                    None => {
                        out.push(prev);
                        out.push('゜');
                    }
                },
                None => out.push('゜'),
            },
            _ => out.push(hiragana_to_katakana(halfwidth_to_fullwidth(c))),
        }
    }

    out
}

/// Fold text for case-, width- and script-insensitive comparison.
///
/// Full-width ASCII becomes ASCII, the ideographic space becomes a plain
/// space, kana is normalized as in [`normalize_kana`] and the result is
/// lowercased.
pub fn fold_for_match(text: &str) -> String {
    let narrowed: String = text
        .chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => shift_down(c, FULLWIDTH_ASCII_OFFSET),
            '\u{3000}' => ' ',
            _ => c,
        })
        .collect();
    normalize_kana(&narrowed).to_lowercase()
}

fn halfwidth_to_fullwidth(c: char) -> char {
    match c {
        '\u{FF61}' => '。',
        '\u{FF62}' => '「',
        '\u{FF63}' => '」',
        '\u{FF64}' => '、',
        '\u{FF65}' => '・',
        '\u{FF66}'..='\u{FF9D}' => HALFWIDTH_KATAKANA[(c as u32 - 0xFF66) as usize],
        _ => c,
    }
}

fn hiragana_to_katakana(c: char) -> char {
    match c {
        '\u{3041}'..='\u{3096}' | 'ゝ' | 'ゞ' => {
            char::from_u32(c as u32 + HIRAGANA_TO_KATAKANA).unwrap_or(c)
        }
        _ => c,
    }
}

fn voiced(c: char) -> Option<char> {
    match c {
        'ウ' => Some('ヴ'),
        'カ' | 'キ' | 'ク' | 'ケ' | 'コ' | 'サ' | 'シ' | 'ス' | 'セ' | 'ソ' | 'タ' | 'チ' | 'ツ' | 'テ'
        | 'ト' | 'ハ' | 'ヒ' | 'フ' | 'ヘ' | 'ホ' => char::from_u32(c as u32 + 1),
        _ => None,
    }
}

fn semi_voiced(c: char) -> Option<char> {
    match c {
        'ハ' | 'ヒ' | 'フ' | 'ヘ' | 'ホ' => char::from_u32(c as u32 + 2),
        _ => None,
    }
}

fn shift_down(c: char, offset: u32) -> char {
    char::from_u32(c as u32 - offset).unwrap_or(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case("第１２巻", "第12巻")]
    #[case("ＯＮＥ　ＰＩＥＣＥ １０８", "ＯＮＥ　ＰＩＥＣＥ 108")]
    #[case("abc", "abc")]
    fn test_fullwidth_digits(#[case] input: &str, #[case] expected: &str) {
        check!(fullwidth_digits_to_ascii(input) == expected);
    }

    #[rstest]
    #[case("ｶﾀｶﾅ", "カタカナ")]
    #[case("ｶﾞﾝﾀﾞﾑ", "ガンダム")]
    #[case("ﾊﾟﾝ", "パン")]
    #[case("ｳﾞｨﾝﾗﾝﾄﾞ･ｻｶﾞ", "ヴィンランド・サガ")]
    #[case("しんげき", "シンゲキ")]
    #[case("ゔぁ", "ヴァ")]
    #[case("いすゞ", "イスヾ")]
    #[case("ﾞ", "゛")]
    #[case("ｱﾟ", "ア゜")]
    fn test_normalize_kana(#[case] input: &str, #[case] expected: &str) {
        check!(normalize_kana(input) == expected);
    }

    #[test]
    fn test_hiragana_and_katakana_fold_identically() {
        check!(fold_for_match("ちぇんそーまん") == fold_for_match("チェンソーマン"));
        check!(fold_for_match("ﾁｪﾝｿｰﾏﾝ") == fold_for_match("チェンソーマン"));
    }

    #[rstest]
    #[case("ＯＮＥ　ＰＩＥＣＥ", "one piece")]
    #[case("Spy×Family", "spy×family")]
    #[case("進撃の巨人", "進撃ノ巨人")]
    fn test_fold_for_match(#[case] input: &str, #[case] expected: &str) {
        check!(fold_for_match(input) == expected);
    }

    #[rstest]
    #[case("🦀")]
    #[case("Москва")]
    #[case("")]
    fn test_unicode_passthrough(#[case] input: &str) {
        check!(normalize_kana(input) == input);
    }
}
