//! Search Normalisation
//!
//! Case and diacritic folding used to match search queries against labels.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase `text` and strip diacritics.
///
/// Characters are lowercased and decomposed (NFD), combining marks are
/// dropped and Latin letters without a decomposition are folded to their
/// closest ASCII spelling.
pub fn normalize(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());

    for c in text.to_lowercase().nfd() {
        if is_combining_mark(c) {
            continue;
        }
        match fold(c) {
            Some(folded) => normalized.push_str(folded),
            None => normalized.push(c),
        }
    }

    normalized
}

fn fold(c: char) -> Option<&'static str> {
    let folded = match c {
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'ø' => "o",
        'ł' => "l",
        'đ' | 'ð' => "d",
        'þ' => "th",
        'ħ' => "h",
        'ı' => "i",
        _ => return None,
    };
    Some(folded)
}

/// Whether `text` contains the already normalised `query`.
pub fn matches_query(text: &str, normalized_query: &str) -> bool {
    normalize(text).contains(normalized_query)
}
