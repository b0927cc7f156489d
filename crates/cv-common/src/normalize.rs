use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s]").unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// 比較時に無視する語（トルコ語 + 英語）
pub static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Turkish
        "ve", "ile", "için", "bir", "bu", "şu", "o", "de", "da", "ki", "mi", "mı", "olarak",
        "olan", "ilgili", "gibi", "üzere", "üzerinde", "tarafından", "birlikte", "yaptım",
        "ettim", "sağladım", "geliştirdim", "çalıştım", "bulundum", "uyguladım", "yönettim",
        "belirledim", "oluşturdum", "güçlendirdim", "hazırladım", "tasarladım", "destek",
        "görev", "aldım", "proje", "ekibi", "deneyim", "yıl", "ay", "kullanımı", "bilgisi",
        "hakkında",
        // English
        "and", "or", "the", "of", "in", "on", "at", "for", "with", "to", "an", "as", "by",
        "from", "is", "was", "were", "be",
    ]
    .into_iter()
    .collect()
});

/// Lower-cases with the Turkish dotted/dotless I convention (`İ`→`i`, `I`→`ı`).
pub fn tr_lower(text: &str) -> String {
    text.replace('İ', "i").replace('I', "ı").to_lowercase()
}

/// Replaces every character that is not a letter, digit or whitespace with a
/// space and collapses whitespace runs.
pub fn strip_punctuation(text: &str) -> String {
    let replaced = RE_NON_WORD.replace_all(text, " ");
    collapse_whitespace(&replaced)
}

pub fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Normalizes a text block for narrative comparison: Turkish lower-casing,
/// punctuation removal, stopword and one-character word removal.
pub fn clean_stopwords(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let lowered = tr_lower(text);
    let stripped = strip_punctuation(&lowered);

    stripped
        .split_whitespace()
        .filter(|w| !is_stopword(w) && w.chars().count() > 1)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Capitalizes the first letter of every alphabetic run ("node js" → "Node Js").
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
