use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::fields::SectionField;
use crate::normalize::{collapse_whitespace, is_stopword, strip_punctuation, tr_lower};
use crate::profile::FieldValue;

/// 正規化済みタームの集合（辞書順で走査 → マッチングのタイブレーク順が決まる）
pub type TermSet = BTreeSet<String>;

/// Record attributes that carry the meaningful text, in priority order.
const RECORD_TEXT_KEYS: [&str; 9] = [
    "dil", "name", "yetenek", "Kurum", "school", "title", "company", "raw_text", "Raw_Entry",
];

/// Single-letter terms that are real technology names.
const RESERVED_SINGLE_LETTER_TERMS: [&str; 2] = ["c", "r"];

static RE_ITEM_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,\n;•\t■▪●]+|\s{2,}").unwrap());

/// CEFR codes and level words (Turkish and English), matched as whole words.
static RE_PROFICIENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:a1|a2|b1|b2|c1|c2|başlangıç|başlangic|orta|ileri|çok iyi|iyi|native|fluent|beginner|basic|intermediate|advanced|ana dil|anadili|anadil|seviyesi|seviye|level)\b",
    )
    .unwrap()
});

/// Field-specific canonicalization rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermRule {
    pub strip_proficiency: bool,
}

impl TermRule {
    pub fn for_field(field: SectionField) -> Self {
        Self {
            strip_proficiency: field.carries_proficiency(),
        }
    }
}

/// Reduces a record to its most relevant text attribute, falling back to all
/// attribute values joined by a space.
pub fn record_text(fields: &[(String, FieldValue)]) -> String {
    for key in RECORD_TEXT_KEYS {
        let lower = key.to_lowercase();
        let hit = fields
            .iter()
            .find(|(k, _)| k == key)
            .or_else(|| fields.iter().find(|(k, _)| *k == lower));
        if let Some((_, value)) = hit {
            let text = value.leaves().join(" ");
            if !text.trim().is_empty() {
                return text;
            }
        }
    }

    fields
        .iter()
        .flat_map(|(_, v)| v.leaves())
        .collect::<Vec<_>>()
        .join(" ")
}

fn item_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Empty => String::new(),
        FieldValue::Scalar(s) => s.clone(),
        FieldValue::Record(fields) => record_text(fields),
        FieldValue::Sequence(_) => value.leaves().join(", "),
    }
}

/// Coerces a section value into raw items.
fn raw_items(value: &FieldValue) -> Vec<String> {
    match value {
        FieldValue::Empty => Vec::new(),
        FieldValue::Sequence(items) => items.iter().map(item_text).collect(),
        other => vec![item_text(other)],
    }
}

/// Normalizes one sub-item; `None` when nothing usable remains.
pub fn canonical_term(raw: &str, rule: TermRule) -> Option<String> {
    let folded: String = raw.nfkc().collect();
    let mut text = strip_punctuation(&tr_lower(&folded));

    if rule.strip_proficiency {
        text = collapse_whitespace(&RE_PROFICIENCY.replace_all(&text, " "));
    }

    let term = text
        .split_whitespace()
        .filter(|w| !is_stopword(w))
        .collect::<Vec<_>>()
        .join(" ");

    match term.chars().count() {
        0 => None,
        1 if !RESERVED_SINGLE_LETTER_TERMS.contains(&term.as_str()) => None,
        _ => Some(term),
    }
}

/// Splits a raw item on list separators, bullets and runs of whitespace.
pub fn split_items(text: &str) -> impl Iterator<Item = &str> {
    RE_ITEM_SEPARATORS.split(text)
}

/// Turns a raw section value into its canonical term set.
pub fn canonicalize(value: &FieldValue, rule: TermRule) -> TermSet {
    raw_items(value)
        .iter()
        .flat_map(|item| split_items(item))
        .filter_map(|sub| canonical_term(sub, rule))
        .collect()
}

pub fn canonicalize_field(field: SectionField, value: &FieldValue) -> TermSet {
    canonicalize(value, TermRule::for_field(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(items: &[&str]) -> TermSet {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn splits_on_separators_and_bullets() {
        let value = FieldValue::scalar("Python, SQL; Excel\n■ Power BI  Tableau");
        assert_eq!(
            canonicalize(&value, TermRule::default()),
            set(&["excel", "power bı", "python", "sql", "tableau"])
        );
    }

    #[test]
    fn keeps_reserved_single_letters_only() {
        let value = FieldValue::list(["C", "R", "X", "Go"]);
        assert_eq!(canonicalize(&value, TermRule::default()), set(&["c", "go", "r"]));
    }

    #[test]
    fn dedupes_after_normalization() {
        let value = FieldValue::list(["Excel", "excel", " EXCEL.", "[Excel]"]);
        assert_eq!(canonicalize(&value, TermRule::default()), set(&["excel"]));
    }

    #[test]
    fn strips_proficiency_words_for_languages() {
        let value = FieldValue::from(json!([
            {"dil": "İngilizce", "seviyesi": "İleri"},
            "Almanca (B2)",
            "Portekizce - Native"
        ]));
        let rule = TermRule::for_field(SectionField::ForeignLanguages);
        assert_eq!(
            canonicalize(&value, rule),
            set(&["almanca", "ingilizce", "portekizce"])
        );
    }

    #[test]
    fn proficiency_removal_keeps_whole_words_intact() {
        let rule = TermRule::for_field(SectionField::ForeignLanguages);
        assert_eq!(
            canonical_term("İngilizce ileri seviyesi", rule).as_deref(),
            Some("ingilizce")
        );
        assert_eq!(canonical_term("Ortak dil", rule).as_deref(), Some("ortak dil"));
        // substring removal would leave "türkçe i"
        assert_eq!(canonical_term("Türkçe (Anadili)", rule).as_deref(), Some("türkçe"));
        assert_eq!(canonical_term("Rusça - Orta", rule).as_deref(), Some("rusça"));
        assert_eq!(canonical_term("Portekizce", rule).as_deref(), Some("portekizce"));
        assert_eq!(canonical_term("B2", rule), None);
    }

    #[test]
    fn proficiency_words_survive_in_other_fields() {
        let value = FieldValue::list(["Advanced Excel"]);
        assert_eq!(
            canonicalize(&value, TermRule::default()),
            set(&["advanced excel"])
        );
    }

    #[test]
    fn records_use_priority_keys_then_all_values() {
        let by_key = FieldValue::record([("issuer", "Oracle"), ("name", "OCA Java")]);
        assert_eq!(canonicalize(&by_key, TermRule::default()), set(&["oca java"]));

        let fallback = FieldValue::record([("issuer", "Oracle"), ("year", "2021")]);
        assert_eq!(
            canonicalize(&fallback, TermRule::default()),
            set(&["oracle 2021"])
        );

        let raw_text = FieldValue::from(json!([{"raw_text": "AWS Solutions Architect"}]));
        assert_eq!(
            canonicalize(&raw_text, TermRule::default()),
            set(&["aws solutions architect"])
        );
    }

    #[test]
    fn drops_stopwords_inside_terms() {
        let value = FieldValue::list(["Excel bilgisi", "Git ve GitHub"]);
        assert_eq!(
            canonicalize(&value, TermRule::default()),
            set(&["excel", "git github"])
        );
    }

    #[test]
    fn empty_and_malformed_inputs() {
        assert!(canonicalize(&FieldValue::Empty, TermRule::default()).is_empty());
        assert!(canonicalize(&FieldValue::scalar("  ,; "), TermRule::default()).is_empty());
        assert_eq!(
            canonicalize(&FieldValue::from(json!(2024)), TermRule::default()),
            set(&["2024"])
        );
    }

    #[test]
    fn fullwidth_forms_fold_to_ascii() {
        assert_eq!(
            canonicalize(&FieldValue::scalar("ＡＷＳ"), TermRule::default()),
            set(&["aws"])
        );
    }
}
