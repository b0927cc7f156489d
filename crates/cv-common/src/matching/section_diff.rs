use std::collections::BTreeSet;

use serde::Serialize;

use crate::fields::{DiffRule, SectionField};
use crate::profile::FieldValue;
use crate::term_normalizer::{canonical_term, split_items, TermRule};

/// Record attributes checked for display text, in order.
const DISPLAY_KEYS: [&str; 4] = ["name", "dil", "Kurum", "Raw_Entry"];

/// Common and one-sided display items for one section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionDiff {
    pub common: Vec<String>,
    pub only_a: Vec<String>,
    pub only_b: Vec<String>,
}

impl SectionDiff {
    pub fn is_empty(&self) -> bool {
        self.common.is_empty() && self.only_a.is_empty() && self.only_b.is_empty()
    }
}

/// Display text of one section item.
pub fn display_text(item: &FieldValue) -> String {
    match item {
        FieldValue::Empty => String::new(),
        FieldValue::Scalar(s) => s.clone(),
        FieldValue::Sequence(_) => item.leaves().join(" "),
        FieldValue::Record(fields) => DISPLAY_KEYS
            .iter()
            .filter_map(|key| item.get(key))
            .map(|v| v.leaves().join(" "))
            .find(|text| !text.trim().is_empty())
            .or_else(|| fields.first().map(|(_, v)| v.leaves().join(" ")))
            .unwrap_or_default(),
    }
}

/// Raw display text of every non-blank item, in stored order.
pub fn display_items(value: &FieldValue) -> Vec<String> {
    let items: Vec<&FieldValue> = match value {
        FieldValue::Empty => Vec::new(),
        FieldValue::Sequence(items) => items.iter().collect(),
        other => vec![other],
    };
    items
        .into_iter()
        .map(display_text)
        .filter(|text| !text.trim().is_empty())
        .collect()
}

fn cleaned_items(field: SectionField, value: &FieldValue) -> Vec<String> {
    let rule = TermRule::for_field(field);
    display_items(value)
        .into_iter()
        .flat_map(|text| {
            split_items(&text)
                .filter_map(|sub| canonical_term(sub, rule))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Words sorted and re-joined before comparison, so word order is ignored.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let sort = |s: &str| {
        let mut words: Vec<&str> = s.split_whitespace().collect();
        words.sort_unstable();
        words.join(" ")
    };
    strsim::normalized_levenshtein(&sort(a), &sort(b)) * 100.0
}

/// Per-section common/only lists, each sorted.
///
/// Fuzzy sections pair every A item with the most similar unused B item;
/// exact sections use plain set algebra.
pub fn section_diff(field: SectionField, a: &FieldValue, b: &FieldValue) -> SectionDiff {
    let items_a = cleaned_items(field, a);
    let items_b = cleaned_items(field, b);

    match field.diff_rule() {
        DiffRule::Fuzzy { threshold } => fuzzy_diff(&items_a, &items_b, threshold),
        DiffRule::Exact => exact_diff(items_a, items_b),
    }
}

fn fuzzy_diff(items_a: &[String], items_b: &[String], threshold: f64) -> SectionDiff {
    let mut common = BTreeSet::new();
    let mut used_b = vec![false; items_b.len()];

    for item_a in items_a {
        let mut best: Option<(usize, f64)> = None;
        for (idx, item_b) in items_b.iter().enumerate() {
            if used_b[idx] {
                continue;
            }
            let score = token_sort_ratio(item_a, item_b);
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((idx, score));
            }
        }

        if let Some((idx, score)) = best {
            if score >= threshold {
                common.insert(item_a.clone());
                used_b[idx] = true;
            }
        }
    }

    let mut only_a: Vec<String> = items_a
        .iter()
        .filter(|item| !common.contains(*item))
        .cloned()
        .collect();
    let mut only_b: Vec<String> = items_b
        .iter()
        .zip(&used_b)
        .filter(|(_, used)| !**used)
        .map(|(item, _)| item.clone())
        .collect();
    only_a.sort();
    only_b.sort();

    SectionDiff {
        common: common.into_iter().collect(),
        only_a,
        only_b,
    }
}

fn exact_diff(items_a: Vec<String>, items_b: Vec<String>) -> SectionDiff {
    let set_a: BTreeSet<String> = items_a.into_iter().collect();
    let set_b: BTreeSet<String> = items_b.into_iter().collect();

    SectionDiff {
        common: set_a.intersection(&set_b).cloned().collect(),
        only_a: set_a.difference(&set_b).cloned().collect(),
        only_b: set_b.difference(&set_a).cloned().collect(),
    }
}
