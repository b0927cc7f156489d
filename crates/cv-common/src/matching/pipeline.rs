use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use super::report::generate_report;
use super::scoring::ComparisonEngine;
use super::section_diff::{display_items, section_diff, SectionDiff};
use super::weights::round3;
use crate::fields::{SectionField, DIFF_SECTIONS};
use crate::profile::Profile;

/// Row order of the section table: heaviest fields first, summary last.
pub const SECTION_TABLE_ORDER: [SectionField; 11] = [
    SectionField::Experience,
    SectionField::Skills,
    SectionField::TechnicalSkills,
    SectionField::Education,
    SectionField::ForeignLanguages,
    SectionField::Certifications,
    SectionField::Courses,
    SectionField::PersonalSkills,
    SectionField::References,
    SectionField::Projects,
    SectionField::Summary,
];

#[derive(Debug, Clone)]
pub struct NamedProfile {
    pub name: String,
    pub profile: Profile,
}

impl NamedProfile {
    pub fn new(name: impl Into<String>, profile: Profile) -> Self {
        Self {
            name: name.into(),
            profile,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PairComparison {
    pub label: String,
    pub name_a: String,
    pub name_b: String,
    pub total: f64,
    pub per_field: BTreeMap<SectionField, f64>,
    pub report: Vec<String>,
    pub diffs: BTreeMap<SectionField, SectionDiff>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionAverage {
    pub field: SectionField,
    pub label: &'static str,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemCounts {
    pub name: String,
    pub counts: BTreeMap<SectionField, usize>,
}

/// Unfiltered listings shown after the pairwise results.
pub const LISTINGS: [(&str, &[SectionField]); 2] = [
    (
        "All courses / certifications",
        &[SectionField::Certifications, SectionField::Courses],
    ),
    ("All references", &[SectionField::References]),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingEntry {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub title: &'static str,
    pub entries: Vec<ListingEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchComparison {
    pub pairs: Vec<PairComparison>,
    pub section_averages: Vec<SectionAverage>,
    pub average_total: f64,
    pub item_counts: Vec<ItemCounts>,
    pub listings: Vec<Listing>,
}

/// 全ペア比較（i < j）を並列実行し、セクション平均と件数を集計する
pub fn compare_all(engine: &ComparisonEngine, profiles: &[NamedProfile]) -> BatchComparison {
    let indices: Vec<(usize, usize)> = (0..profiles.len())
        .flat_map(|i| (i + 1..profiles.len()).map(move |j| (i, j)))
        .collect();

    let pairs: Vec<PairComparison> = indices
        .par_iter()
        .map(|&(i, j)| compare_pair(engine, &profiles[i], &profiles[j]))
        .collect();

    let section_averages = section_averages(&pairs);
    let average_total = if pairs.is_empty() {
        0.0
    } else {
        round3(pairs.iter().map(|p| p.total).sum::<f64>() / pairs.len() as f64)
    };
    let item_counts = profiles.iter().map(item_counts).collect();
    let listings = listings(profiles);

    info!(
        profiles = profiles.len(),
        pairs = pairs.len(),
        average_total,
        backend = %engine.backend().describe(),
        "batch comparison finished"
    );

    BatchComparison {
        pairs,
        section_averages,
        average_total,
        item_counts,
        listings,
    }
}

pub fn compare_pair(
    engine: &ComparisonEngine,
    a: &NamedProfile,
    b: &NamedProfile,
) -> PairComparison {
    let score = engine.score_pair(&a.profile, &b.profile);
    let report = generate_report(engine, &a.profile, &b.profile, score.total, &score.per_field);
    let diffs = DIFF_SECTIONS
        .iter()
        .map(|&field| {
            let diff = section_diff(field, a.profile.field(field), b.profile.field(field));
            (field, diff)
        })
        .collect();

    PairComparison {
        label: format!("{} vs {}", a.name, b.name),
        name_a: a.name.clone(),
        name_b: b.name.clone(),
        total: score.total,
        per_field: score.per_field,
        report,
        diffs,
    }
}

/// Mean of each field's score over all pairs; empty when there are none.
pub fn section_averages(pairs: &[PairComparison]) -> Vec<SectionAverage> {
    if pairs.is_empty() {
        return Vec::new();
    }
    SECTION_TABLE_ORDER
        .iter()
        .map(|&field| {
            let sum: f64 = pairs
                .iter()
                .map(|p| p.per_field.get(&field).copied().unwrap_or(0.0))
                .sum();
            SectionAverage {
                field,
                label: field.label(),
                average: sum / pairs.len() as f64,
            }
        })
        .collect()
}

/// Every profile's raw items for the listing sections, profile by profile.
pub fn listings(profiles: &[NamedProfile]) -> Vec<Listing> {
    LISTINGS
        .iter()
        .map(|&(title, fields)| Listing {
            title,
            entries: profiles
                .iter()
                .flat_map(|named| {
                    fields
                        .iter()
                        .flat_map(move |&field| display_items(named.profile.field(field)))
                        .map(move |text| ListingEntry {
                            name: named.name.clone(),
                            text,
                        })
                })
                .collect(),
        })
        .collect()
}

fn item_counts(named: &NamedProfile) -> ItemCounts {
    ItemCounts {
        name: named.name.clone(),
        counts: SECTION_TABLE_ORDER
            .iter()
            .map(|&field| (field, named.profile.field(field).item_count()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::SemanticBackend;
    use crate::matching::scoring::ComparisonConfig;
    use serde_json::json;

    fn engine() -> ComparisonEngine {
        ComparisonEngine::new(
            ComparisonConfig::default(),
            SemanticBackend::unavailable("test"),
        )
    }

    fn named(name: &str, value: serde_json::Value) -> NamedProfile {
        NamedProfile::new(name, Profile::from_json(value).unwrap())
    }

    #[test]
    fn compares_every_unordered_pair_once() {
        let profiles = vec![
            named("ayse", json!({"YETENEKLER": ["Python", "Excel"]})),
            named("mehmet", json!({"SKILLS": ["python programming", "microsoft excel"]})),
            named("zeynep", json!({"SKILLS": ["Figma"]})),
        ];

        let batch = compare_all(&engine(), &profiles);
        let labels: Vec<_> = batch.pairs.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["ayse vs mehmet", "ayse vs zeynep", "mehmet vs zeynep"]);
        assert_eq!(batch.pairs[0].total, 0.25);
        assert_eq!(batch.pairs[1].total, 0.0);
        assert_eq!(batch.average_total, round3(0.25 / 3.0));
    }

    #[test]
    fn section_averages_follow_table_order() {
        let profiles = vec![
            named("a", json!({"SKILLS": ["Rust"], "ÖZET": "Backend"})),
            named("b", json!({"SKILLS": ["Rust"]})),
        ];

        let batch = compare_all(&engine(), &profiles);
        let fields: Vec<_> = batch.section_averages.iter().map(|s| s.field).collect();
        assert_eq!(fields, SECTION_TABLE_ORDER.to_vec());
        assert_eq!(fields.last(), Some(&SectionField::Summary));
        assert_eq!(batch.section_averages[1].average, 1.0);
        assert_eq!(batch.section_averages[1].label, "Skills");
    }

    #[test]
    fn fewer_than_two_profiles_yield_no_pairs() {
        let batch = compare_all(&engine(), &[named("solo", json!({"SKILLS": ["Rust"]}))]);
        assert!(batch.pairs.is_empty());
        assert!(batch.section_averages.is_empty());
        assert_eq!(batch.average_total, 0.0);
        assert_eq!(batch.item_counts.len(), 1);
    }

    #[test]
    fn item_counts_follow_value_shape() {
        let profiles = vec![named(
            "a",
            json!({
                "YETENEKLER": ["Rust", "Go"],
                "ÖZET": "Backend",
                "YABANCI_DİL": {"dil": "İngilizce", "seviye": "B2"}
            }),
        )];

        let batch = compare_all(&engine(), &profiles);
        let counts = &batch.item_counts[0].counts;
        assert_eq!(counts[&SectionField::Skills], 2);
        assert_eq!(counts[&SectionField::Summary], 7);
        assert_eq!(counts[&SectionField::ForeignLanguages], 2);
        assert_eq!(counts[&SectionField::Experience], 0);
    }

    #[test]
    fn listings_collect_raw_items_per_profile() {
        let profiles = vec![
            named(
                "a",
                json!({
                    "SERTİFİKALAR": [{"name": "AWS Solutions Architect"}],
                    "KURSLAR": ["Rust Bootcamp"],
                    "REFERANSLAR": ["Ayşe Yılmaz - Acme"]
                }),
            ),
            named("b", json!({"COURSES": ["Rust Bootcamp"]})),
        ];

        let batch = compare_all(&engine(), &profiles);
        assert_eq!(batch.listings.len(), 2);

        let courses = &batch.listings[0];
        assert_eq!(courses.title, "All courses / certifications");
        let entries: Vec<_> = courses
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.text.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("a", "AWS Solutions Architect"),
                ("a", "Rust Bootcamp"),
                ("b", "Rust Bootcamp")
            ]
        );

        let references = &batch.listings[1];
        assert_eq!(references.entries.len(), 1);
        assert_eq!(references.entries[0].text, "Ayşe Yılmaz - Acme");
    }

    #[test]
    fn pairs_carry_reports_and_diffs() {
        let profiles = vec![
            named("a", json!({"SKILLS": ["Rust", "Docker"]})),
            named("b", json!({"SKILLS": ["rust", "Kubernetes"]})),
        ];

        let batch = compare_all(&engine(), &profiles);
        let pair = &batch.pairs[0];
        assert!(pair.report[0].starts_with("--- Comparison Report"));
        assert_eq!(pair.diffs.len(), DIFF_SECTIONS.len());
        assert_eq!(pair.diffs[&SectionField::Skills].common, vec!["rust"]);

        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["pairs"][0]["per_field"]["skills"], 1.0 / 3.0);
    }
}
