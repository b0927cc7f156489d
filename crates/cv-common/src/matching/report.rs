use std::collections::BTreeMap;

use serde::Serialize;

use super::scoring::ComparisonEngine;
use crate::fields::{SectionField, COMMON_TERMS_ORDER};
use crate::normalize::title_case;
use crate::profile::Profile;

const MAX_COMMON_TERMS: usize = 10;
const MAX_ONLY_TERMS: usize = 5;

/// Overall compatibility band for a total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    High,
    Moderate,
    Low,
}

impl Verdict {
    pub fn from_total(total: f64) -> Self {
        if total > 0.75 {
            Verdict::High
        } else if total > 0.5 {
            Verdict::Moderate
        } else {
            Verdict::Low
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Verdict::High => "Candidates are highly compatible.",
            Verdict::Moderate => "Candidates are moderately compatible.",
            Verdict::Low => "Candidates have low compatibility.",
        }
    }
}

/// Human-readable rationale for one comparison.
///
/// Recomputes the matcher outcome per list field; `total` and `per_field`
/// come from a prior `score_pair` and are only formatted here.
///
/// The experience line is emitted only when the semantic backend is
/// available: without embeddings the experience score is always 0 and
/// carries no information.
pub fn generate_report(
    engine: &ComparisonEngine,
    a: &Profile,
    b: &Profile,
    total: f64,
    per_field: &BTreeMap<SectionField, f64>,
) -> Vec<String> {
    let mut report = vec![
        format!("--- Comparison Report (Overall Score: {:.1}%) ---", total * 100.0),
        format!("-> Verdict: {}", Verdict::from_total(total).describe()),
    ];

    if engine.backend().is_available() {
        let experience = per_field
            .get(&SectionField::Experience)
            .copied()
            .unwrap_or(0.0);
        report.push(format!("-> EXPERIENCE MATCH: {:.1}%", experience * 100.0));
    }

    let mut only_lines = Vec::new();
    let fields = COMMON_TERMS_ORDER
        .iter()
        .copied()
        .chain(std::iter::once(SectionField::References));

    for field in fields {
        let terms = engine.term_match(field, a.field(field), b.field(field));

        if let Some(title) = field.common_terms_title() {
            if !terms.outcome.commons.is_empty() {
                let listed = truncated(terms.outcome.commons.iter(), MAX_COMMON_TERMS);
                report.push(format!("-> {title}: {listed}"));
            }
        }

        let only_a = terms.only_a();
        if !only_a.is_empty() {
            only_lines.push(format!(
                "-> ONLY IN A ({}): {}",
                field.label(),
                truncated(only_a.into_iter(), MAX_ONLY_TERMS)
            ));
        }
        let only_b = terms.only_b();
        if !only_b.is_empty() {
            only_lines.push(format!(
                "-> ONLY IN B ({}): {}",
                field.label(),
                truncated(only_b.into_iter(), MAX_ONLY_TERMS)
            ));
        }
    }

    report.extend(only_lines);
    report
}

fn truncated<'a>(terms: impl Iterator<Item = &'a String>, limit: usize) -> String {
    let terms: Vec<&String> = terms.collect();
    let mut listed = terms
        .iter()
        .take(limit)
        .map(|t| title_case(t))
        .collect::<Vec<_>>()
        .join(", ");
    if terms.len() > limit {
        listed.push_str("...");
    }
    listed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{FixedEmbedder, SemanticBackend};
    use crate::matching::scoring::ComparisonConfig;
    use serde_json::json;

    fn lexical_engine() -> ComparisonEngine {
        ComparisonEngine::new(
            ComparisonConfig::default(),
            SemanticBackend::unavailable("test"),
        )
    }

    fn profile(value: serde_json::Value) -> Profile {
        Profile::from_json(value).unwrap()
    }

    #[test]
    fn verdict_bands_use_strict_thresholds() {
        assert_eq!(Verdict::from_total(0.9), Verdict::High);
        assert_eq!(Verdict::from_total(0.75), Verdict::Moderate);
        assert_eq!(Verdict::from_total(0.51), Verdict::Moderate);
        assert_eq!(Verdict::from_total(0.5), Verdict::Low);
        assert_eq!(Verdict::from_total(0.0), Verdict::Low);
    }

    #[test]
    fn report_lists_commons_and_one_sided_terms() {
        let engine = lexical_engine();
        let a = profile(json!({"YETENEKLER": ["Python", "Excel", "Node.js"]}));
        let b = profile(json!({"SKILLS": ["python programming", "Figma"]}));
        let score = engine.score_pair(&a, &b);

        let report = generate_report(&engine, &a, &b, score.total, &score.per_field);
        assert!(report[0].starts_with("--- Comparison Report (Overall Score: "));
        assert_eq!(report[1], "-> Verdict: Candidates have low compatibility.");
        assert!(report.contains(&"-> COMMON SKILLS: Python".to_string()));
        assert!(report.contains(&"-> ONLY IN A (Skills): Excel, Node Js".to_string()));
        assert!(report.contains(&"-> ONLY IN B (Skills): Figma".to_string()));
    }

    #[test]
    fn experience_line_needs_a_backend() {
        let a = profile(json!({"DENEYİM": "Rust backend"}));
        let per_field = BTreeMap::from([(SectionField::Experience, 0.42)]);

        let lexical = generate_report(&lexical_engine(), &a, &a, 0.2, &per_field);
        assert!(!lexical.iter().any(|l| l.contains("EXPERIENCE MATCH")));

        let semantic = ComparisonEngine::new(
            ComparisonConfig::default(),
            SemanticBackend::available(FixedEmbedder::new(2)),
        );
        let report = generate_report(&semantic, &a, &a, 0.2, &per_field);
        assert_eq!(report[2], "-> EXPERIENCE MATCH: 42.0%");
    }

    #[test]
    fn long_lists_are_truncated() {
        let engine = lexical_engine();
        let many: Vec<String> = (0..12).map(|i| format!("tool{i:02}")).collect();
        let a = profile(json!({ "SKILLS": many }));

        let report = generate_report(&engine, &a, &a, 1.0, &BTreeMap::new());
        let common = report
            .iter()
            .find(|l| l.starts_with("-> COMMON SKILLS"))
            .unwrap();
        assert!(common.ends_with("Tool09..."));
        assert_eq!(common.matches(", ").count(), 9);
        assert_eq!(report[1], "-> Verdict: Candidates are highly compatible.");
    }

    #[test]
    fn empty_profiles_only_get_header_and_verdict() {
        let engine = lexical_engine();
        let empty = Profile::new();
        let report = generate_report(&engine, &empty, &empty, 0.0, &BTreeMap::new());
        assert_eq!(report.len(), 2);
        assert_eq!(report[0], "--- Comparison Report (Overall Score: 0.0%) ---");
    }
}
