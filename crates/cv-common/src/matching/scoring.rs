use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use super::tiered::{TermMatch, TieredMatcher, DEFAULT_SEMANTIC_THRESHOLD};
use super::weights::WeightTable;
use crate::embedding::{cosine_similarity, SemanticBackend};
use crate::fields::{FieldKind, SectionField};
use crate::normalize::clean_stopwords;
use crate::profile::{FieldValue, Profile};
use crate::term_normalizer::{canonicalize_field, TermSet};

#[derive(Debug, Clone)]
pub struct ComparisonConfig {
    pub semantic_threshold: f32,
    pub weights: WeightTable,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            weights: WeightTable::default(),
        }
    }
}

impl ComparisonConfig {
    /// `CV_SEMANTIC_THRESHOLD` over the defaults.
    pub fn from_env() -> Self {
        Self {
            semantic_threshold: env_semantic_threshold(),
            ..Self::default()
        }
    }
}

fn env_semantic_threshold() -> f32 {
    std::env::var("CV_SEMANTIC_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|t: &f32| t.is_finite())
        .unwrap_or(DEFAULT_SEMANTIC_THRESHOLD)
}

/// Canonical sets of one list field plus the matcher outcome over them.
#[derive(Debug, Clone, Default)]
pub struct FieldTerms {
    pub terms_a: TermSet,
    pub terms_b: TermSet,
    pub outcome: TermMatch,
}

impl FieldTerms {
    pub fn only_a(&self) -> Vec<&String> {
        self.outcome.only_a(&self.terms_a).collect()
    }

    pub fn only_b(&self) -> Vec<&String> {
        self.outcome.only_b(&self.terms_b).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairScore {
    pub total: f64,
    pub per_field: BTreeMap<SectionField, f64>,
}

/// プロファイル間の類似度計算エンジン
///
/// Holds the injected semantic backend and the weight table; both are
/// read-only after construction, so one engine serves many comparisons.
#[derive(Debug, Clone)]
pub struct ComparisonEngine {
    matcher: TieredMatcher,
    weights: WeightTable,
}

impl ComparisonEngine {
    pub fn new(config: ComparisonConfig, backend: SemanticBackend) -> Self {
        Self {
            matcher: TieredMatcher::new(backend, config.semantic_threshold),
            weights: config.weights,
        }
    }

    pub fn backend(&self) -> &SemanticBackend {
        self.matcher.backend()
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    pub fn matcher(&self) -> &TieredMatcher {
        &self.matcher
    }

    /// 総合スコア計算（全フィールド → 重み付き合計）
    pub fn score_pair(&self, a: &Profile, b: &Profile) -> PairScore {
        let per_field: BTreeMap<SectionField, f64> = SectionField::all()
            .map(|field| (field, self.score_field(field, a.field(field), b.field(field))))
            .collect();
        let total = self.weights.weighted_total(&per_field);

        PairScore { total, per_field }
    }

    pub fn score_field(&self, field: SectionField, a: &FieldValue, b: &FieldValue) -> f64 {
        match field.kind() {
            FieldKind::List => self.score_list_field(field, a, b),
            FieldKind::Narrative => self.score_narrative(field, a, b),
        }
    }

    pub fn term_match(&self, field: SectionField, a: &FieldValue, b: &FieldValue) -> FieldTerms {
        let terms_a = canonicalize_field(field, a);
        let terms_b = canonicalize_field(field, b);
        let outcome = self.matcher.match_terms(&terms_a, &terms_b);
        FieldTerms {
            terms_a,
            terms_b,
            outcome,
        }
    }

    /// |commons| / collapsed union.
    pub fn score_list_field(&self, field: SectionField, a: &FieldValue, b: &FieldValue) -> f64 {
        let terms = self.term_match(field, a, b);
        let score = terms.outcome.overlap_ratio();
        debug!(
            field = %field,
            a = terms.terms_a.len(),
            b = terms.terms_b.len(),
            common = terms.outcome.commons.len(),
            score,
            "list field scored"
        );
        score
    }

    /// Cubed cosine similarity of the cleaned texts; 0.0 when either side is
    /// empty or the backend is unavailable.
    pub fn score_narrative(&self, field: SectionField, a: &FieldValue, b: &FieldValue) -> f64 {
        let text_a = clean_stopwords(&a.flatten_text());
        let text_b = clean_stopwords(&b.flatten_text());
        if text_a.is_empty() || text_b.is_empty() {
            return 0.0;
        }

        let backend = self.matcher.backend();
        if !backend.is_available() {
            return 0.0;
        }

        match backend.embed_batch(&[text_a.as_str(), text_b.as_str()]) {
            Ok(vectors) => {
                let similarity = cosine_similarity(&vectors[0], &vectors[1]);
                let score = shape_narrative_similarity(f64::from(similarity));
                debug!(field = %field, similarity, score, "narrative field scored");
                score
            }
            Err(err) => {
                warn!(field = %field, error = %err, "narrative embedding failed; scoring 0");
                0.0
            }
        }
    }
}

/// max(s, 0)³: rewards near-identical blocks, suppresses generic overlap.
pub fn shape_narrative_similarity(similarity: f64) -> f64 {
    similarity.clamp(0.0, 1.0).powi(3)
}
