use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::embedding::{best_match, SemanticBackend};
use crate::term_normalizer::TermSet;

pub const DEFAULT_SEMANTIC_THRESHOLD: f32 = 0.80;

/// Which tier matched an A-side term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Containment,
    Semantic,
}

/// Full result of matching A against B.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TermMatch {
    /// A-side terms with a counterpart in B.
    pub commons: TermSet,
    /// B-side terms used as a counterpart by any tier.
    pub consumed_b: TermSet,
    /// A term → (tier, B counterpart).
    pub pairs: BTreeMap<String, (MatchTier, String)>,
    /// |A| + |B| with matched pairs collapsed onto their A representative.
    pub collapsed_union: usize,
}

impl TermMatch {
    /// |commons| / collapsed union; 0.0 when both sides are empty.
    pub fn overlap_ratio(&self) -> f64 {
        if self.collapsed_union == 0 {
            0.0
        } else {
            self.commons.len() as f64 / self.collapsed_union as f64
        }
    }

    pub fn only_a<'a>(&'a self, set_a: &'a TermSet) -> impl Iterator<Item = &'a String> + 'a {
        set_a.difference(&self.commons)
    }

    pub fn only_b<'a>(&'a self, set_b: &'a TermSet) -> impl Iterator<Item = &'a String> + 'a {
        set_b.difference(&self.consumed_b)
    }

    pub fn tier_of(&self, term: &str) -> Option<MatchTier> {
        self.pairs.get(term).map(|(tier, _)| *tier)
    }
}

/// 3段階（完全一致 → 包含 → 意味的類似）のタームマッチャ
///
/// Greedy, not assignment-optimal. Every tier scans terms in lexicographic
/// order, so the result is reproducible but not symmetric under A/B swap.
#[derive(Debug, Clone)]
pub struct TieredMatcher {
    backend: SemanticBackend,
    semantic_threshold: f32,
}

impl TieredMatcher {
    pub fn new(backend: SemanticBackend, semantic_threshold: f32) -> Self {
        Self {
            backend,
            semantic_threshold,
        }
    }

    pub fn backend(&self) -> &SemanticBackend {
        &self.backend
    }

    pub fn semantic_threshold(&self) -> f32 {
        self.semantic_threshold
    }

    /// Common subset of A (A-side representatives).
    pub fn find_common(&self, set_a: &TermSet, set_b: &TermSet) -> TermSet {
        self.match_terms(set_a, set_b).commons
    }

    pub fn match_terms(&self, set_a: &TermSet, set_b: &TermSet) -> TermMatch {
        let mut result = TermMatch::default();

        if !set_a.is_empty() && !set_b.is_empty() {
            // 1. 完全一致
            for term in set_a.intersection(set_b) {
                result.record(term, MatchTier::Exact, term);
            }

            let mut remaining_b: BTreeSet<&String> =
                set_b.iter().filter(|t| !result.consumed_b.contains(*t)).collect();

            // 2. 包含（最初に見つかった B タームを採用し、以後は候補から外す）
            let unmatched_a: Vec<&String> =
                set_a.iter().filter(|t| !result.commons.contains(*t)).collect();
            let mut remaining_a = Vec::new();
            for term_a in unmatched_a {
                let hit = remaining_b
                    .iter()
                    .find(|term_b| term_b.contains(term_a.as_str()) || term_a.contains(term_b.as_str()))
                    .copied();
                match hit {
                    Some(term_b) => {
                        remaining_b.remove(term_b);
                        result.record(term_a, MatchTier::Containment, term_b);
                    }
                    None => remaining_a.push(term_a),
                }
            }

            // 3. 意味的類似（B 側の排他制御なし）
            if !remaining_a.is_empty() && !remaining_b.is_empty() {
                let candidates: Vec<&String> = remaining_b.into_iter().collect();
                self.semantic_tier(&remaining_a, &candidates, &mut result);
            }
        }

        result.collapsed_union = set_a.len() + set_b.len() - result.consumed_b.len();
        result
    }

    fn semantic_tier(&self, terms_a: &[&String], terms_b: &[&String], result: &mut TermMatch) {
        if !self.backend.is_available() {
            return;
        }

        let texts_a: Vec<&str> = terms_a.iter().map(|t| t.as_str()).collect();
        let texts_b: Vec<&str> = terms_b.iter().map(|t| t.as_str()).collect();

        let embedded = self
            .backend
            .embed_batch(&texts_a)
            .and_then(|a| self.backend.embed_batch(&texts_b).map(|b| (a, b)));
        let (vectors_a, vectors_b) = match embedded {
            Ok(vectors) => vectors,
            Err(err) => {
                warn!(error = %err, "semantic tier skipped");
                return;
            }
        };

        for (term_a, vector_a) in terms_a.iter().zip(&vectors_a) {
            let Some((idx, score)) = best_match(vector_a, &vectors_b) else {
                continue;
            };
            if score > self.semantic_threshold {
                debug!(term_a = %term_a, term_b = %terms_b[idx], score, "semantic match");
                result.record(term_a, MatchTier::Semantic, terms_b[idx]);
            }
        }
    }
}

impl TermMatch {
    fn record(&mut self, term_a: &str, tier: MatchTier, term_b: &str) {
        self.commons.insert(term_a.to_string());
        self.consumed_b.insert(term_b.to_string());
        self.pairs
            .insert(term_a.to_string(), (tier, term_b.to_string()));
    }
}
