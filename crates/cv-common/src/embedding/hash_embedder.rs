use std::hash::{Hash, Hasher};

use siphasher::sip::SipHasher13;

use super::{EmbeddingError, TextEmbedder};

/// 固定 seed（決定論的 hash のため）
/// ⚠️ この値を変更すると全 embedding が変わる → version() を上げること
const HASH_SEED_K0: u64 = 0x0123_4567_89ab_cdef;
const HASH_SEED_K1: u64 = 0xfedc_ba98_7654_3210;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Feature Hashing を用いた決定論的な文埋め込み
///
/// - 学習・ダウンロード不要
/// - 単語トークン + 文字 trigram（表記揺れに多少強い）
/// - SipHash13 + 固定 seed で Rust バージョン間の安定性を保証
///
/// Similarity here is lexical, not semantic: it is the offline fallback.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn hash_token(&self, token: &str) -> usize {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        token.hash(&mut hasher);
        (hasher.finish() as usize) % self.dimension
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let idx = self.hash_token(feature);
        // Sign hashing: 偶数ハッシュ → +weight, 奇数ハッシュ → -weight
        let sign = if self.hash_token(&format!("{feature}_sign")) % 2 == 0 {
            1.0
        } else {
            -1.0
        };
        vector[idx] += sign * weight;
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for word in text.split_whitespace() {
            let word = word.to_lowercase();
            self.add_feature(&mut vector, &format!("w:{word}"), WORD_WEIGHT);

            let padded: Vec<char> = format!("#{word}#").chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.add_feature(&mut vector, &format!("t:{trigram}"), TRIGRAM_WEIGHT);
            }
        }

        // L2正規化
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl TextEmbedder for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn version(&self) -> &str {
        // トークン設計やハッシュ関数が変わったらバージョンを上げる
        "v1"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn produces_normalized_vectors() {
        let embedder = HashEmbedder::new(384);
        let emb = embedder.embed("backend developer rust").unwrap();

        assert_eq!(emb.len(), 384);
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "L2 norm should be 1.0, got {norm}");
    }

    #[test]
    fn is_deterministic() {
        let embedder = HashEmbedder::new(128);
        let first = embedder.embed("veri analizi").unwrap();
        let second = embedder.embed("veri analizi").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn overlapping_texts_are_more_similar() {
        let embedder = HashEmbedder::new(384);
        let vectors = embedder
            .embed_batch(&[
                "python data analysis pandas",
                "python data analysis numpy",
                "forklift warehouse logistics",
            ])
            .unwrap();

        let similar = cosine_similarity(&vectors[0], &vectors[1]);
        let different = cosine_similarity(&vectors[0], &vectors[2]);
        assert!(
            similar > different,
            "overlapping text should score higher: {similar} vs {different}"
        );
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(16);
        assert!(embedder.embed("").unwrap().iter().all(|v| *v == 0.0));
    }
}
