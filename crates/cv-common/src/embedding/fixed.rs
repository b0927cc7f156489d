use std::collections::HashMap;

use super::{EmbeddingError, TextEmbedder};

/// Lookup-table embedder: known texts map to fixed vectors, anything else to
/// the zero vector. Used by tests and offline fixtures.
#[derive(Debug, Clone, Default)]
pub struct FixedEmbedder {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl FixedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
        }
    }

    /// Registers a vector; it is padded or truncated to the embedder dimension.
    pub fn with(mut self, text: impl Into<String>, vector: &[f32]) -> Self {
        let mut v = vector.to_vec();
        v.resize(self.dimension, 0.0);
        self.vectors.insert(text.into(), v);
        self
    }
}

impl TextEmbedder for FixedEmbedder {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn version(&self) -> &str {
        "v1"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|t| {
                self.vectors
                    .get(*t)
                    .cloned()
                    .unwrap_or_else(|| vec![0.0; self.dimension])
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_texts_get_their_vectors() {
        let embedder = FixedEmbedder::new(3).with("ai", &[1.0, 0.0]);
        let vectors = embedder.embed_batch(&["ai", "unknown"]).unwrap();
        assert_eq!(vectors[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(vectors[1], vec![0.0, 0.0, 0.0]);
    }
}
