#[cfg(feature = "candle")]
pub mod candle_embedder;
pub mod config;
pub mod fixed;
pub mod hash_embedder;
pub mod similarity;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

#[cfg(feature = "candle")]
pub use candle_embedder::CandleEmbedder;
pub use config::{BackendKind, EmbeddingConfig};
pub use fixed::FixedEmbedder;
pub use hash_embedder::HashEmbedder;
pub use similarity::{best_match, cosine_similarity};

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("semantic backend unavailable: {0}")]
    Unavailable(String),
    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),
    #[error("embedding inference failed: {0}")]
    Inference(String),
    #[error("embedding backend returned {got} vectors for {expected} inputs")]
    BatchSize { expected: usize, got: usize },
}

/// 文埋め込みモデルの抽象インターフェース
///
/// 実装:
/// - HashEmbedder: Feature Hashing（決定論的、ダウンロード不要）
/// - CandleEmbedder: Candle による Sentence Transformer 推論（`candle` feature）
/// - FixedEmbedder: 固定ベクトル表（テスト用）
///
/// Implementations must be safe to call from several comparison workers at
/// once; backends whose inference is not re-entrant serialize internally.
pub trait TextEmbedder: Send + Sync {
    /// 実装名（"hash", "candle", "fixed"）
    fn name(&self) -> &'static str;

    /// バージョン情報（モデルの世代管理用）
    fn version(&self) -> &str;

    /// 埋め込み次元数
    fn dimension(&self) -> usize;

    /// One vector per input text, in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or(EmbeddingError::BatchSize {
                expected: 1,
                got: 0,
            })
    }
}

/// Embedding capability injected into the comparison engine.
///
/// Callers match on the variant; an unavailable backend makes every
/// embedding-dependent score contribute zero.
#[derive(Clone)]
pub enum SemanticBackend {
    Available(Arc<dyn TextEmbedder>),
    Unavailable { reason: String },
}

impl SemanticBackend {
    pub fn available(embedder: impl TextEmbedder + 'static) -> Self {
        SemanticBackend::Available(Arc::new(embedder))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        SemanticBackend::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SemanticBackend::Available(_))
    }

    /// Batch embedding with the output length checked against the input.
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        match self {
            SemanticBackend::Available(embedder) => {
                let vectors = embedder.embed_batch(texts)?;
                if vectors.len() != texts.len() {
                    return Err(EmbeddingError::BatchSize {
                        expected: texts.len(),
                        got: vectors.len(),
                    });
                }
                Ok(vectors)
            }
            SemanticBackend::Unavailable { reason } => {
                Err(EmbeddingError::Unavailable(reason.clone()))
            }
        }
    }

    /// "name/version" or "unavailable (reason)".
    pub fn describe(&self) -> String {
        match self {
            SemanticBackend::Available(embedder) => {
                format!("{}/{}", embedder.name(), embedder.version())
            }
            SemanticBackend::Unavailable { reason } => format!("unavailable ({reason})"),
        }
    }
}

impl fmt::Debug for SemanticBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticBackend::Available(embedder) => f
                .debug_struct("Available")
                .field("name", &embedder.name())
                .field("version", &embedder.version())
                .field("dimension", &embedder.dimension())
                .finish(),
            SemanticBackend::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// バックエンドのファクトリ（プロセス起動時に一度だけ呼ぶ）
///
/// A model that fails to load yields `Unavailable` instead of an error.
pub fn create_backend(config: &EmbeddingConfig) -> SemanticBackend {
    let backend = match config.backend {
        BackendKind::Hash => SemanticBackend::available(HashEmbedder::new(config.dimension)),
        BackendKind::None => SemanticBackend::unavailable("semantic matching disabled"),
        BackendKind::Candle => load_candle(config),
    };

    match &backend {
        SemanticBackend::Available(_) => info!(backend = %backend.describe(), "semantic backend ready"),
        SemanticBackend::Unavailable { reason } => {
            warn!(%reason, "semantic backend unavailable; embedding scores will be zero")
        }
    }
    backend
}

#[cfg(feature = "candle")]
fn load_candle(config: &EmbeddingConfig) -> SemanticBackend {
    match CandleEmbedder::with_model(&config.model) {
        Ok(embedder) => SemanticBackend::available(embedder),
        Err(err) => SemanticBackend::unavailable(err.to_string()),
    }
}

#[cfg(not(feature = "candle"))]
fn load_candle(config: &EmbeddingConfig) -> SemanticBackend {
    SemanticBackend::unavailable(format!(
        "model {} requested but cv-common was built without the `candle` feature",
        config.model
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_backend_reports_reason() {
        let backend = SemanticBackend::unavailable("no model");
        assert!(!backend.is_available());
        let err = backend.embed_batch(&["python"]).unwrap_err();
        assert!(matches!(err, EmbeddingError::Unavailable(reason) if reason == "no model"));
        assert_eq!(backend.describe(), "unavailable (no model)");
    }

    #[test]
    fn factory_honours_backend_kind() {
        let hash = create_backend(&EmbeddingConfig {
            backend: BackendKind::Hash,
            ..EmbeddingConfig::default()
        });
        assert!(hash.is_available());
        assert!(hash.describe().starts_with("hash/"));

        let none = create_backend(&EmbeddingConfig {
            backend: BackendKind::None,
            ..EmbeddingConfig::default()
        });
        assert!(!none.is_available());
    }

    #[cfg(not(feature = "candle"))]
    #[test]
    fn candle_without_feature_is_unavailable() {
        let backend = create_backend(&EmbeddingConfig {
            backend: BackendKind::Candle,
            ..EmbeddingConfig::default()
        });
        assert!(!backend.is_available());
    }

    #[test]
    fn batch_size_mismatch_is_an_error() {
        struct Short;
        impl TextEmbedder for Short {
            fn name(&self) -> &'static str {
                "short"
            }
            fn version(&self) -> &str {
                "v1"
            }
            fn dimension(&self) -> usize {
                2
            }
            fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
                Ok(vec![vec![1.0, 0.0]])
            }
        }

        let backend = SemanticBackend::available(Short);
        let err = backend.embed_batch(&["a", "b"]).unwrap_err();
        assert!(matches!(err, EmbeddingError::BatchSize { expected: 2, got: 1 }));
    }
}
