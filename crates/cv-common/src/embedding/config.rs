use std::str::FromStr;

use strum::{AsRefStr, EnumString};

pub const DEFAULT_MODEL: &str = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";

/// Which embedding implementation to load at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendKind {
    Hash,
    Candle,
    None,
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(feature = "candle") {
            BackendKind::Candle
        } else {
            BackendKind::Hash
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub backend: BackendKind,
    /// HuggingFace Hub リポジトリ名（candle バックエンド用）
    pub model: String,
    /// 埋め込み次元数（hash バックエンド用）
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            model: DEFAULT_MODEL.to_string(),
            dimension: 384,
        }
    }
}

impl EmbeddingConfig {
    /// 環境変数から設定を読み込み（未設定・不正値はデフォルト）
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: std::env::var("CV_EMBEDDER")
                .ok()
                .and_then(|s| BackendKind::from_str(s.trim()).ok())
                .unwrap_or(defaults.backend),
            model: std::env::var("CV_EMBEDDING_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.model),
            dimension: std::env::var("CV_EMBEDDING_DIMENSION")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|d: &usize| *d > 0)
                .unwrap_or(defaults.dimension),
        }
    }
}
