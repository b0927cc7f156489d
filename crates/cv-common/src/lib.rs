//! Similarity scoring for structured CV profiles.
//!
//! Profiles are canonicalized per section, list sections are matched with a
//! tiered (exact → containment → semantic) matcher, narrative sections are
//! compared by sentence embeddings, and the per-section scores are combined
//! with a weight table.

pub mod embedding;
pub mod fields;
pub mod logging;
pub mod matching;
pub mod normalize;
pub mod profile;
pub mod term_normalizer;

pub use embedding::{create_backend, EmbeddingConfig, EmbeddingError, SemanticBackend, TextEmbedder};
pub use fields::{FieldKind, SectionField};
pub use matching::{
    compare_all, generate_report, BatchComparison, ComparisonConfig, ComparisonEngine,
    NamedProfile, PairScore, WeightTable,
};
pub use profile::{FieldValue, Profile, ProfileError};
pub use term_normalizer::{canonicalize, canonicalize_field, TermSet};
