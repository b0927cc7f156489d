pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod section_diff;
pub mod tiered;
pub mod weights;

pub use pipeline::{
    compare_all, BatchComparison, Listing, ListingEntry, NamedProfile, PairComparison,
    SectionAverage,
};
pub use report::{generate_report, Verdict};
pub use scoring::{shape_narrative_similarity, ComparisonConfig, ComparisonEngine, PairScore};
pub use section_diff::{display_items, section_diff, SectionDiff};
pub use tiered::{MatchTier, TermMatch, TieredMatcher, DEFAULT_SEMANTIC_THRESHOLD};
pub use weights::{WeightError, WeightTable, DEFAULT_WEIGHTS};
