pub mod assignment;
pub mod normalizer;
pub mod scorer;
pub mod sequence;

pub use assignment::{assign, Assigner, ScoreResult, DEFAULT_THRESHOLD};
pub use normalizer::{normalize, Analysis, ExtractedSignals, NormalizedStem, SourceTag};
pub use scorer::{levenshtein_distance, Precedence, Scorer, ScorerRegistry, Strategy};
pub use sequence::sequence_ratio;
