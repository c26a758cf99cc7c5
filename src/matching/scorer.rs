//! Pairwise filename similarity strategies.
//!
//! Every strategy is a pure function of two analysed stems returning a
//! value in `[0, 1]`. Case-insensitively identical stems always score 1.0.
//! The hard rules (year veto, source penalty, season/episode identity) do
//! not fire in the same order for every strategy; [`Precedence`] spells the
//! order out per scorer and can be overridden.

use super::normalizer::Analysis;
use super::sequence::sequence_ratio;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Score returned when both stems carry years and none coincide
pub const YEAR_VETO_SCORE: f64 = 0.1;

/// Multiplier applied when both stems carry disjoint source tags
pub const SOURCE_PENALTY_FACTOR: f64 = 0.25;

/// Word overlap (Jaccard) that must be exceeded for a word match
const MIN_WORD_OVERLAP: f64 = 0.3;

const WORD_YEAR_BONUS: f64 = 0.2;
const SUBSTRING_BONUS: f64 = 0.2;

const HYBRID_WORD_WEIGHT: f64 = 0.5;
const HYBRID_SEQUENCE_WEIGHT: f64 = 0.3;
const HYBRID_EDIT_WEIGHT: f64 = 0.2;
const HYBRID_YEAR_BONUS: f64 = 0.1;
const HYBRID_YEAR_PENALTY: f64 = 0.5;

const DEFAULT_SEQUENCE_WEIGHT: f64 = 0.4;
const DEFAULT_EDIT_WEIGHT: f64 = 0.3;
const DEFAULT_CHAR_WEIGHT: f64 = 0.3;

/// Available scoring strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Season/episode rules, containment, then a blended text similarity
    Default,

    /// Year veto plus content-word overlap
    YearWord,

    /// Longest-matching-block ratio over cleaned stems
    Sequence,

    /// Normalised edit distance over cleaned stems
    Levenshtein,

    /// Weighted blend of year+word, sequence and edit distance
    Hybrid,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Default,
        Strategy::YearWord,
        Strategy::Sequence,
        Strategy::Levenshtein,
        Strategy::Hybrid,
    ];

    /// Stable identifier used in configuration and on the command line
    pub fn id(&self) -> &'static str {
        match self {
            Strategy::Default => "default",
            Strategy::YearWord => "year_word",
            Strategy::Sequence => "sequence",
            Strategy::Levenshtein => "levenshtein",
            Strategy::Hybrid => "hybrid",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Strategy::Default => "season/episode rules, containment, blended similarity",
            Strategy::YearWord => "year veto + word overlap",
            Strategy::Sequence => "character sequence similarity",
            Strategy::Levenshtein => "edit distance similarity",
            Strategy::Hybrid => "weighted blend with year bonus/penalty",
        }
    }

    /// Parse an identifier; `legacy` is an alias of `default`
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim().to_lowercase().replace('-', "_");
        match id.as_str() {
            "default" | "legacy" => Some(Strategy::Default),
            "year_word" | "yearword" => Some(Strategy::YearWord),
            "sequence" => Some(Strategy::Sequence),
            "levenshtein" | "edit_distance" => Some(Strategy::Levenshtein),
            "hybrid" => Some(Strategy::Hybrid),
            _ => None,
        }
    }

    pub fn default_precedence(&self) -> Precedence {
        match self {
            Strategy::Default => Precedence::EpisodeFirst,
            Strategy::YearWord | Strategy::Hybrid => Precedence::VetoFirst,
            Strategy::Sequence | Strategy::Levenshtein => Precedence::TextOnly,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Order in which the hard rules fire around a strategy's body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    /// Season/episode rules decide before anything else; no source penalty
    EpisodeFirst,

    /// The body (with its own year handling) runs first, then the source
    /// penalty; a shared `(season, episode)` waives the penalty
    VetoFirst,

    /// Body only
    TextOnly,
}

/// A strategy together with its rule ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scorer {
    strategy: Strategy,
    precedence: Precedence,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(Strategy::Default)
    }
}

impl Scorer {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            precedence: strategy.default_precedence(),
        }
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn precedence(&self) -> Precedence {
        self.precedence
    }

    /// Score two raw stems
    pub fn score(&self, stem_a: &str, stem_b: &str) -> f64 {
        self.score_analyzed(&Analysis::new(stem_a), &Analysis::new(stem_b))
    }

    /// Score two stems that were already analysed
    pub fn score_analyzed(&self, a: &Analysis, b: &Analysis) -> f64 {
        if a.lowered == b.lowered {
            return 1.0;
        }

        let raw = match self.precedence {
            Precedence::EpisodeFirst => match episode_rule(a, b) {
                Some(score) => score,
                None => self.body(a, b),
            },
            Precedence::VetoFirst => {
                let score = self.body(a, b);
                if a.signals.sources_disjoint(&b.signals) && !a.signals.same_episode(&b.signals) {
                    score * SOURCE_PENALTY_FACTOR
                } else {
                    score
                }
            }
            Precedence::TextOnly => self.body(a, b),
        };

        let score = clamp_score(raw);
        debug!(
            "Similarity [{}] '{}' vs '{}': {:.3}",
            self.strategy, a.lowered, b.lowered, score
        );
        score
    }

    fn body(&self, a: &Analysis, b: &Analysis) -> f64 {
        match self.strategy {
            Strategy::Default => default_body(a, b),
            Strategy::YearWord => year_word_body(a, b),
            Strategy::Sequence => sequence_body(a, b),
            Strategy::Levenshtein => edit_body(a, b),
            Strategy::Hybrid => hybrid_body(a, b),
        }
    }
}

/// Non-finite values become 0.0, everything else is clamped to `[0, 1]`
pub fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Classic edit distance (unit costs), counted in characters
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// `1 - distance / longer length`, 0.0 when either side is empty
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Share of `a`'s characters that occur anywhere in `b`, over the longer length
fn shared_char_ratio(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    let common = a.chars().filter(|c| b.contains(*c)).count();
    common as f64 / max_len as f64
}

/// Season/episode identity rules
fn episode_rule(a: &Analysis, b: &Analysis) -> Option<f64> {
    let (sa, sb) = (&a.signals, &b.signals);

    if let (Some((season_a, episode_a)), Some((season_b, episode_b))) =
        (sa.season_episode, sb.season_episode)
    {
        return Some(if season_a == season_b && episode_a == episode_b {
            1.0
        } else if season_a == season_b {
            0.3
        } else {
            0.1
        });
    }

    match (sa.episode_number(), sb.episode_number()) {
        (Some(x), Some(y)) if x == y => Some(0.8),
        _ => None,
    }
}

fn default_body(a: &Analysis, b: &Analysis) -> f64 {
    let (s1, s2) = (a.lowered.as_str(), b.lowered.as_str());

    if !s1.is_empty() && !s2.is_empty() {
        if let Some(score) = containment(s1, s2).or_else(|| containment(s2, s1)) {
            return score;
        }
    }

    sequence_ratio(s1, s2) * DEFAULT_SEQUENCE_WEIGHT
        + edit_similarity(s1, s2) * DEFAULT_EDIT_WEIGHT
        + shared_char_ratio(s1, s2) * DEFAULT_CHAR_WEIGHT
}

/// 0.9 when `needle` sits at either end of `haystack`, 0.8 elsewhere
fn containment(needle: &str, haystack: &str) -> Option<f64> {
    if !haystack.contains(needle) {
        return None;
    }
    if haystack.starts_with(needle) || haystack.ends_with(needle) {
        Some(0.9)
    } else {
        Some(0.8)
    }
}

fn year_word_body(a: &Analysis, b: &Analysis) -> f64 {
    if a.signals.years_disjoint(&b.signals) {
        return YEAR_VETO_SCORE;
    }

    let words_a = a.content_words();
    let words_b = b.content_words();
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let shared = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    let overlap = shared as f64 / union as f64;
    if overlap <= MIN_WORD_OVERLAP {
        return 0.1;
    }

    let bonus = if a.signals.years_agree(&b.signals) {
        WORD_YEAR_BONUS
    } else {
        0.0
    };
    (overlap + bonus).min(1.0)
}

fn sequence_body(a: &Analysis, b: &Analysis) -> f64 {
    let (s1, s2) = (a.stem.as_str(), b.stem.as_str());
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }

    let bonus = if s1.contains(s2) || s2.contains(s1) {
        SUBSTRING_BONUS
    } else {
        0.0
    };
    (sequence_ratio(s1, s2) + bonus).min(1.0)
}

fn edit_body(a: &Analysis, b: &Analysis) -> f64 {
    edit_similarity(a.stem.as_str(), b.stem.as_str())
}

fn hybrid_body(a: &Analysis, b: &Analysis) -> f64 {
    let blended = year_word_body(a, b) * HYBRID_WORD_WEIGHT
        + sequence_body(a, b) * HYBRID_SEQUENCE_WEIGHT
        + edit_body(a, b) * HYBRID_EDIT_WEIGHT;

    let adjusted = if a.signals.years_agree(&b.signals) {
        blended + HYBRID_YEAR_BONUS
    } else if a.signals.years_disjoint(&b.signals) {
        blended - HYBRID_YEAR_PENALTY
    } else {
        blended
    };
    clamp_score(adjusted)
}

/// Name → scorer mapping used to select a strategy at runtime
#[derive(Debug, Clone)]
pub struct ScorerRegistry {
    scorers: Vec<(&'static str, Scorer)>,
}

impl Default for ScorerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ScorerRegistry {
    /// Registry holding every built-in strategy under its stable id
    pub fn standard() -> Self {
        Self {
            scorers: Strategy::ALL
                .iter()
                .map(|strategy| (strategy.id(), Scorer::new(*strategy)))
                .collect(),
        }
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.scorers.iter().map(|(id, _)| *id).collect()
    }

    /// Look up a scorer by id or alias
    pub fn get(&self, id: &str) -> Option<Scorer> {
        let strategy = Strategy::from_id(id)?;
        self.scorers
            .iter()
            .find(|(_, scorer)| scorer.strategy() == strategy)
            .map(|(_, scorer)| *scorer)
    }

    /// Select by id, falling back to the default strategy when the id is
    /// absent or unknown
    pub fn select(&self, id: Option<&str>) -> Scorer {
        match id {
            Some(id) => self.get(id).unwrap_or_else(|| {
                warn!("Unknown matching strategy '{}', using '{}'", id, Strategy::Default);
                Scorer::default()
            }),
            None => Scorer::default(),
        }
    }

    /// `(id, description)` pairs in registration order
    pub fn describe(&self) -> Vec<(&'static str, &'static str)> {
        self.scorers
            .iter()
            .map(|(id, scorer)| (*id, scorer.strategy().description()))
            .collect()
    }
}
