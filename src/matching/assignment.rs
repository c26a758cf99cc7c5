//! One-to-one assignment of captions to videos.
//!
//! Exact stem equality is resolved first (first found, not best found),
//! then every remaining pair is scored and the candidates above the
//! threshold are committed greedily in descending score order.

use super::normalizer::Analysis;
use super::scorer::Scorer;
use crate::marker::logical_stem;
use crate::store::Match;
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info, warn};

/// Scores must strictly exceed this to become candidates
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Score of one candidate pair, by index into the input lists
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    pub primary: usize,
    pub auxiliary: usize,
    pub score: f64,
}

/// Assignment engine configured with a scorer and threshold
#[derive(Debug)]
pub struct Assigner {
    scorer: Scorer,
    threshold: f64,
    pool: Option<ThreadPool>,
}

impl Assigner {
    pub fn new(scorer: Scorer) -> Self {
        Self {
            scorer,
            threshold: DEFAULT_THRESHOLD,
            pool: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Score primaries on a dedicated pool of `workers` threads.
    ///
    /// Falls back to sequential scoring when the pool cannot be built.
    pub fn with_workers(mut self, workers: usize) -> Self {
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => self.pool = Some(pool),
            Err(e) => warn!("Could not start {} scoring workers, scoring sequentially: {}", workers, e),
        }
        self
    }

    pub fn scorer(&self) -> Scorer {
        self.scorer
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Pair primaries with auxiliaries; matches come back in commit order
    pub fn assign(&self, primaries: &[String], auxiliaries: &[String]) -> Vec<Match> {
        let mut matches = Vec::new();
        if primaries.is_empty() || auxiliaries.is_empty() {
            return matches;
        }

        let mut primary_used = vec![false; primaries.len()];
        let mut auxiliary_used = vec![false; auxiliaries.len()];

        // Exact pass
        let auxiliary_keys: Vec<String> = auxiliaries
            .iter()
            .map(|name| logical_stem(name).to_lowercase())
            .collect();
        for (p, primary) in primaries.iter().enumerate() {
            let key = logical_stem(primary).to_lowercase();
            let found = auxiliary_keys
                .iter()
                .enumerate()
                .find(|(a, aux_key)| !auxiliary_used[*a] && **aux_key == key)
                .map(|(a, _)| a);

            if let Some(a) = found {
                debug!("Exact match: {} <-> {}", primary, auxiliaries[a]);
                primary_used[p] = true;
                auxiliary_used[a] = true;
                matches.push(Match::new(primary, &auxiliaries[a]));
            }
        }
        let exact = matches.len();

        // Scored pass
        let primary_analyses = analyze_all(primaries);
        let auxiliary_analyses = analyze_all(auxiliaries);
        let pending: Vec<usize> = (0..primaries.len()).filter(|p| !primary_used[*p]).collect();
        let free: Vec<usize> = (0..auxiliaries.len()).filter(|a| !auxiliary_used[*a]).collect();

        let score_row = |p: usize| -> Vec<ScoreResult> {
            free.iter()
                .filter_map(|&a| {
                    let score = self
                        .scorer
                        .score_analyzed(&primary_analyses[p], &auxiliary_analyses[a]);
                    (score > self.threshold).then_some(ScoreResult {
                        primary: p,
                        auxiliary: a,
                        score,
                    })
                })
                .collect()
        };

        let rows: Vec<Vec<ScoreResult>> = match &self.pool {
            Some(pool) => pool.install(|| pending.par_iter().map(|&p| score_row(p)).collect()),
            None => pending.iter().map(|&p| score_row(p)).collect(),
        };
        let mut candidates: Vec<ScoreResult> = rows.into_iter().flatten().collect();

        // Greedy resolution; sort_by is stable so ties keep generation order
        candidates.sort_by(|x, y| y.score.total_cmp(&x.score));
        for candidate in candidates {
            if primary_used[candidate.primary] || auxiliary_used[candidate.auxiliary] {
                continue;
            }
            primary_used[candidate.primary] = true;
            auxiliary_used[candidate.auxiliary] = true;

            let primary = &primaries[candidate.primary];
            let auxiliary = &auxiliaries[candidate.auxiliary];
            debug!("Scored match ({:.3}): {} <-> {}", candidate.score, primary, auxiliary);
            matches.push(Match::new(primary, auxiliary));
        }

        info!(
            "🎯 Matched {} pairs ({} exact, {} scored) using '{}'",
            matches.len(),
            exact,
            matches.len() - exact,
            self.scorer.strategy()
        );
        matches
    }
}

/// Sequential assignment with the given scorer and threshold
pub fn assign(
    primaries: &[String],
    auxiliaries: &[String],
    scorer: &Scorer,
    threshold: f64,
) -> Vec<Match> {
    Assigner::new(*scorer)
        .with_threshold(threshold)
        .assign(primaries, auxiliaries)
}

/// Analyse every logical stem once
fn analyze_all(names: &[String]) -> Vec<Analysis> {
    names
        .iter()
        .map(|name| Analysis::new(logical_stem(name)))
        .collect()
}
