//! Joint distributions of full-time scores, laid out as a matrix with home goals along the
//! rows and away goals along the columns.

use ordinalizer::Ordinal;
use serde::{Deserialize, Serialize};

use tipsheet::linear::Matrix;
use tipsheet::poisson;
use tipsheet::probs::SliceExt;

use crate::domain::Score;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreProbability {
    pub score: Score,
    pub probability: f64,
}

/// A market whose probability can be read off a score grid.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Market {
    /// Strictly more than the given number of goals in total.
    Over(u8),
    BothTeamsScore,
}
impl Market {
    pub fn gather(&self, scoregrid: &Matrix<f64>) -> f64 {
        match self {
            Market::Over(goals) => sum_where(scoregrid, |home, away| home + away > *goals as usize),
            Market::BothTeamsScore => sum_where(scoregrid, |home, away| home > 0 && away > 0),
        }
    }
}

/// Populates the grid with the product of two independent Poisson distributions.
pub fn from_univariate_poisson(home_rate: f64, away_rate: f64, scoregrid: &mut Matrix<f64>) {
    let max_goals = |len: usize| u8::try_from(len - 1).unwrap_or(u8::MAX);
    let home_probs = poisson::series(home_rate, max_goals(scoregrid.rows()));
    let away_probs = poisson::series(away_rate, max_goals(scoregrid.cols()));
    for (home_goals, home_prob) in home_probs.iter().enumerate() {
        for (away_goals, away_prob) in away_probs.iter().enumerate() {
            scoregrid[(home_goals, away_goals)] = home_prob * away_prob;
        }
    }
}

/// Rescales the grid so that its cells sum to 1, returning the mass prior to rescaling.
pub fn normalise(scoregrid: &mut Matrix<f64>) -> f64 {
    scoregrid.flatten_mut().normalise(1.0)
}

/// Probabilities of the three full-time outcomes, indexed by [`MatchOutcome`](crate::domain::MatchOutcome) ordinal.
pub fn three_way(scoregrid: &Matrix<f64>) -> [f64; 3] {
    let mut probs = [0.0; 3];
    for ((home_goals, away_goals), prob) in scoregrid.cells() {
        let outcome = Score::new(home_goals as u8, away_goals as u8).outcome();
        probs[outcome.ordinal()] += prob;
    }
    probs
}

/// The `k` most probable scores, in descending order of probability. Equally probable
/// scores are ordered by home goals, then by away goals.
pub fn shortlist(scoregrid: &Matrix<f64>, k: usize) -> Vec<ScoreProbability> {
    let mut cells = scoregrid
        .cells()
        .map(|((home_goals, away_goals), &probability)| ScoreProbability {
            score: Score::new(home_goals as u8, away_goals as u8),
            probability,
        })
        .collect::<Vec<_>>();
    cells.sort_by(|a, b| {
        b.probability
            .total_cmp(&a.probability)
            .then_with(|| a.score.cmp(&b.score))
    });
    cells.truncate(k);
    cells
}

fn sum_where(scoregrid: &Matrix<f64>, predicate: impl Fn(usize, usize) -> bool) -> f64 {
    scoregrid
        .cells()
        .filter(|((home, away), _)| predicate(*home, *away))
        .map(|(_, prob)| prob)
        .sum()
}
