//! Combines form, head-to-head tendency and league-table strength into a three-way
//! distribution and a Poisson goal model.

use std::fmt::{Display, Formatter};

use anyhow::anyhow;
use ordinalizer::Ordinal;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use tipsheet::linear::Matrix;
use tipsheet::probs::SliceExt;

use crate::config::ValidationError;
use crate::domain::{LeagueId, LeagueStrengthEntry, MatchOutcome, TeamId};
use crate::form::FormRow;
use crate::head_to_head::{HeadToHeadSummary, HeadToHeadWindow};
use crate::scoregrid::{self, Market, ScoreProbability};

/// No three-way bucket is ever pushed below this by the strength adjustment.
const MIN_BUCKET_PROB: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Goals per side modelled by the score grid; the grid spans `0..=max_goals`.
    pub max_goals: u8,
    /// Number of correct scores to shortlist.
    pub shortlist: usize,
    /// Lower bound on either side's expected goals.
    pub min_expected_goals: f64,
    /// Blend weight given to a full head-to-head window.
    pub h2h_max_weight: f64,
    /// Probability moved towards the stronger side at the largest table differential.
    pub strength_max_shift: f64,
    /// Table differentials below this count as evenly matched.
    pub near_equal_threshold: f64,
    /// Probability added to the draw between evenly matched sides.
    pub draw_boost: f64,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            max_goals: 6,
            shortlist: 3,
            min_expected_goals: 0.3,
            h2h_max_weight: 0.3,
            strength_max_shift: 0.12,
            near_equal_threshold: 0.05,
            draw_boost: 0.03,
        }
    }
}
impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        const MIN_MAX_GOALS: u8 = 4;
        const MAX_MAX_GOALS: u8 = 20;
        if !(MIN_MAX_GOALS..=MAX_MAX_GOALS).contains(&self.max_goals) {
            return Err(anyhow!("max goals must lie in {MIN_MAX_GOALS}..={MAX_MAX_GOALS}").into());
        }
        if self.shortlist == 0 {
            return Err(anyhow!("correct-score shortlist cannot be empty").into());
        }
        if self.min_expected_goals <= 0.0 {
            return Err(anyhow!("minimum expected goals must be positive").into());
        }
        for (name, value) in [
            ("head-to-head weight", self.h2h_max_weight),
            ("strength shift", self.strength_max_shift),
            ("near-equal threshold", self.near_equal_threshold),
            ("draw boost", self.draw_boost),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(anyhow!("{name} must lie in [0, 1)").into());
            }
        }
        Ok(())
    }
}

/// Everything the predictor needs to know about a fixture.
#[derive(Debug, Clone)]
pub struct PredictionInputs<'a> {
    pub league_id: LeagueId,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    /// The home team's form in its home matches.
    pub home_form: &'a FormRow,
    /// The away team's form in its away matches.
    pub away_form: &'a FormRow,
    pub head_to_head: &'a HeadToHeadWindow,
    pub standings: Option<(&'a LeagueStrengthEntry, &'a LeagueStrengthEntry)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinProbabilities {
    pub home_win: u8,
    pub draw: u8,
    pub away_win: u8,
}
impl WinProbabilities {
    pub fn get(&self, outcome: MatchOutcome) -> u8 {
        match outcome {
            MatchOutcome::HomeWin => self.home_win,
            MatchOutcome::Draw => self.draw,
            MatchOutcome::AwayWin => self.away_win,
        }
    }

    pub fn total(&self) -> u16 {
        self.home_win as u16 + self.draw as u16 + self.away_win as u16
    }

    /// The most probable outcome; ties resolve in favour of the home win, then the draw.
    pub fn dominant(&self) -> MatchOutcome {
        MatchOutcome::iter()
            .fold(None, |best: Option<MatchOutcome>, outcome| match best {
                Some(best) if self.get(best) >= self.get(outcome) => Some(best),
                _ => Some(outcome),
            })
            .unwrap_or(MatchOutcome::Draw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedGoals {
    pub home: f64,
    pub away: f64,
}

/// A finished prediction, identified by its league and the two teams. Probabilities are
/// expressed in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub league_id: LeagueId,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub win_probabilities: WinProbabilities,
    pub expected_goals: ExpectedGoals,
    pub btts_probability: f64,
    pub over15_probability: f64,
    pub over25_probability: f64,
    pub correct_scores: Vec<ScoreProbability>,
    pub head_to_head: Option<HeadToHeadSummary>,
    pub confidence: u8,
    pub advice: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tip {
    HomeWin,
    Draw,
    AwayWin,
    HomeWinOrDraw,
    AwayWinOrDraw,
    NoClearFavourite,
}
impl Tip {
    pub fn for_probabilities(win_probabilities: &WinProbabilities) -> Self {
        const OUTRIGHT: u8 = 50;
        const DOUBLE_CHANCE: u8 = 65;
        let dominant = win_probabilities.dominant();
        if win_probabilities.get(dominant) >= OUTRIGHT {
            return match dominant {
                MatchOutcome::HomeWin => Tip::HomeWin,
                MatchOutcome::Draw => Tip::Draw,
                MatchOutcome::AwayWin => Tip::AwayWin,
            };
        }
        let WinProbabilities { home_win, draw, away_win } = *win_probabilities;
        if home_win + draw >= DOUBLE_CHANCE && home_win >= away_win {
            Tip::HomeWinOrDraw
        } else if away_win + draw >= DOUBLE_CHANCE {
            Tip::AwayWinOrDraw
        } else {
            Tip::NoClearFavourite
        }
    }
}

impl Display for Tip {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Tip::HomeWin => "Home win",
            Tip::Draw => "Draw",
            Tip::AwayWin => "Away win",
            Tip::HomeWinOrDraw => "Home win or draw",
            Tip::AwayWinOrDraw => "Away win or draw",
            Tip::NoClearFavourite => "No clear favourite",
        };
        write!(f, "{text}")
    }
}

/// Produces the advice line: the result tip, followed by a goals lean where one exists.
pub fn advise(win_probabilities: &WinProbabilities, over25_probability: f64) -> String {
    let tip = Tip::for_probabilities(win_probabilities);
    if over25_probability >= 60.0 {
        format!("{tip}, over 2.5 goals")
    } else if over25_probability <= 40.0 {
        format!("{tip}, under 2.5 goals")
    } else {
        tip.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct Predictor {
    config: Config,
    form_limit: usize,
    h2h_window: usize,
}
impl Predictor {
    /// `form_limit` and `h2h_window` are the sample sizes the form rows and head-to-head
    /// windows were gathered with; a full sample earns full confidence.
    pub fn new(config: Config, form_limit: usize, h2h_window: usize) -> Result<Self, ValidationError> {
        config.validate()?;
        if form_limit == 0 || h2h_window == 0 {
            return Err(anyhow!("sample sizes must be positive").into());
        }
        Ok(Self {
            config,
            form_limit,
            h2h_window,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn predict(&self, inputs: &PredictionInputs) -> PredictionResult {
        let expected_goals = self.expected_goals(inputs.home_form, inputs.away_form);

        let grid_size = self.config.max_goals as usize + 1;
        let mut scoregrid = Matrix::allocate(grid_size, grid_size);
        scoregrid::from_univariate_poisson(expected_goals.home, expected_goals.away, &mut scoregrid);
        scoregrid::normalise(&mut scoregrid);

        let mut probs = scoregrid::three_way(&scoregrid);
        let summary = inputs.head_to_head.summary();
        if let Some(summary) = &summary {
            self.blend_head_to_head(&mut probs, summary);
        }
        let standings_applied = match inputs.standings {
            Some((home, away)) if home.is_established() && away.is_established() => {
                self.adjust_for_strength(&mut probs, strength_differential(home, away));
                true
            }
            _ => false,
        };

        let percentages = probs.apportion(100);
        let win_probabilities = WinProbabilities {
            home_win: percentages[MatchOutcome::HomeWin.ordinal()] as u8,
            draw: percentages[MatchOutcome::Draw.ordinal()] as u8,
            away_win: percentages[MatchOutcome::AwayWin.ordinal()] as u8,
        };
        let over25_probability = 100.0 * Market::Over(2).gather(&scoregrid);
        let confidence = self.confidence(inputs, summary.as_ref(), standings_applied, &probs);

        PredictionResult {
            league_id: inputs.league_id,
            home_team_id: inputs.home_team_id,
            away_team_id: inputs.away_team_id,
            win_probabilities,
            expected_goals,
            btts_probability: 100.0 * Market::BothTeamsScore.gather(&scoregrid),
            over15_probability: 100.0 * Market::Over(1).gather(&scoregrid),
            over25_probability,
            correct_scores: scoregrid::shortlist(&scoregrid, self.config.shortlist)
                .into_iter()
                .map(|cell| ScoreProbability {
                    probability: 100.0 * cell.probability,
                    ..cell
                })
                .collect(),
            head_to_head: summary,
            confidence,
            advice: advise(&win_probabilities, over25_probability),
        }
    }

    /// Each side's rate averages its own scoring with the opponent's conceding.
    fn expected_goals(&self, home_form: &FormRow, away_form: &FormRow) -> ExpectedGoals {
        let floor = self.config.min_expected_goals;
        ExpectedGoals {
            home: f64::max(floor, (home_form.attack_rate() + away_form.defence_rate()) / 2.0),
            away: f64::max(floor, (away_form.attack_rate() + home_form.defence_rate()) / 2.0),
        }
    }

    fn blend_head_to_head(&self, probs: &mut [f64; 3], summary: &HeadToHeadSummary) {
        let sample = usize::min(summary.matches, self.h2h_window) as f64 / self.h2h_window as f64;
        let weight = self.config.h2h_max_weight * sample;
        let draw_floor = probs[MatchOutcome::Draw.ordinal()];
        for (prob, tendency) in probs.iter_mut().zip(summary.frequencies()) {
            *prob = (1.0 - weight) * *prob + weight * tendency;
        }
        if summary.all_draws() {
            let draw = &mut probs[MatchOutcome::Draw.ordinal()];
            *draw = f64::max(*draw, draw_floor);
        }
        probs.normalise(1.0);
    }

    fn adjust_for_strength(&self, probs: &mut [f64; 3], differential: f64) {
        let (home, draw, away) = (
            MatchOutcome::HomeWin.ordinal(),
            MatchOutcome::Draw.ordinal(),
            MatchOutcome::AwayWin.ordinal(),
        );
        if differential.abs() < self.config.near_equal_threshold {
            let half_boost = self.config.draw_boost / 2.0;
            for side in [home, away] {
                let taken = f64::min(half_boost, f64::max(0.0, probs[side] - MIN_BUCKET_PROB));
                probs[side] -= taken;
                probs[draw] += taken;
            }
        } else {
            let (stronger, weaker) = if differential > 0.0 { (home, away) } else { (away, home) };
            let shift = differential.abs() * self.config.strength_max_shift;
            let moved = f64::min(shift, f64::max(0.0, probs[weaker] - MIN_BUCKET_PROB));
            probs[weaker] -= moved;
            probs[stronger] += moved;
        }
    }

    fn confidence(
        &self,
        inputs: &PredictionInputs,
        summary: Option<&HeadToHeadSummary>,
        standings_applied: bool,
        probs: &[f64; 3],
    ) -> u8 {
        let form_matches = usize::min(inputs.home_form.matches_considered, inputs.away_form.matches_considered);
        let form_sufficiency = f64::min(1.0, form_matches as f64 / self.form_limit as f64);
        let h2h_sufficiency = summary
            .map(|summary| f64::min(1.0, summary.matches as f64 / self.h2h_window as f64))
            .unwrap_or(0.0);
        let top = probs.iter().copied().fold(0.0, f64::max);
        let dominance = ((top - 1.0 / 3.0) / (2.0 / 3.0)).clamp(0.0, 1.0);

        let mut score = 20.0 + 45.0 * form_sufficiency + 20.0 * h2h_sufficiency + 5.0 * dominance;
        if standings_applied {
            score += 10.0;
        }
        score.clamp(5.0, 95.0).round() as u8
    }
}

/// How much stronger the home side is on the table, in `[-1, 1]`; positive favours home.
pub fn strength_differential(home: &LeagueStrengthEntry, away: &LeagueStrengthEntry) -> f64 {
    let ppg_term = (home.points_per_game() - away.points_per_game()) / 3.0;
    let position_term =
        (away.position as f64 - home.position as f64) / (away.position as f64 + home.position as f64);
    let goal_difference_term =
        ((home.goal_difference_per_game() - away.goal_difference_per_game()) / 3.0).clamp(-1.0, 1.0);
    (0.4 * ppg_term + 0.3 * position_term + 0.3 * goal_difference_term).clamp(-1.0, 1.0)
}
