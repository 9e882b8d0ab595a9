//! Recency-weighted form over a team's most recent matches.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::config::ValidationError;
use crate::domain::{MatchRecord, Scope, TeamId, TeamResult};

/// Goal rate assumed for a team whose sample is too thin to say anything about it.
pub const NEUTRAL_GOAL_RATE: f64 = 1.5;

/// Fewest matches in a split for its goal rates to be trusted.
pub const MIN_QUALIFYING_MATCHES: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Most recent matches to consider.
    pub limit: usize,
}
impl Default for Config {
    fn default() -> Self {
        Self { limit: 10 }
    }
}
impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.limit == 0 {
            return Err(anyhow!("form limit must be positive").into());
        }
        Ok(())
    }
}

/// Weight of the match at recency index `index`, where 0 is the most recent.
#[inline]
pub fn recency_weight(index: usize) -> f64 {
    1.0 / (1 + index) as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRow {
    pub team_id: TeamId,
    pub scope: Scope,
    pub matches_considered: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub goals_for: u32,
    pub goals_against: u32,
    /// Recency-weighted mean of goals scored per match.
    pub weighted_goals_for: f64,
    /// Recency-weighted mean of goals conceded per match.
    pub weighted_goals_against: f64,
    pub btts_pct: f64,
    pub over15_pct: f64,
    pub over25_pct: f64,
    /// One symbol per considered match (`W`, `D` or `L`), most recent first.
    pub sequence: String,
}
impl FormRow {
    pub fn empty(team_id: TeamId, scope: Scope) -> Self {
        Self {
            team_id,
            scope,
            matches_considered: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_for: 0,
            goals_against: 0,
            weighted_goals_for: 0.0,
            weighted_goals_against: 0.0,
            btts_pct: 0.0,
            over15_pct: 0.0,
            over25_pct: 0.0,
            sequence: String::new(),
        }
    }

    pub fn points(&self) -> u32 {
        3 * self.wins as u32 + self.draws as u32
    }

    pub fn points_per_game(&self) -> f64 {
        if self.matches_considered == 0 {
            0.0
        } else {
            self.points() as f64 / self.matches_considered as f64
        }
    }

    pub fn is_sufficient(&self) -> bool {
        self.matches_considered >= MIN_QUALIFYING_MATCHES
    }

    /// Goal-scoring rate to feed into expected goals.
    pub fn attack_rate(&self) -> f64 {
        if self.is_sufficient() {
            self.weighted_goals_for
        } else {
            NEUTRAL_GOAL_RATE
        }
    }

    /// Goal-conceding rate to feed into expected goals.
    pub fn defence_rate(&self) -> f64 {
        if self.is_sufficient() {
            self.weighted_goals_against
        } else {
            NEUTRAL_GOAL_RATE
        }
    }
}

/// Aggregates the form of `team` over at most `limit` of its matches admitted by `scope`.
/// `history` must be ordered most recent first; matches not involving `team` are ignored.
/// A short history is aggregated over what is there, never padded.
pub fn aggregate(team: TeamId, history: &[MatchRecord], scope: Scope, limit: usize) -> FormRow {
    let mut row = FormRow::empty(team, scope);
    let (mut weighted_for, mut weighted_against, mut weight_total) = (0.0, 0.0, 0.0);
    let (mut btts, mut over15, mut over25) = (0usize, 0usize, 0usize);

    let considered = history
        .iter()
        .filter_map(|record| {
            record
                .side_of(team)
                .filter(|&side| scope.admits(side))
                .map(|side| (record, side))
        })
        .take(limit);

    for (index, (record, side)) in considered.enumerate() {
        let (scored, conceded) = record.goals_for_against(side);
        let result = record.result_for(side);
        match result {
            TeamResult::Win => row.wins += 1,
            TeamResult::Draw => row.draws += 1,
            TeamResult::Loss => row.losses += 1,
        }
        row.sequence.push(result.symbol());
        row.goals_for += scored as u32;
        row.goals_against += conceded as u32;

        let weight = recency_weight(index);
        weighted_for += weight * scored as f64;
        weighted_against += weight * conceded as f64;
        weight_total += weight;

        let score = record.score();
        if score.both_scored() {
            btts += 1;
        }
        if score.total() > 1 {
            over15 += 1;
        }
        if score.total() > 2 {
            over25 += 1;
        }
        row.matches_considered += 1;
    }

    if row.matches_considered > 0 {
        row.weighted_goals_for = weighted_for / weight_total;
        row.weighted_goals_against = weighted_against / weight_total;
        let percent = |count: usize| 100.0 * count as f64 / row.matches_considered as f64;
        row.btts_pct = percent(btts);
        row.over15_pct = percent(over15);
        row.over25_pct = percent(over25);
    }
    row
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use crate::data::tests::{day, PREMIER};

    use super::*;

    fn played(id: u64, days: i64, home: TeamId, away: TeamId, home_goals: u8, away_goals: u8) -> MatchRecord {
        MatchRecord {
            id,
            league_id: PREMIER,
            kickoff: day(days),
            home_team_id: home,
            away_team_id: away,
            home_goals,
            away_goals,
        }
    }

    /// Team 1's history, most recent first.
    fn history() -> Vec<MatchRecord> {
        vec![
            played(5, 50, 1, 2, 3, 1),
            played(4, 40, 3, 1, 0, 0),
            played(3, 30, 1, 4, 1, 2),
            played(2, 20, 5, 1, 1, 4),
            played(1, 10, 1, 6, 2, 2),
        ]
    }

    #[test]
    fn recency_weights() {
        assert_eq!(1.0, recency_weight(0));
        assert_eq!(0.5, recency_weight(1));
        assert_eq!(0.25, recency_weight(3));
    }

    #[test]
    fn overall_form() {
        let row = aggregate(1, &history(), Scope::Overall, 10);
        assert_eq!(5, row.matches_considered);
        assert_eq!((2, 2, 1), (row.wins, row.draws, row.losses));
        assert_eq!("WDLWD", row.sequence);
        assert_eq!(10, row.goals_for);
        assert_eq!(6, row.goals_against);
        assert_eq!(8, row.points());
        assert_float_absolute_eq!(1.6, row.points_per_game(), 1e-12);

        // weights 1, 1/2, 1/3, 1/4, 1/5
        let weight_total = 1.0 + 0.5 + 1.0 / 3.0 + 0.25 + 0.2;
        let weighted_for = 3.0 + 0.0 + 1.0 / 3.0 + 1.0 + 0.4;
        let weighted_against = 1.0 + 0.0 + 2.0 / 3.0 + 0.25 + 0.4;
        assert_float_relative_eq!(weighted_for / weight_total, row.weighted_goals_for, 1e-12);
        assert_float_relative_eq!(weighted_against / weight_total, row.weighted_goals_against, 1e-12);

        // BTTS: 3-1, 1-2, 1-4, 2-2; over 1.5: all but 0-0; over 2.5: 3-1, 1-2, 1-4, 2-2
        assert_float_absolute_eq!(80.0, row.btts_pct, 1e-12);
        assert_float_absolute_eq!(80.0, row.over15_pct, 1e-12);
        assert_float_absolute_eq!(80.0, row.over25_pct, 1e-12);
    }

    #[test]
    fn home_split() {
        let row = aggregate(1, &history(), Scope::Home, 10);
        assert_eq!(3, row.matches_considered);
        assert_eq!("WLD", row.sequence);
        let weight_total = 1.0 + 0.5 + 1.0 / 3.0;
        assert_float_relative_eq!((3.0 + 0.5 + 2.0 / 3.0) / weight_total, row.weighted_goals_for, 1e-12);
    }

    #[test]
    fn away_split_reindexes_recency() {
        let row = aggregate(1, &history(), Scope::Away, 10);
        assert_eq!(2, row.matches_considered);
        assert_eq!("DW", row.sequence);
        // the 0-0 is the most recent away match and takes full weight
        assert_float_relative_eq!((0.0 + 0.5 * 4.0) / 1.5, row.weighted_goals_for, 1e-12);
        assert_float_relative_eq!((0.0 + 0.5 * 1.0) / 1.5, row.weighted_goals_against, 1e-12);
    }

    #[test]
    fn limit_applies() {
        let row = aggregate(1, &history(), Scope::Overall, 2);
        assert_eq!(2, row.matches_considered);
        assert_eq!("WD", row.sequence);
        assert_float_absolute_eq!(50.0, row.btts_pct, 1e-12);
        assert_float_absolute_eq!(50.0, row.over25_pct, 1e-12);
    }

    #[test]
    fn short_history_is_not_padded() {
        let row = aggregate(1, &history()[..1], Scope::Overall, 10);
        assert_eq!(1, row.matches_considered);
        assert_float_absolute_eq!(100.0, row.btts_pct, 1e-12);
        assert_float_absolute_eq!(3.0, row.weighted_goals_for, 1e-12);
        assert!(!row.is_sufficient());
        assert_eq!(NEUTRAL_GOAL_RATE, row.attack_rate());
        assert_eq!(NEUTRAL_GOAL_RATE, row.defence_rate());
    }

    #[test]
    fn empty_history() {
        let row = aggregate(1, &[], Scope::Home, 10);
        assert_eq!(FormRow::empty(1, Scope::Home), row);
        assert_eq!(0.0, row.points_per_game());
        assert_eq!(NEUTRAL_GOAL_RATE, row.attack_rate());
    }

    #[test]
    fn unrelated_matches_ignored() {
        let mut history = history();
        history.insert(0, played(9, 60, 7, 8, 5, 5));
        let row = aggregate(1, &history, Scope::Overall, 10);
        assert_eq!(5, row.matches_considered);
        assert_eq!("WDLWD", row.sequence);
    }

    #[test]
    fn sufficient_sample_uses_own_rates() {
        let row = aggregate(1, &history(), Scope::Away, 10);
        assert!(row.is_sufficient());
        assert_eq!(row.weighted_goals_for, row.attack_rate());
        assert_eq!(row.weighted_goals_against, row.defence_rate());
    }

    #[test]
    fn percentages_never_exceed_100() {
        let history = (0..12)
            .map(|i| played(i, 100 - i as i64, 1, 2, 2, 2))
            .collect::<Vec<_>>();
        let row = aggregate(1, &history, Scope::Overall, 10);
        assert_eq!(10, row.matches_considered);
        assert_eq!(100.0, row.btts_pct);
        assert_eq!(100.0, row.over25_pct);
    }

    #[test]
    fn config_validation() {
        Config::default().validate().unwrap();
        assert_eq!(
            "form limit must be positive",
            Config { limit: 0 }.validate().unwrap_err().to_string()
        );
    }
}
