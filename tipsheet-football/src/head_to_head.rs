//! Shared history between the two teams of a fixture.

use anyhow::anyhow;
use chrono::NaiveDateTime;
use ordinalizer::Ordinal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ValidationError;
use crate::data::{sort_most_recent_first, DataError, MatchData};
use crate::domain::{LeagueId, MatchOutcome, MatchRecord, Side, TeamId, TeamResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Most recent meetings to retain.
    pub window: usize,
}
impl Default for Config {
    fn default() -> Self {
        Self { window: 5 }
    }
}
impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        const MAX_WINDOW: usize = 20;
        if self.window == 0 || self.window > MAX_WINDOW {
            return Err(anyhow!("head-to-head window must lie in 1..={MAX_WINDOW}").into());
        }
        Ok(())
    }
}

/// The most recent meetings between two teams, most recent first, oriented so that "home"
/// always refers to the home team of the fixture being predicted.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadToHeadWindow {
    home_team_id: TeamId,
    away_team_id: TeamId,
    matches: Vec<MatchRecord>,
}
impl HeadToHeadWindow {
    /// Keeps at most `window` of the `meetings` that genuinely involve both teams, in strictly
    /// descending chronological order.
    pub fn new(home_team_id: TeamId, away_team_id: TeamId, mut meetings: Vec<MatchRecord>, window: usize) -> Self {
        meetings.retain(|record| record.involves(home_team_id) && record.involves(away_team_id));
        sort_most_recent_first(&mut meetings);
        meetings.dedup_by_key(|record| record.id);
        meetings.truncate(window);
        Self {
            home_team_id,
            away_team_id,
            matches: meetings,
        }
    }

    pub fn empty(home_team_id: TeamId, away_team_id: TeamId) -> Self {
        Self {
            home_team_id,
            away_team_id,
            matches: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn matches(&self) -> &[MatchRecord] {
        &self.matches
    }

    pub fn summary(&self) -> Option<HeadToHeadSummary> {
        if self.matches.is_empty() {
            return None;
        }
        let (mut home_wins, mut draws, mut away_wins) = (0, 0, 0);
        for record in &self.matches {
            let side = record.side_of(self.home_team_id).unwrap_or(Side::Home);
            match record.result_for(side) {
                TeamResult::Win => home_wins += 1,
                TeamResult::Draw => draws += 1,
                TeamResult::Loss => away_wins += 1,
            }
        }
        let matches = self.matches.len();
        let ppg = |wins: usize| (3 * wins + draws) as f64 / matches as f64;
        Some(HeadToHeadSummary {
            matches,
            home_wins,
            draws,
            away_wins,
            home_ppg: ppg(home_wins),
            away_ppg: ppg(away_wins),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadToHeadSummary {
    pub matches: usize,
    pub home_wins: usize,
    pub draws: usize,
    pub away_wins: usize,
    pub home_ppg: f64,
    pub away_ppg: f64,
}
impl HeadToHeadSummary {
    /// Relative frequency of each outcome, indexed by [`MatchOutcome`] ordinal.
    pub fn frequencies(&self) -> [f64; 3] {
        let mut frequencies = [0.0; 3];
        let total = self.matches as f64;
        frequencies[MatchOutcome::HomeWin.ordinal()] = self.home_wins as f64 / total;
        frequencies[MatchOutcome::Draw.ordinal()] = self.draws as f64 / total;
        frequencies[MatchOutcome::AwayWin.ordinal()] = self.away_wins as f64 / total;
        frequencies
    }

    pub fn all_draws(&self) -> bool {
        self.draws == self.matches
    }
}

/// Retrieves the meetings of two teams before `before`, looking first in the fixture's own
/// league-season and, only if that has none, across the rest of its league family. Meetings
/// in any other competition are never admitted.
pub fn resolve(
    data: &impl MatchData,
    home_team_id: TeamId,
    away_team_id: TeamId,
    league_id: LeagueId,
    before: NaiveDateTime,
    config: &Config,
) -> Result<HeadToHeadWindow, DataError> {
    let direct = admitted(data.meetings(home_team_id, away_team_id, &[league_id], before)?, &[league_id]);
    if !direct.is_empty() {
        return Ok(HeadToHeadWindow::new(home_team_id, away_team_id, direct, config.window));
    }

    let family = data.league_family(league_id)?;
    if family.iter().all(|&id| id == league_id) {
        return Ok(HeadToHeadWindow::empty(home_team_id, away_team_id));
    }
    let broadened = admitted(data.meetings(home_team_id, away_team_id, &family, before)?, &family);
    debug!(
        "broadened head-to-head of {home_team_id} v {away_team_id} to {} related leagues, found {}",
        family.len(),
        broadened.len()
    );
    Ok(HeadToHeadWindow::new(home_team_id, away_team_id, broadened, config.window))
}

fn admitted(mut meetings: Vec<MatchRecord>, leagues: &[LeagueId]) -> Vec<MatchRecord> {
    meetings.retain(|record| leagues.contains(&record.league_id));
    meetings
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use crate::data::tests::{day, Builder, CUP, PREMIER, PREMIER_LAST_SEASON};

    use super::*;

    #[test]
    fn window_is_bounded_and_descending() {
        let mut builder = Builder::new();
        for n in 0..8 {
            builder = builder.played(PREMIER, day(10 * n), 1, 2, 1, 0);
        }
        let snapshot = builder.build();
        let window = resolve(&snapshot, 1, 2, PREMIER, day(1000), &Config::default()).unwrap();
        assert_eq!(5, window.len());
        assert_eq!(day(70), window.matches()[0].kickoff);
        for pair in window.matches().windows(2) {
            assert!(pair[0].kickoff > pair[1].kickoff);
        }
    }

    #[test]
    fn direct_league_takes_precedence() {
        let snapshot = Builder::new()
            .played(PREMIER, day(400), 1, 2, 1, 0)
            .played(PREMIER_LAST_SEASON, day(100), 2, 1, 3, 3)
            .build();
        let window = resolve(&snapshot, 1, 2, PREMIER, day(1000), &Config::default()).unwrap();
        assert_eq!(1, window.len());
        assert_eq!(PREMIER, window.matches()[0].league_id);
    }

    #[test]
    fn broadens_to_family_when_direct_empty() {
        let snapshot = Builder::new()
            .played(PREMIER_LAST_SEASON, day(100), 2, 1, 3, 3)
            .played(PREMIER_LAST_SEASON, day(50), 1, 2, 2, 0)
            .build();
        let window = resolve(&snapshot, 1, 2, PREMIER, day(1000), &Config::default()).unwrap();
        assert_eq!(2, window.len());
        assert_eq!(day(100), window.matches()[0].kickoff);
    }

    #[test]
    fn never_leaks_other_competitions() {
        let snapshot = Builder::new()
            .played(CUP, day(300), 1, 2, 5, 0)
            .played(PREMIER_LAST_SEASON, day(100), 2, 1, 1, 0)
            .build();
        let window = resolve(&snapshot, 1, 2, PREMIER, day(1000), &Config::default()).unwrap();
        assert_eq!(1, window.len());
        assert!(window.matches().iter().all(|record| record.league_id != CUP));
    }

    #[test]
    fn no_family_means_empty_window() {
        let snapshot = Builder::new().played(PREMIER, day(100), 1, 2, 1, 0).build();
        let window = resolve(&snapshot, 1, 2, CUP, day(1000), &Config::default()).unwrap();
        assert!(window.is_empty());
        assert_eq!(None, window.summary());
    }

    #[test]
    fn excludes_meetings_after_cutoff() {
        let snapshot = Builder::new()
            .played(PREMIER, day(100), 1, 2, 1, 0)
            .played(PREMIER, day(200), 1, 2, 1, 0)
            .build();
        let window = resolve(&snapshot, 1, 2, PREMIER, day(150), &Config::default()).unwrap();
        assert_eq!(1, window.len());
        assert_eq!(day(100), window.matches()[0].kickoff);
    }

    #[test]
    fn summary_oriented_to_fixture_home_team() {
        let snapshot = Builder::new()
            .played(PREMIER, day(10), 1, 2, 2, 0) // team 1 wins at home
            .played(PREMIER, day(20), 2, 1, 0, 1) // team 1 wins away
            .played(PREMIER, day(30), 2, 1, 1, 1) // draw
            .played(PREMIER, day(40), 1, 2, 0, 3) // team 2 wins away
            .build();
        let summary = resolve(&snapshot, 1, 2, PREMIER, day(1000), &Config::default())
            .unwrap()
            .summary()
            .unwrap();
        assert_eq!(4, summary.matches);
        assert_eq!((2, 1, 1), (summary.home_wins, summary.draws, summary.away_wins));
        assert_float_absolute_eq!(7.0 / 4.0, summary.home_ppg, 1e-12);
        assert_float_absolute_eq!(4.0 / 4.0, summary.away_ppg, 1e-12);
        assert_eq!([0.5, 0.25, 0.25], summary.frequencies());
        assert!(!summary.all_draws());

        let reversed = resolve(&snapshot, 2, 1, PREMIER, day(1000), &Config::default())
            .unwrap()
            .summary()
            .unwrap();
        assert_eq!((1, 1, 2), (reversed.home_wins, reversed.draws, reversed.away_wins));
    }

    #[test]
    fn window_discards_strangers_and_duplicates() {
        let snapshot = Builder::new()
            .played(PREMIER, day(10), 1, 2, 2, 2)
            .played(PREMIER, day(20), 1, 3, 2, 2)
            .build();
        let mut meetings = snapshot.played_matches(1, &[PREMIER], day(100)).unwrap();
        meetings.push(meetings[1].clone());
        let window = HeadToHeadWindow::new(1, 2, meetings, 5);
        assert_eq!(1, window.len());
        assert!(window.summary().unwrap().all_draws());
    }

    #[test]
    fn config_validation() {
        Config::default().validate().unwrap();
        assert_eq!(
            "head-to-head window must lie in 1..=20",
            Config { window: 0 }.validate().unwrap_err().to_string()
        );
    }
}
