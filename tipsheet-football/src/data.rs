//! Read-only access to match histories, league tables and fixtures.

use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use tipsheet::file::read_json;

use crate::domain::{
    Fixture, FixtureId, League, LeagueId, LeagueStrengthEntry, MatchRecord, Season, SeasonId, Team,
    TeamId,
};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// The persistence layer, as seen by the prediction engine. Every listing of played matches
/// is ordered most recent first.
pub trait MatchData: Send + Sync {
    fn league(&self, id: LeagueId) -> Result<Option<League>, DataError>;

    fn season(&self, id: SeasonId) -> Result<Option<Season>, DataError>;

    fn team(&self, id: TeamId) -> Result<Option<Team>, DataError>;

    /// Ids of every league-season sharing the name and country of `id`, `id` included. An
    /// unknown `id` has no family.
    fn league_family(&self, id: LeagueId) -> Result<Vec<LeagueId>, DataError>;

    /// Matches played by `team` in any of `leagues`, kicking off strictly before `before`.
    fn played_matches(
        &self,
        team: TeamId,
        leagues: &[LeagueId],
        before: NaiveDateTime,
    ) -> Result<Vec<MatchRecord>, DataError>;

    /// Matches between `team_a` and `team_b`, in either venue, in any of `leagues`, kicking
    /// off strictly before `before`.
    fn meetings(
        &self,
        team_a: TeamId,
        team_b: TeamId,
        leagues: &[LeagueId],
        before: NaiveDateTime,
    ) -> Result<Vec<MatchRecord>, DataError>;

    fn standings(&self, league: LeagueId) -> Result<Vec<LeagueStrengthEntry>, DataError>;

    /// Fixtures kicking off on `date`, optionally restricted to leagues of one season.
    fn fixtures_on(&self, date: NaiveDate, season: Option<SeasonId>) -> Result<Vec<Fixture>, DataError>;

    fn fixture(&self, id: FixtureId) -> Result<Option<Fixture>, DataError>;
}

impl<D: MatchData + ?Sized> MatchData for Arc<D> {
    fn league(&self, id: LeagueId) -> Result<Option<League>, DataError> {
        (**self).league(id)
    }

    fn season(&self, id: SeasonId) -> Result<Option<Season>, DataError> {
        (**self).season(id)
    }

    fn team(&self, id: TeamId) -> Result<Option<Team>, DataError> {
        (**self).team(id)
    }

    fn league_family(&self, id: LeagueId) -> Result<Vec<LeagueId>, DataError> {
        (**self).league_family(id)
    }

    fn played_matches(
        &self,
        team: TeamId,
        leagues: &[LeagueId],
        before: NaiveDateTime,
    ) -> Result<Vec<MatchRecord>, DataError> {
        (**self).played_matches(team, leagues, before)
    }

    fn meetings(
        &self,
        team_a: TeamId,
        team_b: TeamId,
        leagues: &[LeagueId],
        before: NaiveDateTime,
    ) -> Result<Vec<MatchRecord>, DataError> {
        (**self).meetings(team_a, team_b, leagues, before)
    }

    fn standings(&self, league: LeagueId) -> Result<Vec<LeagueStrengthEntry>, DataError> {
        (**self).standings(league)
    }

    fn fixtures_on(&self, date: NaiveDate, season: Option<SeasonId>) -> Result<Vec<Fixture>, DataError> {
        (**self).fixtures_on(date, season)
    }

    fn fixture(&self, id: FixtureId) -> Result<Option<Fixture>, DataError> {
        (**self).fixture(id)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueTable {
    pub league_id: LeagueId,
    pub entries: Vec<LeagueStrengthEntry>,
}

/// The serialised form of a [`Snapshot`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotDocument {
    pub leagues: Vec<League>,
    pub seasons: Vec<Season>,
    pub teams: Vec<Team>,
    pub matches: Vec<MatchRecord>,
    pub fixtures: Vec<Fixture>,
    pub tables: Vec<LeagueTable>,
}

/// An immutable, fully indexed copy of the data set, held in memory.
#[derive(Debug, Default)]
pub struct Snapshot {
    leagues: FxHashMap<LeagueId, League>,
    seasons: FxHashMap<SeasonId, Season>,
    teams: FxHashMap<TeamId, Team>,
    matches_by_team: FxHashMap<TeamId, Vec<MatchRecord>>,
    fixtures: FxHashMap<FixtureId, Fixture>,
    tables: FxHashMap<LeagueId, Vec<LeagueStrengthEntry>>,
}
impl Snapshot {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let document: SnapshotDocument = read_json(path)?;
        Ok(Self::from(document))
    }
}

impl From<SnapshotDocument> for Snapshot {
    fn from(document: SnapshotDocument) -> Self {
        let mut matches_by_team: FxHashMap<TeamId, Vec<MatchRecord>> = FxHashMap::default();
        for record in document.matches {
            matches_by_team
                .entry(record.away_team_id)
                .or_default()
                .push(record.clone());
            matches_by_team
                .entry(record.home_team_id)
                .or_default()
                .push(record);
        }
        for history in matches_by_team.values_mut() {
            sort_most_recent_first(history);
        }

        let snapshot = Self {
            leagues: index_by(document.leagues, |league| league.id),
            seasons: index_by(document.seasons, |season| season.id),
            teams: index_by(document.teams, |team| team.id),
            matches_by_team,
            fixtures: index_by(document.fixtures, |fixture| fixture.id),
            tables: document
                .tables
                .into_iter()
                .map(|table| (table.league_id, table.entries))
                .collect(),
        };
        debug!(
            "indexed {} leagues, {} teams, {} fixtures",
            snapshot.leagues.len(),
            snapshot.teams.len(),
            snapshot.fixtures.len()
        );
        snapshot
    }
}

fn index_by<K: std::hash::Hash + Eq, V>(items: Vec<V>, key: impl Fn(&V) -> K) -> FxHashMap<K, V> {
    items.into_iter().map(|item| (key(&item), item)).collect()
}

/// Orders matches by descending kickoff; simultaneous kickoffs fall back to descending id.
pub fn sort_most_recent_first(records: &mut [MatchRecord]) {
    records.sort_by(|a, b| b.kickoff.cmp(&a.kickoff).then_with(|| b.id.cmp(&a.id)));
}

impl MatchData for Snapshot {
    fn league(&self, id: LeagueId) -> Result<Option<League>, DataError> {
        Ok(self.leagues.get(&id).cloned())
    }

    fn season(&self, id: SeasonId) -> Result<Option<Season>, DataError> {
        Ok(self.seasons.get(&id).cloned())
    }

    fn team(&self, id: TeamId) -> Result<Option<Team>, DataError> {
        Ok(self.teams.get(&id).cloned())
    }

    fn league_family(&self, id: LeagueId) -> Result<Vec<LeagueId>, DataError> {
        let Some(league) = self.leagues.get(&id) else {
            return Ok(vec![]);
        };
        let mut family = self
            .leagues
            .values()
            .filter(|other| other.is_related(league))
            .map(|other| other.id)
            .collect::<Vec<_>>();
        family.sort_unstable();
        Ok(family)
    }

    fn played_matches(
        &self,
        team: TeamId,
        leagues: &[LeagueId],
        before: NaiveDateTime,
    ) -> Result<Vec<MatchRecord>, DataError> {
        Ok(self
            .matches_by_team
            .get(&team)
            .map(|history| {
                history
                    .iter()
                    .filter(|record| record.kickoff < before && leagues.contains(&record.league_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn meetings(
        &self,
        team_a: TeamId,
        team_b: TeamId,
        leagues: &[LeagueId],
        before: NaiveDateTime,
    ) -> Result<Vec<MatchRecord>, DataError> {
        let mut meetings = self.played_matches(team_a, leagues, before)?;
        meetings.retain(|record| record.involves(team_b));
        Ok(meetings)
    }

    fn standings(&self, league: LeagueId) -> Result<Vec<LeagueStrengthEntry>, DataError> {
        Ok(self.tables.get(&league).cloned().unwrap_or_default())
    }

    fn fixtures_on(&self, date: NaiveDate, season: Option<SeasonId>) -> Result<Vec<Fixture>, DataError> {
        let mut fixtures = self
            .fixtures
            .values()
            .filter(|fixture| fixture.kickoff.date() == date)
            .filter(|fixture| match season {
                None => true,
                Some(season) => self
                    .leagues
                    .get(&fixture.league_id)
                    .map(|league| league.season_id == season)
                    .unwrap_or(false),
            })
            .cloned()
            .collect::<Vec<_>>();
        fixtures.sort_by(|a, b| a.kickoff.cmp(&b.kickoff).then_with(|| a.id.cmp(&b.id)));
        Ok(fixtures)
    }

    fn fixture(&self, id: FixtureId) -> Result<Option<Fixture>, DataError> {
        Ok(self.fixtures.get(&id).cloned())
    }
}
