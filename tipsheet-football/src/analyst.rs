//! Assembles the context of a fixture from the data source and hands it to the predictor.

use thiserror::Error;
use tracing::debug;

use crate::config::{Config, ValidationError};
use crate::data::{DataError, MatchData};
use crate::domain::{Fixture, FixtureId, League, LeagueId, LeagueStrengthEntry, Scope, SeasonId, TeamId};
use crate::form::{self, FormRow};
use crate::head_to_head::{self, HeadToHeadWindow};
use crate::predictor::{PredictionInputs, PredictionResult, Predictor};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("unknown fixture {0}")]
    UnknownFixture(FixtureId),

    #[error("unknown league {0}")]
    UnknownLeague(LeagueId),

    #[error("cannot resolve season {season_id} of league {league_id}")]
    UnresolvableSeason { league_id: LeagueId, season_id: SeasonId },

    #[error("unknown team {0}")]
    UnknownTeam(TeamId),

    #[error("{0}")]
    Data(#[from] DataError),
}

/// Everything known about a fixture ahead of kickoff.
#[derive(Debug, Clone)]
pub struct FixtureContext {
    pub fixture: Fixture,
    pub league: League,
    pub home_form: FormRow,
    pub away_form: FormRow,
    pub head_to_head: HeadToHeadWindow,
    pub standings: Option<(LeagueStrengthEntry, LeagueStrengthEntry)>,
}
impl FixtureContext {
    pub fn inputs(&self) -> PredictionInputs<'_> {
        PredictionInputs {
            league_id: self.fixture.league_id,
            home_team_id: self.fixture.home_team_id,
            away_team_id: self.fixture.away_team_id,
            home_form: &self.home_form,
            away_form: &self.away_form,
            head_to_head: &self.head_to_head,
            standings: self.standings.as_ref().map(|(home, away)| (home, away)),
        }
    }
}

pub struct Analyst<D: MatchData> {
    data: D,
    form: form::Config,
    head_to_head: head_to_head::Config,
    predictor: Predictor,
}
impl<D: MatchData> Analyst<D> {
    pub fn new(data: D, config: &Config) -> Result<Self, ValidationError> {
        config.validate()?;
        let predictor = Predictor::new(config.predictor.clone(), config.form.limit, config.head_to_head.window)?;
        Ok(Self {
            data,
            form: config.form.clone(),
            head_to_head: config.head_to_head.clone(),
            predictor,
        })
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn fixture(&self, fixture_id: FixtureId) -> Result<Fixture, AnalysisError> {
        self.data
            .fixture(fixture_id)?
            .ok_or(AnalysisError::UnknownFixture(fixture_id))
    }

    /// The league-season of the fixture, provided that its season can be resolved.
    pub fn league_of(&self, fixture: &Fixture) -> Result<League, AnalysisError> {
        let league = self
            .data
            .league(fixture.league_id)?
            .ok_or(AnalysisError::UnknownLeague(fixture.league_id))?;
        if self.data.season(league.season_id)?.is_none() {
            return Err(AnalysisError::UnresolvableSeason {
                league_id: league.id,
                season_id: league.season_id,
            });
        }
        Ok(league)
    }

    pub fn context(&self, fixture: &Fixture) -> Result<FixtureContext, AnalysisError> {
        let league = self.league_of(fixture)?;
        for team in [fixture.home_team_id, fixture.away_team_id] {
            if self.data.team(team)?.is_none() {
                return Err(AnalysisError::UnknownTeam(team));
            }
        }

        let form_of = |team: TeamId, scope: Scope| -> Result<FormRow, AnalysisError> {
            let history = self.data.played_matches(team, &[league.id], fixture.kickoff)?;
            Ok(form::aggregate(team, &history, scope, self.form.limit))
        };
        let home_form = form_of(fixture.home_team_id, Scope::Home)?;
        let away_form = form_of(fixture.away_team_id, Scope::Away)?;

        let head_to_head = head_to_head::resolve(
            &self.data,
            fixture.home_team_id,
            fixture.away_team_id,
            league.id,
            fixture.kickoff,
            &self.head_to_head,
        )?;

        let table = self.data.standings(league.id)?;
        let find = |team: TeamId| table.iter().find(|entry| entry.team_id == team).cloned();
        let standings = find(fixture.home_team_id).zip(find(fixture.away_team_id));

        debug!(
            "fixture {}: home form {} ({:.2} ppg), away form {} ({:.2} ppg), {} meetings, standings {}",
            fixture.id,
            home_form.sequence,
            home_form.points_per_game(),
            away_form.sequence,
            away_form.points_per_game(),
            head_to_head.len(),
            if standings.is_some() { "found" } else { "missing" }
        );
        Ok(FixtureContext {
            fixture: fixture.clone(),
            league,
            home_form,
            away_form,
            head_to_head,
            standings,
        })
    }

    pub fn analyse(&self, fixture: &Fixture) -> Result<PredictionResult, AnalysisError> {
        let context = self.context(fixture)?;
        Ok(self.predictor.predict(&context.inputs()))
    }
}

#[cfg(test)]
mod tests {
    use crate::data::tests::{day, entry, league, Builder, CUP, PREMIER, PREMIER_LAST_SEASON};
    use crate::data::Snapshot;

    use super::*;

    fn analyst(snapshot: Snapshot) -> Analyst<Snapshot> {
        Analyst::new(snapshot, &Config::default()).unwrap()
    }

    fn analyse(analyst: &Analyst<Snapshot>, fixture_id: FixtureId) -> Result<PredictionResult, AnalysisError> {
        analyst.fixture(fixture_id).and_then(|fixture| analyst.analyse(&fixture))
    }

    fn populated() -> Builder {
        Builder::new()
            .played(PREMIER, day(10), 1, 3, 2, 0)
            .played(PREMIER, day(20), 4, 1, 1, 1)
            .played(PREMIER, day(30), 1, 5, 3, 1)
            .played(PREMIER, day(15), 6, 2, 0, 1)
            .played(PREMIER, day(25), 7, 2, 2, 2)
            .played(CUP, day(35), 1, 2, 4, 0)
            .played(PREMIER, day(300), 1, 2, 1, 0)
            .fixture(100, PREMIER, day(200), 1, 2)
    }

    #[test]
    fn context_splits_form_by_venue() {
        let analyst = analyst(populated().build());
        let fixture = analyst.fixture(100).unwrap();
        let context = analyst.context(&fixture).unwrap();
        assert_eq!(Scope::Home, context.home_form.scope);
        assert_eq!(2, context.home_form.matches_considered);
        assert_eq!("WW", context.home_form.sequence);
        assert_eq!(Scope::Away, context.away_form.scope);
        assert_eq!(2, context.away_form.matches_considered);
        assert_eq!("DW", context.away_form.sequence);
    }

    #[test]
    fn context_excludes_later_and_unrelated_matches() {
        let analyst = analyst(populated().build());
        let context = analyst.context(&analyst.fixture(100).unwrap()).unwrap();
        // the cup meeting is another competition and the league meeting is after kickoff
        assert!(context.head_to_head.is_empty());
        assert!(context.standings.is_none());
    }

    #[test]
    fn context_uses_family_meetings_and_standings() {
        let snapshot = populated()
            .played(PREMIER_LAST_SEASON, day(5), 2, 1, 0, 0)
            .table(PREMIER, vec![entry(1, 1, 25, 10, 15), entry(2, 20, 5, 10, -20)])
            .build();
        let analyst = analyst(snapshot);
        let context = analyst.context(&analyst.fixture(100).unwrap()).unwrap();
        assert_eq!(1, context.head_to_head.len());
        let (home, away) = context.standings.unwrap();
        assert_eq!((1, 20), (home.position, away.position));
    }

    #[test]
    fn analyse_with_standings() {
        let snapshot = populated()
            .table(PREMIER, vec![entry(1, 1, 25, 10, 15), entry(2, 20, 5, 10, -20)])
            .build();
        let prediction = analyse(&analyst(snapshot), 100).unwrap();
        assert_eq!((PREMIER, 1, 2), (prediction.league_id, prediction.home_team_id, prediction.away_team_id));
        assert_eq!(100, prediction.win_probabilities.total());
        assert!(prediction.win_probabilities.home_win > prediction.win_probabilities.away_win);
    }

    #[test]
    fn unknown_fixture() {
        let err = analyse(&analyst(populated().build()), 999).unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownFixture(999)));
    }

    #[test]
    fn unknown_league() {
        let analyst = analyst(populated().fixture(101, 77, day(200), 1, 2).build());
        let err = analyse(&analyst, 101).unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownLeague(77)));
    }

    #[test]
    fn unresolvable_season() {
        let snapshot = populated()
            .league(league(50, "Serie A", "Italy", 1999))
            .fixture(101, 50, day(200), 1, 2)
            .build();
        let err = analyse(&analyst(snapshot), 101).unwrap_err();
        assert_eq!("cannot resolve season 1999 of league 50", err.to_string());
    }

    #[test]
    fn unknown_team() {
        let analyst = analyst(populated().fixture(101, PREMIER, day(200), 1, 42).build());
        let err = analyse(&analyst, 101).unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownTeam(42)));
    }

    #[test]
    fn thin_data_still_predicts() {
        let analyst = analyst(Builder::new().fixture(100, PREMIER, day(0), 1, 2).build());
        let prediction = analyse(&analyst, 100).unwrap();
        assert_eq!(100, prediction.win_probabilities.total());
        assert_eq!(1.5, prediction.expected_goals.home);
        assert!(prediction.confidence <= 25);
    }
}
