use chrono::NaiveDateTime;
use ordinalizer::Ordinal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount, EnumIter};

pub type TeamId = u32;
pub type LeagueId = u32;
pub type SeasonId = u32;
pub type FixtureId = u64;
pub type MatchId = u64;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Score {
    pub home: u8,
    pub away: u8,
}
impl Score {
    pub fn new(home: u8, away: u8) -> Self {
        Self { home, away }
    }

    pub fn total(&self) -> u16 {
        self.home as u16 + self.away as u16
    }

    pub fn outcome(&self) -> MatchOutcome {
        match self.home.cmp(&self.away) {
            std::cmp::Ordering::Greater => MatchOutcome::HomeWin,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
            std::cmp::Ordering::Less => MatchOutcome::AwayWin,
        }
    }

    pub fn both_scored(&self) -> bool {
        self.home > 0 && self.away > 0
    }
}

/// The three-way result of a match, seen from the home side. The ordinal doubles as the
/// index into three-way probability arrays.
#[derive(
    Clone, Copy, Debug, Hash, PartialEq, Eq, Ordinal, EnumCount, EnumIter, Display, Serialize, Deserialize,
)]
pub enum MatchOutcome {
    HomeWin,
    Draw,
    AwayWin,
}

/// A match result from one team's point of view.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamResult {
    Win,
    Draw,
    Loss,
}
impl TeamResult {
    pub fn points(&self) -> u32 {
        match self {
            TeamResult::Win => 3,
            TeamResult::Draw => 1,
            TeamResult::Loss => 0,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            TeamResult::Win => 'W',
            TeamResult::Draw => 'D',
            TeamResult::Loss => 'L',
        }
    }
}

/// Which of a team's matches are considered when aggregating form.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, EnumIter, Display, Serialize, Deserialize)]
pub enum Scope {
    #[default]
    Overall,
    Home,
    Away,
}
impl Scope {
    pub fn admits(&self, side: Side) -> bool {
        matches!(
            (self, side),
            (Scope::Overall, _) | (Scope::Home, Side::Home) | (Scope::Away, Side::Away)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}

/// A competition in a single season. Leagues that share a name and a country form a
/// family, which keeps head-to-head history continuous across seasons and renames.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: LeagueId,
    pub name: String,
    pub country: String,
    pub season_id: SeasonId,
}
impl League {
    pub fn is_related(&self, other: &League) -> bool {
        self.name.trim().eq_ignore_ascii_case(other.name.trim())
            && self.country.trim().eq_ignore_ascii_case(other.country.trim())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub name: String,
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

/// A match that has been played.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub league_id: LeagueId,
    pub kickoff: NaiveDateTime,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_goals: u8,
    pub away_goals: u8,
}
impl MatchRecord {
    pub fn score(&self) -> Score {
        Score::new(self.home_goals, self.away_goals)
    }

    pub fn side_of(&self, team: TeamId) -> Option<Side> {
        if self.home_team_id == team {
            Some(Side::Home)
        } else if self.away_team_id == team {
            Some(Side::Away)
        } else {
            None
        }
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.side_of(team).is_some()
    }

    /// Goals scored and conceded by the team playing on `side`.
    pub fn goals_for_against(&self, side: Side) -> (u8, u8) {
        match side {
            Side::Home => (self.home_goals, self.away_goals),
            Side::Away => (self.away_goals, self.home_goals),
        }
    }

    pub fn result_for(&self, side: Side) -> TeamResult {
        let (scored, conceded) = self.goals_for_against(side);
        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => TeamResult::Win,
            std::cmp::Ordering::Equal => TeamResult::Draw,
            std::cmp::Ordering::Less => TeamResult::Loss,
        }
    }
}

/// A match that is yet to be played.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: FixtureId,
    pub league_id: LeagueId,
    pub kickoff: NaiveDateTime,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
}

/// A team's row in its league table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueStrengthEntry {
    pub team_id: TeamId,
    pub position: u32,
    pub points: u32,
    pub matches_played: u32,
    pub goal_difference: i32,
}
impl LeagueStrengthEntry {
    pub fn is_established(&self) -> bool {
        self.matches_played > 0 && self.position > 0
    }

    pub fn points_per_game(&self) -> f64 {
        self.points as f64 / self.matches_played as f64
    }

    pub fn goal_difference_per_game(&self) -> f64 {
        self.goal_difference as f64 / self.matches_played as f64
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn record(home_goals: u8, away_goals: u8) -> MatchRecord {
        MatchRecord {
            id: 1,
            league_id: 10,
            kickoff: NaiveDate::from_ymd_opt(2024, 3, 2)
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
            home_team_id: 100,
            away_team_id: 200,
            home_goals,
            away_goals,
        }
    }

    #[test]
    fn side_of() {
        let record = record(2, 1);
        assert_eq!(Some(Side::Home), record.side_of(100));
        assert_eq!(Some(Side::Away), record.side_of(200));
        assert_eq!(None, record.side_of(300));
        assert!(!record.involves(300));
    }

    #[test]
    fn result_for() {
        let record = record(2, 1);
        assert_eq!(TeamResult::Win, record.result_for(Side::Home));
        assert_eq!(TeamResult::Loss, record.result_for(Side::Away));
        assert_eq!((1, 2), record.goals_for_against(Side::Away));
        assert_eq!(TeamResult::Draw, self::record(1, 1).result_for(Side::Away));
    }

    #[test]
    fn score_outcome() {
        assert_eq!(MatchOutcome::HomeWin, Score::new(3, 0).outcome());
        assert_eq!(MatchOutcome::Draw, Score::new(0, 0).outcome());
        assert_eq!(MatchOutcome::AwayWin, Score::new(1, 2).outcome());
        assert!(Score::new(1, 2).both_scored());
        assert!(!Score::new(0, 2).both_scored());
    }

    #[test]
    fn outcome_ordinals() {
        assert_eq!(0, MatchOutcome::HomeWin.ordinal());
        assert_eq!(1, MatchOutcome::Draw.ordinal());
        assert_eq!(2, MatchOutcome::AwayWin.ordinal());
    }

    #[test]
    fn scope_admits() {
        assert!(Scope::Overall.admits(Side::Away));
        assert!(Scope::Home.admits(Side::Home));
        assert!(!Scope::Home.admits(Side::Away));
        assert!(!Scope::Away.admits(Side::Home));
    }

    #[test]
    fn related_leagues() {
        let premier = League {
            id: 1,
            name: "Premier League".into(),
            country: "England".into(),
            season_id: 2023,
        };
        let next_season = League {
            id: 2,
            name: "premier league ".into(),
            country: "ENGLAND".into(),
            season_id: 2024,
        };
        let elsewhere = League {
            id: 3,
            name: "Premier League".into(),
            country: "Wales".into(),
            season_id: 2024,
        };
        assert!(premier.is_related(&next_season));
        assert!(!premier.is_related(&elsewhere));
    }

    #[test]
    fn strength_entry() {
        let entry = LeagueStrengthEntry {
            team_id: 1,
            position: 1,
            points: 25,
            matches_played: 10,
            goal_difference: 15,
        };
        assert!(entry.is_established());
        assert_eq!(2.5, entry.points_per_game());
        assert_eq!(1.5, entry.goal_difference_per_game());
        assert!(!LeagueStrengthEntry {
            matches_played: 0,
            ..entry
        }
        .is_established());
    }
}
