use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};

use tipsheet_football::domain::{LeagueStrengthEntry, MatchRecord, Scope};
use tipsheet_football::form::FormRow;
use tipsheet_football::head_to_head::HeadToHeadWindow;
use tipsheet_football::predictor::{Config, PredictionInputs, Predictor};

fn criterion_benchmark(c: &mut Criterion) {
    let form = |team_id, scope, goals_for, goals_against| FormRow {
        matches_considered: 10,
        weighted_goals_for: goals_for,
        weighted_goals_against: goals_against,
        ..FormRow::empty(team_id, scope)
    };
    let home_form = form(1, Scope::Home, 1.9, 0.8);
    let away_form = form(2, Scope::Away, 1.1, 1.6);
    let kickoff = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(15, 0, 0)
        .unwrap();
    let meetings = (0..5)
        .map(|id| MatchRecord {
            id,
            league_id: 1,
            kickoff: kickoff - chrono::Duration::days(100 * id as i64),
            home_team_id: 1 + (id % 2) as u32,
            away_team_id: 2 - (id % 2) as u32,
            home_goals: 2,
            away_goals: 1,
        })
        .collect();
    let head_to_head = HeadToHeadWindow::new(1, 2, meetings, 5);
    let home = LeagueStrengthEntry {
        team_id: 1,
        position: 3,
        points: 40,
        matches_played: 20,
        goal_difference: 14,
    };
    let away = LeagueStrengthEntry {
        team_id: 2,
        position: 12,
        points: 24,
        matches_played: 20,
        goal_difference: -6,
    };
    let inputs = PredictionInputs {
        league_id: 1,
        home_team_id: 1,
        away_team_id: 2,
        home_form: &home_form,
        away_form: &away_form,
        head_to_head: &head_to_head,
        standings: Some((&home, &away)),
    };

    let predictor = Predictor::new(Config::default(), 10, 5).unwrap();
    // sanity check
    assert_eq!(100, predictor.predict(&inputs).win_probabilities.total());

    c.bench_function("cri_predict_6_goals", |b| {
        b.iter(|| predictor.predict(&inputs));
    });

    let predictor = Predictor::new(
        Config {
            max_goals: 10,
            ..Config::default()
        },
        10,
        5,
    )
    .unwrap();
    c.bench_function("cri_predict_10_goals", |b| {
        b.iter(|| predictor.predict(&inputs));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
