use stanza::style::HAlign::Left;
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Cell, Col, Row, Table};

use crate::domain::TeamId;
use crate::predictor::PredictionResult;
use crate::registry::{FixtureAnalysisResult, JobStatusView, Page};

fn left(min_width: usize) -> Col {
    Col::new(Styles::default().with(MinWidth(min_width)).with(Left))
}

fn right(min_width: usize) -> Col {
    Col::new(Styles::default().with(MinWidth(min_width)).with(HAlign::Right))
}

fn header(labels: &[&str]) -> Row {
    Row::new(
        Styles::default().with(Header(true)),
        labels.iter().map(|&label| label.into()).collect(),
    )
}

pub fn tabulate_prediction(prediction: &PredictionResult, home_team: &str, away_team: &str) -> Table {
    let mut table = Table::default().with_cols(vec![left(20), right(10)]);
    let mut push = |label: String, value: String| {
        table.push_row(Row::new(Styles::default(), vec![label.into(), value.into()]));
    };
    let win = &prediction.win_probabilities;
    push(format!("{home_team} win"), format!("{}%", win.home_win));
    push("Draw".into(), format!("{}%", win.draw));
    push(format!("{away_team} win"), format!("{}%", win.away_win));
    push(
        "Expected goals".into(),
        format!("{:.2} - {:.2}", prediction.expected_goals.home, prediction.expected_goals.away),
    );
    push("Both teams score".into(), format!("{:.1}%", prediction.btts_probability));
    push("Over 1.5".into(), format!("{:.1}%", prediction.over15_probability));
    push("Over 2.5".into(), format!("{:.1}%", prediction.over25_probability));
    if let Some(summary) = &prediction.head_to_head {
        push(
            "Head to head".into(),
            format!("{}-{}-{} of {}", summary.home_wins, summary.draws, summary.away_wins, summary.matches),
        );
    }
    push("Confidence".into(), prediction.confidence.to_string());
    push("Advice".into(), prediction.advice.clone());
    table
}

pub fn tabulate_correct_scores(prediction: &PredictionResult) -> Table {
    let mut table = Table::default()
        .with_cols(vec![left(8), right(10)])
        .with_row(header(&["Score", "Probability"]));
    for cell in &prediction.correct_scores {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                format!("{}-{}", cell.score.home, cell.score.away).into(),
                format!("{:.1}%", cell.probability).into(),
            ],
        ));
    }
    table
}

pub fn tabulate_status(status: &JobStatusView) -> Table {
    let mut table = Table::default().with_cols(vec![left(12), right(10)]);
    let eta = status
        .eta_seconds
        .map(|eta| format!("{eta:.1}s"))
        .unwrap_or_else(|| "unknown".into());
    let finished_at = status
        .finished_at
        .map(|finished_at| finished_at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();
    for (label, value) in [
        ("Job", status.job_id.to_string()),
        ("Date", status.date.to_string()),
        ("Status", status.status.to_string()),
        ("Total", status.total.to_string()),
        ("Completed", status.completed.to_string()),
        ("Failed", status.failed.to_string()),
        ("In progress", status.in_progress.to_string()),
        ("ETA", eta),
        ("Finished", finished_at),
    ] {
        table.push_row(Row::new(Styles::default(), vec![label.into(), value.into()]));
    }
    if let Some(error) = &status.error {
        table.push_row(Row::new(Styles::default(), vec!["Error".into(), error.clone().into()]));
    }
    table
}

/// One row per fixture. Failed fixtures show their error in place of the advice.
pub fn tabulate_results(page: &Page<FixtureAnalysisResult>, team_name: impl Fn(TeamId) -> String) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            left(16),
            left(6),
            left(30),
            right(5),
            right(5),
            right(5),
            right(5),
            left(20),
        ])
        .with_row(header(&["League", "Time", "Fixture", "1", "X", "2", "Conf", "Advice"]));
    for result in &page.items {
        let fixture = format!("{} v {}", team_name(result.home_team_id), team_name(result.away_team_id));
        let mut cells: Vec<Cell> = vec![
            result.league_name.clone().into(),
            result.kickoff.format("%H:%M").to_string().into(),
            fixture.into(),
        ];
        match &result.prediction {
            Some(prediction) => {
                let win = &prediction.win_probabilities;
                cells.push(win.home_win.to_string().into());
                cells.push(win.draw.to_string().into());
                cells.push(win.away_win.to_string().into());
                cells.push(prediction.confidence.to_string().into());
                cells.push(prediction.advice.clone().into());
            }
            None => {
                cells.extend((0..4).map(|_| "-".into()));
                cells.push(result.error.clone().unwrap_or_default().into());
            }
        }
        table.push_row(Row::new(Styles::default(), cells));
    }
    table
}
