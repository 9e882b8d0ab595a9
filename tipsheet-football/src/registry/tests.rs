use chrono::{Duration, TimeZone};

use crate::data::tests::day;

use super::*;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap()
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
}

fn outcome(fixture_id: FixtureId, league_name: &str, kickoff: i64, success: bool, duration_ms: u64) -> FixtureAnalysisResult {
    FixtureAnalysisResult {
        fixture_id,
        league_id: 1,
        league_name: league_name.into(),
        kickoff: day(kickoff),
        home_team_id: 1,
        away_team_id: 2,
        success,
        error: (!success).then(|| "unknown team 2".to_string()),
        prediction: None,
        duration_ms,
        cache_hit: false,
    }
}

fn job() -> JobMetadata {
    JobMetadata::new(Uuid::new_v4(), date(), None, false, now())
}

#[test]
fn lifecycle_to_completion() {
    let mut job = job();
    assert_eq!(JobStatus::Pending, job.status);
    job.start(3, now());
    assert_eq!(JobStatus::Running, job.status);

    for _ in 0..3 {
        job.begin_fixture();
    }
    assert_eq!(3, job.in_progress);
    job.record(outcome(3, "Serie A", 1, true, 20), now());
    job.record(outcome(1, "Bundesliga", 2, false, 10), now());
    assert_eq!(JobStatus::Running, job.status);
    assert_eq!((1, 1, 1), (job.completed, job.failed, job.in_progress));
    assert_eq!(job.finished(), job.results.len());

    job.record(outcome(2, "Bundesliga", 1, true, 30), now());
    assert_eq!(JobStatus::Completed, job.status);
    assert_eq!(Some(now()), job.finished_at);
    assert_eq!(0, job.in_progress);
    assert_eq!(
        vec![2, 1, 3],
        job.results.iter().map(|result| result.fixture_id).collect::<Vec<_>>()
    );
}

#[test]
fn completes_despite_failures() {
    let mut job = job();
    job.start(2, now());
    job.record(outcome(1, "Serie A", 1, false, 5), now());
    job.record(outcome(2, "Serie A", 1, false, 5), now());
    assert_eq!(JobStatus::Completed, job.status);
    assert_eq!(2, job.failed);
}

#[test]
fn results_past_total_are_ignored() {
    let mut job = job();
    job.start(1, now());
    job.record(outcome(1, "Serie A", 1, true, 5), now());
    job.record(outcome(2, "Serie A", 1, true, 5), now());
    assert_eq!(1, job.completed);
    assert_eq!(1, job.results.len());
}

#[test]
fn empty_job_completes_on_start() {
    let mut job = job();
    job.start(0, now());
    assert_eq!(JobStatus::Completed, job.status);
    assert_eq!(Some(0.0), job.eta_seconds());
}

#[test]
fn failed_job_keeps_error() {
    let mut job = job();
    job.fail("data source unavailable: timeout".into(), now());
    let view = job.view();
    assert_eq!(JobStatus::Failed, view.status);
    assert_eq!(Some("data source unavailable: timeout".to_string()), view.error);
    assert!(view.status.is_terminal());
}

#[test]
fn eta_decreases_with_progress() {
    let mut job = job();
    job.start(5, now());
    assert_eq!(None, job.eta_seconds());

    let mut previous = f64::MAX;
    for fixture_id in 0..4 {
        job.record(outcome(fixture_id, "Serie A", 1, true, 400), now());
        let eta = job.eta_seconds().unwrap();
        assert!(eta >= 0.0);
        assert!(eta < previous, "{eta} not below {previous}");
        previous = eta;
    }
    assert_eq!(Some(0.4), job.eta_seconds());
}

#[test]
fn average_duration_floored() {
    let mut job = job();
    job.start(4, now());
    job.record(outcome(1, "Serie A", 1, true, 0), now());
    assert_eq!(Some(1.0), job.average_duration_ms());
    assert_eq!(Some(0.003), job.eta_seconds());
}

#[test]
fn status_display() {
    assert_eq!("COMPLETED", JobStatus::Completed.to_string());
    assert_eq!(r#""RUNNING""#, serde_json::to_string(&JobStatus::Running).unwrap());
}

#[test]
fn pages() {
    let items = (1..=7).collect::<Vec<_>>();
    let page = Page::of(&items, 1, 3);
    assert_eq!(vec![1, 2, 3], page.items);
    assert_eq!((7, 3), (page.total_items, page.total_pages));

    assert_eq!(vec![7], Page::of(&items, 3, 3).items);
    assert!(Page::of(&items, 4, 3).items.is_empty());
    assert_eq!(vec![1], Page::of(&items, 0, 0).items);
    assert_eq!(0, Page::of(&Vec::<u8>::new(), 1, 10).total_pages);
}

#[test]
fn registry_results_in_presentation_order() {
    let registry = JobRegistry::default();
    let job_id = registry.create(date(), None, false);
    registry.update(&job_id, |job| job.start(3, now())).unwrap();
    registry.update(&job_id, |job| job.record(outcome(1, "Serie A", 1, true, 5), now()));
    registry.update(&job_id, |job| job.record(outcome(2, "La Liga", 3, true, 5), now()));
    registry.update(&job_id, |job| job.record(outcome(3, "La Liga", 2, true, 5), now()));

    let page = registry.results(&job_id, 1, 2).unwrap();
    assert_eq!(vec![3, 2], page.items.iter().map(|result| result.fixture_id).collect::<Vec<_>>());
    assert_eq!(2, page.total_pages);
    assert_eq!(JobStatus::Completed, registry.view(&job_id).unwrap().status);
}

#[test]
fn running_job_results_are_ordered_too() {
    let registry = JobRegistry::default();
    let job_id = registry.create(date(), None, false);
    registry.update(&job_id, |job| job.start(3, now()));
    registry.update(&job_id, |job| job.record(outcome(1, "Serie A", 1, true, 5), now()));
    registry.update(&job_id, |job| job.record(outcome(2, "La Liga", 3, true, 5), now()));
    let page = registry.results(&job_id, 1, 10).unwrap();
    assert_eq!(vec![2, 1], page.items.iter().map(|result| result.fixture_id).collect::<Vec<_>>());
}

#[test]
fn unknown_job() {
    let registry = JobRegistry::default();
    assert!(registry.view(&Uuid::new_v4()).is_none());
    assert!(registry.results(&Uuid::new_v4(), 1, 10).is_none());
    assert!(registry.update(&Uuid::new_v4(), |job| job.begin_fixture()).is_none());
}

#[test]
fn eviction_after_retention() {
    let registry = JobRegistry::default();
    let finished = registry.create(date(), None, false);
    let running = registry.create(date(), None, false);
    registry.update(&finished, |job| job.start(0, now()));
    registry.update(&running, |job| job.start(5, now()));
    assert_eq!(2, registry.len());

    assert_eq!(0, registry.evict_expired(now() + Duration::hours(23)));
    assert_eq!(0, registry.evict_expired(now() + Duration::hours(24)));
    assert_eq!(1, registry.evict_expired(now() + Duration::hours(24) + Duration::seconds(1)));
    assert!(registry.view(&finished).is_none());
    assert!(registry.view(&running).is_some());
}

#[tokio::test(start_paused = true)]
async fn sweeper_evicts_every_period() {
    let registry = Arc::new(JobRegistry::default());
    let stale = registry.create(date(), None, false);
    let recent = registry.create(date(), None, false);
    let long_ago = Utc::now() - registry.config.retention() - Duration::minutes(1);
    registry.update(&stale, |job| job.start(0, long_ago));
    registry.update(&recent, |job| job.start(0, Utc::now()));

    let sweeper = registry.spawn_sweeper();
    let period = registry.config.sweep_period();
    tokio::time::sleep(period / 2).await;
    assert_eq!(2, registry.len());

    tokio::time::sleep(period).await;
    assert!(registry.view(&stale).is_none());
    assert!(registry.view(&recent).is_some());

    registry.update(&recent, |job| job.finished_at = Some(long_ago));
    tokio::time::sleep(period).await;
    assert!(registry.is_empty());
    sweeper.abort();
}

#[test]
fn config_validation() {
    Config::default().validate().unwrap();
    assert_eq!(chrono::Duration::hours(24), Config::default().retention());
    assert_eq!(3600, Config::default().sweep_period().as_secs());
    assert!(Config {
        retention_hours: 0,
        ..Config::default()
    }
    .validate()
    .is_err());
}
