//! Fans fixture analysis out over the worker pool, one job per date.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use tipsheet::timed::Timed;

use crate::analyst::{AnalysisError, Analyst};
use crate::cache::{CacheKey, Cached, ResultCache};
use crate::config::{Config, ValidationError};
use crate::data::{DataError, MatchData};
use crate::domain::{Fixture, FixtureId, SeasonId};
use crate::pool::WorkerPool;
use crate::quota::QuotaExceeded;
use crate::registry::{FixtureAnalysisResult, JobId, JobRegistry, JobStatus, JobStatusView, Page};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("worker queue is full")]
    QueueFull,

    #[error("{0}")]
    QuotaExceeded(#[from] QuotaExceeded),

    #[error("job {job_id} failed to resolve its fixtures: {source}")]
    FixtureResolution { job_id: JobId, source: DataError },

    #[error("unknown job {0}")]
    UnknownJob(JobId),
}

pub struct Coordinator<D: MatchData + 'static> {
    analyst: Arc<Analyst<D>>,
    cache: Arc<ResultCache>,
    registry: Arc<JobRegistry>,
    pool: Arc<WorkerPool>,
}
impl<D: MatchData + 'static> Coordinator<D> {
    /// Starts the worker pool; must be called from within a Tokio runtime.
    pub fn new(analyst: Analyst<D>, cache: Arc<ResultCache>, config: &Config) -> Result<Self, ValidationError> {
        Ok(Self {
            analyst: Arc::new(analyst),
            cache,
            registry: Arc::new(JobRegistry::new(config.registry.clone())),
            pool: Arc::new(WorkerPool::new(config.pool.clone())?),
        })
    }

    pub fn analyst(&self) -> &Analyst<D> {
        &self.analyst
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Starts a job over every fixture on `date`, optionally narrowed to one season, returning
    /// as soon as the fixtures are known. Analysis carries on in the background.
    pub fn start(&self, date: NaiveDate, season_id: Option<SeasonId>, refresh: bool) -> Result<JobId, BatchError> {
        if self.pool.is_saturated() {
            return Err(BatchError::QueueFull);
        }
        let job_id = self.registry.create(date, season_id, refresh);

        let fixtures = match self.analyst.data().fixtures_on(date, season_id) {
            Ok(fixtures) => fixtures,
            Err(err) => {
                warn!("job {job_id}: cannot resolve fixtures on {date}: {err}");
                self.registry
                    .update(&job_id, |job| job.fail(err.to_string(), Utc::now()));
                return Err(BatchError::FixtureResolution { job_id, source: err });
            }
        };

        info!("job {job_id}: analysing {} fixtures on {date}", fixtures.len());
        self.registry
            .update(&job_id, |job| job.start(fixtures.len(), Utc::now()));
        if !fixtures.is_empty() {
            tokio::spawn(dispatch(
                job_id,
                fixtures,
                refresh,
                self.analyst.clone(),
                self.cache.clone(),
                self.registry.clone(),
                self.pool.clone(),
            ));
        }
        Ok(job_id)
    }

    pub fn status(&self, job_id: &JobId) -> Result<JobStatusView, BatchError> {
        self.registry.view(job_id).ok_or(BatchError::UnknownJob(*job_id))
    }

    /// A 1-based page of the job's results, ordered by league name, kickoff and fixture.
    pub fn results(
        &self,
        job_id: &JobId,
        page: usize,
        page_size: usize,
    ) -> Result<Page<FixtureAnalysisResult>, BatchError> {
        self.registry
            .results(job_id, page, page_size)
            .ok_or(BatchError::UnknownJob(*job_id))
    }

    /// Polls the job until it reaches a terminal state.
    pub async fn wait(&self, job_id: &JobId, poll: Duration) -> Result<JobStatusView, BatchError> {
        loop {
            let status = self.status(job_id)?;
            if status.status.is_terminal() {
                return Ok(status);
            }
            debug!(
                "job {job_id}: {}/{} done, {} failed",
                status.completed + status.failed,
                status.total,
                status.failed
            );
            tokio::time::sleep(poll).await;
        }
    }

    /// Predicts a single fixture through the cache.
    pub fn predict(&self, fixture_id: FixtureId, refresh: bool) -> Result<Cached, AnalysisError> {
        let fixture = self.analyst.fixture(fixture_id)?;
        self.cache
            .get_or_compute(CacheKey::from(&fixture), refresh, || self.analyst.analyse(&fixture))
    }
}

async fn dispatch<D: MatchData + 'static>(
    job_id: JobId,
    fixtures: Vec<Fixture>,
    refresh: bool,
    analyst: Arc<Analyst<D>>,
    cache: Arc<ResultCache>,
    registry: Arc<JobRegistry>,
    pool: Arc<WorkerPool>,
) {
    let mut fixtures = fixtures.into_iter();
    while let Some(fixture) = fixtures.next() {
        let task = run_fixture(job_id, fixture.clone(), refresh, analyst.clone(), cache.clone(), registry.clone());
        if let Err(err) = pool.submit(task).await {
            warn!("job {job_id}: abandoning remaining fixtures: {err}");
            for fixture in std::iter::once(fixture).chain(fixtures.by_ref()) {
                let result = failure(&analyst, &fixture, err.to_string(), 0);
                registry.update(&job_id, |job| job.record(result, Utc::now()));
            }
            break;
        }
    }
}

async fn run_fixture<D: MatchData + 'static>(
    job_id: JobId,
    fixture: Fixture,
    refresh: bool,
    analyst: Arc<Analyst<D>>,
    cache: Arc<ResultCache>,
    registry: Arc<JobRegistry>,
) {
    registry.update(&job_id, |job| job.begin_fixture());
    let result = {
        let (analyst, fixture) = (analyst.clone(), fixture.clone());
        tokio::task::spawn_blocking(move || analyse_fixture(&analyst, &cache, &fixture, refresh)).await
    };
    let result = result.unwrap_or_else(|err| failure(&analyst, &fixture, format!("analysis aborted: {err}"), 0));

    let status = registry.update(&job_id, |job| {
        job.record(result, Utc::now());
        (job.status, job.completed, job.failed)
    });
    if let Some((JobStatus::Completed, completed, failed)) = status {
        info!("job {job_id}: completed with {completed} analysed and {failed} failed");
    }
}

fn analyse_fixture<D: MatchData>(
    analyst: &Analyst<D>,
    cache: &ResultCache,
    fixture: &Fixture,
    refresh: bool,
) -> FixtureAnalysisResult {
    let timed = Timed::result(|| {
        let league = analyst.league_of(fixture)?;
        let cached = cache.get_or_compute(CacheKey::from(fixture), refresh, || analyst.analyse(fixture))?;
        Ok::<_, AnalysisError>((league, cached))
    });
    let duration_ms = timed.elapsed_millis();
    match timed.value {
        Ok((league, cached)) => FixtureAnalysisResult {
            fixture_id: fixture.id,
            league_id: fixture.league_id,
            league_name: league.name,
            kickoff: fixture.kickoff,
            home_team_id: fixture.home_team_id,
            away_team_id: fixture.away_team_id,
            success: true,
            error: None,
            prediction: Some(cached.result),
            duration_ms,
            cache_hit: cached.cache_hit,
        },
        Err(err) => {
            debug!("fixture {} failed: {err}", fixture.id);
            failure(analyst, fixture, err.to_string(), duration_ms)
        }
    }
}

fn failure<D: MatchData>(analyst: &Analyst<D>, fixture: &Fixture, error: String, duration_ms: u64) -> FixtureAnalysisResult {
    let league_name = analyst
        .data()
        .league(fixture.league_id)
        .ok()
        .flatten()
        .map(|league| league.name)
        .unwrap_or_default();
    FixtureAnalysisResult {
        fixture_id: fixture.id,
        league_id: fixture.league_id,
        league_name,
        kickoff: fixture.kickoff,
        home_team_id: fixture.home_team_id,
        away_team_id: fixture.away_team_id,
        success: false,
        error: Some(error),
        prediction: None,
        duration_ms,
        cache_hit: false,
    }
}
