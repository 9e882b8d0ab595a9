//! In-memory store of batch jobs, their progress and their per-fixture results.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ValidationError;
use crate::domain::{FixtureId, LeagueId, SeasonId, TeamId};
use crate::predictor::PredictionResult;

pub type JobId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long a finished job is kept before it becomes eligible for eviction.
    pub retention_hours: u32,
    pub sweep_minutes: u32,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            retention_hours: 24,
            sweep_minutes: 60,
        }
    }
}
impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.retention_hours == 0 {
            return Err(anyhow!("job retention must be positive").into());
        }
        if self.sweep_minutes == 0 {
            return Err(anyhow!("sweep period must be positive").into());
        }
        Ok(())
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retention_hours as i64)
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(60 * self.sweep_minutes as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}
impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// The outcome of analysing one fixture within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureAnalysisResult {
    pub fixture_id: FixtureId,
    pub league_id: LeagueId,
    pub league_name: String,
    pub kickoff: NaiveDateTime,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub success: bool,
    pub error: Option<String>,
    pub prediction: Option<PredictionResult>,
    pub duration_ms: u64,
    pub cache_hit: bool,
}

/// Presentation order of results: by league name, then kickoff, then fixture.
pub fn presentation_order(a: &FixtureAnalysisResult, b: &FixtureAnalysisResult) -> Ordering {
    a.league_name
        .cmp(&b.league_name)
        .then_with(|| a.kickoff.cmp(&b.kickoff))
        .then_with(|| a.fixture_id.cmp(&b.fixture_id))
}

#[derive(Debug, Clone)]
pub struct JobMetadata {
    pub job_id: JobId,
    pub date: NaiveDate,
    pub season_id: Option<SeasonId>,
    pub refresh: bool,
    pub status: JobStatus,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub results: Vec<FixtureAnalysisResult>,
    total_duration_ms: u64,
}
impl JobMetadata {
    pub fn new(job_id: JobId, date: NaiveDate, season_id: Option<SeasonId>, refresh: bool, now: DateTime<Utc>) -> Self {
        Self {
            job_id,
            date,
            season_id,
            refresh,
            status: JobStatus::Pending,
            total: 0,
            completed: 0,
            failed: 0,
            in_progress: 0,
            started_at: now,
            finished_at: None,
            error: None,
            results: vec![],
            total_duration_ms: 0,
        }
    }

    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }

    /// Moves a pending job to running over `total` fixtures. A job with nothing to do
    /// completes straight away.
    pub fn start(&mut self, total: usize, now: DateTime<Utc>) {
        debug_assert_eq!(JobStatus::Pending, self.status, "job {} already started", self.job_id);
        self.total = total;
        self.status = JobStatus::Running;
        self.complete_if_done(now);
    }

    pub fn fail(&mut self, error: String, now: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.error = Some(error);
        self.finished_at = Some(now);
    }

    pub fn begin_fixture(&mut self) {
        self.in_progress += 1;
    }

    /// Records the result of one fixture, updating the counters along with it.
    pub fn record(&mut self, result: FixtureAnalysisResult, now: DateTime<Utc>) {
        if self.status != JobStatus::Running || self.finished() == self.total {
            debug!("job {}: ignoring result for fixture {}", self.job_id, result.fixture_id);
            return;
        }
        self.in_progress = self.in_progress.saturating_sub(1);
        if result.success {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
        self.total_duration_ms += result.duration_ms;
        self.results.push(result);
        self.complete_if_done(now);
    }

    fn complete_if_done(&mut self, now: DateTime<Utc>) {
        if self.status == JobStatus::Running && self.finished() == self.total {
            self.status = JobStatus::Completed;
            self.finished_at = Some(now);
            self.in_progress = 0;
            self.results.sort_by(presentation_order);
        }
    }

    /// Mean duration of the fixtures finished so far, never below a millisecond.
    pub fn average_duration_ms(&self) -> Option<f64> {
        match self.finished() {
            0 => None,
            finished => Some(f64::max(1.0, self.total_duration_ms as f64 / finished as f64)),
        }
    }

    /// Projected seconds to completion; unknown until the first fixture has finished.
    pub fn eta_seconds(&self) -> Option<f64> {
        if self.status.is_terminal() {
            return Some(0.0);
        }
        let remaining = self.total.saturating_sub(self.finished());
        self.average_duration_ms()
            .map(|average| remaining as f64 * average / 1_000.0)
    }

    pub fn view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.job_id,
            date: self.date,
            status: self.status,
            total: self.total,
            completed: self.completed,
            failed: self.failed,
            in_progress: self.in_progress,
            eta_seconds: self.eta_seconds(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub date: NaiveDate,
    pub status: JobStatus,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub eta_seconds: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}
impl<T: Clone> Page<T> {
    /// Cuts the requested page out of `items`. Page numbers and sizes below 1 are raised to 1;
    /// a page past the end is empty.
    pub fn of(items: &[T], page: usize, page_size: usize) -> Self {
        let (page, page_size) = (page.max(1), page_size.max(1));
        let total_items = items.len();
        let start = usize::min(total_items, (page - 1).saturating_mul(page_size));
        let end = usize::min(total_items, start.saturating_add(page_size));
        Self {
            items: items[start..end].to_vec(),
            page,
            page_size,
            total_items,
            total_pages: total_items.div_ceil(page_size),
        }
    }
}

#[derive(Debug, Default)]
pub struct JobRegistry {
    config: Config,
    jobs: Mutex<FxHashMap<JobId, JobMetadata>>,
}
impl JobRegistry {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            jobs: Mutex::default(),
        }
    }

    pub fn create(&self, date: NaiveDate, season_id: Option<SeasonId>, refresh: bool) -> JobId {
        let job_id = Uuid::new_v4();
        let job = JobMetadata::new(job_id, date, season_id, refresh, Utc::now());
        self.lock().insert(job_id, job);
        job_id
    }

    /// Applies `f` to the job under the registry lock, returning `None` if there is no such job.
    pub fn update<R>(&self, job_id: &JobId, f: impl FnOnce(&mut JobMetadata) -> R) -> Option<R> {
        self.lock().get_mut(job_id).map(f)
    }

    pub fn view(&self, job_id: &JobId) -> Option<JobStatusView> {
        self.lock().get(job_id).map(JobMetadata::view)
    }

    /// A page of the job's results in presentation order.
    pub fn results(&self, job_id: &JobId, page: usize, page_size: usize) -> Option<Page<FixtureAnalysisResult>> {
        let jobs = self.lock();
        let job = jobs.get(job_id)?;
        if job.status.is_terminal() {
            Some(Page::of(&job.results, page, page_size))
        } else {
            let mut results = job.results.clone();
            results.sort_by(presentation_order);
            Some(Page::of(&results, page, page_size))
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes the jobs that finished longer than the retention period before `now`,
    /// returning how many were removed.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let horizon = now - self.config.retention();
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|_, job| match job.finished_at {
            Some(finished_at) => finished_at >= horizon,
            None => true,
        });
        let evicted = before - jobs.len();
        if evicted > 0 {
            info!("evicted {evicted} expired jobs, {} remain", jobs.len());
        }
        evicted
    }

    /// Sweeps expired jobs every sweep period for as long as the returned task is alive.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let period = self.config.sweep_period();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                registry.evict_expired(Utc::now());
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<JobId, JobMetadata>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests;
