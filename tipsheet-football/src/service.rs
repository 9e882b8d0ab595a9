//! The engine's outward face: batch runs under a daily quota, and single-fixture predictions.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::info;

use crate::analyst::{AnalysisError, Analyst};
use crate::batch::{BatchError, Coordinator};
use crate::cache::{Cached, ResultCache};
use crate::config::{Config, ValidationError};
use crate::data::MatchData;
use crate::domain::{FixtureId, SeasonId};
use crate::quota::{Caller, DailyQuota};
use crate::registry::{FixtureAnalysisResult, JobId, JobStatusView, Page};

pub struct Service<D: MatchData + 'static> {
    coordinator: Coordinator<D>,
    quota: DailyQuota,
}
impl<D: MatchData + 'static> Service<D> {
    /// Must be called from within a Tokio runtime.
    pub fn new(data: D, cache: Arc<ResultCache>, config: &Config) -> Result<Self, ValidationError> {
        let analyst = Analyst::new(data, config)?;
        Ok(Self {
            coordinator: Coordinator::new(analyst, cache, config)?,
            quota: DailyQuota::new(&config.quota),
        })
    }

    pub fn coordinator(&self) -> &Coordinator<D> {
        &self.coordinator
    }

    /// Starts a batch run on behalf of `caller`. A saturated pool rejects the run before it
    /// counts against the caller's quota.
    pub fn start_batch(
        &self,
        caller: &Caller,
        date: NaiveDate,
        season_id: Option<SeasonId>,
        refresh: bool,
    ) -> Result<JobId, BatchError> {
        if self.coordinator.pool().is_saturated() {
            return Err(BatchError::QueueFull);
        }
        self.quota.acquire(caller)?;
        let job_id = self.coordinator.start(date, season_id, refresh)?;
        info!("{caller} started job {job_id}");
        Ok(job_id)
    }

    pub fn status(&self, job_id: &JobId) -> Result<JobStatusView, BatchError> {
        self.coordinator.status(job_id)
    }

    pub fn results(
        &self,
        job_id: &JobId,
        page: usize,
        page_size: usize,
    ) -> Result<Page<FixtureAnalysisResult>, BatchError> {
        self.coordinator.results(job_id, page, page_size)
    }

    pub fn predict_fixture(&self, fixture_id: FixtureId, refresh: bool) -> Result<Cached, AnalysisError> {
        self.coordinator.predict(fixture_id, refresh)
    }

    /// Starts the periodic eviction of expired jobs.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        self.coordinator.registry().spawn_sweeper()
    }
}
