//! Last computed prediction per league and pairing, served until a refresh is forced.

use std::ops::AddAssign;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tipsheet::file::{ReadJsonFile, WriteJsonFile};

use crate::domain::{Fixture, LeagueId, TeamId};
use crate::predictor::PredictionResult;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub league_id: LeagueId,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
}
impl From<&Fixture> for CacheKey {
    fn from(fixture: &Fixture) -> Self {
        Self {
            league_id: fixture.league_id,
            home_team_id: fixture.home_team_id,
            away_team_id: fixture.away_team_id,
        }
    }
}
impl From<&PredictionResult> for CacheKey {
    fn from(result: &PredictionResult) -> Self {
        Self {
            league_id: result.league_id,
            home_team_id: result.home_team_id,
            away_team_id: result.away_team_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}
impl CacheStats {
    pub fn lookups(&self) -> usize {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }
}

impl AddAssign<bool> for CacheStats {
    fn add_assign(&mut self, cache_hit: bool) {
        if cache_hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}

impl AddAssign for CacheStats {
    fn add_assign(&mut self, rhs: Self) {
        self.hits += rhs.hits;
        self.misses += rhs.misses;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cached {
    pub result: PredictionResult,
    pub cache_hit: bool,
}

#[derive(Debug, Default)]
struct Entries {
    results: FxHashMap<CacheKey, PredictionResult>,
    stats: CacheStats,
}

#[derive(Debug, Default)]
pub struct ResultCache {
    entries: Mutex<Entries>,
}
impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves the stored result for `key` unless `refresh` is set or there is none, in which
    /// case `compute` is invoked and its result stored. The cache is not locked while
    /// computing, so two concurrent misses on the same key both compute and the later one
    /// is kept.
    pub fn get_or_compute<E>(
        &self,
        key: CacheKey,
        refresh: bool,
        compute: impl FnOnce() -> Result<PredictionResult, E>,
    ) -> Result<Cached, E> {
        if !refresh {
            let mut entries = self.lock();
            if let Some(result) = entries.results.get(&key).cloned() {
                entries.stats += true;
                return Ok(Cached {
                    result,
                    cache_hit: true,
                });
            }
        }

        let result = compute()?;
        let mut entries = self.lock();
        entries.stats += false;
        entries.results.insert(key, result.clone());
        Ok(Cached {
            result,
            cache_hit: false,
        })
    }

    pub fn get(&self, key: &CacheKey) -> Option<PredictionResult> {
        self.lock().results.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Writes every stored result to `path`, ordered by key.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let mut results = self
            .lock()
            .results
            .iter()
            .map(|(key, result)| (*key, result.clone()))
            .collect::<Vec<_>>();
        results.sort_by_key(|(key, _)| *key);
        let results = results.into_iter().map(|(_, result)| result).collect::<Vec<_>>();
        results.write_json_file(&path)?;
        info!("saved {} cached predictions to {:?}", results.len(), path.as_ref());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let results = Vec::<PredictionResult>::read_json_file(&path)?;
        debug!("loaded {} cached predictions from {:?}", results.len(), path.as_ref());
        let results = results
            .into_iter()
            .map(|result| (CacheKey::from(&result), result))
            .collect();
        Ok(Self {
            entries: Mutex::new(Entries {
                results,
                stats: CacheStats::default(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
