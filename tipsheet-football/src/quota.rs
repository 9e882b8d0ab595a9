//! A per-caller cap on batch submissions within a local calendar day.

use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};

use anyhow::anyhow;
use chrono::{Local, NaiveDate};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub daily_limit: u32,
}
impl Default for Config {
    fn default() -> Self {
        Self { daily_limit: 5 }
    }
}
impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.daily_limit == 0 {
            return Err(anyhow!("daily limit must be positive").into());
        }
        Ok(())
    }
}

/// Whoever is submitting work: an authenticated user, or failing that, a remote address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Caller {
    User(String),
    Ip(IpAddr),
}
impl Display for Caller {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Caller::User(user) => write!(f, "user {user}"),
            Caller::Ip(addr) => write!(f, "address {addr}"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{caller} has used all {limit} batch runs for today")]
pub struct QuotaExceeded {
    pub caller: Caller,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy)]
struct Usage {
    date: NaiveDate,
    count: u32,
}

#[derive(Debug)]
pub struct DailyQuota {
    limit: u32,
    usage: Mutex<FxHashMap<Caller, Usage>>,
}
impl DailyQuota {
    pub fn new(config: &Config) -> Self {
        Self {
            limit: config.daily_limit,
            usage: Mutex::default(),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Counts a submission by `caller` against today's allowance.
    pub fn acquire(&self, caller: &Caller) -> Result<(), QuotaExceeded> {
        self.acquire_on(caller, Local::now().date_naive())
    }

    /// Counts a submission as of `today`. A caller last seen on any other day starts afresh.
    pub fn acquire_on(&self, caller: &Caller, today: NaiveDate) -> Result<(), QuotaExceeded> {
        let mut usage = self.usage.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = usage.entry(caller.clone()).or_insert(Usage { date: today, count: 0 });
        if entry.date != today {
            *entry = Usage { date: today, count: 0 };
        }
        if entry.count >= self.limit {
            warn!("{caller} exceeded the daily limit of {}", self.limit);
            return Err(QuotaExceeded {
                caller: caller.clone(),
                limit: self.limit,
            });
        }
        entry.count += 1;
        Ok(())
    }

    /// Submissions left to `caller` as of `today`.
    pub fn remaining_on(&self, caller: &Caller, today: NaiveDate) -> u32 {
        let usage = self.usage.lock().unwrap_or_else(PoisonError::into_inner);
        match usage.get(caller) {
            Some(entry) if entry.date == today => self.limit.saturating_sub(entry.count),
            _ => self.limit,
        }
    }
}
