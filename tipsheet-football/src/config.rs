//! Engine configuration, assembled from per-component sections.

use std::error::Error;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tipsheet::file::read_json;

use crate::{form, head_to_head, pool, predictor, quota, registry};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValidationError(#[from] pub Box<dyn Error + Send + Sync>);

impl From<anyhow::Error> for ValidationError {
    fn from(value: anyhow::Error) -> Self {
        ValidationError(value.into())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub form: form::Config,
    pub head_to_head: head_to_head::Config,
    pub predictor: predictor::Config,
    pub pool: pool::Config,
    pub quota: quota::Config,
    pub registry: registry::Config,
}
impl Config {
    /// Reads a JSON configuration document. Absent sections and fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Config = read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.form.validate()?;
        self.head_to_head.validate()?;
        self.predictor.validate()?;
        self.pool.validate()?;
        self.quota.validate()?;
        self.registry.validate()?;
        Ok(())
    }
}
