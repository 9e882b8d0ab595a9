//! A bounded pool of asynchronous workers fed through a fixed-capacity queue.
//!
//! Up to `core_workers` queued tasks run at once. When the queue is full, a newly offered task
//! starts straight away on one of the overflow slots (`max_workers - core_workers`); failing
//! that, [`WorkerPool::submit`] waits for queue capacity and [`WorkerPool::try_submit`] rejects it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub core_workers: usize,
    pub max_workers: usize,
    pub queue_capacity: usize,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            core_workers: 15,
            max_workers: 20,
            queue_capacity: 100,
        }
    }
}
impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.core_workers == 0 {
            return Err(anyhow!("at least one core worker is required").into());
        }
        if self.max_workers < self.core_workers {
            return Err(anyhow!("max workers cannot be fewer than core workers").into());
        }
        if self.queue_capacity == 0 {
            return Err(anyhow!("queue capacity must be positive").into());
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker queue is full")]
    QueueFull,

    #[error("worker pool has shut down")]
    Shutdown,
}

type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

enum Offer {
    Accepted,
    Full(Task),
}

pub struct WorkerPool {
    config: Config,
    sender: mpsc::Sender<Task>,
    core: Arc<Semaphore>,
    overflow: Arc<Semaphore>,
    dispatcher: JoinHandle<()>,
}
impl WorkerPool {
    /// Starts the dispatcher; must be called from within a Tokio runtime.
    pub fn new(config: Config) -> Result<Self, ValidationError> {
        config.validate()?;
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let core = Arc::new(Semaphore::new(config.core_workers));
        let overflow = Arc::new(Semaphore::new(config.max_workers - config.core_workers));
        let dispatcher = tokio::spawn(dispatch(receiver, core.clone()));
        debug!(
            "started worker pool with {} core workers, {} in total, queue of {}",
            config.core_workers, config.max_workers, config.queue_capacity
        );
        Ok(Self {
            config,
            sender,
            core,
            overflow,
            dispatcher,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Queues the task, or starts it on a free overflow worker if the queue is full. With
    /// neither available, waits for queue capacity.
    pub async fn submit(&self, task: impl Future<Output = ()> + Send + 'static) -> Result<(), PoolError> {
        match self.offer(Box::pin(task))? {
            Offer::Accepted => Ok(()),
            Offer::Full(task) => self.sender.send(task).await.map_err(|_| PoolError::Shutdown),
        }
    }

    /// Like [`WorkerPool::submit`], but rejects the task rather than wait for queue capacity.
    pub fn try_submit(&self, task: impl Future<Output = ()> + Send + 'static) -> Result<(), PoolError> {
        match self.offer(Box::pin(task))? {
            Offer::Accepted => Ok(()),
            Offer::Full(_) => {
                warn!("rejected task: queue full and all {} workers busy", self.config.max_workers);
                Err(PoolError::QueueFull)
            }
        }
    }

    fn offer(&self, task: Task) -> Result<Offer, PoolError> {
        match self.sender.try_send(task) {
            Ok(()) => Ok(Offer::Accepted),
            Err(TrySendError::Closed(_)) => Err(PoolError::Shutdown),
            Err(TrySendError::Full(task)) => match self.overflow.clone().try_acquire_owned() {
                Ok(permit) => {
                    debug!("queue full, running task on an overflow worker");
                    tokio::spawn(async move {
                        task.await;
                        drop(permit);
                    });
                    Ok(Offer::Accepted)
                }
                Err(_) => Ok(Offer::Full(task)),
            },
        }
    }

    /// Whether a task offered now would have to wait, or be rejected by
    /// [`WorkerPool::try_submit`].
    pub fn is_saturated(&self) -> bool {
        self.sender.capacity() == 0 && self.overflow.available_permits() == 0
    }

    pub fn queued(&self) -> usize {
        self.config.queue_capacity - self.sender.capacity()
    }

    pub fn active(&self) -> usize {
        let overflow_workers = self.config.max_workers - self.config.core_workers;
        (self.config.core_workers - self.core.available_permits())
            + (overflow_workers - self.overflow.available_permits())
    }

    /// Stops accepting tasks and waits for every queued and running task to finish.
    pub async fn shutdown(self) {
        let Self {
            config,
            sender,
            core,
            overflow,
            dispatcher,
        } = self;
        drop(sender);
        if let Err(err) = dispatcher.await {
            warn!("worker pool dispatcher failed: {err}");
        }
        let overflow_workers = config.max_workers - config.core_workers;
        let _ = core.acquire_many(config.core_workers as u32).await;
        let _ = overflow.acquire_many(overflow_workers as u32).await;
        debug!("worker pool shut down");
    }
}

async fn dispatch(mut receiver: mpsc::Receiver<Task>, core: Arc<Semaphore>) {
    loop {
        let Ok(permit) = core.clone().acquire_owned().await else {
            break;
        };
        let Some(task) = receiver.recv().await else {
            break;
        };
        tokio::spawn(async move {
            task.await;
            drop(permit);
        });
    }
}
