//! Scheduler
//!
//! Runs named maintenance jobs on fixed intervals. Each job is single-flight: a tick or a manual
//! trigger that arrives while a run is active is skipped, not queued.

use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use serde::Serialize;
use thiserror::Error;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub mod jobs;

pub use jobs::CartExpirySweep;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(String),

    #[error("job {0} is already running")]
    AlreadyRunning(String),

    #[error("job failed: {0}")]
    Failed(String),
}

/// A unit of periodic maintenance work.
#[automock]
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    /// Do one run, returning a short summary for the status report.
    async fn run(&self) -> Result<String, JobError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded { summary: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub name: String,
    pub interval_seconds: u64,
    pub running: bool,
    pub last_started_at: Option<Timestamp>,
    pub last_finished_at: Option<Timestamp>,
    pub last_outcome: Option<JobOutcome>,
}

#[derive(Debug, Default)]
struct JobHistory {
    last_started_at: Option<Timestamp>,
    last_finished_at: Option<Timestamp>,
    last_outcome: Option<JobOutcome>,
}

struct JobSlot {
    job: Arc<dyn Job>,
    running: AtomicBool,
    history: Mutex<JobHistory>,
}

/// Clears the slot's running flag when the run ends, however it ends.
struct RunGuard {
    slot: Arc<JobSlot>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.slot.running.store(false, Ordering::Release);
    }
}

impl JobSlot {
    fn try_begin(self: &Arc<Self>) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard { slot: self.clone() })
    }

    fn history(&self) -> MutexGuard<'_, JobHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn execute(&self, _guard: RunGuard) {
        let name = self.job.name();

        self.history().last_started_at = Some(Timestamp::now());

        let outcome = match self.job.run().await {
            Ok(summary) => {
                tracing::info!(job = name, %summary, "job finished");

                JobOutcome::Succeeded { summary }
            }
            Err(error) => {
                tracing::error!(job = name, %error, "job failed");

                JobOutcome::Failed {
                    error: error.to_string(),
                }
            }
        };

        let mut history = self.history();
        history.last_finished_at = Some(Timestamp::now());
        history.last_outcome = Some(outcome);
    }

    fn status(&self) -> JobStatus {
        let history = self.history();

        JobStatus {
            name: self.job.name().to_string(),
            interval_seconds: self.job.interval().as_secs(),
            running: self.running.load(Ordering::Acquire),
            last_started_at: history.last_started_at,
            last_finished_at: history.last_finished_at,
            last_outcome: history.last_outcome.clone(),
        }
    }
}

pub struct Scheduler {
    slots: Vec<Arc<JobSlot>>,
    shutdown: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(jobs: Vec<Arc<dyn Job>>, shutdown: CancellationToken) -> Self {
        let slots = jobs
            .into_iter()
            .map(|job| {
                Arc::new(JobSlot {
                    job,
                    running: AtomicBool::new(false),
                    history: Mutex::default(),
                })
            })
            .collect();

        Self {
            slots,
            shutdown,
            handles: Mutex::default(),
        }
    }

    /// Start one timer loop per job. The first run of every job happens immediately.
    pub fn start(&self) {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);

        for slot in &self.slots {
            let slot = slot.clone();
            let shutdown = self.shutdown.clone();
            let span = tracing::info_span!("scheduler.job", job = slot.job.name());

            handles.push(tokio::spawn(
                async move {
                    let mut ticker = tokio::time::interval(slot.job.interval());
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                    loop {
                        tokio::select! {
                            biased;

                            () = shutdown.cancelled() => break,
                            _ = ticker.tick() => {
                                match slot.try_begin() {
                                    Some(guard) => slot.execute(guard).await,
                                    None => tracing::debug!("previous run still active, skipping tick"),
                                }
                            }
                        }
                    }

                    tracing::debug!("job loop stopped");
                }
                .instrument(span),
            ));
        }
    }

    /// Stop every timer loop, waiting for active runs to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let handles: Vec<_> = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        for handle in handles {
            if let Err(error) = handle.await {
                tracing::warn!(%error, "job loop ended abnormally");
            }
        }
    }

    fn slot(&self, name: &str) -> Result<&Arc<JobSlot>, JobError> {
        self.slots
            .iter()
            .find(|slot| slot.job.name() == name)
            .ok_or_else(|| JobError::NotFound(name.to_string()))
    }
}

impl JobsService for Scheduler {
    fn status(&self) -> Vec<JobStatus> {
        self.slots.iter().map(|slot| slot.status()).collect()
    }

    fn trigger(&self, name: &str) -> Result<(), JobError> {
        let slot = self.slot(name)?.clone();

        let guard = slot
            .try_begin()
            .ok_or_else(|| JobError::AlreadyRunning(name.to_string()))?;

        tracing::info!(job = name, "job triggered manually");

        tokio::spawn(async move { slot.execute(guard).await }.in_current_span());

        Ok(())
    }
}

#[automock]
pub trait JobsService: Send + Sync {
    /// Status of every registered job.
    fn status(&self) -> Vec<JobStatus>;

    /// Start a run of `name` in the background now.
    fn trigger(&self, name: &str) -> Result<(), JobError>;
}
