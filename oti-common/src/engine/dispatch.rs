//! Hand-off of created jobs to the external calculation worker
//!
//! Dispatch only enqueues. The worker runs out of band and reports back
//! through the job status and indicator create paths. Delivery is
//! at-most-once: a command that cannot be enqueued is reported and dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::db::models::IndicatorJob;
use crate::{Error, Result};

/// Message sent to the worker for one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCommand {
    pub job_id: i64,
    pub version: u32,
    pub city_name: Option<String>,
}

impl From<&IndicatorJob> for JobCommand {
    fn from(job: &IndicatorJob) -> Self {
        Self {
            job_id: job.id,
            version: job.version,
            city_name: job.city_name.clone(),
        }
    }
}

/// Enqueues job commands without waiting for them to run.
///
/// Implementations must not block beyond the enqueue itself.
pub trait JobDispatcher: Send + Sync {
    fn dispatch(&self, command: JobCommand) -> Result<()>;
}

/// Dispatcher backed by a bounded in-process queue
///
/// The receiving half is drained by a relay task that forwards commands to
/// the worker.
#[derive(Debug, Clone)]
pub struct QueueDispatcher {
    sender: mpsc::Sender<JobCommand>,
}

impl QueueDispatcher {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<JobCommand>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl JobDispatcher for QueueDispatcher {
    fn dispatch(&self, command: JobCommand) -> Result<()> {
        self.sender.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(cmd) => {
                Error::Dispatch(format!("job queue full, job {} not dispatched", cmd.job_id))
            }
            mpsc::error::TrySendError::Closed(cmd) => {
                Error::Dispatch(format!("job queue closed, job {} not dispatched", cmd.job_id))
            }
        })
    }
}
