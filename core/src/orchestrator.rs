//! # Batch Orchestrator
//!
//! Runs one [`ProvisioningWorkflow`] per system on a fixed pool of workers.
//!
//! Workers pull jobs from a shared queue, so at most `workers` workflows are in flight.
//! Outcomes are consumed in completion order. `on_complete` fires for every system as it
//! finishes, `on_done` only for those that produced records, and the collected records
//! are sorted once everything has terminated.

use std::sync::Arc;

use scli_common::provisioning::{BatchResult, ProvisioningRecord};
use scli_common::scheduler::Scheduler;
use scli_common::serial::SystemSerial;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::workflow::{ProvisioningWorkflow, SystemJob, WorkflowError, WorkflowKind};

/// Upper bound on concurrently running workflows.
pub const MAX_WORKERS: usize = 20;

type Callback = Box<dyn Fn(&SystemSerial) + Send + Sync>;
type Outcome = (SystemSerial, Result<Vec<ProvisioningRecord>, WorkflowError>);

pub struct BatchOrchestrator {
    workflow: ProvisioningWorkflow,
    workers: usize,
    kind: WorkflowKind,
    on_done: Option<Callback>,
    on_complete: Option<Callback>,
}

impl BatchOrchestrator {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            workflow: ProvisioningWorkflow::new(scheduler),
            workers: MAX_WORKERS,
            kind: WorkflowKind::Single,
            on_done: None,
            on_complete: None,
        }
    }

    /// Caps the pool. Values above [`MAX_WORKERS`] are clamped, zero becomes one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, MAX_WORKERS);
        self
    }

    pub fn with_kind(mut self, kind: WorkflowKind) -> Self {
        self.kind = kind;
        self
    }

    /// Called once for every system that produced at least one record.
    pub fn on_done<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SystemSerial) + Send + Sync + 'static,
    {
        self.on_done = Some(Box::new(callback));
        self
    }

    /// Called once for every system, found, missing or failed.
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SystemSerial) + Send + Sync + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub async fn run(&self, jobs: Vec<SystemJob>) -> BatchResult {
        let total = jobs.len();
        let mut batch = BatchResult::new();
        if total == 0 {
            return batch;
        }

        let (job_tx, job_rx) = mpsc::unbounded_channel::<SystemJob>();
        for job in jobs {
            // The receiver is alive until the end of this function.
            let _ = job_tx.send(job);
        }
        drop(job_tx);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Outcome>();
        let workers = self.workers.min(total);
        debug!("Processing {total} systems on {workers} workers");

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let workflow = self.workflow.clone();
            let kind = self.kind;
            let queue = Arc::clone(&job_rx);
            let done_tx = done_tx.clone();

            pool.spawn(async move {
                loop {
                    // The lock is released before the workflow runs.
                    let next = queue.lock().await.recv().await;
                    let Some(job) = next else { break };

                    let serial = job.serial.clone();
                    let outcome = workflow.execute(job, kind).await;
                    if done_tx.send((serial, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(done_tx);

        let mut finished = 0;
        while let Some((serial, outcome)) = done_rx.recv().await {
            finished += 1;
            match outcome {
                Ok(records) if records.is_empty() => {
                    debug!("{serial}: no such system");
                    batch.missing += 1;
                }
                Ok(records) => {
                    for record in records {
                        batch.push(record);
                    }
                    if let Some(on_done) = &self.on_done {
                        on_done(&serial);
                    }
                }
                Err(e) => {
                    debug!("{e}");
                    batch.failed += 1;
                }
            }
            if let Some(on_complete) = &self.on_complete {
                on_complete(&serial);
            }
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                error!("Worker terminated abnormally: {e}");
            }
        }

        if finished < total {
            warn!("{} systems were not processed", total - finished);
            batch.failed += total - finished;
        }

        batch.finalize()
    }
}
