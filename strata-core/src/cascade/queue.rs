//! Background cascade queue
//!
//! Cascades run after the primary write has committed, on a small pool of
//! workers. Each worker drains its own lane and every job from one source
//! document goes to the same lane, so a document's cascades never overlap
//! and apply in submission order. Callers get a [`CascadeHandle`] they may
//! await or simply drop.

use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use super::delete::{run_delete, DeletePolicy};
use super::save::run_save;
use super::CascadePlan;
use crate::document::DocumentId;
use crate::error::{StrataError, StrataResult};

const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// Which half of the engine a job runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeOperation {
    Save,
    Delete,
}

impl fmt::Display for CascadeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeOperation::Save => write!(f, "save"),
            CascadeOperation::Delete => write!(f, "delete"),
        }
    }
}

/// A background cascade that failed, as seen by failure subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeFailure {
    pub operation: CascadeOperation,
    pub collection: String,
    pub id: Option<DocumentId>,
    pub message: String,
}

enum CascadeTask {
    Save(CascadePlan),
    Delete(CascadePlan, DeletePolicy),
}

/// Unit of work picked up by a worker
pub(crate) struct CascadeJob {
    task: CascadeTask,
    done: Option<oneshot::Sender<StrataResult<()>>>,
}

impl CascadeJob {
    pub(crate) fn save(plan: CascadePlan) -> Self {
        Self { task: CascadeTask::Save(plan), done: None }
    }

    pub(crate) fn delete(plan: CascadePlan, policy: DeletePolicy) -> Self {
        Self { task: CascadeTask::Delete(plan, policy), done: None }
    }

    fn operation(&self) -> CascadeOperation {
        match self.task {
            CascadeTask::Save(_) => CascadeOperation::Save,
            CascadeTask::Delete(..) => CascadeOperation::Delete,
        }
    }

    fn plan(&self) -> &CascadePlan {
        match &self.task {
            CascadeTask::Save(plan) | CascadeTask::Delete(plan, _) => plan,
        }
    }

    /// Lane index for this job's source document
    fn lane(&self, lanes: usize) -> usize {
        let plan = self.plan();
        let mut hasher = DefaultHasher::new();
        plan.collection.name().hash(&mut hasher);
        plan.source_id.hash(&mut hasher);
        (hasher.finish() % lanes.max(1) as u64) as usize
    }

    fn failure(&self, error: &StrataError) -> CascadeFailure {
        let plan = self.plan();
        CascadeFailure {
            operation: self.operation(),
            collection: plan.collection.name().to_string(),
            id: plan.source_id,
            message: error.to_string(),
        }
    }

    async fn run(self, failures: &broadcast::Sender<CascadeFailure>) {
        let operation = self.operation();
        let collection = self.plan().collection.name().to_string();
        let id = self.plan().source_id;

        let CascadeJob { task, done } = self;
        let result = match task {
            CascadeTask::Save(plan) => run_save(plan).await,
            CascadeTask::Delete(plan, policy) => run_delete(plan, policy).await,
        };

        if let Err(e) = &result {
            log::error!("{} cascade from {} ({:?}) failed: {}", operation, collection, id, e);
            // No subscriber is not an error
            let _ = failures.send(CascadeFailure { operation, collection, id, message: e.to_string() });
        }

        if let Some(done) = done {
            let _ = done.send(result);
        }
    }
}

/// Completion handle of a scheduled cascade
#[derive(Debug)]
pub struct CascadeHandle {
    rx: Option<oneshot::Receiver<StrataResult<()>>>,
}

impl CascadeHandle {
    /// Handle for a document that scheduled nothing
    pub fn none() -> Self {
        Self { rx: None }
    }

    pub fn is_scheduled(&self) -> bool {
        self.rx.is_some()
    }

    /// Wait for the cascade and return its result
    pub async fn wait(self) -> StrataResult<()> {
        match self.rx {
            None => Ok(()),
            Some(rx) => rx.await.unwrap_or(Err(StrataError::QueueClosed)),
        }
    }
}

/// Worker pool executing cascade jobs, one lane per worker
pub struct CascadeQueue {
    lanes: Mutex<Option<Vec<mpsc::UnboundedSender<CascadeJob>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    failures: broadcast::Sender<CascadeFailure>,
}

impl CascadeQueue {
    /// Spawn `workers` tasks on the current Tokio runtime
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);

        let mut lanes = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let (tx, mut rx) = mpsc::unbounded_channel::<CascadeJob>();
            let failures = failures.clone();
            handles.push(tokio::spawn(async move {
                while let Some(job) = rx.recv().await {
                    job.run(&failures).await;
                }
                log::debug!("cascade worker {} stopped", worker_id);
            }));
            lanes.push(tx);
        }

        log::debug!("cascade queue started with {} worker(s)", workers);
        Self { lanes: Mutex::new(Some(lanes)), workers: Mutex::new(handles), failures }
    }

    /// Schedule a job. A closed queue resolves the handle with `QueueClosed`.
    pub(crate) fn submit(&self, mut job: CascadeJob) -> CascadeHandle {
        let (done_tx, done_rx) = oneshot::channel();
        job.done = Some(done_tx);

        let rejected = match self.lanes.lock() {
            Ok(guard) => match guard.as_deref() {
                Some(lanes) => match lanes.get(job.lane(lanes.len())) {
                    Some(tx) => tx.send(job).err().map(|e| e.0),
                    None => Some(job),
                },
                None => Some(job),
            },
            Err(_) => Some(job),
        };

        if let Some(job) = rejected {
            let failure = job.failure(&StrataError::QueueClosed);
            log::error!(
                "{} cascade from {} dropped: {}",
                failure.operation,
                failure.collection,
                StrataError::QueueClosed
            );
            let _ = self.failures.send(failure);
            if let Some(done) = job.done {
                let _ = done.send(Err(StrataError::QueueClosed));
            }
        }

        CascadeHandle { rx: Some(done_rx) }
    }

    /// Receive every failed background cascade from now on
    pub fn subscribe_failures(&self) -> broadcast::Receiver<CascadeFailure> {
        self.failures.subscribe()
    }

    /// Stop accepting jobs, drain the ones already queued and join the workers
    pub async fn shutdown(&self) {
        if let Ok(mut lanes) = self.lanes.lock() {
            lanes.take();
        }

        let handles = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => Vec::new(),
        };
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl fmt::Debug for CascadeQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = self.lanes.lock().map(|lanes| lanes.is_some()).unwrap_or(false);
        f.debug_struct("CascadeQueue").field("open", &open).finish()
    }
}
