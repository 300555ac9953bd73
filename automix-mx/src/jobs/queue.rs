//! Bounded worker pool over a single shared FIFO
//!
//! At most `concurrency` jobs run in parallel; the shared queue is
//! drained as soon as a worker returns, and FIFO order across all kinds
//! prevents starvation. Handlers are registered per kind; a job whose
//! kind has no handler is dropped with an error log.
//!
//! Shutdown cancels queued-but-unstarted jobs immediately, then waits a
//! bounded grace period for running jobs before giving up on them
//! (child processes are reaped by their own kill-on-drop guards).

use super::{Job, JobKind, JobState};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default worker count
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Grace period granted to running jobs at shutdown
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Boxed handler future
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Job handler: side effects only, no observable result
pub type Handler = Arc<dyn Fn(Job) -> HandlerFuture + Send + Sync>;

struct QueueInner {
    queue: Mutex<VecDeque<Job>>,
    handlers: RwLock<HashMap<JobKind, Handler>>,
    notify: Notify,
    cancel: CancellationToken,
    running: AtomicUsize,
}

/// In-process job dispatcher
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(QueueInner {
                queue: Mutex::new(VecDeque::new()),
                handlers: RwLock::new(HashMap::new()),
                notify: Notify::new(),
                cancel: CancellationToken::new(),
                running: AtomicUsize::new(0),
            }),
            workers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register the handler for a job kind (latest registration wins)
    pub fn on_kind<F>(&self, kind: JobKind, handler: F)
    where
        F: Fn(Job) -> HandlerFuture + Send + Sync + 'static,
    {
        self.inner
            .handlers
            .write()
            .expect("handler registry poisoned")
            .insert(kind, Arc::new(handler));
    }

    /// Enqueue a job; returns its id
    pub fn enqueue(&self, kind: JobKind, payload: serde_json::Value) -> Uuid {
        let job = Job::new(kind, payload);
        let id = job.id;
        {
            let mut queue = self.inner.queue.lock().expect("job queue poisoned");
            queue.push_back(job);
            debug!(kind = kind.as_str(), depth = queue.len(), "job enqueued");
        }
        self.inner.notify.notify_one();
        id
    }

    /// Spawn `concurrency` workers
    pub fn start(&self, concurrency: usize) {
        let mut workers = self.workers.lock().expect("worker list poisoned");
        for worker_id in 0..concurrency.max(1) {
            let inner = Arc::clone(&self.inner);
            workers.push(tokio::spawn(async move {
                worker_loop(worker_id, inner).await;
            }));
        }
        info!(concurrency = concurrency.max(1), "job queue started");
    }

    /// Jobs waiting in the queue
    pub fn depth(&self) -> usize {
        self.inner.queue.lock().expect("job queue poisoned").len()
    }

    /// Jobs currently executing
    pub fn running(&self) -> usize {
        self.inner.running.load(Ordering::Relaxed)
    }

    /// Cancel queued jobs and wait out the grace period for running ones
    pub async fn shutdown(&self, grace: Duration) {
        let dropped = {
            let mut queue = self.inner.queue.lock().expect("job queue poisoned");
            let n = queue.len();
            queue.clear();
            n
        };
        if dropped > 0 {
            warn!(dropped, "dropping queued jobs at shutdown");
        }
        self.inner.cancel.cancel();
        self.inner.notify.notify_waiters();

        let handles: Vec<JoinHandle<()>> =
            std::mem::take(&mut *self.workers.lock().expect("worker list poisoned"));
        let join_all = futures::future::join_all(handles.into_iter().map(|h| async move {
            let _ = h.await;
        }));
        if tokio::time::timeout(grace, join_all).await.is_err() {
            warn!("workers did not finish within the shutdown grace period");
        }
        info!("job queue stopped");
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

async fn worker_loop(worker_id: usize, inner: Arc<QueueInner>) {
    loop {
        let job = {
            let mut queue = inner.queue.lock().expect("job queue poisoned");
            queue.pop_front()
        };

        match job {
            Some(mut job) => {
                let handler = inner
                    .handlers
                    .read()
                    .expect("handler registry poisoned")
                    .get(&job.kind)
                    .cloned();
                let Some(handler) = handler else {
                    error!(kind = job.kind.as_str(), job_id = %job.id, "no handler registered");
                    continue;
                };

                job.state = JobState::Running;
                inner.running.fetch_add(1, Ordering::Relaxed);
                debug!(worker_id, kind = job.kind.as_str(), job_id = %job.id, "job started");

                let kind = job.kind;
                let job_id = job.id;
                // Failures are swallowed after logging; a retry is a new job
                if let Err(e) = handler(job).await {
                    error!(kind = kind.as_str(), job_id = %job_id, error = %e, "job failed");
                } else {
                    debug!(worker_id, kind = kind.as_str(), job_id = %job_id, "job done");
                }
                inner.running.fetch_sub(1, Ordering::Relaxed);
            }
            None => {
                if inner.cancel.is_cancelled() {
                    break;
                }
                tokio::select! {
                    _ = inner.notify.notified() => {}
                    _ = inner.cancel.cancelled() => break,
                }
            }
        }
    }
    debug!(worker_id, "worker exiting");
}
