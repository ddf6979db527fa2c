//! Multi-core yEnc decoder pool
//!
//! Jobs are pulled from an inbound queue and handed to whichever worker
//! advertises itself as idle next. Completed jobs from every worker are fanned
//! in to a single output stream by [`Decoder::collect`].

mod worker;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::DecoderConfig;
use crate::error::{Result, YencError};
use crate::job::{Data, JobReceiver};

use worker::{Inbox, Worker, WorkerHandle};

/// Idle worker inboxes, shared by all routing tasks
type IdleRegistry = Arc<Mutex<mpsc::Receiver<Inbox>>>;

/// Counters shared between the decoder and its workers
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub(crate) active: AtomicUsize,
    pub(crate) peak_active: AtomicUsize,
    pub(crate) completed: AtomicU64,
    pub(crate) failed: AtomicU64,
}

/// Snapshot of decoder pool activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Jobs being decoded right now
    pub active: usize,
    /// Highest number of jobs ever decoded at the same time
    pub peak_active: usize,
    /// Jobs decoded, successfully or not
    pub completed: u64,
    /// Jobs that finished with an error
    pub failed: u64,
}

/// Multi-core yEnc decoder pool
///
/// Owns a fixed set of workers, a registry of idle worker inboxes and the
/// inbound job queue. Must be started from within a Tokio runtime.
///
/// # Example
///
/// ```no_run
/// use yenc_pool::{Data, Decoder, job_queue};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (jobs, queue) = job_queue(16);
/// let mut decoder = Decoder::new(2, queue)?;
/// decoder.start()?;
/// let mut results = decoder.collect()?;
///
/// jobs.send(Data::new(std::fs::read("00000020.ntx")?)).await?;
///
/// if let Some(done) = results.recv().await {
///     if let Some(err) = &done.error {
///         eprintln!("decode failed: {}", err);
///     }
/// }
///
/// decoder.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Decoder {
    config: DecoderConfig,
    idle_tx: mpsc::Sender<Inbox>,
    idle: IdleRegistry,
    jobs: Option<JobReceiver>,
    workers: HashMap<usize, WorkerHandle>,
    shutdown: watch::Sender<bool>,
    router: Option<JoinHandle<()>>,
    counters: Arc<PoolCounters>,
}

impl Decoder {
    /// Create a decoder pool with `max_workers` workers reading from `jobs`
    ///
    /// # Errors
    ///
    /// Returns [`YencError::TooManyWorkers`] if `max_workers` exceeds the
    /// available parallelism of the machine.
    pub fn new(max_workers: usize, jobs: JobReceiver) -> Result<Self> {
        Self::with_config(DecoderConfig::new(max_workers), jobs)
    }

    /// Create a decoder pool from a full configuration
    pub fn with_config(config: DecoderConfig, jobs: JobReceiver) -> Result<Self> {
        config.validate()?;

        let (idle_tx, idle_rx) = mpsc::channel(config.workers);
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            idle_tx,
            idle: Arc::new(Mutex::new(idle_rx)),
            jobs: Some(jobs),
            workers: HashMap::with_capacity(config.workers),
            shutdown,
            router: None,
            counters: Arc::new(PoolCounters::default()),
            config,
        })
    }

    /// Number of workers this pool runs
    pub fn max_workers(&self) -> usize {
        self.config.workers
    }

    /// Check if the pool has been started and not yet stopped
    pub fn is_running(&self) -> bool {
        self.router.is_some()
    }

    /// Get a snapshot of pool activity
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            active: self.counters.active.load(Ordering::SeqCst),
            peak_active: self.counters.peak_active.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }

    /// Start the workers and the routing loop
    ///
    /// # Errors
    ///
    /// Returns [`YencError::Lifecycle`] if the pool was already started. A
    /// stopped pool cannot be restarted.
    pub fn start(&mut self) -> Result<()> {
        let jobs = self
            .jobs
            .take()
            .ok_or(YencError::Lifecycle("decoder pool has already been started"))?;

        for id in 0..self.config.workers {
            let worker = Worker::spawn(
                id,
                self.idle_tx.clone(),
                self.shutdown.subscribe(),
                self.config.decode_options(),
                self.counters.clone(),
            );
            self.workers.insert(id, worker);
        }

        self.router = Some(tokio::spawn(dispatch(
            jobs,
            self.idle.clone(),
            self.shutdown.subscribe(),
        )));

        debug!(workers = self.config.workers, "Decoder pool started");
        Ok(())
    }

    /// Merge the output of every worker into one stream
    ///
    /// The stream ends once every worker has stopped and its output is
    /// drained. It can only be taken once per pool.
    ///
    /// # Errors
    ///
    /// Returns [`YencError::Lifecycle`] if the pool is not running or the
    /// output was already collected.
    pub fn collect(&mut self) -> Result<mpsc::Receiver<Data>> {
        if self.workers.is_empty() {
            return Err(YencError::Lifecycle("decoder pool is not running"));
        }
        if self.workers.values().any(|w| w.outbox.is_none()) {
            return Err(YencError::Lifecycle("decoder output has already been collected"));
        }

        let (out, merged) = mpsc::channel(self.config.workers);

        for worker in self.workers.values_mut() {
            if let Some(outbox) = worker.outbox.take() {
                tokio::spawn(fan_in(outbox, out.clone()));
            }
        }

        // Each fan-in task holds one sender; the stream closes when the last one finishes
        drop(out);

        Ok(merged)
    }

    /// Stop the routing loop and every worker
    ///
    /// Waits until the router and all worker tasks have exited. Jobs still
    /// waiting for a worker, and results nobody has collected, are dropped.
    pub async fn stop(&mut self) {
        self.shutdown.send_replace(true);

        if let Some(router) = self.router.take()
            && let Err(e) = router.await
        {
            warn!("Decoder routing task failed: {}", e);
        }

        for (id, worker) in self.workers.drain() {
            if let Err(e) = worker.task.await {
                warn!(worker = id, "Worker task failed: {}", e);
            }
        }

        debug!("Decoder pool stopped");
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        // Signal only; tasks finish on their own
        self.shutdown.send_replace(true);
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("config", &self.config)
            .field("workers", &self.workers.len())
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Route each inbound job to the next idle worker until stopped
async fn dispatch(mut jobs: JobReceiver, idle: IdleRegistry, mut shutdown: watch::Receiver<bool>) {
    let stop_rx = shutdown.clone();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait_for(|stop| *stop) => break,
            job = jobs.recv() => match job {
                // Checkout runs on its own task so a burst of jobs doesn't wait in line here
                Some(job) => {
                    tokio::spawn(checkout(job, idle.clone(), stop_rx.clone()));
                }
                None => {
                    debug!("Job queue closed");
                    break;
                }
            },
        }
    }
}

/// Wait for an idle worker and hand it `job`
///
/// An inbox whose worker has already exited is skipped in favour of the next one.
async fn checkout(mut job: Data, idle: IdleRegistry, mut shutdown: watch::Receiver<bool>) {
    loop {
        let inbox = tokio::select! {
            biased;
            _ = shutdown.wait_for(|stop| *stop) => None,
            inbox = async {
                let mut idle = idle.lock().await;
                idle.recv().await
            } => inbox,
        };

        let Some(inbox) = inbox else {
            warn!(
                bytes = job.content.len(),
                "Decoder pool stopped before job was routed"
            );
            return;
        };

        match inbox.send(job).await {
            Ok(()) => {
                trace!("Job routed to idle worker");
                return;
            }
            Err(mpsc::error::SendError(returned)) => job = returned,
        }
    }
}

/// Forward one worker's completed jobs into the merged stream
async fn fan_in(mut outbox: mpsc::Receiver<Data>, out: mpsc::Sender<Data>) {
    while let Some(done) = outbox.recv().await {
        if out.send(done).await.is_err() {
            break;
        }
    }
}
