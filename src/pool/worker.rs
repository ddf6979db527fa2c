use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::YencError;
use crate::job::{Data, decode_data};
use crate::yenc::DecodeOptions;

use super::PoolCounters;

/// Sending half of a worker inbox, published to the idle registry
pub(crate) type Inbox = mpsc::Sender<Data>;

/// A single decode worker bound to one inbox and one outbox
pub(crate) struct Worker {
    id: usize,
    inbox_tx: Inbox,
    inbox: mpsc::Receiver<Data>,
    outbox: mpsc::Sender<Data>,
    idle: mpsc::Sender<Inbox>,
    shutdown: watch::Receiver<bool>,
    options: DecodeOptions,
    counters: Arc<PoolCounters>,
}

/// Decoder-side handle of a spawned worker
pub(crate) struct WorkerHandle {
    /// Completed jobs, taken by `Decoder::collect`
    pub(crate) outbox: Option<mpsc::Receiver<Data>>,
    pub(crate) task: JoinHandle<()>,
}

impl Worker {
    /// Spawn a worker task that registers itself in `idle` whenever it is free
    pub(crate) fn spawn(
        id: usize,
        idle: mpsc::Sender<Inbox>,
        shutdown: watch::Receiver<bool>,
        options: DecodeOptions,
        counters: Arc<PoolCounters>,
    ) -> WorkerHandle {
        let (inbox_tx, inbox) = mpsc::channel(1);
        let (outbox, outbox_rx) = mpsc::channel(1);

        let worker = Worker {
            id,
            inbox_tx,
            inbox,
            outbox,
            idle,
            shutdown,
            options,
            counters,
        };

        WorkerHandle {
            outbox: Some(outbox_rx),
            task: tokio::spawn(worker.run()),
        }
    }

    async fn run(mut self) {
        debug!(worker = self.id, "Worker started");

        loop {
            // Add inbox to the idle registry
            tokio::select! {
                biased;
                _ = self.shutdown.wait_for(|stop| *stop) => break,
                sent = self.idle.send(self.inbox_tx.clone()) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }

            let job = tokio::select! {
                biased;
                _ = self.shutdown.wait_for(|stop| *stop) => break,
                job = self.inbox.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let done = self.process(job).await;

            tokio::select! {
                biased;
                sent = self.outbox.send(done) => {
                    if sent.is_err() {
                        warn!(worker = self.id, "Output stream closed, dropping decoded job");
                    }
                }
                _ = self.shutdown.wait_for(|stop| *stop) => {
                    warn!(worker = self.id, "Pool stopped before decoded job was collected");
                    break;
                }
            }
        }

        self.inbox.close();
        while let Ok(job) = self.inbox.try_recv() {
            warn!(
                worker = self.id,
                bytes = job.content.len(),
                "Pool stopped before routed job was decoded"
            );
        }

        debug!(worker = self.id, "Worker stopped");
    }

    /// Decode one job on the blocking pool
    async fn process(&self, job: Data) -> Data {
        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak_active.fetch_max(active, Ordering::SeqCst);

        trace!(worker = self.id, bytes = job.content.len(), "Decoding job");

        let options = self.options;
        let done = match tokio::task::spawn_blocking(move || decode_data(job, &options)).await {
            Ok(done) => done,
            Err(e) => Data {
                error: Some(YencError::Io(std::io::Error::other(format!(
                    "Task join error: {}",
                    e
                )))),
                ..Default::default()
            },
        };

        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        self.counters.completed.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = &done.error {
            self.counters.failed.fetch_add(1, Ordering::SeqCst);
            warn!(worker = self.id, "yEnc decode failed: {}", err);
        }

        done
    }
}
