//! Fixed-size pool of insert workers for one file.
//!
//! This module defines the [`WorkerPool`] struct, which spawns a set of
//! asynchronous workers that all consume the same bounded record queue and
//! fan their outcomes into one bounded outcome queue.
//!
//! Termination is cooperative: closing the record queue (dropping its last
//! sender) is the only stop signal. [`WorkerPool::close_when_done`] joins
//! every worker before releasing the outcome sender, so the outcome queue
//! closes only after all workers have provably exited.

use super::worker::{SharedRecords, worker_loop};
use crate::loader::{config::DestinationMap, service::writer::RecordWriter};
use memc_loader_core::AppsInstalled;
use std::sync::Arc;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};

pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `num_workers` workers draining `records`.
    ///
    /// Each worker gets its own clone of `outcomes`; the caller keeps the
    /// original and hands it to [`WorkerPool::close_when_done`].
    pub fn spawn(
        num_workers: usize,
        records: mpsc::Receiver<AppsInstalled>,
        outcomes: &mpsc::Sender<bool>,
        destinations: &Arc<DestinationMap>,
        writer: &Arc<RecordWriter>,
    ) -> Self {
        let records: SharedRecords = Arc::new(Mutex::new(records));

        let workers = (0..num_workers)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&records),
                    outcomes.clone(),
                    Arc::clone(destinations),
                    Arc::clone(writer),
                ))
            })
            .collect();

        Self { workers }
    }

    /// Number of spawned workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Spawns the pool-closer task.
    ///
    /// The task waits for every worker to exit and then drops `outcomes`,
    /// which closes the outcome queue once the workers' own clones are gone.
    pub fn close_when_done(self, outcomes: mpsc::Sender<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            for (worker_id, result) in futures::future::join_all(self.workers)
                .await
                .into_iter()
                .enumerate()
            {
                if let Err(e) = result {
                    tracing::error!("w{worker_id}: terminated abnormally: {e}");
                }
            }
            drop(outcomes);
        })
    }
}
