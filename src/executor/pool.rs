//! Bounded hashing pool.
//!
//! Dispatcher + worker inbox design:
//! - single-consumer upstream `mpsc::Receiver` (dispatcher)
//! - per-worker bounded `mpsc` inbox channels
//! - each worker hashes one file at a time on the blocking pool
//! - explicit sender drop before awaiting workers, so every batch ends in a
//!   barrier: `hash_tree` returns only after all jobs finished

use crate::hash::compute_hash;
use crate::types::{Digest, FileTree, MirrorError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

/// One file to hash.
#[derive(Debug, Clone)]
pub struct HashJob {
    /// Key in the inventory
    pub relative: PathBuf,
    /// Absolute location on disk
    pub absolute: PathBuf,
}

/// Relative path paired with its hashing result.
pub type JobOutcome = (PathBuf, Result<Digest, MirrorError>);

/// Runtime stats for one hashed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub enqueued: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
    pub per_worker_completed: Vec<usize>,
}

impl PoolStats {
    fn new(workers: usize) -> Self {
        Self {
            workers,
            enqueued: 0,
            dispatched: 0,
            completed: 0,
            failed: 0,
            per_worker_completed: vec![0; workers],
        }
    }
}

/// Worker pool computing content digests with bounded parallelism.
///
/// Built once and reused by every pass.
pub struct HashPool {
    runtime: Runtime,
    workers: usize,
    queue_capacity: usize,
}

impl HashPool {
    /// Create a pool with `worker_count` concurrent hashers (minimum one).
    pub fn new(worker_count: usize) -> Result<Self, MirrorError> {
        let workers = worker_count.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers.min(4))
            .max_blocking_threads(workers)
            .thread_name("dirmirror-hash")
            .enable_all()
            .build()
            .map_err(MirrorError::Io)?;

        Ok(Self {
            runtime,
            workers,
            queue_capacity: workers * 2,
        })
    }

    /// Pool sized to the available hardware parallelism.
    pub fn with_available_parallelism() -> Result<Self, MirrorError> {
        Self::new(num_cpus::get())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fill in the digest of every entry in `tree`.
    ///
    /// Blocks until all jobs complete. If any file fails to hash, the first
    /// failure is returned once the batch has drained, and the tree must not be
    /// used for comparison.
    pub fn hash_tree(&self, tree: &mut FileTree) -> Result<PoolStats, MirrorError> {
        let jobs: Vec<HashJob> = tree
            .unhashed_paths()
            .map(|relative| HashJob {
                relative: relative.clone(),
                absolute: tree.root_path.join(relative),
            })
            .collect();

        let (stats, outcomes) = self.run_batch(jobs)?;

        let mut first_error = None;
        for (relative, outcome) in outcomes {
            match outcome {
                Ok(digest) => {
                    tree.set_digest(&relative, digest);
                }
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        if !tree.is_fully_hashed() {
            return Err(MirrorError::Pool(format!(
                "{} entries left unhashed under {}",
                tree.unhashed_paths().count(),
                tree.root_path.display()
            )));
        }

        Ok(stats)
    }

    /// Hash a batch of jobs and return every outcome (barrier).
    pub fn run_batch(&self, jobs: Vec<HashJob>) -> Result<(PoolStats, Vec<JobOutcome>), MirrorError> {
        let workers = self.workers.min(jobs.len()).max(1);
        let capacity = self.queue_capacity;
        let stats = Arc::new(Mutex::new(PoolStats::new(workers)));
        let total = jobs.len();

        self.runtime.block_on(async move {
            let (enqueue_tx, enqueue_rx) = mpsc::channel::<HashJob>(capacity);
            let (result_tx, mut result_rx) = mpsc::channel::<JobOutcome>(capacity);

            let mut worker_txs = Vec::with_capacity(workers);
            let mut worker_handles: Vec<JoinHandle<()>> = Vec::with_capacity(workers);
            for worker_id in 0..workers {
                let (worker_tx, worker_rx) = mpsc::channel::<HashJob>(capacity);
                worker_txs.push(worker_tx);
                worker_handles.push(tokio::spawn(worker_loop(
                    worker_id,
                    worker_rx,
                    result_tx.clone(),
                    Arc::clone(&stats),
                )));
            }
            drop(result_tx);

            let dispatcher =
                tokio::spawn(dispatcher_loop(enqueue_rx, worker_txs, Arc::clone(&stats)));

            let producer = {
                let stats = Arc::clone(&stats);
                tokio::spawn(async move {
                    for job in jobs {
                        if enqueue_tx.send(job).await.is_err() {
                            break;
                        }
                        stats.lock().await.enqueued += 1;
                    }
                    // enqueue_tx dropped here, closing the dispatcher input.
                })
            };

            let mut outcomes = Vec::with_capacity(total);
            while let Some(outcome) = result_rx.recv().await {
                outcomes.push(outcome);
            }

            producer.await.map_err(map_join_error)?;
            dispatcher.await.map_err(map_join_error)?;
            for handle in worker_handles {
                handle.await.map_err(map_join_error)?;
            }

            if outcomes.len() != total {
                return Err(MirrorError::Pool(format!(
                    "expected {} hash results, received {}",
                    total,
                    outcomes.len()
                )));
            }

            let snapshot = stats.lock().await.clone();
            Ok((snapshot, outcomes))
        })
    }
}

async fn dispatcher_loop(
    mut enqueue_rx: mpsc::Receiver<HashJob>,
    worker_txs: Vec<mpsc::Sender<HashJob>>,
    stats: Arc<Mutex<PoolStats>>,
) {
    let mut next_worker = 0usize;
    let worker_len = worker_txs.len();

    while let Some(job) = enqueue_rx.recv().await {
        if worker_len == 0 {
            break;
        }

        let target = next_worker % worker_len;
        if worker_txs[target].send(job).await.is_ok() {
            stats.lock().await.dispatched += 1;
            next_worker = (next_worker + 1) % worker_len;
        } else {
            debug!("worker {} inbox closed, job dropped", target);
        }
    }
    // worker_txs are dropped here, which closes worker inboxes.
}

async fn worker_loop(
    worker_id: usize,
    mut worker_rx: mpsc::Receiver<HashJob>,
    result_tx: mpsc::Sender<JobOutcome>,
    stats: Arc<Mutex<PoolStats>>,
) {
    while let Some(job) = worker_rx.recv().await {
        let HashJob { relative, absolute } = job;
        let hashed = {
            let absolute = absolute.clone();
            tokio::task::spawn_blocking(move || compute_hash(&absolute)).await
        };
        let outcome = match hashed {
            Ok(result) => result,
            Err(join_err) => Err(MirrorError::Pool(format!(
                "hash task for {} failed: {}",
                absolute.display(),
                join_err
            ))),
        };

        {
            let mut guard = stats.lock().await;
            guard.completed += 1;
            if outcome.is_err() {
                guard.failed += 1;
            }
            if let Some(slot) = guard.per_worker_completed.get_mut(worker_id) {
                *slot += 1;
            }
        }

        if result_tx.send((relative, outcome)).await.is_err() {
            break;
        }
    }
}

fn map_join_error(error: tokio::task::JoinError) -> MirrorError {
    MirrorError::Pool(format!("hash pool task failed: {}", error))
}
