//! # Shard Pool
//!
//! A fixed set of worker threads, each draining one bounded queue. The shard
//! of a transaction is a pure function of its sender, so one sender's
//! transactions run in submission order on one worker while different
//! senders proceed in parallel.
//!
//! Queues are tokio `mpsc` channels: producers `send().await` and block on a
//! full queue, workers `blocking_recv()` on their own OS thread. A `Flush`
//! marker behind the queued jobs acknowledges once everything before it has
//! completed.

use crate::config::ExecutorConfig;
use crate::executor::{run, Completion};
use parking_lot::{Mutex, RwLock};
use sc_02_transaction::{decode_trx, TrxContextBuilder};
use shared_types::{Address, AppError, AppResult, ExecMode};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

enum ShardMsg {
    Job {
        raw: Vec<u8>,
        height: u64,
        on_done: Completion,
    },
    Flush(oneshot::Sender<()>),
}

/// Shard index for `sender`: its last byte modulo the shard count.
pub fn shard_of(sender: &Address, shard_count: usize) -> usize {
    usize::from(sender[sender.len() - 1]) % shard_count.max(1)
}

pub struct ShardPool {
    shard_count: usize,
    /// Emptied on shutdown.
    queues: RwLock<Vec<mpsc::Sender<ShardMsg>>>,
    stopped: Mutex<Vec<oneshot::Receiver<u64>>>,
}

impl ShardPool {
    pub fn start(builder: TrxContextBuilder, config: &ExecutorConfig) -> AppResult<Self> {
        let shard_count = config.shard_count.max(1);
        let capacity = config.queue_capacity.max(1);
        let mut queues = Vec::with_capacity(shard_count);
        let mut stopped = Vec::with_capacity(shard_count);

        for shard in 0..shard_count {
            let (tx, rx) = mpsc::channel(capacity);
            let (done_tx, done_rx) = oneshot::channel();
            let builder = builder.clone();
            std::thread::Builder::new()
                .name(format!("sc-shard-{shard}"))
                .spawn(move || {
                    let processed = worker_loop(&builder, rx);
                    debug!("[sc-06] shard {} stopped after {} transactions", shard, processed);
                    let _ = done_tx.send(processed);
                })
                .map_err(|e| AppError::InvalidState(format!("spawn shard worker {shard}: {e}")))?;
            queues.push(tx);
            stopped.push(done_rx);
        }

        info!(
            "[sc-06] shard pool started: {} shards, queue capacity {}",
            shard_count, capacity
        );
        Ok(Self {
            shard_count,
            queues: RwLock::new(queues),
            stopped: Mutex::new(stopped),
        })
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Queue `raw` on its sender's shard. Undecodable input and submissions
    /// after shutdown complete immediately with an error.
    pub async fn submit(&self, raw: Vec<u8>, height: u64, on_done: Completion) {
        let from = match decode_trx(&raw) {
            Ok(trx) => trx.from,
            Err(e) => {
                on_done(Err(e));
                return;
            }
        };

        let queue = self.queues.read().get(shard_of(&from, self.shard_count)).cloned();
        let Some(queue) = queue else {
            on_done(Err(stopped_error()));
            return;
        };

        let job = ShardMsg::Job {
            raw,
            height,
            on_done,
        };
        if let Err(mpsc::error::SendError(ShardMsg::Job { on_done, .. })) = queue.send(job).await {
            on_done(Err(stopped_error()));
        }
    }

    /// Wait until every job queued before this call has completed.
    pub async fn flush(&self) {
        let queues = self.queues.read().clone();
        let mut acks = Vec::with_capacity(queues.len());
        for queue in queues {
            let (tx, rx) = oneshot::channel();
            if queue.send(ShardMsg::Flush(tx)).await.is_ok() {
                acks.push(rx);
            }
        }
        for ack in acks {
            let _ = ack.await;
        }
    }

    /// Close every queue, let the workers drain what is already queued and
    /// wait for them to exit.
    pub async fn shutdown(&self) {
        let queues = std::mem::take(&mut *self.queues.write());
        if queues.is_empty() {
            return;
        }
        drop(queues);

        let stopped = std::mem::take(&mut *self.stopped.lock());
        let mut total = 0u64;
        for done in stopped {
            match done.await {
                Ok(processed) => total += processed,
                Err(_) => warn!("[sc-06] shard worker exited without reporting"),
            }
        }
        info!("[sc-06] shard pool stopped, {} transactions processed", total);
    }
}

fn worker_loop(builder: &TrxContextBuilder, mut rx: mpsc::Receiver<ShardMsg>) -> u64 {
    let mut processed = 0u64;
    while let Some(msg) = rx.blocking_recv() {
        match msg {
            ShardMsg::Job {
                raw,
                height,
                on_done,
            } => {
                on_done(run(builder, &raw, height, ExecMode::Execution));
                processed += 1;
            }
            ShardMsg::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    processed
}

fn stopped_error() -> AppError {
    AppError::InvalidState("executor is shut down".to_string())
}
