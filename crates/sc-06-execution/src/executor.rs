//! Synchronous dispatch and the executor facade.

use crate::config::ExecutorConfig;
use crate::pool::ShardPool;
use sc_02_transaction::{TrxContext, TrxContextBuilder, TrxKind};
use shared_types::{short_hex, Address, AppResult, ExecMode, Hash};
use tracing::{debug, error, trace};

/// Result of one applied (or checked) transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrxReceipt {
    pub tx_hash: Hash,
    pub kind: TrxKind,
    pub from: Address,
    pub to: Address,
    pub height: u64,
    pub gas_wanted: u64,
    pub gas_used: u64,
    pub mode: ExecMode,
}

impl TrxReceipt {
    fn from_context(ctx: &TrxContext) -> Self {
        Self {
            tx_hash: ctx.tx_hash,
            kind: ctx.kind(),
            from: ctx.trx.from,
            to: ctx.trx.to,
            height: ctx.height,
            gas_wanted: ctx.trx.gas,
            gas_used: ctx.gas_used,
            mode: ctx.mode,
        }
    }
}

pub type TrxOutcome = AppResult<TrxReceipt>;

/// Per-transaction completion callback of the sharded path.
pub type Completion = Box<dyn FnOnce(TrxOutcome) + Send + 'static>;

/// Validate then execute `ctx` against gov, account and stake, in that order.
pub fn dispatch(ctx: &mut TrxContext) -> AppResult<()> {
    validate_all(ctx)?;
    execute_all(ctx)
}

/// Run every handler's validation. Writes nothing.
pub fn validate_all(ctx: &mut TrxContext) -> AppResult<()> {
    for (name, handler) in &ctx.handlers.ordered() {
        match handler.validate_trx(ctx) {
            Err(e) if e.is_unknown_trx_type() => {
                trace!("[sc-06] {} skips {} validation", name, ctx.kind().as_str());
            }
            other => other?,
        }
    }
    Ok(())
}

/// Run every handler's execution. A failing handler reverts the ones that
/// already applied, newest first, so a failed transaction leaves no writes.
pub fn execute_all(ctx: &mut TrxContext) -> AppResult<()> {
    let handlers = ctx.handlers.ordered();
    let mut applied = Vec::with_capacity(handlers.len());

    for (name, handler) in &handlers {
        match handler.execute_trx(ctx) {
            Ok(()) => applied.push((*name, handler)),
            Err(e) if e.is_unknown_trx_type() => {
                trace!("[sc-06] {} skips {} execution", name, ctx.kind().as_str());
            }
            Err(e) => {
                for (done, handler) in applied.iter().rev() {
                    if let Err(revert) = handler.revert_trx(ctx) {
                        error!(
                            "[sc-06] {} failed to revert {} {}: {}",
                            done,
                            ctx.kind().as_str(),
                            short_hex(&ctx.tx_hash),
                            revert
                        );
                    }
                }
                debug!(
                    "[sc-06] {} failed {} {}, reverted {} handler(s)",
                    name,
                    ctx.kind().as_str(),
                    short_hex(&ctx.tx_hash),
                    applied.len()
                );
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Builds contexts and runs them, either inline or through the shard pool.
pub struct TrxExecutor {
    builder: TrxContextBuilder,
    pool: ShardPool,
    config: ExecutorConfig,
}

impl TrxExecutor {
    /// Create the executor and start its shard workers.
    pub fn new(builder: TrxContextBuilder, config: ExecutorConfig) -> AppResult<Self> {
        let pool = ShardPool::start(builder.clone(), &config)?;
        Ok(Self {
            builder,
            pool,
            config,
        })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Build and run one transaction on the caller's thread.
    pub fn execute_sync(&self, raw: &[u8], height: u64, mode: ExecMode) -> TrxOutcome {
        run(&self.builder, raw, height, mode)
    }

    /// Queue a transaction for in-block execution. `on_done` is called
    /// exactly once with the outcome.
    pub async fn submit(&self, raw: Vec<u8>, height: u64, on_done: Completion) {
        self.pool.submit(raw, height, on_done).await;
    }

    /// Wait until every submitted transaction has completed.
    pub async fn flush(&self) {
        self.pool.flush().await;
    }

    /// Close the shard queues and wait for the workers to drain them.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

pub(crate) fn run(builder: &TrxContextBuilder, raw: &[u8], height: u64, mode: ExecMode) -> TrxOutcome {
    let mut ctx = builder.build(raw, height, mode)?;
    match dispatch(&mut ctx) {
        Ok(()) => {
            debug!(
                "[sc-06] {} {} from {} applied at {} ({})",
                ctx.kind().as_str(),
                short_hex(&ctx.tx_hash),
                short_hex(&ctx.trx.from),
                height,
                mode.label()
            );
            Ok(TrxReceipt::from_context(&ctx))
        }
        Err(e) => {
            debug!(
                "[sc-06] {} {} rejected ({}): {}",
                ctx.kind().as_str(),
                short_hex(&ctx.tx_hash),
                mode.label(),
                e
            );
            Err(e)
        }
    }
}
