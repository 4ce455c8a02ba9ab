//! # Execution Benchmarks
//!
//! | Group | Measures |
//! |-------|----------|
//! | sc-02 codec | wire decode and signer recovery of one transfer |
//! | sc-07 check_tx | admission-view validation |
//! | sc-07 block | one block of N transfers, sync and sharded delivery |

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use sc_02_transaction::test_utils::TestWallet;
use sc_02_transaction::{decode_trx, recover_signer};
use sc_06_execution::ExecutorConfig;
use sc_07_block_app::AppConfig;
use sc_tests::support::{Chain, FUNDS, GAS};
use std::time::Duration;

// ============================================================================
// SC-02: Transaction codec
// ============================================================================

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("sc-02-codec");
    let wallet = TestWallet::from_seed(1);
    let raw = wallet.signed_transfer([0x01; 20], 1, 100, GAS);
    let trx = decode_trx(&raw).expect("decode");

    group.bench_function("decode_transfer", |b| b.iter(|| black_box(decode_trx(black_box(&raw)))));
    group.bench_function("recover_signer", |b| b.iter(|| black_box(recover_signer(black_box(&trx)))));
    group.finish();
}

// ============================================================================
// SC-07: Admission
// ============================================================================

fn bench_check_tx(c: &mut Criterion) {
    let mut group = c.benchmark_group("sc-07-check-tx");
    let wallet = TestWallet::from_seed(2);

    // The admission view consumes the nonce, so each iteration gets a fresh chain.
    group.bench_function("transfer", |b| {
        b.iter_batched(
            || {
                let chain = Chain::new(&[10], &[(wallet.address, FUNDS)]);
                let raw = wallet.signed_transfer([0x02; 20], 1, 100, GAS);
                (chain, raw)
            },
            |(chain, raw)| black_box(chain.app.check_tx(&raw)),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

// ============================================================================
// SC-07: Block execution
// ============================================================================

fn block_inputs(senders: u64, config: AppConfig) -> (Chain, Vec<Vec<u8>>) {
    let wallets: Vec<TestWallet> = (0..senders).map(|i| TestWallet::from_seed(100 + i)).collect();
    let holders: Vec<_> = wallets.iter().map(|w| (w.address, FUNDS)).collect();
    let chain = Chain::with_config(&[10, 20, 30], &holders, config);
    let txs = wallets
        .iter()
        .map(|w| w.signed_transfer([0x03; 20], 1, 1, GAS))
        .collect();
    (chain, txs)
}

fn bench_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("sc-07-block");
    group.measurement_time(Duration::from_secs(10));
    let rt = tokio::runtime::Runtime::new().expect("runtime");

    let sharded = AppConfig {
        executor: ExecutorConfig {
            async_delivery: true,
            ..ExecutorConfig::default()
        },
        ..AppConfig::default()
    };

    for size in [10u64, 100, 500] {
        group.throughput(Throughput::Elements(size));
        for (label, config) in [("sync", AppConfig::default()), ("sharded", sharded.clone())] {
            group.bench_with_input(BenchmarkId::new(label, size), &size, |b, &size| {
                b.iter_batched(
                    || block_inputs(size, config.clone()),
                    |(chain, txs)| rt.block_on(async { black_box(chain.block(txs).await.commit) }),
                    BatchSize::LargeInput,
                )
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_codec, bench_check_tx, bench_block);
criterion_main!(benches);
