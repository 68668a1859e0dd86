use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use gametrust_escrow::{EscrowStatus, EscrowStore, MemoryStorage, NewEscrow, StoreConfig};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

const CYCLES: u64 = 1_000;

fn escrow_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");

    group.throughput(Throughput::Elements(CYCLES));
    group.measurement_time(Duration::from_secs(20));
    group.sample_size(50);

    let input = NewEscrow::new("b1", "s1", "a1", "CODM Legendary", dec!(70000));

    group.bench_function("create_dispute_refund_clear_1K_cycles", |b| {
        let store = EscrowStore::new(StoreConfig::default(), Arc::new(MemoryStorage::new()));
        b.iter(|| {
            for _ in 0..CYCLES {
                store.create(input.clone()).unwrap();
                store.transition(EscrowStatus::Disputed, Some("bench")).unwrap();
                store.transition(EscrowStatus::Refunded, None).unwrap();
                store.clear().unwrap();
            }
        });
    });

    group.bench_function("load_1K_times", |b| {
        let store = EscrowStore::new(StoreConfig::default(), Arc::new(MemoryStorage::new()));
        store.create(input.clone()).unwrap();
        b.iter(|| {
            for _ in 0..CYCLES {
                store.load().unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, escrow_lifecycle);
criterion_main!(benches);
