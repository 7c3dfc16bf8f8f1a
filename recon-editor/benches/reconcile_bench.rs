//! Criterion micro-benchmarks for reconciliation state.
//!
//! Benchmarks:
//! - Snapshot application (drift path, no outstanding submissions)
//! - Snapshot application (self-echo path, several outstanding submissions)
//! - Field input on a wide schema

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use recon_editor::ReconciliationState;
use recon_editor::service::mock::RecordingUpdateService;
use recon_model::{FieldDescriptor, FieldSchema};
use recon_types::{Record, RecordId};
use serde_json::json;

fn wide_schema(width: usize) -> Arc<FieldSchema> {
    let mut fields = vec![FieldDescriptor::immutable("id")];
    fields.extend((0..width).map(|i| FieldDescriptor::mutable(&format!("f{i}"))));
    Arc::new(FieldSchema::new(fields).unwrap())
}

fn wide_record(width: usize, salt: i64) -> Record {
    let mut record = Record::new();
    record.insert("id", json!(1));
    for i in 0..width {
        record.insert(format!("f{i}"), json!(i as i64 + salt));
    }
    record
}

fn bench_snapshot_drift(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_snapshot_drift");
    for width in [8usize, 64, 512] {
        let schema = wide_schema(width);
        let base = wide_record(width, 0);
        let next = wide_record(width, 1);
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            b.iter_batched(
                || ReconciliationState::new(&base, Arc::clone(&schema)),
                |mut state| black_box(state.apply_incoming_snapshot(&next)),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_snapshot_echo(c: &mut Criterion) {
    // Update calls run to completion on worker threads so nothing piles up.
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();
    let id = RecordId::from(1);

    let mut group = c.benchmark_group("apply_snapshot_echo");
    for outstanding in [1usize, 4, 16] {
        let schema = wide_schema(64);
        let base = wide_record(64, 0);
        let echo = wide_record(64, 1);
        group.bench_with_input(
            BenchmarkId::from_parameter(outstanding),
            &outstanding,
            |b, &outstanding| {
                b.iter_batched(
                    || {
                        let service = Arc::new(RecordingUpdateService::new());
                        let mut state = ReconciliationState::new(&base, Arc::clone(&schema));
                        let keys: Vec<String> = schema.mutable_keys().map(str::to_string).collect();
                        for chunk in keys.chunks(keys.len().div_ceil(outstanding)) {
                            for key in chunk {
                                state.set_field_value(key, echo.get(key).cloned().unwrap());
                            }
                            recon_editor::submit(&mut state, &id, service.clone(), |_| {})
                                .unwrap();
                        }
                        state
                    },
                    |mut state| black_box(state.apply_incoming_snapshot(&echo)),
                    BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

fn bench_field_input(c: &mut Criterion) {
    let schema = wide_schema(256);
    let base = wide_record(256, 0);
    c.bench_function("set_field_value_256", |b| {
        b.iter_batched(
            || ReconciliationState::new(&base, Arc::clone(&schema)),
            |mut state| {
                for i in 0..256 {
                    state.set_field_value(&format!("f{i}"), json!(-1));
                }
                black_box(state.merged_view())
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_snapshot_drift,
    bench_snapshot_echo,
    bench_field_input
);
criterion_main!(benches);
