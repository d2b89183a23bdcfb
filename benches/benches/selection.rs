// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{
    BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};
use drawstate::{
    ChunkPolicy, DrawingState, EnvelopeTable, ModifySelectionMode, SelectionMode, StateConfig,
};
use drawstate_selection::IndexSelection;
use kurbo::Rect;
use std::time::Duration;

/// Features on a square lattice, one unit apart, each half a unit wide.
fn lattice(n: usize) -> EnvelopeTable {
    let side = (n as f64).sqrt().ceil() as usize;
    let mut table = EnvelopeTable::with_grid(16.0);
    for i in 0..n {
        let x = (i % side) as f64;
        let y = (i / side) as f64;
        table.set(i, Rect::new(x, y, x + 0.5, y + 0.5));
    }
    table
}

fn state(n: usize) -> DrawingState {
    DrawingState::with_features(
        n,
        StateConfig::default().with_chunk_policy(ChunkPolicy::FixedSize(4_096)),
    )
}

fn bench_bitset_combine(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection/bitset_combine");

    // Word-level set algebra should scale with words touched, not with candidates.
    for len in [4_096_usize, 65_536, 1_048_576] {
        let current: IndexSelection = (0..len).step_by(3).collect();
        let candidates: IndexSelection = (0..len).step_by(2).collect();
        group.throughput(Throughput::Elements(len as u64));

        for mode in [
            ModifySelectionMode::Append,
            ModifySelectionMode::Replace,
            ModifySelectionMode::SelectFrom,
        ] {
            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}"), len),
                &candidates,
                |b, candidates| {
                    b.iter_batched(
                        || current.clone(),
                        |mut sel| {
                            sel.combine(candidates, mode);
                            black_box(sel);
                        },
                        BatchSize::LargeInput,
                    );
                },
            );
        }
    }

    group.finish();
}

fn bench_select_by_region(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection/select_by_region");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(3));

    // A viewport-sized region over increasingly large layers.
    for len in [10_000_usize, 250_000] {
        let geometry = lattice(len);
        let region = Rect::new(10.0, 10.0, 60.0, 60.0);
        group.throughput(Throughput::Elements(len as u64));

        group.bench_function(BenchmarkId::new("replace", len), |b| {
            b.iter_batched(
                || state(len),
                |mut s| {
                    let changed = s.selection().select_by_region(
                        &geometry,
                        region,
                        SelectionMode::IntersectsExtent,
                        ModifySelectionMode::Replace,
                    );
                    black_box(changed.ok());
                    black_box(s);
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(BenchmarkId::new("invert", len), |b| {
            b.iter_batched(
                || state(len),
                |mut s| {
                    let changed = s.selection().invert_selection(&geometry, region);
                    black_box(changed.ok());
                    black_box(s);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_select_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection/select_all");

    for len in [65_536_usize, 1_048_576] {
        group.throughput(Throughput::Elements(len as u64));
        group.bench_function(BenchmarkId::from_parameter(len), |b| {
            b.iter_batched(
                || state(len),
                |mut s| {
                    black_box(s.selection().select_all());
                    black_box(s);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_bitset_combine,
    bench_select_by_region,
    bench_select_all
);
criterion_main!(benches);
