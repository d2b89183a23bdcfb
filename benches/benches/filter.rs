// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use drawstate::{
    CategoryId, ChunkPolicy, Criteria, DrawingState, ModifySelectionMode, StateConfig,
};

const CHUNK: usize = 8_192;

/// Simple LCG for deterministic selections.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }
}

/// A layer with roughly `1 / every` features selected, every fourth hidden,
/// and three categories.
fn layer(len: usize, every: u64) -> DrawingState {
    let config = StateConfig::default().with_chunk_policy(ChunkPolicy::FixedSize(CHUNK));
    let mut state = DrawingState::with_features(len, config);
    let categories = [CategoryId::new(1), CategoryId::new(2), CategoryId::new(3)];
    for i in 0..len {
        let _ = state.set_category(i, Some(categories[i % categories.len()]));
        if i % 4 == 0 {
            let _ = state.set_visible(i, false);
        }
    }
    let mut rng = Lcg(0x5EED);
    let picks: Vec<usize> = (0..len).filter(|_| rng.next() % every == 0).collect();
    let _ = state
        .selection()
        .select_indices(picks, ModifySelectionMode::Replace);
    state.flush();
    state
}

fn bench_query_chunk(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter/query_chunk");
    group.throughput(Throughput::Elements(CHUNK as u64));

    let state = layer(1_048_576, 16);
    let chunk = 64;

    let cases = [
        ("visible", Criteria::new().chunk(chunk).visible(true)),
        ("selected", Criteria::new().chunk(chunk).selected(true)),
        ("unselected", Criteria::new().chunk(chunk).selected(false)),
        (
            "category_visible",
            Criteria::new()
                .chunk(chunk)
                .category(CategoryId::new(2))
                .visible(true),
        ),
    ];
    for (name, criteria) in cases {
        group.bench_with_input(BenchmarkId::new(name, chunk), &criteria, |b, criteria| {
            b.iter(|| black_box(state.query(*criteria).count()));
        });
    }

    group.finish();
}

fn bench_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter/count");

    // Single-axis counts come from counters; combined ones scan.
    for len in [65_536_usize, 1_048_576] {
        let state = layer(len, 16);
        group.throughput(Throughput::Elements(len as u64));
        let cases = [
            ("selected", Criteria::new().selected(true)),
            ("visible", Criteria::new().visible(true)),
            ("chunk_selected", Criteria::new().chunk(3).selected(true)),
            (
                "selected_visible",
                Criteria::new().selected(true).visible(true),
            ),
        ];
        for (name, criteria) in cases {
            group.bench_with_input(BenchmarkId::new(name, len), &criteria, |b, criteria| {
                b.iter(|| black_box(state.count(*criteria)));
            });
        }
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter/snapshot");
    let state = layer(262_144, 8);

    group.throughput(Throughput::Elements(CHUNK as u64));
    group.bench_function("chunk", |b| {
        b.iter(|| {
            let snapshot = state.snapshot(0..CHUNK);
            black_box(snapshot.count(Criteria::new().selected(true).visible(true)))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_query_chunk, bench_count, bench_snapshot);
criterion_main!(benches);
