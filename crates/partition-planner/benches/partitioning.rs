// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for graph partitioning.

use compile_settings::{CompilationSettings, FallbackPolicy};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graph_ir::{graph::Validated, ComputeGraph, Operator};
use partition_planner::{Partitioner, SupportTable};
use std::sync::Arc;
use tensor_spec::{DType, ShapeSpec, TensorFormat};

/// A chain where every `stride`-th operator is excluded.
fn striped_chain(n: usize, stride: usize) -> ComputeGraph<Validated> {
    let ops = (0..n)
        .map(|i| {
            let input = if i == 0 { "x".to_string() } else { format!("t{}", i - 1) };
            let kind = if i % stride == stride - 1 { "aten::softmax" } else { "aten::conv2d" };
            Operator::new(i, format!("op{i}"), kind)
                .with_inputs([input])
                .with_outputs([format!("t{i}")])
        })
        .collect();
    ComputeGraph::new("bench".into(), vec!["x".into()], ops, vec![format!("t{}", n - 1)])
        .validate()
        .unwrap()
}

fn settings() -> CompilationSettings {
    CompilationSettings::builder()
        .input(ShapeSpec::fixed(vec![1, 3, 224, 224], DType::Float, TensorFormat::Contiguous).unwrap())
        .fallback(FallbackPolicy::new(true, 3, ["aten::softmax"], Vec::<String>::new()).unwrap())
        .build()
        .unwrap()
}

fn bench_partition(c: &mut Criterion) {
    let partitioner = Partitioner::new(Arc::new(SupportTable::accept_all()));
    let settings = settings();
    let mut group = c.benchmark_group("partition");
    for n in [100usize, 1_000, 10_000] {
        let graph = striped_chain(n, 7);
        group.bench_with_input(BenchmarkId::from_parameter(n), &graph, |b, g| {
            b.iter(|| partitioner.partition(black_box(g), &settings).unwrap())
        });
    }
    group.finish();
}

fn bench_min_region_demotion(c: &mut Criterion) {
    let partitioner = Partitioner::new(Arc::new(SupportTable::accept_all()));
    let settings = settings();
    // Stride 2 yields single-operator accelerator runs that are all demoted.
    let graph = striped_chain(5_000, 2);
    c.bench_function("partition_demote_all", |b| {
        b.iter(|| partitioner.partition(black_box(&graph), &settings).unwrap())
    });
}

criterion_group!(benches, bench_partition, bench_min_region_demotion);
criterion_main!(benches);
