// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: Compare fallback policies on a synthetic detector graph.
//!
//! Larger minimum region sizes trade accelerator coverage for fewer
//! engine boundaries.
//!
//! ```bash
//! cargo run -p pipeline --example fallback_comparison
//! ```

use compile_settings::{CompilationSettings, FallbackPolicy};
use engine_builder::ReferenceBackend;
use graph_ir::{graph::Validated, ComputeGraph, Operator};
use partition_planner::SupportTable;
use pipeline::{Orchestrator, OrchestratorConfig};
use std::sync::Arc;
use tensor_spec::{DType, ShapeSpec, TensorFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let graph = Arc::new(build_graph(6)?);
    println!("Graph: {}\n", graph.summary());

    let orchestrator = Orchestrator::new(
        Arc::new(SupportTable::accept_all()),
        Arc::new(ReferenceBackend::new().with_layer_workspace(1 << 20)),
        OrchestratorConfig::default(),
    )?;

    println!(
        "{:<16} {:>9} {:>8} {:>10} {:>12}",
        "Min region", "Segments", "Engines", "Coverage", "Peak MB",
    );
    println!("{}", "-".repeat(60));

    for min_region_size in [1, 2, 3, 5] {
        let settings = CompilationSettings::builder()
            .input(ShapeSpec::dynamic(
                vec![1, 3, 320, 320],
                vec![4, 3, 640, 640],
                vec![8, 3, 1280, 1280],
                DType::Float,
                TensorFormat::Contiguous,
            )?)
            .enabled_precision(DType::Half)
            .fallback(FallbackPolicy::new(
                true,
                min_region_size,
                ["custom::nms", "custom::roi_align"],
                Vec::<String>::new(),
            )?)
            .build()?;

        let exe = orchestrator.compile(Arc::clone(&graph), Arc::new(settings)).await?;
        println!(
            "{:<16} {:>9} {:>8} {:>9.0}% {:>12.2}",
            min_region_size,
            exe.num_segments(),
            exe.num_engines(),
            exe.metrics.accelerator_coverage() * 100.0,
            exe.metrics.peak_device_bytes as f64 / (1024.0 * 1024.0),
        );
    }
    Ok(())
}

/// Backbone stages of decreasing length, each followed by a custom op.
fn build_graph(stages: usize) -> Result<ComputeGraph<Validated>, graph_ir::GraphError> {
    let mut ops = Vec::new();
    let mut prev = "image".to_string();
    for s in 0..stages {
        let run = stages - s;
        for c in 0..run {
            let out = format!("s{s}.c{c}");
            ops.push(
                Operator::new(ops.len(), format!("stage{s}.conv{c}"), "aten::conv2d")
                    .with_module_path(["Backbone", "Stage"])
                    .with_inputs([prev.clone()])
                    .with_outputs([out.clone()]),
            );
            prev = out;
        }
        let kind = if s % 2 == 0 { "custom::nms" } else { "custom::roi_align" };
        let out = format!("s{s}.post");
        ops.push(
            Operator::new(ops.len(), format!("stage{s}.post"), kind)
                .with_inputs([prev.clone()])
                .with_outputs([out.clone()]),
        );
        prev = out;
    }
    ComputeGraph::new("detector".into(), vec!["image".into()], ops, vec![prev]).validate()
}
