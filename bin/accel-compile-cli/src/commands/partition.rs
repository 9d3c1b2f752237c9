// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-compile partition`: show where each operator would run.

use crate::SupportArgs;
use compile_settings::CompilationSettings;
use graph_ir::{graph::Validated, ComputeGraph};
use partition_planner::{PartitionPlan, Partitioner};
use std::path::PathBuf;
use std::sync::Arc;

pub fn execute(
    graph: PathBuf,
    settings: PathBuf,
    json: bool,
    support: SupportArgs,
) -> anyhow::Result<()> {
    let graph = super::load_graph(&graph)?;
    let settings = super::load_settings(&settings)?;
    let plan = plan(&graph, &settings, &support)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("  {}", plan.summary());
    println!();
    println!(
        "  {:<4} {:<16} {:>5} {:<28} {:<28}",
        "Idx", "Target", "Ops", "Inputs", "Outputs"
    );
    println!("  {}", "-".repeat(86));
    for region in &plan.regions {
        println!(
            "  {:<4} {:<16} {:>5} {:<28} {:<28}",
            region.index,
            region.target.to_string(),
            region.num_operators(),
            super::truncate(&region.inputs.join(","), 28),
            super::truncate(&region.outputs.join(","), 28),
        );
        for (name, reason) in region.operator_names.iter().zip(&region.fallback_reasons) {
            println!("         └ {}: {}", super::truncate(name, 30), reason);
        }
    }
    Ok(())
}

/// Partitions with the same input-count check `compile` applies.
fn plan(
    graph: &ComputeGraph<Validated>,
    settings: &CompilationSettings,
    support: &SupportArgs,
) -> anyhow::Result<PartitionPlan> {
    pipeline::check_arity(graph, settings)?;
    let partitioner = Partitioner::new(Arc::new(super::support_table(support)));
    Ok(partitioner.partition(graph, settings)?)
}
