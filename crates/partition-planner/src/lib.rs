// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # partition-planner
//!
//! Splits a validated `ComputeGraph` into ordered regions, each targeting
//! either the accelerator or the general-purpose executor, under the
//! fallback policy and lowering mode of a `CompilationSettings`.
//!
//! # Trait-Based Extensibility
//!
//! Which operators the accelerator can convert is decided by an
//! [`OperatorSupport`] oracle, so new backends plug in their own converter
//! tables without touching the segmentation logic. [`SupportTable`] is the
//! table-driven implementation shipped here.
//!
//! # Guarantees
//!
//! - Regions cover every operator exactly once, in topological order.
//! - With fallback enabled, every accelerator region has at least
//!   `min_region_size` operators.
//! - With fallback disabled, the result is a single accelerator region or
//!   [`PartitionError::UnsupportedGraph`]; nothing is silently demoted.
//! - Identical inputs give identical plans.
//!
//! # Example
//! ```
//! use compile_settings::{CompilationSettings, FallbackPolicy};
//! use graph_ir::{ComputeGraph, Operator};
//! use partition_planner::{partition, RegionTarget, SupportTable};
//! use tensor_spec::{DType, ShapeSpec, TensorFormat};
//!
//! let ops = vec![
//!     Operator::new(0, "conv", "aten::conv2d").with_inputs(["x"]).with_outputs(["a"]),
//!     Operator::new(1, "sm", "aten::softmax").with_inputs(["a"]).with_outputs(["y"]),
//! ];
//! let graph = ComputeGraph::new("g".into(), vec!["x".into()], ops, vec!["y".into()])
//!     .validate()
//!     .unwrap();
//! let settings = CompilationSettings::builder()
//!     .input(ShapeSpec::fixed(vec![1, 3, 8, 8], DType::Float, TensorFormat::Contiguous).unwrap())
//!     .fallback(FallbackPolicy::new(true, 1, ["aten::softmax"], Vec::<String>::new()).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let plan = partition(&graph, &settings, &SupportTable::accept_all()).unwrap();
//! assert_eq!(plan.regions[0].target, RegionTarget::Accelerator);
//! assert_eq!(plan.regions[1].target, RegionTarget::GeneralExecutor);
//! ```

mod error;
mod partitioner;
mod plan;
mod support;

pub use error::PartitionError;
pub use partitioner::Partitioner;
pub use plan::{FallbackReason, PartitionPlan, Region, RegionTarget};
pub use support::{OperatorSupport, Support, SupportTable};

use compile_settings::CompilationSettings;
use graph_ir::{graph::Validated, ComputeGraph};
use std::sync::Arc;

/// Partitions `graph` with a one-off copy of `support`.
///
/// Prefer [`Partitioner`] when partitioning repeatedly with one oracle.
pub fn partition<S>(
    graph: &ComputeGraph<Validated>,
    settings: &CompilationSettings,
    support: &S,
) -> Result<PartitionPlan, PartitionError>
where
    S: OperatorSupport + Clone + 'static,
{
    Partitioner::new(Arc::new(support.clone())).partition(graph, settings)
}
