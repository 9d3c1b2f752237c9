// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # pipeline
//!
//! The orchestrator that turns a graph and validated settings into a
//! hybrid executable.
//!
//! The pipeline takes:
//! - A validated `ComputeGraph` from `graph-ir`.
//! - Immutable `CompilationSettings` from `compile-settings`, shared by
//!   every build as an `Arc`.
//! - An `OperatorSupport` oracle and an `AcceleratorBackend`.
//!
//! It partitions once, builds every accelerator region on blocking workers
//! (bounded by [`OrchestratorConfig::max_parallel_builds`]), and assembles
//! a [`HybridExecutable`] whose segments follow the partition order.
//!
//! # Failure
//! The first region that fails ends the compile with that region's error;
//! the other in-flight builds are cancelled and drained first. No partial
//! executable is ever returned.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use compile_settings::CompilationSettings;
//! use engine_builder::ReferenceBackend;
//! use graph_ir::{ComputeGraph, Operator};
//! use partition_planner::SupportTable;
//! use pipeline::{Orchestrator, OrchestratorConfig};
//! use tensor_spec::{DType, ShapeSpec, TensorFormat};
//!
//! # #[tokio::main(flavor = "multi_thread", worker_threads = 2)]
//! # async fn main() -> Result<(), pipeline::CompileError> {
//! let ops = vec![Operator::new(0, "relu", "aten::relu").with_inputs(["x"]).with_outputs(["y"])];
//! let graph = ComputeGraph::new("g".into(), vec!["x".into()], ops, vec!["y".into()]).validate()?;
//! let settings = CompilationSettings::builder()
//!     .input(ShapeSpec::fixed(vec![1, 16], DType::Float, TensorFormat::Contiguous)?)
//!     .build()?;
//!
//! let orchestrator = Orchestrator::new(
//!     Arc::new(SupportTable::accept_all()),
//!     Arc::new(ReferenceBackend::new()),
//!     OrchestratorConfig::default(),
//! )?;
//! let exe = orchestrator.compile(Arc::new(graph), Arc::new(settings)).await?;
//! assert_eq!(exe.num_engines(), 1);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod executable;
mod metrics;
mod orchestrator;

pub use config::OrchestratorConfig;
pub use error::CompileError;
pub use executable::{ExecutableSegment, HybridExecutable};
pub use metrics::{CompileMetrics, RegionBuildMetrics};
pub use orchestrator::{check_arity, Orchestrator};
