// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # engine-builder
//!
//! Turns one accelerator [`Region`](partition_planner::Region) into a
//! serialized engine through an [`AcceleratorBackend`].
//!
//! A build goes through three steps:
//!
//! 1. [`lower`] the region into a [`BackendNetwork`], binding graph inputs
//!    to optimisation profiles from the settings' shape descriptors;
//! 2. flatten the settings into [`BackendSettings`], carrying the lowering
//!    mode exactly as the settings derived it;
//! 3. call the backend with a [`BuildContext`] that accounts device memory
//!    against the workspace budget and observes the [`BuildBudget`].
//!
//! Backend failures become [`EngineBuildError`]s carrying the backend's
//! diagnostic text. Cancellation and expired deadlines become
//! [`BuildCancelled`], after every partial reservation has been released.
//!
//! [`ReferenceBackend`] is a deterministic backend that needs no hardware.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use compile_settings::CompilationSettings;
//! use engine_builder::{BuildBudget, EngineBuilder, ReferenceBackend};
//! use graph_ir::{ComputeGraph, Operator};
//! use partition_planner::{partition, SupportTable};
//! use tensor_spec::{DType, ShapeSpec, TensorFormat};
//!
//! let ops = vec![Operator::new(0, "relu", "aten::relu").with_inputs(["x"]).with_outputs(["y"])];
//! let graph = ComputeGraph::new("g".into(), vec!["x".into()], ops, vec!["y".into()])
//!     .validate()
//!     .unwrap();
//! let settings = CompilationSettings::builder()
//!     .input(ShapeSpec::fixed(vec![1, 16], DType::Float, TensorFormat::Contiguous).unwrap())
//!     .build()
//!     .unwrap();
//! let plan = partition(&graph, &settings, &SupportTable::accept_all()).unwrap();
//!
//! let builder = EngineBuilder::new(Arc::new(ReferenceBackend::new()));
//! let artifact = builder
//!     .build(&graph, &plan.regions[0], &settings, &BuildBudget::unbounded())
//!     .unwrap();
//! assert!(artifact.is_engine());
//! ```

mod backend;
mod budget;
mod builder;
mod context;
mod error;
mod network;
mod reference;
mod settings;

pub use backend::AcceleratorBackend;
pub use budget::BuildBudget;
pub use builder::{BuildReport, CompiledArtifact, EngineArtifact, EngineBuilder};
pub use context::BuildContext;
pub use error::{BackendError, BuildCancelled, BuildError, CancelCause, EngineBuildError};
pub use network::{
    lower, BackendLayer, BackendNetwork, InputBinding, NetworkInput, OptimizationProfile,
};
pub use reference::{ReferenceBackend, REFERENCE_ENGINE_FORMAT};
pub use settings::BackendSettings;
