// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # graph-ir
//!
//! A minimal operator-level IR for the graphs handed to the compiler.
//!
//! - [`Operator`] — one node: name, operator kind (e.g. `aten::conv2d`), the
//!   stack of enclosing module types, and its input/output tensor names.
//! - [`ComputeGraph`] — operators in topological order plus the graph's
//!   input and output tensors, with a **type-state pattern**
//!   (`Loaded` → `Validated`).
//! - [`GraphManifest`] / [`GraphLoader`] — JSON description of a graph and
//!   the loader that turns it into a validated graph.
//!
//! # Example
//! ```no_run
//! use graph_ir::GraphLoader;
//! use std::path::Path;
//!
//! let graph = GraphLoader::load(Path::new("./graphs/resnet18.json")).unwrap();
//! println!("{}", graph.summary());
//! for op in graph.iter_operators() {
//!     println!("  {}", op.summary());
//! }
//! ```

mod error;
pub mod graph;
mod loader;
mod manifest;
mod operator;

pub use error::GraphError;
pub use graph::{ComputeGraph, TensorInfo};
pub use loader::GraphLoader;
pub use manifest::{GraphManifest, ManifestOperator};
pub use operator::Operator;
