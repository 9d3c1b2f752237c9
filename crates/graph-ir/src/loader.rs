// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph loading from JSON manifests.

use crate::graph::Validated;
use crate::{ComputeGraph, GraphError, GraphManifest, Operator};
use std::path::Path;

/// Loads a graph manifest into a validated [`ComputeGraph`].
///
/// # Example
/// ```no_run
/// use graph_ir::GraphLoader;
/// use std::path::Path;
///
/// let graph = GraphLoader::load(Path::new("./graphs/tiny-cnn.json")).unwrap();
/// println!("Loaded {} operators", graph.num_operators());
/// ```
pub struct GraphLoader;

impl GraphLoader {
    /// Reads, checks, and validates a manifest file.
    pub fn load(path: &Path) -> Result<ComputeGraph<Validated>, GraphError> {
        let manifest = GraphManifest::from_file(path)?;
        Self::from_manifest(&manifest)
    }

    /// Builds a validated graph from an already parsed manifest.
    pub fn from_manifest(manifest: &GraphManifest) -> Result<ComputeGraph<Validated>, GraphError> {
        manifest.validate()?;

        let operators = manifest
            .operators
            .iter()
            .enumerate()
            .map(|(i, mo)| Operator {
                name: mo.name.clone(),
                kind: mo.kind.clone(),
                module_path: mo.module_path.clone(),
                index: i,
                inputs: mo.inputs.clone(),
                outputs: mo.outputs.clone(),
            })
            .collect();

        let graph = ComputeGraph::new(
            manifest.name.clone(),
            manifest.inputs.clone(),
            operators,
            manifest.outputs.clone(),
        );
        graph.validate()
    }
}
