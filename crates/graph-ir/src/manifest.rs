// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON graph manifest parsing.
//!
//! # Format
//! ```json
//! {
//!   "name": "tiny-cnn",
//!   "inputs": ["x"],
//!   "outputs": ["logits"],
//!   "operators": [
//!     {
//!       "name": "conv1",
//!       "kind": "aten::conv2d",
//!       "module_path": ["Net"],
//!       "inputs": ["x"],
//!       "outputs": ["c1"]
//!     },
//!     ...
//!   ]
//! }
//! ```
//!
//! Operator indices are implied by position in the `operators` array.

use crate::GraphError;
use std::path::Path;

/// Top-level graph manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GraphManifest {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    pub operators: Vec<ManifestOperator>,
}

/// A single operator entry in the manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestOperator {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub module_path: Vec<String>,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl GraphManifest {
    /// Loads a manifest from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let manifest: Self = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// Checks the manifest-level properties that do not need dataflow
    /// analysis: at least one operator, and no operator without a kind.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.operators.is_empty() {
            return Err(GraphError::InvalidGraph(
                "manifest contains no operators".into(),
            ));
        }
        for op in &self.operators {
            if op.kind.trim().is_empty() {
                return Err(GraphError::InvalidOperator {
                    operator: op.name.clone(),
                    detail: "missing operator kind".into(),
                });
            }
        }
        if self.outputs.is_empty() {
            tracing::warn!("manifest '{}' declares no graph outputs", self.name);
        }
        Ok(())
    }
}
