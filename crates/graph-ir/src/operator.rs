// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator nodes of the computation graph.
//!
//! An [`Operator`] carries no weights or attributes, only what partitioning
//! and engine lowering need: its kind, where it sits in the module
//! hierarchy, and which tensors it reads and writes.

/// A single node in the computation graph.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Operator {
    /// Unique identifier for this operator (e.g. `"features.0.conv"`).
    pub name: String,
    /// Operator type (e.g. `"aten::conv2d"`). Matched against fallback
    /// exclusion lists and the backend's support table.
    pub kind: String,
    /// Types of the enclosing modules, outermost first
    /// (e.g. `["torchvision.models.resnet.ResNet", "torchvision.models.resnet.BasicBlock"]`).
    #[serde(default)]
    pub module_path: Vec<String>,
    /// Position in topological order (0-based).
    pub index: usize,
    /// Names of consumed tensors.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Names of produced tensors.
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl Operator {
    /// Creates an operator with no module context and no tensors.
    pub fn new(index: usize, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            module_path: Vec::new(),
            index,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_inputs<I, T>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outputs<I, T>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_module_path<I, T>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.module_path = path.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if any enclosing module type is in `modules`.
    pub fn is_within_any<'a, I>(&self, modules: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        let modules: Vec<&String> = modules.into_iter().collect();
        self.module_path.iter().any(|m| modules.contains(&m))
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        let scope = if self.module_path.is_empty() {
            String::new()
        } else {
            format!(" in {}", self.module_path.join(" > "))
        };
        format!(
            "[{}] {} ({}){} — {} in, {} out",
            self.index,
            self.name,
            self.kind,
            scope,
            self.inputs.len(),
            self.outputs.len(),
        )
    }
}
