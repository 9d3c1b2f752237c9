// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Computation graph: operators in topological order.
//!
//! # Type-State Pattern
//!
//! ```text
//! ComputeGraph<Loaded>     — operators parsed, not yet checked.
//!       │  .validate()
//!       ▼
//! ComputeGraph<Validated>  — dataflow verified, ready for partitioning.
//! ```
//!
//! The partitioner only accepts `ComputeGraph<Validated>`, so it never sees
//! a graph whose operator list is out of topological order or reads an
//! undefined tensor. Validation also builds the tensor table used to compute
//! region boundaries.

use crate::{GraphError, Operator};
use std::collections::{HashMap, HashSet};
use std::fmt;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph has been loaded but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been validated and is ready for partitioning.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

/// Dataflow facts about one tensor, computed during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorInfo {
    /// Index of the producing operator, `None` for graph inputs.
    pub producer: Option<usize>,
    /// Index of the last operator that reads the tensor, if any.
    pub last_consumer: Option<usize>,
    /// Whether the tensor is one of the graph's outputs.
    pub is_graph_output: bool,
}

impl TensorInfo {
    /// Returns `true` if the tensor is still needed after operator `index`.
    pub fn live_after(&self, index: usize) -> bool {
        self.is_graph_output || self.last_consumer.is_some_and(|c| c > index)
    }
}

// ── ComputeGraph ───────────────────────────────────────────────────

/// A computation graph as an ordered operator list.
#[derive(Debug, Clone)]
pub struct ComputeGraph<S: GraphState = Loaded> {
    /// Human-readable graph name (e.g. `"resnet18"`).
    pub name: String,
    /// Tensors supplied by the caller, in binding order.
    pub inputs: Vec<String>,
    /// Operators in topological order.
    pub operators: Vec<Operator>,
    /// Tensors returned to the caller.
    pub outputs: Vec<String>,
    tensors: HashMap<String, TensorInfo>,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl ComputeGraph<Loaded> {
    /// Creates a new graph in the `Loaded` state.
    pub fn new(
        name: String,
        inputs: Vec<String>,
        operators: Vec<Operator>,
        outputs: Vec<String>,
    ) -> Self {
        Self {
            name,
            inputs,
            operators,
            outputs,
            tensors: HashMap::new(),
            _state: std::marker::PhantomData,
        }
    }

    /// Validates the graph and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - The graph has at least one operator.
    /// - Operator indices are consecutive starting from 0.
    /// - Operator names are unique.
    /// - Every tensor has exactly one producer (graph input or operator).
    /// - Every operator input is defined before it is read.
    /// - Every graph output is defined.
    pub fn validate(self) -> Result<ComputeGraph<Validated>, GraphError> {
        if self.operators.is_empty() {
            return Err(GraphError::InvalidGraph(
                "graph contains no operators".into(),
            ));
        }

        let mut tensors: HashMap<String, TensorInfo> = HashMap::new();
        for input in &self.inputs {
            let fresh = TensorInfo {
                producer: None,
                last_consumer: None,
                is_graph_output: false,
            };
            if tensors.insert(input.clone(), fresh).is_some() {
                return Err(GraphError::InvalidGraph(format!(
                    "graph input '{input}' is declared twice"
                )));
            }
        }

        let mut names = HashSet::new();
        for (i, op) in self.operators.iter().enumerate() {
            if op.index != i {
                return Err(GraphError::InvalidOperator {
                    operator: op.name.clone(),
                    detail: format!("expected index {i}, got {}", op.index),
                });
            }
            if !names.insert(op.name.as_str()) {
                return Err(GraphError::InvalidOperator {
                    operator: op.name.clone(),
                    detail: "duplicate operator name".into(),
                });
            }
            if op.kind.trim().is_empty() {
                return Err(GraphError::InvalidOperator {
                    operator: op.name.clone(),
                    detail: "operator kind is empty".into(),
                });
            }

            for input in &op.inputs {
                match tensors.get_mut(input) {
                    Some(info) => info.last_consumer = Some(i),
                    None => {
                        return Err(GraphError::UndefinedTensor {
                            operator: op.name.clone(),
                            tensor: input.clone(),
                        })
                    }
                }
            }

            for output in &op.outputs {
                let fresh = TensorInfo {
                    producer: Some(i),
                    last_consumer: None,
                    is_graph_output: false,
                };
                if tensors.insert(output.clone(), fresh).is_some() {
                    return Err(GraphError::InvalidOperator {
                        operator: op.name.clone(),
                        detail: format!("tensor '{output}' already has a producer"),
                    });
                }
            }
        }

        for output in &self.outputs {
            match tensors.get_mut(output) {
                Some(info) => info.is_graph_output = true,
                None => {
                    return Err(GraphError::InvalidGraph(format!(
                        "graph output '{output}' is never produced"
                    )))
                }
            }
        }

        let dead = self
            .operators
            .iter()
            .filter(|op| {
                !op.outputs.is_empty()
                    && op
                        .outputs
                        .iter()
                        .all(|t| tensors.get(t).is_some_and(|info| !info.live_after(op.index)))
            })
            .count();
        if dead > 0 {
            tracing::warn!(
                "graph '{}' has {dead} operator(s) whose outputs are never read",
                self.name,
            );
        }

        Ok(ComputeGraph {
            name: self.name,
            inputs: self.inputs,
            operators: self.operators,
            outputs: self.outputs,
            tensors,
            _state: std::marker::PhantomData,
        })
    }
}

// ── Validated state ────────────────────────────────────────────────

impl ComputeGraph<Validated> {
    /// Returns the total number of operators.
    pub fn num_operators(&self) -> usize {
        self.operators.len()
    }

    /// Returns an iterator over the operators in topological order.
    pub fn iter_operators(&self) -> impl Iterator<Item = &Operator> {
        self.operators.iter()
    }

    /// Returns a reference to an operator by index.
    pub fn operator(&self, index: usize) -> Option<&Operator> {
        self.operators.get(index)
    }

    /// Returns the dataflow facts for a tensor.
    pub fn tensor(&self, name: &str) -> Option<&TensorInfo> {
        self.tensors.get(name)
    }

    /// Returns `true` if `name` is one of the graph's inputs.
    pub fn is_graph_input(&self, name: &str) -> bool {
        self.tensors
            .get(name)
            .is_some_and(|info| info.producer.is_none())
    }

    /// Number of distinct operator kinds.
    pub fn num_kinds(&self) -> usize {
        self.operators
            .iter()
            .map(|op| op.kind.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Returns a summary string describing the graph.
    pub fn summary(&self) -> String {
        format!(
            "Graph '{}': {} operators ({} kinds), {} inputs, {} outputs",
            self.name,
            self.num_operators(),
            self.num_kinds(),
            self.inputs.len(),
            self.outputs.len(),
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> fmt::Display for ComputeGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "ComputeGraph '{}' ({} operators):",
            self.name,
            self.operators.len()
        )?;
        for op in &self.operators {
            writeln!(f, "  {}", op.summary())?;
        }
        Ok(())
    }
}
