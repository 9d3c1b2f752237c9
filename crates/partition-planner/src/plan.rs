// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Partition plan: the output of the partitioner.
//!
//! A plan is an ordered sequence of [`Region`]s that together cover every
//! operator of the graph exactly once, in topological order. Accelerator
//! regions are handed to the engine builder; general-executor regions run
//! on the interpreter. The plan is the contract between the partitioner and
//! the orchestrator.

use crate::PartitionError;
use std::fmt;

/// Where a region executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionTarget {
    Accelerator,
    GeneralExecutor,
}

impl fmt::Display for RegionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionTarget::Accelerator => f.write_str("Accelerator"),
            RegionTarget::GeneralExecutor => f.write_str("GeneralExecutor"),
        }
    }
}

/// Why an operator was placed on the general executor.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum FallbackReason {
    /// The operator kind is in the policy's excluded operators.
    ExcludedOperator,
    /// An enclosing module is in the policy's excluded modules.
    ExcludedModule { module: String },
    /// The support oracle rejected the operator.
    Unsupported { reason: String },
    /// The operator was eligible, but its accelerator run was shorter than
    /// the minimum region size.
    BelowMinRegionSize { run_len: usize, min_region_size: usize },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::ExcludedOperator => f.write_str("operator kind excluded by policy"),
            FallbackReason::ExcludedModule { module } => {
                write!(f, "enclosing module '{module}' excluded by policy")
            }
            FallbackReason::Unsupported { reason } => f.write_str(reason),
            FallbackReason::BelowMinRegionSize {
                run_len,
                min_region_size,
            } => write!(
                f,
                "accelerator run of {run_len} below min region size {min_region_size}"
            ),
        }
    }
}

/// A contiguous run of operators with a single execution target.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Region {
    /// Index of this region in execution order.
    pub index: usize,
    pub target: RegionTarget,
    /// Operator indices (into the graph), strictly increasing and contiguous.
    pub operators: Vec<usize>,
    /// Operator names, parallel to `operators`.
    pub operator_names: Vec<String>,
    /// Tensors read by the region but produced outside it, in first-use
    /// order.
    pub inputs: Vec<String>,
    /// Tensors produced by the region and needed afterwards (by a later
    /// region or as graph outputs), in production order.
    pub outputs: Vec<String>,
    /// Per-operator fallback causes, parallel to `operators`. Empty for
    /// accelerator regions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallback_reasons: Vec<FallbackReason>,
}

impl Region {
    pub fn num_operators(&self) -> usize {
        self.operators.len()
    }

    pub fn is_accelerator(&self) -> bool {
        self.target == RegionTarget::Accelerator
    }

    /// First operator index, or `None` for an (invalid) empty region.
    pub fn first_operator(&self) -> Option<usize> {
        self.operators.first().copied()
    }

    pub fn last_operator(&self) -> Option<usize> {
        self.operators.last().copied()
    }
}

/// The complete, validated output of the partitioner.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PartitionPlan {
    /// Name of the partitioned graph.
    pub graph_name: String,
    /// Regions in execution order.
    pub regions: Vec<Region>,
    /// Operator count of the source graph.
    pub num_operators: usize,
}

impl PartitionPlan {
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    /// Iterates over accelerator regions only.
    pub fn accelerator_regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(|r| r.is_accelerator())
    }

    pub fn num_accelerator_operators(&self) -> usize {
        self.accelerator_regions().map(Region::num_operators).sum()
    }

    /// Validates the plan.
    ///
    /// Checks:
    /// - Plan is non-empty.
    /// - Region indices are consecutive starting from 0.
    /// - No region is empty.
    /// - Operator indices are contiguous across regions and cover the graph
    ///   exactly once.
    /// - Adjacent regions have different targets.
    pub fn validate(&self) -> Result<(), PartitionError> {
        if self.regions.is_empty() {
            return Err(PartitionError::EmptyGraph);
        }

        let mut expected_op = 0;
        let mut previous: Option<RegionTarget> = None;

        for (expected_idx, region) in self.regions.iter().enumerate() {
            if region.index != expected_idx {
                return Err(PartitionError::InvalidPlan(format!(
                    "expected region index {expected_idx}, got {}",
                    region.index
                )));
            }
            if region.operators.is_empty() {
                return Err(PartitionError::InvalidPlan(format!(
                    "region {} is empty",
                    region.index
                )));
            }
            if region.operator_names.len() != region.operators.len() {
                return Err(PartitionError::InvalidPlan(format!(
                    "region {} has {} operators but {} names",
                    region.index,
                    region.operators.len(),
                    region.operator_names.len()
                )));
            }
            for &op in &region.operators {
                if op != expected_op {
                    return Err(PartitionError::InvalidPlan(format!(
                        "expected operator {expected_op}, got {op} in region {}",
                        region.index
                    )));
                }
                expected_op += 1;
            }
            if previous == Some(region.target) {
                return Err(PartitionError::InvalidPlan(format!(
                    "regions {} and {} are adjacent with the same target {}",
                    region.index - 1,
                    region.index,
                    region.target
                )));
            }
            previous = Some(region.target);
        }

        if expected_op != self.num_operators {
            return Err(PartitionError::InvalidPlan(format!(
                "plan covers {expected_op} of {} operators",
                self.num_operators
            )));
        }
        Ok(())
    }

    /// Returns a human-readable summary of the plan.
    pub fn summary(&self) -> String {
        let accel = self.accelerator_regions().count();
        let sizes: Vec<String> = self
            .regions
            .iter()
            .map(|r| {
                let tag = match r.target {
                    RegionTarget::Accelerator => "A",
                    RegionTarget::GeneralExecutor => "G",
                };
                format!("{tag}{}", r.num_operators())
            })
            .collect();
        format!(
            "Plan '{}': {} regions ({} accelerator, {} general), \
             {}/{} operators on accelerator, layout: [{}]",
            self.graph_name,
            self.num_regions(),
            accel,
            self.num_regions() - accel,
            self.num_accelerator_operators(),
            self.num_operators,
            sizes.join(" "),
        )
    }
}

/// Incremental plan construction, used by the partitioner.
pub(crate) struct PlanBuilder {
    graph_name: String,
    num_operators: usize,
    regions: Vec<Region>,
}

impl PlanBuilder {
    pub fn new(graph_name: &str, num_operators: usize) -> Self {
        Self {
            graph_name: graph_name.to_string(),
            num_operators,
            regions: Vec::new(),
        }
    }

    /// Appends a region; its index is assigned from position.
    pub fn add_region(
        &mut self,
        target: RegionTarget,
        operators: Vec<usize>,
        operator_names: Vec<String>,
        boundary: (Vec<String>, Vec<String>),
        fallback_reasons: Vec<FallbackReason>,
    ) {
        let (inputs, outputs) = boundary;
        self.regions.push(Region {
            index: self.regions.len(),
            target,
            operators,
            operator_names,
            inputs,
            outputs,
            fallback_reasons,
        });
    }

    pub fn build(self) -> PartitionPlan {
        PartitionPlan {
            graph_name: self.graph_name,
            regions: self.regions,
            num_operators: self.num_operators,
        }
    }
}
