// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The assembled hybrid executable.

use crate::{CompileError, CompileMetrics};
use engine_builder::{CompiledArtifact, EngineArtifact};
use partition_planner::{Region, RegionTarget};
use std::collections::HashSet;

/// One region of the executable, with its compiled artifact.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutableSegment {
    pub region: usize,
    pub target: RegionTarget,
    pub operator_names: Vec<String>,
    /// Boundary tensors consumed, as produced by the partitioner.
    pub inputs: Vec<String>,
    /// Boundary tensors produced, as produced by the partitioner.
    pub outputs: Vec<String>,
    pub artifact: CompiledArtifact,
}

impl ExecutableSegment {
    pub fn new(region: &Region, artifact: CompiledArtifact) -> Self {
        Self {
            region: region.index,
            target: region.target,
            operator_names: region.operator_names.clone(),
            inputs: region.inputs.clone(),
            outputs: region.outputs.clone(),
            artifact,
        }
    }

    pub fn engine(&self) -> Option<&EngineArtifact> {
        self.artifact.engine()
    }
}

/// Engines and interpreter segments in execution order.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HybridExecutable {
    pub graph_name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub segments: Vec<ExecutableSegment>,
    pub metrics: CompileMetrics,
}

impl HybridExecutable {
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Accelerator segments with their engines.
    pub fn engines(&self) -> impl Iterator<Item = (&ExecutableSegment, &EngineArtifact)> {
        self.segments
            .iter()
            .filter_map(|s| s.engine().map(|e| (s, e)))
    }

    pub fn num_engines(&self) -> usize {
        self.engines().count()
    }

    /// Checks segment order and tensor wiring: every segment input is a
    /// graph input or an output of an earlier segment, and every graph
    /// output is produced by some segment.
    pub fn validate(&self) -> Result<(), CompileError> {
        let mut available: HashSet<&str> = self.inputs.iter().map(String::as_str).collect();
        for (i, seg) in self.segments.iter().enumerate() {
            if seg.region != i {
                return Err(CompileError::InvalidExecutable(format!(
                    "segment {} carries region index {}",
                    i, seg.region
                )));
            }
            let wrong_artifact = match seg.target {
                RegionTarget::Accelerator => !seg.artifact.is_engine(),
                RegionTarget::GeneralExecutor => seg.artifact.is_engine(),
            };
            if wrong_artifact {
                return Err(CompileError::InvalidExecutable(format!(
                    "segment {} targets {} but carries the wrong artifact kind",
                    i, seg.target
                )));
            }
            if let Some(missing) = seg.inputs.iter().find(|t| !available.contains(t.as_str())) {
                return Err(CompileError::InvalidExecutable(format!(
                    "segment {i} reads '{missing}' before any segment produces it"
                )));
            }
            available.extend(seg.outputs.iter().map(String::as_str));
        }
        if let Some(missing) = self.outputs.iter().find(|t| !available.contains(t.as_str())) {
            return Err(CompileError::InvalidExecutable(format!(
                "graph output '{missing}' is not produced by any segment"
            )));
        }
        Ok(())
    }

    /// Pretty JSON description (engine bytes excluded).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn summary(&self) -> String {
        let layout: Vec<String> = self
            .segments
            .iter()
            .map(|s| {
                let tag = match s.target {
                    RegionTarget::Accelerator => 'A',
                    RegionTarget::GeneralExecutor => 'G',
                };
                format!("{tag}{}", s.operator_names.len())
            })
            .collect();
        format!(
            "Executable '{}': {} segments ({} engines), layout: [{}]",
            self.graph_name,
            self.num_segments(),
            self.num_engines(),
            layout.join(" ")
        )
    }
}
