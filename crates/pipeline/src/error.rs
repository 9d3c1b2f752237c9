// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the compilation pipeline.

use compile_settings::ValidationError;
use engine_builder::{BuildError, CancelCause, EngineBuildError};
use graph_ir::GraphError;
use partition_planner::PartitionError;

/// Errors that can end a [`compile`](crate::Orchestrator::compile) call.
///
/// No partial executable accompanies any of them.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The settings or request were invalid.
    #[error("invalid settings: {0}")]
    Validation(#[from] ValidationError),

    /// The graph was malformed or could not be loaded.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Partitioning failed, e.g. an unsupported operator with fallback off.
    #[error("partitioning failed: {0}")]
    Partition(#[from] PartitionError),

    /// One region's engine build failed.
    #[error("engine build failed for region {region}: {source}")]
    Build {
        region: usize,
        #[source]
        source: EngineBuildError,
    },

    /// A region build was cancelled or ran past its deadline.
    #[error("compile cancelled while building region {region}: {cause}")]
    Cancelled { region: usize, cause: CancelCause },

    /// The settings describe a different number of inputs than the graph has.
    #[error("graph '{graph}' has {expected} inputs but {actual} input specs were given")]
    InputArity {
        graph: String,
        expected: usize,
        actual: usize,
    },

    /// Orchestrator configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The assembled executable broke region order or tensor wiring.
    #[error("invalid hybrid executable: {0}")]
    InvalidExecutable(String),

    /// A build worker panicked or was lost.
    #[error("build worker failed: {0}")]
    Worker(String),
}

impl CompileError {
    /// The region whose build ended the compile, if any.
    pub fn region(&self) -> Option<usize> {
        match self {
            CompileError::Build { region, .. } | CompileError::Cancelled { region, .. } => {
                Some(*region)
            }
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CompileError::Cancelled { .. })
    }
}

impl From<BuildError> for CompileError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::Failed(source) => CompileError::Build {
                region: source.region(),
                source,
            },
            BuildError::Cancelled(c) => CompileError::Cancelled {
                region: c.region,
                cause: c.cause,
            },
        }
    }
}
