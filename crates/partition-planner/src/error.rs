// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the partitioner.

/// Errors that can occur during partitioning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartitionError {
    /// Fallback is disabled but an operator cannot run on the accelerator.
    #[error("graph is not fully accelerator-eligible and fallback is disabled: operator '{operator}' ({kind}): {reason}")]
    UnsupportedGraph {
        operator: String,
        kind: String,
        reason: String,
    },

    /// The graph has no operators.
    #[error("cannot partition an empty graph")]
    EmptyGraph,

    /// The produced plan broke a structural invariant.
    #[error("invalid partition plan: {0}")]
    InvalidPlan(String),
}
