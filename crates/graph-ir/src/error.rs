// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for graph loading and validation.

/// Errors that can occur when loading or validating a computation graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The graph manifest file could not be read.
    #[error("failed to read graph manifest: {0}")]
    ManifestReadError(#[from] std::io::Error),

    /// The manifest JSON is malformed.
    #[error("failed to parse graph manifest: {0}")]
    ManifestParseError(#[from] serde_json::Error),

    /// An operator definition is invalid.
    #[error("invalid operator '{operator}': {detail}")]
    InvalidOperator { operator: String, detail: String },

    /// An operator consumes a tensor that nothing produced before it.
    #[error("operator '{operator}' reads undefined tensor '{tensor}'")]
    UndefinedTensor { operator: String, tensor: String },

    /// The graph is structurally malformed.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),
}
