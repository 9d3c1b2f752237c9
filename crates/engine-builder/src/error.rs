// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for engine building.

use device_memory::DeviceMemoryError;
use std::fmt;

/// Why a build stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelCause {
    /// The caller's cancellation token fired.
    Cancelled,
    /// The build deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::Cancelled => f.write_str("cancelled"),
            CancelCause::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// Failures reported by an [`AcceleratorBackend`](crate::AcceleratorBackend).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend could not convert or optimise a layer.
    #[error("layer '{layer}': {diagnostic}")]
    LayerRejected { layer: String, diagnostic: String },

    /// A device-memory reservation failed.
    #[error(transparent)]
    OutOfMemory(#[from] DeviceMemoryError),

    /// A checkpoint observed cancellation or an expired deadline.
    #[error("build interrupted: {0}")]
    Interrupted(CancelCause),

    /// Any other backend failure.
    #[error("{0}")]
    Internal(String),
}

/// A region could not be built into an engine. Not retryable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineBuildError {
    /// The backend failed; `diagnostic` carries its message.
    #[error("backend '{backend}' failed to build region {region}: {diagnostic}")]
    Backend {
        region: usize,
        backend: String,
        diagnostic: String,
    },

    /// Only accelerator regions have engines.
    #[error("region {region} targets the general executor and has no engine to build")]
    NotAcceleratorRegion { region: usize },

    /// The region could not be lowered to a backend network.
    #[error("cannot lower region {region}: {detail}")]
    Lowering { region: usize, detail: String },
}

impl EngineBuildError {
    pub fn region(&self) -> usize {
        match self {
            EngineBuildError::Backend { region, .. }
            | EngineBuildError::NotAcceleratorRegion { region }
            | EngineBuildError::Lowering { region, .. } => *region,
        }
    }
}

/// A build terminated cooperatively. Partial device allocations have been
/// released by the time this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("build of region {region} {cause}")]
pub struct BuildCancelled {
    pub region: usize,
    pub cause: CancelCause,
}

/// Outcome of a failed [`EngineBuilder::build`](crate::EngineBuilder::build).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Failed(#[from] EngineBuildError),

    #[error(transparent)]
    Cancelled(#[from] BuildCancelled),
}

impl BuildError {
    pub fn region(&self) -> usize {
        match self {
            BuildError::Failed(e) => e.region(),
            BuildError::Cancelled(c) => c.region,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled(_))
    }
}
