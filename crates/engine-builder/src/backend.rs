// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The accelerator backend seam.

use crate::{BackendError, BackendNetwork, BackendSettings, BuildContext};

/// An accelerator engine builder.
///
/// Implementations own kernel selection and the serialized engine format.
/// They must call [`BuildContext::checkpoint`] between units of work and
/// account device memory through [`BuildContext::reserve`], so that a
/// cancelled build returns promptly with its reservations released.
pub trait AcceleratorBackend: Send + Sync {
    /// Name used in diagnostics and build reports.
    fn name(&self) -> &str;

    /// Whether two builds may share one device context concurrently.
    /// When `false`, callers serialise builds per device.
    fn is_thread_safe(&self) -> bool {
        true
    }

    /// Builds `network` into a serialized engine.
    fn build_engine(
        &self,
        network: &BackendNetwork,
        settings: &BackendSettings,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Vec<u8>, BackendError>;
}
