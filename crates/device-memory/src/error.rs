// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for device-memory accounting.

/// Errors raised by [`DeviceArena`](crate::DeviceArena).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceMemoryError {
    /// The reservation would exceed the arena budget.
    #[error("device '{device}' out of memory reserving {requested_bytes} bytes for '{label}': {available_bytes} of {budget_bytes} available")]
    OutOfDeviceMemory {
        device: String,
        label: String,
        requested_bytes: u64,
        available_bytes: u64,
        budget_bytes: u64,
    },

    /// A reservation of zero bytes was requested.
    #[error("cannot reserve zero bytes for '{0}'")]
    ZeroSizedReservation(String),
}
