// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-build services handed to the backend.

use crate::{BackendError, BuildBudget};
use device_memory::{DeviceArena, Reservation};

/// What a backend may use while building one region.
///
/// Reservations either stay with the caller (RAII) or are parked here with
/// [`hold`](Self::hold); held reservations are released when the context
/// drops, which happens before `build` returns on every path.
pub struct BuildContext<'a> {
    region: usize,
    arena: &'a DeviceArena,
    budget: &'a BuildBudget,
    held: Vec<Reservation>,
    checkpoints: u64,
}

impl<'a> BuildContext<'a> {
    pub fn new(region: usize, arena: &'a DeviceArena, budget: &'a BuildBudget) -> Self {
        Self {
            region,
            arena,
            budget,
            held: Vec::new(),
            checkpoints: 0,
        }
    }

    pub fn region(&self) -> usize {
        self.region
    }

    /// Reserves device memory against the build's workspace budget.
    pub fn reserve(&self, bytes: u64, label: impl Into<String>) -> Result<Reservation, BackendError> {
        Ok(self.arena.reserve(bytes, label)?)
    }

    /// Keeps a reservation alive until the build finishes.
    pub fn hold(&mut self, reservation: Reservation) {
        self.held.push(reservation);
    }

    /// Bytes parked with [`hold`](Self::hold).
    pub fn held_bytes(&self) -> u64 {
        self.held.iter().map(Reservation::size_bytes).sum()
    }

    /// Cooperative cancellation point. Backends call this between units of
    /// work and return the error unchanged.
    pub fn checkpoint(&mut self) -> Result<(), BackendError> {
        self.checkpoints += 1;
        self.budget.check().map_err(BackendError::Interrupted)
    }

    pub fn checkpoints(&self) -> u64 {
        self.checkpoints
    }

    pub fn arena(&self) -> &DeviceArena {
        self.arena
    }
}
