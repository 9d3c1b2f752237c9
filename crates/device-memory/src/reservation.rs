// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII reservation handle.

use crate::arena::ArenaInner;
use std::sync::Arc;

/// A block of device memory accounted against an arena.
///
/// Dropping the reservation returns its bytes to the arena, so an early
/// return from a build (error or cancellation) cannot leak accounting.
pub struct Reservation {
    arena: Arc<ArenaInner>,
    size_bytes: u64,
    label: String,
}

impl Reservation {
    pub(crate) fn new(arena: Arc<ArenaInner>, size_bytes: u64, label: String) -> Self {
        Self {
            arena,
            size_bytes,
            label,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// What the memory was reserved for.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.arena.release(self.size_bytes);
    }
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("label", &self.label)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}
