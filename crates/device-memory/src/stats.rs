// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reservation statistics for build reports.

/// Cumulative statistics for one [`DeviceArena`](crate::DeviceArena).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ArenaStats {
    /// Successful reservations.
    pub reservations: u64,
    /// Reservations returned to the arena.
    pub releases: u64,
    /// Reservations refused because of the budget.
    pub rejected: u64,
    /// High-water mark of live bytes.
    pub peak_live_bytes: u64,
    /// Sum of all reserved bytes, including released ones.
    pub cumulative_bytes: u64,
}

impl ArenaStats {
    pub(crate) fn record_reservation(&mut self, size: u64, live_after: u64) {
        self.reservations += 1;
        self.cumulative_bytes += size;
        self.peak_live_bytes = self.peak_live_bytes.max(live_after);
    }

    pub(crate) fn record_release(&mut self) {
        self.releases += 1;
    }

    pub(crate) fn record_rejection(&mut self) {
        self.rejected += 1;
    }

    /// Reservations not yet released.
    pub fn outstanding(&self) -> u64 {
        self.reservations - self.releases
    }

    pub fn summary(&self) -> String {
        let peak_mb = self.peak_live_bytes as f64 / (1024.0 * 1024.0);
        format!(
            "Reservations: {} ({} released, {} rejected), peak {:.2} MB, {} bytes cumulative",
            self.reservations, self.releases, self.rejected, peak_mb, self.cumulative_bytes,
        )
    }
}
