// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-build device-memory arena.
//!
//! # Thread Safety
//! `DeviceArena` is `Send + Sync`. Live bytes are updated with a
//! compare-and-swap loop, so concurrent reservations can never jointly
//! overshoot the budget.

use crate::{ArenaStats, DeviceMemoryError, MemoryBudget, Reservation};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// State shared between the arena and its outstanding reservations.
pub(crate) struct ArenaInner {
    device: String,
    budget: MemoryBudget,
    live_bytes: AtomicU64,
    stats: Mutex<ArenaStats>,
}

impl ArenaInner {
    pub(crate) fn release(&self, size_bytes: u64) {
        self.live_bytes.fetch_sub(size_bytes, Ordering::AcqRel);
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_release();
        }
    }
}

/// Accounts device memory for one engine build.
///
/// # Example
/// ```
/// use device_memory::{DeviceArena, DeviceMemoryError, MemoryBudget};
///
/// let arena = DeviceArena::new("gpu0", MemoryBudget::from_bytes(1000));
/// let _w = arena.reserve(800, "workspace").unwrap();
/// assert!(matches!(
///     arena.reserve(300, "tactic"),
///     Err(DeviceMemoryError::OutOfDeviceMemory { .. })
/// ));
/// ```
pub struct DeviceArena {
    inner: Arc<ArenaInner>,
}

impl DeviceArena {
    /// Creates an arena for the named device.
    pub fn new(device: impl Into<String>, budget: MemoryBudget) -> Self {
        Self {
            inner: Arc::new(ArenaInner {
                device: device.into(),
                budget,
                live_bytes: AtomicU64::new(0),
                stats: Mutex::new(ArenaStats::default()),
            }),
        }
    }

    /// Reserves `size_bytes`, failing if the budget would be exceeded.
    pub fn reserve(
        &self,
        size_bytes: u64,
        label: impl Into<String>,
    ) -> Result<Reservation, DeviceMemoryError> {
        let label = label.into();
        if size_bytes == 0 {
            return Err(DeviceMemoryError::ZeroSizedReservation(label));
        }

        let limit = self.inner.budget.limit();
        let reserved = self
            .inner
            .live_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let next = current.checked_add(size_bytes)?;
                match limit {
                    Some(max) if next > max => None,
                    _ => Some(next),
                }
            });

        match reserved {
            Ok(previous) => {
                let live_after = previous + size_bytes;
                if let Ok(mut stats) = self.inner.stats.lock() {
                    stats.record_reservation(size_bytes, live_after);
                }
                tracing::trace!(
                    "{}: reserved {} bytes for '{}' ({} live)",
                    self.inner.device,
                    size_bytes,
                    label,
                    live_after
                );
                Ok(Reservation::new(Arc::clone(&self.inner), size_bytes, label))
            }
            Err(current) => {
                if let Ok(mut stats) = self.inner.stats.lock() {
                    stats.record_rejection();
                }
                let budget_bytes = limit.unwrap_or(u64::MAX);
                Err(DeviceMemoryError::OutOfDeviceMemory {
                    device: self.inner.device.clone(),
                    label,
                    requested_bytes: size_bytes,
                    available_bytes: budget_bytes.saturating_sub(current),
                    budget_bytes,
                })
            }
        }
    }

    /// Bytes held by outstanding reservations.
    pub fn live_bytes(&self) -> u64 {
        self.inner.live_bytes.load(Ordering::Acquire)
    }

    /// Bytes still available, or `None` when unlimited.
    pub fn available_bytes(&self) -> Option<u64> {
        self.inner
            .budget
            .limit()
            .map(|max| max.saturating_sub(self.live_bytes()))
    }

    pub fn budget(&self) -> MemoryBudget {
        self.inner.budget
    }

    pub fn device(&self) -> &str {
        &self.inner.device
    }

    /// Snapshot of the arena statistics.
    pub fn stats(&self) -> ArenaStats {
        self.inner
            .stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for DeviceArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceArena")
            .field("device", &self.inner.device)
            .field("budget", &self.inner.budget)
            .field("live_bytes", &self.live_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_and_drop() {
        let arena = DeviceArena::new("gpu0", MemoryBudget::from_bytes(1 << 20));
        let r = arena.reserve(1024, "w").unwrap();
        assert_eq!(arena.live_bytes(), 1024);
        assert_eq!(r.size_bytes(), 1024);
        assert_eq!(r.label(), "w");
        drop(r);
        assert_eq!(arena.live_bytes(), 0);
    }

    #[test]
    fn test_budget_enforced() {
        let arena = DeviceArena::new("gpu0", MemoryBudget::from_bytes(1024));
        let _a = arena.reserve(512, "a").unwrap();
        let _b = arena.reserve(512, "b").unwrap();
        match arena.reserve(1, "c") {
            Err(DeviceMemoryError::OutOfDeviceMemory {
                available_bytes,
                budget_bytes,
                ..
            }) => {
                assert_eq!(available_bytes, 0);
                assert_eq!(budget_bytes, 1024);
            }
            other => panic!("expected OOM, got {other:?}"),
        }
        assert_eq!(arena.stats().rejected, 1);
    }

    #[test]
    fn test_unlimited_budget() {
        let arena = DeviceArena::new("gpu0", MemoryBudget::Unlimited);
        let _r = arena.reserve(1 << 40, "huge").unwrap();
        assert_eq!(arena.available_bytes(), None);
    }

    #[test]
    fn test_zero_sized_rejected() {
        let arena = DeviceArena::new("gpu0", MemoryBudget::Unlimited);
        assert!(matches!(
            arena.reserve(0, "empty"),
            Err(DeviceMemoryError::ZeroSizedReservation(_))
        ));
    }

    #[test]
    fn test_release_on_early_return() {
        fn build(arena: &DeviceArena) -> Result<(), DeviceMemoryError> {
            let _first = arena.reserve(600, "first")?;
            let _second = arena.reserve(600, "second")?;
            Ok(())
        }
        let arena = DeviceArena::new("gpu0", MemoryBudget::from_bytes(1000));
        assert!(build(&arena).is_err());
        assert_eq!(arena.live_bytes(), 0);
        let stats = arena.stats();
        assert_eq!(stats.outstanding(), 0);
        assert_eq!(stats.peak_live_bytes, 600);
    }

    #[test]
    fn test_concurrent_reservations_respect_budget() {
        let arena = Arc::new(DeviceArena::new("gpu0", MemoryBudget::from_bytes(10 * 100)));
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let arena = Arc::clone(&arena);
                std::thread::spawn(move || arena.reserve(100, "t").ok())
            })
            .collect();
        let held: Vec<_> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert!(held.len() <= 10);
        assert!(arena.live_bytes() <= 1000);
        drop(held);
        assert_eq!(arena.live_bytes(), 0);
    }

    #[test]
    fn test_debug_format() {
        let arena = DeviceArena::new("gpu1/dla0", MemoryBudget::from_bytes(64 << 20));
        assert_eq!(arena.budget().limit(), Some(64 << 20));
        let debug = format!("{arena:?}");
        assert!(debug.contains("DeviceArena"));
        assert!(debug.contains("gpu1/dla0"));
    }
}
