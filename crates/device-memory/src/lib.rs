// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # device-memory
//!
//! Budgeted accounting of accelerator device memory used while an engine is
//! being built.
//!
//! The accelerator's memory is opaque to the host, so nothing here owns real
//! buffers. Instead every backend allocation is mirrored by a
//! [`Reservation`] against a per-build [`DeviceArena`], which enforces the
//! workspace budget and guarantees release through RAII.
//!
//! # Key Components
//!
//! - [`MemoryBudget`] — the arena ceiling: a byte count, or unlimited when
//!   the request leaves the workspace size to the backend.
//! - [`DeviceArena`] — hands out reservations, enforces the budget, tracks
//!   live and peak bytes.
//! - [`Reservation`] — RAII handle; dropping it returns its bytes to the
//!   arena.
//! - [`ArenaStats`] — cumulative reservation metrics.
//!
//! # Ownership Model
//!
//! ```text
//! DeviceArena::reserve(bytes, label)
//!       │
//!       ▼
//!   Reservation  ◄─── holds Arc<ArenaInner>
//!       │
//!       │  drop()  (success, failure, or cancellation)
//!       ▼
//!   ArenaInner::release()  ──► live bytes decremented
//! ```
//!
//! A build that returns early, whether on error or on cancellation, drops
//! its reservations on the way out, so the arena reports zero live bytes
//! once the build has returned.
//!
//! # Example
//! ```
//! use device_memory::{DeviceArena, MemoryBudget};
//!
//! let arena = DeviceArena::new("gpu0", MemoryBudget::from_bytes(64 << 20));
//! let a = arena.reserve(1024 * 1024, "conv1 workspace").unwrap();
//! let b = arena.reserve(512 * 1024, "conv2 workspace").unwrap();
//! assert_eq!(arena.live_bytes(), 1024 * 1024 + 512 * 1024);
//!
//! drop(a);
//! drop(b);
//! assert_eq!(arena.live_bytes(), 0);
//! assert_eq!(arena.stats().peak_live_bytes, 1024 * 1024 + 512 * 1024);
//! ```

mod arena;
mod budget;
mod error;
mod reservation;
mod stats;

pub use arena::DeviceArena;
pub use budget::MemoryBudget;
pub use error::DeviceMemoryError;
pub use reservation::Reservation;
pub use stats::ArenaStats;
