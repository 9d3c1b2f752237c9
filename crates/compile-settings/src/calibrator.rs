// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Int8 calibration sources.
//!
//! A calibrator is owned by the caller and shared with the settings as an
//! `Arc<dyn Calibrator>`. The settings never consume or tear it down; it may
//! outlive any number of compilations.

use std::fmt;
use std::sync::Mutex;

/// Source of int8 calibration data for the accelerator backend.
///
/// Implementations must be shareable across concurrent region builds, so all
/// methods take `&self`.
pub trait Calibrator: Send + Sync + fmt::Debug {
    /// Name rendered by `describe`.
    fn name(&self) -> &str;

    /// Number of samples per calibration batch.
    fn batch_size(&self) -> usize;

    /// Returns the next calibration batch as flat `f32` data, or `None`
    /// when the calibration set is exhausted.
    fn next_batch(&self) -> Option<Vec<f32>> {
        None
    }

    /// Returns a previously written calibration cache, if one exists.
    fn read_cache(&self) -> Option<Vec<u8>> {
        None
    }

    /// Stores the calibration cache produced by a build.
    fn write_cache(&self, _cache: &[u8]) {}
}

/// A calibrator that only replays and records a calibration cache.
///
/// # Example
/// ```
/// use compile_settings::{CacheCalibrator, Calibrator};
///
/// let cal = CacheCalibrator::new("imagenet-cache", 32);
/// assert!(cal.read_cache().is_none());
/// cal.write_cache(b"scales");
/// assert_eq!(cal.read_cache().as_deref(), Some(&b"scales"[..]));
/// ```
#[derive(Debug)]
pub struct CacheCalibrator {
    name: String,
    batch_size: usize,
    cache: Mutex<Option<Vec<u8>>>,
}

impl CacheCalibrator {
    pub fn new(name: impl Into<String>, batch_size: usize) -> Self {
        Self {
            name: name.into(),
            batch_size,
            cache: Mutex::new(None),
        }
    }

    /// Creates a calibrator primed with an existing cache.
    pub fn with_cache(name: impl Into<String>, batch_size: usize, cache: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            batch_size,
            cache: Mutex::new(Some(cache)),
        }
    }
}

impl Calibrator for CacheCalibrator {
    fn name(&self) -> &str {
        &self.name
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn read_cache(&self) -> Option<Vec<u8>> {
        // A poisoned lock still holds a usable cache value.
        match self.cache.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn write_cache(&self, cache: &[u8]) {
        let mut guard = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(cache.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_primed_cache() {
        let cal = CacheCalibrator::with_cache("c", 8, vec![1, 2, 3]);
        assert_eq!(cal.batch_size(), 8);
        assert_eq!(cal.read_cache(), Some(vec![1, 2, 3]));
        assert!(cal.next_batch().is_none());
    }

    #[test]
    fn test_shared_across_threads() {
        let cal: Arc<dyn Calibrator> = Arc::new(CacheCalibrator::new("shared", 4));
        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let cal = Arc::clone(&cal);
                std::thread::spawn(move || cal.write_cache(&[i]))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cal.read_cache().map(|c| c.len()), Some(1));
        assert_eq!(Arc::strong_count(&cal), 1);
    }
}
