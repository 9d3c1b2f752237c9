// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Deterministic in-process backend.
//!
//! `ReferenceBackend` exercises the full build protocol without accelerator
//! hardware: it reserves workspace per layer, checkpoints between layers,
//! drives the calibrator under int8, and emits the lowered network plus the
//! backend settings as a JSON engine image.

use crate::{
    AcceleratorBackend, BackendError, BackendNetwork, BackendSettings, BuildContext,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Format tag written into every reference engine image.
pub const REFERENCE_ENGINE_FORMAT: &str = "reference-engine/1";

#[derive(serde::Serialize)]
struct EngineImage<'a> {
    format: &'static str,
    backend: &'a str,
    network: &'a BackendNetwork,
    settings: &'a BackendSettings,
    calibration_cache: Option<String>,
}

/// A backend that "compiles" by serializing its input.
#[derive(Debug)]
pub struct ReferenceBackend {
    rejected_kinds: BTreeSet<String>,
    thread_safe: bool,
    layer_workspace_bytes: u64,
    layer_delay: Option<Duration>,
    active: AtomicUsize,
    peak_active: AtomicUsize,
    completed: AtomicUsize,
}

impl Default for ReferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceBackend {
    pub fn new() -> Self {
        Self {
            rejected_kinds: BTreeSet::new(),
            thread_safe: true,
            layer_workspace_bytes: 0,
            layer_delay: None,
            active: AtomicUsize::new(0),
            peak_active: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Fails any build containing one of `kinds`.
    pub fn rejecting<I, T>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.rejected_kinds.extend(kinds.into_iter().map(Into::into));
        self
    }

    pub fn with_thread_safe(mut self, thread_safe: bool) -> Self {
        self.thread_safe = thread_safe;
        self
    }

    /// Device bytes reserved and held for each layer.
    pub fn with_layer_workspace(mut self, bytes: u64) -> Self {
        self.layer_workspace_bytes = bytes;
        self
    }

    /// Simulated optimisation time per layer.
    pub fn with_layer_delay(mut self, delay: Duration) -> Self {
        self.layer_delay = Some(delay);
        self
    }

    /// Highest number of builds observed running at once.
    pub fn peak_concurrent_builds(&self) -> usize {
        self.peak_active.load(Ordering::Acquire)
    }

    /// Builds that returned an engine.
    pub fn completed_builds(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    fn calibrate(&self, settings: &BackendSettings) -> Option<String> {
        let calibrator = settings.calibrator.as_ref()?;
        if let Some(cache) = calibrator.read_cache() {
            tracing::debug!(
                "Reusing {} byte calibration cache from '{}'",
                cache.len(),
                calibrator.name()
            );
            return Some(String::from_utf8_lossy(&cache).into_owned());
        }

        let mut batches = 0usize;
        let mut abs_max = 0f32;
        while let Some(batch) = calibrator.next_batch() {
            batches += 1;
            abs_max = batch.iter().fold(abs_max, |m, v| m.max(v.abs()));
        }
        let cache = format!("batches={batches};abs_max={abs_max}");
        calibrator.write_cache(cache.as_bytes());
        tracing::debug!(
            "Calibrated with '{}' over {} batches",
            calibrator.name(),
            batches
        );
        Some(cache)
    }
}

struct ActiveBuild<'a>(&'a AtomicUsize);

impl Drop for ActiveBuild<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl AcceleratorBackend for ReferenceBackend {
    fn name(&self) -> &str {
        "reference"
    }

    fn is_thread_safe(&self) -> bool {
        self.thread_safe
    }

    fn build_engine(
        &self,
        network: &BackendNetwork,
        settings: &BackendSettings,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Vec<u8>, BackendError> {
        let now_active = self.active.fetch_add(1, Ordering::AcqRel) + 1;
        let _active = ActiveBuild(&self.active);
        self.peak_active.fetch_max(now_active, Ordering::AcqRel);

        for layer in &network.layers {
            ctx.checkpoint()?;
            if self.rejected_kinds.contains(&layer.kind) {
                return Err(BackendError::LayerRejected {
                    layer: layer.name.clone(),
                    diagnostic: format!("no converter for '{}'", layer.kind),
                });
            }
            if self.layer_workspace_bytes > 0 {
                let reservation =
                    ctx.reserve(self.layer_workspace_bytes, format!("{}:workspace", layer.name))?;
                ctx.hold(reservation);
            }
            if let Some(delay) = self.layer_delay {
                std::thread::sleep(delay);
            }
        }
        ctx.checkpoint()?;

        let calibration_cache = if settings.int8_enabled() {
            self.calibrate(settings)
        } else {
            None
        };

        let image = EngineImage {
            format: REFERENCE_ENGINE_FORMAT,
            backend: self.name(),
            network,
            settings,
            calibration_cache,
        };
        let bytes = serde_json::to_vec(&image)
            .map_err(|e| BackendError::Internal(format!("cannot serialize engine: {e}")))?;
        self.completed.fetch_add(1, Ordering::AcqRel);
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendLayer, BuildBudget};
    use compile_settings::{CacheCalibrator, Calibrator, CompilationSettings};
    use device_memory::{DeviceArena, MemoryBudget};
    use std::sync::Arc;
    use tensor_spec::{DType, ShapeSpec, TensorFormat};

    fn network(kinds: &[&str]) -> BackendNetwork {
        BackendNetwork {
            region: 0,
            name: "net.region0".into(),
            layers: kinds
                .iter()
                .enumerate()
                .map(|(i, k)| BackendLayer {
                    name: format!("l{i}"),
                    kind: (*k).to_string(),
                    inputs: vec![],
                    outputs: vec![],
                })
                .collect(),
            inputs: vec![],
            outputs: vec![],
        }
    }

    fn settings(int8: bool, cal: Option<Arc<dyn Calibrator>>) -> BackendSettings {
        let mut b = CompilationSettings::builder()
            .input(ShapeSpec::fixed(vec![1], DType::Float, TensorFormat::Contiguous).unwrap());
        if int8 {
            b = b.enabled_precision(DType::Int8);
        }
        if let Some(cal) = cal {
            b = b.calibrator(cal);
        }
        BackendSettings::from(&b.build().unwrap())
    }

    #[test]
    fn test_engine_image_is_deterministic() {
        let backend = ReferenceBackend::new();
        let arena = DeviceArena::new("gpu0", MemoryBudget::Unlimited);
        let budget = BuildBudget::unbounded();
        let net = network(&["aten::conv2d", "aten::relu"]);
        let s = settings(false, None);

        let a = backend
            .build_engine(&net, &s, &mut BuildContext::new(0, &arena, &budget))
            .unwrap();
        let b = backend
            .build_engine(&net, &s, &mut BuildContext::new(0, &arena, &budget))
            .unwrap();
        assert_eq!(a, b);

        let image: serde_json::Value = serde_json::from_slice(&a).unwrap();
        assert_eq!(image["format"], REFERENCE_ENGINE_FORMAT);
        assert_eq!(image["network"]["layers"].as_array().unwrap().len(), 2);
        assert_eq!(backend.completed_builds(), 2);
    }

    #[test]
    fn test_rejected_kind_names_layer() {
        let backend = ReferenceBackend::new().rejecting(["aten::relu"]);
        let arena = DeviceArena::new("gpu0", MemoryBudget::Unlimited);
        let budget = BuildBudget::unbounded();
        let err = backend
            .build_engine(
                &network(&["aten::conv2d", "aten::relu"]),
                &settings(false, None),
                &mut BuildContext::new(0, &arena, &budget),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "layer 'l1': no converter for 'aten::relu'");
        assert_eq!(backend.completed_builds(), 0);
    }

    #[test]
    fn test_workspace_exhaustion() {
        let backend = ReferenceBackend::new().with_layer_workspace(600);
        let arena = DeviceArena::new("gpu0", MemoryBudget::from_bytes(1000));
        let budget = BuildBudget::unbounded();
        let err = backend
            .build_engine(
                &network(&["a", "b"]),
                &settings(false, None),
                &mut BuildContext::new(0, &arena, &budget),
            )
            .unwrap_err();
        assert!(matches!(err, BackendError::OutOfMemory(_)));
        assert_eq!(arena.live_bytes(), 0);
    }

    #[test]
    fn test_calibration_cache_written_then_reused() {
        let cal = Arc::new(CacheCalibrator::new("cal", 4));
        let s = settings(true, Some(cal.clone() as Arc<dyn Calibrator>));
        let backend = ReferenceBackend::new();
        let arena = DeviceArena::new("gpu0", MemoryBudget::Unlimited);
        let budget = BuildBudget::unbounded();

        backend
            .build_engine(&network(&["a"]), &s, &mut BuildContext::new(0, &arena, &budget))
            .unwrap();
        let cache = cal.read_cache().unwrap();
        assert_eq!(cache, b"batches=0;abs_max=0");

        let bytes = backend
            .build_engine(&network(&["a"]), &s, &mut BuildContext::new(0, &arena, &budget))
            .unwrap();
        let image: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(image["calibration_cache"], "batches=0;abs_max=0");
    }
}
