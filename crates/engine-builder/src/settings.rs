// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Backend-facing view of the compilation settings.

use compile_settings::{
    CalibrationMode, Calibrator, CompilationSettings, DeviceSpec, EngineCapability, LoweringMode,
};
use std::sync::Arc;
use tensor_spec::DType;

/// Everything a backend needs from [`CompilationSettings`], flattened.
///
/// The lowering mode is copied from `settings.lowering()`; it is never
/// derived again here. The calibrator is forwarded only when int8 is
/// enabled.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BackendSettings {
    pub enabled_precisions: Vec<DType>,
    pub device: DeviceSpec,
    pub capability: EngineCapability,
    pub workspace_size: u64,
    pub num_min_timing_iters: u32,
    pub num_avg_timing_iters: u32,
    pub max_batch_size: u32,
    pub sparse_weights: bool,
    pub disable_tf32: bool,
    pub refit: bool,
    pub debug: bool,
    pub strict_types: bool,
    pub truncate_long_and_double: bool,
    pub lowering: LoweringMode,
    pub calibration_mode: CalibrationMode,
    pub calibrator_name: Option<String>,
    #[serde(skip)]
    pub calibrator: Option<Arc<dyn Calibrator>>,
}

impl BackendSettings {
    pub fn int8_enabled(&self) -> bool {
        self.enabled_precisions.contains(&DType::Int8)
    }
}

impl From<&CompilationSettings> for BackendSettings {
    fn from(settings: &CompilationSettings) -> Self {
        let calibrator = if settings.int8_enabled() {
            settings.calibrator().cloned()
        } else {
            None
        };
        Self {
            enabled_precisions: settings.enabled_precisions().iter().copied().collect(),
            device: settings.device().clone(),
            capability: settings.capability(),
            workspace_size: settings.workspace_size(),
            num_min_timing_iters: settings.num_min_timing_iters(),
            num_avg_timing_iters: settings.num_avg_timing_iters(),
            max_batch_size: settings.max_batch_size(),
            sparse_weights: settings.sparse_weights(),
            disable_tf32: settings.disable_tf32(),
            refit: settings.refit(),
            debug: settings.debug(),
            strict_types: settings.strict_types(),
            truncate_long_and_double: settings.truncate_long_and_double(),
            lowering: settings.lowering(),
            calibration_mode: settings.calibration_mode(),
            calibrator_name: calibrator.as_ref().map(|c| c.name().to_string()),
            calibrator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compile_settings::CacheCalibrator;
    use tensor_spec::{ShapeSpec, TensorFormat};

    fn base() -> compile_settings::CompilationSettingsBuilder {
        CompilationSettings::builder()
            .input(ShapeSpec::fixed(vec![1, 8], DType::Float, TensorFormat::Contiguous).unwrap())
    }

    #[test]
    fn test_lowering_is_copied_from_settings() {
        let settings = base().enabled_precision(DType::Int8).build().unwrap();
        let backend = BackendSettings::from(&settings);
        assert_eq!(backend.lowering, settings.lowering());
        assert!(backend.lowering.unfreeze_module);
        assert!(backend.lowering.disable_cse);
        assert_eq!(backend.calibration_mode, CalibrationMode::QuantizationAware);
        assert!(backend.calibrator.is_none());
    }

    #[test]
    fn test_calibrator_forwarded_only_with_int8() {
        let cal: Arc<dyn Calibrator> = Arc::new(CacheCalibrator::new("cache", 8));

        let without = base().calibrator(Arc::clone(&cal)).build().unwrap();
        let backend = BackendSettings::from(&without);
        assert!(backend.calibrator.is_none());
        assert!(!backend.int8_enabled());

        let with = base()
            .enabled_precision(DType::Int8)
            .calibrator(cal)
            .build()
            .unwrap();
        let backend = BackendSettings::from(&with);
        assert_eq!(backend.calibrator_name.as_deref(), Some("cache"));
        assert_eq!(backend.lowering, LoweringMode::default());
    }

    #[test]
    fn test_serializes_without_calibrator_object() {
        let settings = base().workspace_size(1 << 20).build().unwrap();
        let json = serde_json::to_value(BackendSettings::from(&settings)).unwrap();
        assert_eq!(json["workspace_size"], 1 << 20);
        assert_eq!(json["num_min_timing_iters"], 2);
        assert!(json.get("calibrator").is_none());
    }
}
