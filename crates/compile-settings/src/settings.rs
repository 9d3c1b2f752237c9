// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The validated compilation request and its builder.

use crate::lowering::{CalibrationMode, LoweringMode};
use crate::{Calibrator, DeviceKind, DeviceSpec, EngineCapability, FallbackPolicy, ValidationError};
use std::collections::BTreeSet;
use std::sync::Arc;
use tensor_spec::{DType, ShapeSpec};

/// A complete, validated compilation request.
///
/// Immutable once built: there are no setters, and the derived
/// [`LoweringMode`] is computed a single time in
/// [`CompilationSettingsBuilder::build`]. Share it across concurrent builds
/// by wrapping it in an `Arc`.
#[derive(Debug, Clone)]
pub struct CompilationSettings {
    inputs: Vec<ShapeSpec>,
    enabled_precisions: BTreeSet<DType>,
    device: DeviceSpec,
    fallback: FallbackPolicy,
    capability: EngineCapability,
    workspace_size: u64,
    num_min_timing_iters: u32,
    num_avg_timing_iters: u32,
    max_batch_size: u32,
    sparse_weights: bool,
    disable_tf32: bool,
    refit: bool,
    debug: bool,
    strict_types: bool,
    truncate_long_and_double: bool,
    calibrator: Option<Arc<dyn Calibrator>>,
    calibration_mode: CalibrationMode,
    lowering: LoweringMode,
}

impl CompilationSettings {
    /// Starts a builder populated with the defaults.
    pub fn builder() -> CompilationSettingsBuilder {
        CompilationSettingsBuilder::default()
    }

    /// Returns a builder seeded with these settings, for deriving a
    /// modified copy. The derived flags are recomputed by `build`.
    pub fn to_builder(&self) -> CompilationSettingsBuilder {
        CompilationSettingsBuilder {
            inputs: self.inputs.clone(),
            enabled_precisions: Some(self.enabled_precisions.clone()),
            device: self.device.clone(),
            fallback: self.fallback.clone(),
            capability: self.capability,
            workspace_size: self.workspace_size as i64,
            num_min_timing_iters: i64::from(self.num_min_timing_iters),
            num_avg_timing_iters: i64::from(self.num_avg_timing_iters),
            max_batch_size: i64::from(self.max_batch_size),
            sparse_weights: self.sparse_weights,
            disable_tf32: self.disable_tf32,
            refit: self.refit,
            debug: self.debug,
            strict_types: self.strict_types,
            truncate_long_and_double: self.truncate_long_and_double,
            calibrator: self.calibrator.clone(),
        }
    }

    pub fn inputs(&self) -> &[ShapeSpec] {
        &self.inputs
    }

    pub fn enabled_precisions(&self) -> &BTreeSet<DType> {
        &self.enabled_precisions
    }

    pub fn int8_enabled(&self) -> bool {
        self.enabled_precisions.contains(&DType::Int8)
    }

    pub fn device(&self) -> &DeviceSpec {
        &self.device
    }

    pub fn fallback(&self) -> &FallbackPolicy {
        &self.fallback
    }

    pub fn capability(&self) -> EngineCapability {
        self.capability
    }

    /// Builder workspace limit in bytes; `0` leaves the choice to the
    /// backend.
    pub fn workspace_size(&self) -> u64 {
        self.workspace_size
    }

    pub fn num_min_timing_iters(&self) -> u32 {
        self.num_min_timing_iters
    }

    pub fn num_avg_timing_iters(&self) -> u32 {
        self.num_avg_timing_iters
    }

    /// `0` means unset.
    pub fn max_batch_size(&self) -> u32 {
        self.max_batch_size
    }

    pub fn sparse_weights(&self) -> bool {
        self.sparse_weights
    }

    pub fn disable_tf32(&self) -> bool {
        self.disable_tf32
    }

    pub fn refit(&self) -> bool {
        self.refit
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn strict_types(&self) -> bool {
        self.strict_types
    }

    pub fn truncate_long_and_double(&self) -> bool {
        self.truncate_long_and_double
    }

    /// The shared calibrator, if one was supplied.
    pub fn calibrator(&self) -> Option<&Arc<dyn Calibrator>> {
        self.calibrator.as_ref()
    }

    pub fn calibration_mode(&self) -> CalibrationMode {
        self.calibration_mode
    }

    /// Derived lowering flags. Read these; never re-derive them.
    pub fn lowering(&self) -> LoweringMode {
        self.lowering
    }
}

/// Collects request values and validates them all in [`build`](Self::build).
///
/// Numeric knobs are accepted as signed integers so that negative values
/// coming from an untyped binding layer are rejected with a field name
/// instead of wrapping.
#[derive(Debug, Clone)]
pub struct CompilationSettingsBuilder {
    inputs: Vec<ShapeSpec>,
    enabled_precisions: Option<BTreeSet<DType>>,
    device: DeviceSpec,
    fallback: FallbackPolicy,
    capability: EngineCapability,
    workspace_size: i64,
    num_min_timing_iters: i64,
    num_avg_timing_iters: i64,
    max_batch_size: i64,
    sparse_weights: bool,
    disable_tf32: bool,
    refit: bool,
    debug: bool,
    strict_types: bool,
    truncate_long_and_double: bool,
    calibrator: Option<Arc<dyn Calibrator>>,
}

impl Default for CompilationSettingsBuilder {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            enabled_precisions: None,
            device: DeviceSpec::default(),
            fallback: FallbackPolicy::default(),
            capability: EngineCapability::Default,
            workspace_size: 0,
            num_min_timing_iters: 2,
            num_avg_timing_iters: 1,
            max_batch_size: 0,
            sparse_weights: false,
            disable_tf32: false,
            refit: false,
            debug: false,
            strict_types: false,
            truncate_long_and_double: false,
            calibrator: None,
        }
    }
}

impl CompilationSettingsBuilder {
    /// Appends one graph input, in graph-input order.
    pub fn input(mut self, spec: ShapeSpec) -> Self {
        self.inputs.push(spec);
        self
    }

    /// Replaces all graph inputs.
    pub fn inputs(mut self, specs: impl IntoIterator<Item = ShapeSpec>) -> Self {
        self.inputs = specs.into_iter().collect();
        self
    }

    /// Adds a precision. The first call replaces the `{Float}` default.
    pub fn enabled_precision(mut self, dtype: DType) -> Self {
        self.enabled_precisions
            .get_or_insert_with(BTreeSet::new)
            .insert(dtype);
        self
    }

    /// Replaces the precision set. An empty set fails at `build`.
    pub fn enabled_precisions(mut self, dtypes: impl IntoIterator<Item = DType>) -> Self {
        self.enabled_precisions = Some(dtypes.into_iter().collect());
        self
    }

    pub fn device(mut self, device: DeviceSpec) -> Self {
        self.device = device;
        self
    }

    pub fn fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn capability(mut self, capability: EngineCapability) -> Self {
        self.capability = capability;
        self
    }

    pub fn workspace_size(mut self, bytes: i64) -> Self {
        self.workspace_size = bytes;
        self
    }

    pub fn num_min_timing_iters(mut self, iters: i64) -> Self {
        self.num_min_timing_iters = iters;
        self
    }

    pub fn num_avg_timing_iters(mut self, iters: i64) -> Self {
        self.num_avg_timing_iters = iters;
        self
    }

    pub fn max_batch_size(mut self, size: i64) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn sparse_weights(mut self, on: bool) -> Self {
        self.sparse_weights = on;
        self
    }

    pub fn disable_tf32(mut self, on: bool) -> Self {
        self.disable_tf32 = on;
        self
    }

    pub fn refit(mut self, on: bool) -> Self {
        self.refit = on;
        self
    }

    pub fn debug(mut self, on: bool) -> Self {
        self.debug = on;
        self
    }

    pub fn strict_types(mut self, on: bool) -> Self {
        self.strict_types = on;
        self
    }

    pub fn truncate_long_and_double(mut self, on: bool) -> Self {
        self.truncate_long_and_double = on;
        self
    }

    /// Shares a calibrator with the settings. The caller keeps ownership.
    pub fn calibrator(mut self, calibrator: Arc<dyn Calibrator>) -> Self {
        self.calibrator = Some(calibrator);
        self
    }

    pub fn clear_calibrator(mut self) -> Self {
        self.calibrator = None;
        self
    }

    /// Validates every field and freezes the result.
    pub fn build(self) -> Result<CompilationSettings, ValidationError> {
        if self.inputs.is_empty() {
            return Err(ValidationError::Empty {
                field: "inputs".into(),
            });
        }

        let enabled_precisions = self
            .enabled_precisions
            .unwrap_or_else(|| BTreeSet::from([DType::Float]));
        if enabled_precisions.is_empty() {
            return Err(ValidationError::Empty {
                field: "enabled_precisions".into(),
            });
        }

        let workspace_size = non_negative("workspace_size", self.workspace_size)?;
        let num_min_timing_iters = knob("num_min_timing_iters", self.num_min_timing_iters)?;
        let num_avg_timing_iters = knob("num_avg_timing_iters", self.num_avg_timing_iters)?;
        let max_batch_size = knob("max_batch_size", self.max_batch_size)?;

        if self.capability == EngineCapability::SafeDla
            && self.device.kind() != DeviceKind::AuxiliaryLowPower
        {
            return Err(ValidationError::Incompatible {
                field: "capability".into(),
                detail: format!(
                    "{} requires a DLA device, got {}",
                    self.capability,
                    self.device.kind()
                ),
            });
        }

        let int8_enabled = enabled_precisions.contains(&DType::Int8);
        let calibration_mode = CalibrationMode::derive(int8_enabled, self.calibrator.is_some());
        let lowering = calibration_mode.lowering();

        if let (false, Some(cal)) = (int8_enabled, &self.calibrator) {
            tracing::warn!(
                "calibrator '{}' supplied without int8 precision; it will be ignored",
                cal.name()
            );
        }
        if lowering.unfreeze_module {
            tracing::info!(
                "int8 enabled without a calibrator: lowering with unfrozen module and CSE disabled"
            );
        }

        Ok(CompilationSettings {
            inputs: self.inputs,
            enabled_precisions,
            device: self.device,
            fallback: self.fallback,
            capability: self.capability,
            workspace_size,
            num_min_timing_iters,
            num_avg_timing_iters,
            max_batch_size,
            sparse_weights: self.sparse_weights,
            disable_tf32: self.disable_tf32,
            refit: self.refit,
            debug: self.debug,
            strict_types: self.strict_types,
            truncate_long_and_double: self.truncate_long_and_double,
            calibrator: self.calibrator,
            calibration_mode,
            lowering,
        })
    }
}

fn non_negative(field: &str, value: i64) -> Result<u64, ValidationError> {
    u64::try_from(value).map_err(|_| ValidationError::Negative {
        field: field.to_string(),
        value,
    })
}

fn knob(field: &str, value: i64) -> Result<u32, ValidationError> {
    let value_u64 = non_negative(field, value)?;
    u32::try_from(value_u64).map_err(|_| ValidationError::OutOfRange {
        field: field.to_string(),
        detail: format!("{value} exceeds {}", u32::MAX),
    })
}
