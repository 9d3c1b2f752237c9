// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lowering flags derived from the precision set and calibrator.
//!
//! The derivation happens exactly once, inside the settings builder. Later
//! stages read [`LoweringMode`] from the settings and never call
//! [`CalibrationMode::derive`] themselves.

/// How int8 quantisation parameters will be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMode {
    /// Int8 is not enabled.
    NotRequired,
    /// Int8 enabled with a calibrator: scales come from calibration data.
    PostTraining,
    /// Int8 enabled without a calibrator: scales must already be present in
    /// the graph (quantisation-aware trained model).
    QuantizationAware,
}

impl CalibrationMode {
    pub(crate) fn derive(int8_enabled: bool, has_calibrator: bool) -> Self {
        match (int8_enabled, has_calibrator) {
            (false, _) => CalibrationMode::NotRequired,
            (true, true) => CalibrationMode::PostTraining,
            (true, false) => CalibrationMode::QuantizationAware,
        }
    }

    /// The graph lowering flags this mode requires.
    pub fn lowering(self) -> LoweringMode {
        match self {
            CalibrationMode::QuantizationAware => LoweringMode {
                unfreeze_module: true,
                disable_cse: true,
            },
            CalibrationMode::NotRequired | CalibrationMode::PostTraining => {
                LoweringMode::default()
            }
        }
    }
}

/// Graph lowering flags consumed by the partitioner and engine builder.
///
/// `unfreeze_module` keeps module weights as parameters instead of folding
/// them into constants; `disable_cse` preserves duplicated subexpressions so
/// fake-quantisation nodes keep their placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub struct LoweringMode {
    pub unfreeze_module: bool,
    pub disable_cse: bool,
}
