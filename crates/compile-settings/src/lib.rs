// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # compile-settings
//!
//! The compilation request as one validated, immutable value.
//!
//! - [`DeviceSpec`] / [`DeviceKind`] / [`EngineCapability`] — target
//!   accelerator selection.
//! - [`FallbackPolicy`] — which operators must run on the general executor.
//! - [`Calibrator`] — shared int8 calibration source, never owned by the
//!   settings' lifecycle.
//! - [`LoweringMode`] — flags derived once from precisions + calibrator.
//! - [`CompilationSettings`] / [`CompilationSettingsBuilder`] — the request.
//! - [`describe`] — deterministic dump of the full settings tree.
//! - [`CompileRequest`] — TOML request files.
//!
//! # Construction
//!
//! Every check runs inside [`CompilationSettingsBuilder::build`]; there is
//! no way to obtain a `CompilationSettings` that failed validation, and no
//! setter exists afterwards.
//!
//! ```
//! use compile_settings::{CompilationSettings, FallbackPolicy};
//! use tensor_spec::{DType, ShapeSpec, TensorFormat};
//!
//! let settings = CompilationSettings::builder()
//!     .input(ShapeSpec::fixed(vec![16, 3, 32, 32], DType::Float, TensorFormat::Contiguous).unwrap())
//!     .enabled_precision(DType::Int8)
//!     .fallback(FallbackPolicy::new(true, 3, ["aten::softmax"], Vec::<String>::new()).unwrap())
//!     .build()
//!     .unwrap();
//!
//! // int8 without a calibrator forces the relaxed lowering mode.
//! assert!(settings.lowering().unfreeze_module);
//! assert!(settings.lowering().disable_cse);
//! ```

mod calibrator;
mod describe;
mod device;
mod fallback;
mod lowering;
mod request;
mod settings;

pub use calibrator::{CacheCalibrator, Calibrator};
pub use describe::describe;
pub use device::{DeviceKey, DeviceKind, DeviceSpec, EngineCapability};
pub use fallback::FallbackPolicy;
pub use lowering::{CalibrationMode, LoweringMode};
pub use request::{CompileRequest, DeviceEntry, FallbackEntry, InputEntry, RequestError};
pub use settings::{CompilationSettings, CompilationSettingsBuilder};
pub use tensor_spec::ValidationError;
