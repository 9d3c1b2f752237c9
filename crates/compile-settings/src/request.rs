// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Compilation requests loaded from TOML files.
//!
//! A request file is raw, unchecked input. It only becomes usable through
//! [`CompileRequest::into_settings`], which routes every value through the
//! validating builder.
//!
//! # TOML Format
//! ```toml
//! enabled_precisions = ["float", "half"]
//! workspace_size = 1073741824
//! num_min_timing_iters = 2
//! num_avg_timing_iters = 1
//! capability = "default"
//!
//! [[inputs]]
//! shape = [1, 3, 224, 224]
//! dtype = "float"
//!
//! [[inputs]]
//! min_shape = [1, 16]
//! opt_shape = [8, 16]
//! max_shape = [32, 16]
//! dtype = "int32"
//! format = "contiguous"
//!
//! [device]
//! device_type = "gpu"
//! gpu_id = 0
//!
//! [fallback]
//! enabled = true
//! min_block_size = 3
//! forced_fallback_operators = ["aten::softmax"]
//! ```

use crate::{
    CompilationSettings, DeviceKind, DeviceSpec, EngineCapability, FallbackPolicy,
    ValidationError,
};
use std::path::Path;
use tensor_spec::{DType, ShapeSpec, TensorFormat};

/// Errors from reading or converting a request file.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("cannot read request '{path}': {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("TOML serialise error: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("invalid request: {0}")]
    Invalid(#[from] ValidationError),
}

/// One `[[inputs]]` table. Either `shape`, or all of
/// `min_shape`/`opt_shape`/`max_shape`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InputEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_shape: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opt_shape: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_shape: Option<Vec<i64>>,
    #[serde(default = "default_dtype")]
    pub dtype: String,
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for InputEntry {
    fn default() -> Self {
        Self {
            shape: None,
            min_shape: None,
            opt_shape: None,
            max_shape: None,
            dtype: default_dtype(),
            format: default_format(),
        }
    }
}

/// The `[device]` table.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DeviceEntry {
    #[serde(default = "default_device_type")]
    pub device_type: String,
    #[serde(default)]
    pub gpu_id: i64,
    #[serde(default)]
    pub dla_core: i64,
    #[serde(default)]
    pub allow_gpu_fallback: bool,
}

impl Default for DeviceEntry {
    fn default() -> Self {
        Self {
            device_type: default_device_type(),
            gpu_id: 0,
            dla_core: 0,
            allow_gpu_fallback: false,
        }
    }
}

/// The `[fallback]` table.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FallbackEntry {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_min_block_size")]
    pub min_block_size: i64,
    #[serde(default)]
    pub forced_fallback_operators: Vec<String>,
    #[serde(default)]
    pub forced_fallback_modules: Vec<String>,
}

impl Default for FallbackEntry {
    fn default() -> Self {
        Self {
            enabled: false,
            min_block_size: default_min_block_size(),
            forced_fallback_operators: Vec::new(),
            forced_fallback_modules: Vec::new(),
        }
    }
}

/// A compilation request as written in a TOML file.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompileRequest {
    #[serde(default = "default_precisions")]
    pub enabled_precisions: Vec<String>,
    #[serde(default)]
    pub workspace_size: i64,
    #[serde(default = "default_min_timing_iters")]
    pub num_min_timing_iters: i64,
    #[serde(default = "default_avg_timing_iters")]
    pub num_avg_timing_iters: i64,
    #[serde(default)]
    pub max_batch_size: i64,
    #[serde(default = "default_capability")]
    pub capability: String,
    #[serde(default)]
    pub sparse_weights: bool,
    #[serde(default)]
    pub disable_tf32: bool,
    #[serde(default)]
    pub refit: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub strict_types: bool,
    #[serde(default)]
    pub truncate_long_and_double: bool,
    #[serde(default)]
    pub inputs: Vec<InputEntry>,
    #[serde(default)]
    pub device: DeviceEntry,
    #[serde(default)]
    pub fallback: FallbackEntry,
}

fn default_dtype() -> String {
    "float".into()
}

fn default_format() -> String {
    "contiguous".into()
}

fn default_device_type() -> String {
    "gpu".into()
}

fn default_min_block_size() -> i64 {
    1
}

fn default_precisions() -> Vec<String> {
    vec!["float".into()]
}

fn default_min_timing_iters() -> i64 {
    2
}

fn default_avg_timing_iters() -> i64 {
    1
}

fn default_capability() -> String {
    "default".into()
}

impl Default for CompileRequest {
    fn default() -> Self {
        Self {
            enabled_precisions: default_precisions(),
            workspace_size: 0,
            num_min_timing_iters: default_min_timing_iters(),
            num_avg_timing_iters: default_avg_timing_iters(),
            max_batch_size: 0,
            capability: default_capability(),
            sparse_weights: false,
            disable_tf32: false,
            refit: false,
            debug: false,
            strict_types: false,
            truncate_long_and_double: false,
            inputs: Vec::new(),
            device: DeviceEntry::default(),
            fallback: FallbackEntry::default(),
        }
    }
}

impl CompileRequest {
    /// Loads a request from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RequestError> {
        let content = std::fs::read_to_string(path).map_err(|source| RequestError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses a request from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RequestError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialises the request to TOML.
    pub fn to_toml(&self) -> Result<String, RequestError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates the request into immutable settings.
    ///
    /// Calibrators cannot be expressed in a file; attach one with
    /// [`CompilationSettings::to_builder`] if needed.
    pub fn into_settings(self) -> Result<CompilationSettings, RequestError> {
        let inputs = self
            .inputs
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                entry
                    .to_shape_spec()
                    .map_err(|e| e.with_context(&format!("inputs[{i}]")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let precisions = self
            .enabled_precisions
            .iter()
            .map(|p| p.parse::<DType>())
            .collect::<Result<Vec<_>, _>>()?;

        let device = self.device.to_device_spec()?;
        let fallback = FallbackPolicy::new(
            self.fallback.enabled,
            self.fallback.min_block_size,
            self.fallback.forced_fallback_operators,
            self.fallback.forced_fallback_modules,
        )?;
        let capability: EngineCapability = self.capability.parse()?;

        let settings = CompilationSettings::builder()
            .inputs(inputs)
            .enabled_precisions(precisions)
            .device(device)
            .fallback(fallback)
            .capability(capability)
            .workspace_size(self.workspace_size)
            .num_min_timing_iters(self.num_min_timing_iters)
            .num_avg_timing_iters(self.num_avg_timing_iters)
            .max_batch_size(self.max_batch_size)
            .sparse_weights(self.sparse_weights)
            .disable_tf32(self.disable_tf32)
            .refit(self.refit)
            .debug(self.debug)
            .strict_types(self.strict_types)
            .truncate_long_and_double(self.truncate_long_and_double)
            .build()?;
        Ok(settings)
    }
}

impl InputEntry {
    fn to_shape_spec(&self) -> Result<ShapeSpec, ValidationError> {
        let dtype: DType = self.dtype.parse()?;
        let format: TensorFormat = self.format.parse()?;

        match (&self.shape, &self.min_shape, &self.opt_shape, &self.max_shape) {
            (Some(shape), None, None, None) => ShapeSpec::fixed(shape.clone(), dtype, format),
            (None, Some(min), Some(opt), Some(max)) => {
                ShapeSpec::dynamic(min.clone(), opt.clone(), max.clone(), dtype, format)
            }
            _ => Err(ValidationError::Incompatible {
                field: "shape".into(),
                detail: "give either `shape` or all of `min_shape`, `opt_shape`, `max_shape`"
                    .into(),
            }),
        }
    }
}

impl DeviceEntry {
    fn to_device_spec(&self) -> Result<DeviceSpec, ValidationError> {
        let kind: DeviceKind = self.device_type.parse()?;
        DeviceSpec::new(kind, self.gpu_id, self.dla_core, self.allow_gpu_fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
enabled_precisions = ["float", "int8"]
workspace_size = 4096
max_batch_size = 16
refit = true

[[inputs]]
shape = [1, 3, 32, 32]

[[inputs]]
min_shape = [1, 8]
opt_shape = [4, 8]
max_shape = [16, 8]
dtype = "i32"
format = "nhwc"

[device]
device_type = "dla"
gpu_id = 0
dla_core = 1
allow_gpu_fallback = true

[fallback]
enabled = true
min_block_size = 3
forced_fallback_operators = ["aten::softmax"]
forced_fallback_modules = ["Net.Head"]
"#;

    #[test]
    fn test_parse_and_convert() {
        let req = CompileRequest::from_toml(SAMPLE).unwrap();
        assert_eq!(req.inputs.len(), 2);
        assert_eq!(req.num_min_timing_iters, 2);

        let s = req.into_settings().unwrap();
        assert_eq!(s.inputs().len(), 2);
        assert!(!s.inputs()[0].is_dynamic());
        assert!(s.inputs()[1].is_dynamic());
        assert_eq!(s.inputs()[1].dtype(), DType::Int32);
        assert_eq!(s.inputs()[1].format(), TensorFormat::ChannelLast);
        assert_eq!(s.device().aux_core(), Some(1));
        assert_eq!(s.workspace_size(), 4096);
        assert_eq!(s.max_batch_size(), 16);
        assert!(s.refit());
        assert_eq!(s.fallback().min_region_size(), 3);
        assert!(s.fallback().excludes_operator("aten::softmax"));
        assert!(s.lowering().unfreeze_module);
    }

    #[test]
    fn test_unknown_dtype_rejected() {
        let req = CompileRequest::from_toml(
            r#"
[[inputs]]
shape = [1]
dtype = "float64"
"#,
        )
        .unwrap();
        let err = req.into_settings().unwrap_err();
        assert!(matches!(
            err,
            RequestError::Invalid(ValidationError::UnknownVariant { kind: "dtype", .. })
        ));
    }

    #[test]
    fn test_unknown_precision_rejected() {
        let req = CompileRequest {
            enabled_precisions: vec!["fp64".into()],
            inputs: vec![InputEntry {
                shape: Some(vec![1]),
                ..InputEntry::default()
            }],
            ..CompileRequest::default()
        };
        assert!(matches!(
            req.into_settings(),
            Err(RequestError::Invalid(ValidationError::UnknownVariant { .. }))
        ));
    }

    #[test]
    fn test_negative_workspace_rejected() {
        let req = CompileRequest::from_toml("workspace_size = -1\n[[inputs]]\nshape = [1]\n").unwrap();
        match req.into_settings() {
            Err(RequestError::Invalid(e)) => assert_eq!(e.field(), Some("workspace_size")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_input_names_index() {
        let req = CompileRequest::from_toml(
            r#"
[[inputs]]
shape = [1]

[[inputs]]
min_shape = [4]
opt_shape = [2]
max_shape = [8]
"#,
        )
        .unwrap();
        match req.into_settings() {
            Err(RequestError::Invalid(e)) => {
                assert_eq!(e.field(), Some("inputs[1].shape range"))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_range_rejected() {
        let entry = InputEntry {
            min_shape: Some(vec![1]),
            ..InputEntry::default()
        };
        assert!(entry.to_shape_spec().is_err());
    }

    #[test]
    fn test_toml_roundtrip_preserves_request() {
        let req = CompileRequest::from_toml(SAMPLE).unwrap();
        let back = CompileRequest::from_toml(&req.to_toml().unwrap()).unwrap();
        assert_eq!(req, back);
    }

    #[test]
    fn test_missing_file() {
        let err = CompileRequest::from_file(Path::new("/nonexistent/request.toml")).unwrap_err();
        assert!(matches!(err, RequestError::ReadError { .. }));
    }
}
