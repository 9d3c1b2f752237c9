// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element data types for engine inputs and enabled precisions.

use crate::ValidationError;
use std::fmt;
use std::str::FromStr;

/// Enumerates the element types an accelerator engine can consume or be
/// built for.
///
/// Used both for per-input dtypes and for the set of enabled kernel
/// precisions in a compilation request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    /// 32-bit IEEE 754 floating point.
    Float,
    /// 16-bit IEEE 754 floating point.
    Half,
    /// 8-bit signed integer (quantised).
    Int8,
    /// 32-bit signed integer.
    Int32,
    /// Boolean.
    Bool,
}

impl DType {
    /// Returns the display label used in settings dumps.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::Float => "Float",
            DType::Half => "Half",
            DType::Int8 => "Int8",
            DType::Int32 => "Int32",
            DType::Bool => "Bool",
        }
    }

    /// Returns `true` for the quantised integer precision that needs
    /// calibration data (or a QAT graph) to build.
    pub fn is_quantized(self) -> bool {
        matches!(self, DType::Int8)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = ValidationError;

    /// Parses a dtype name. Accepts the display label plus common aliases
    /// (`"f32"`, `"float16"`, `"char"`, `"i32"`, ...), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "float" | "float32" | "f32" | "fp32" => Ok(DType::Float),
            "half" | "float16" | "f16" | "fp16" => Ok(DType::Half),
            "int8" | "i8" | "char" => Ok(DType::Int8),
            "int32" | "i32" | "int" => Ok(DType::Int32),
            "bool" | "boolean" => Ok(DType::Bool),
            _ => Err(ValidationError::UnknownVariant {
                kind: "dtype",
                value: s.to_string(),
            }),
        }
    }
}
