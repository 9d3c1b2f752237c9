// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Input shape descriptors: one fixed shape, or a dynamic `min/opt/max`
//! range served by a single engine.

use crate::{DType, TensorFormat, ValidationError};
use std::fmt;

/// Static or dynamic extent of an input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Extent {
    Static {
        shape: Vec<i64>,
    },
    Dynamic {
        min: Vec<i64>,
        opt: Vec<i64>,
        max: Vec<i64>,
    },
}

/// Describes one graph input: shape (or shape range), element type, and
/// memory layout.
///
/// A `ShapeSpec` can only be obtained through [`ShapeSpec::fixed`] or
/// [`ShapeSpec::dynamic`], both of which validate, so every instance
/// satisfies:
/// - all dimensions are `>= 0`;
/// - for dynamic specs, `min`, `opt` and `max` share one rank and
///   `min[i] <= opt[i] <= max[i]` for every `i`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct ShapeSpec {
    #[serde(flatten)]
    extent: Extent,
    dtype: DType,
    format: TensorFormat,
}

impl ShapeSpec {
    /// Creates a static input spec.
    ///
    /// # Examples
    /// ```
    /// use tensor_spec::{DType, ShapeSpec, TensorFormat};
    /// let s = ShapeSpec::fixed(vec![1, 3, 32, 32], DType::Float, TensorFormat::Contiguous).unwrap();
    /// assert_eq!(s.rank(), 4);
    /// assert!(!s.is_dynamic());
    /// ```
    pub fn fixed(
        shape: Vec<i64>,
        dtype: DType,
        format: TensorFormat,
    ) -> Result<Self, ValidationError> {
        check_non_negative("shape", &shape)?;
        Ok(Self {
            extent: Extent::Static { shape },
            dtype,
            format,
        })
    }

    /// Creates a dynamic input spec from a `min/opt/max` triple.
    pub fn dynamic(
        min: Vec<i64>,
        opt: Vec<i64>,
        max: Vec<i64>,
        dtype: DType,
        format: TensorFormat,
    ) -> Result<Self, ValidationError> {
        if min.len() != opt.len() || opt.len() != max.len() {
            return Err(ValidationError::RankMismatch {
                field: "shape range".into(),
                min_rank: min.len(),
                opt_rank: opt.len(),
                max_rank: max.len(),
            });
        }
        check_non_negative("min_shape", &min)?;
        check_non_negative("opt_shape", &opt)?;
        check_non_negative("max_shape", &max)?;

        for (index, ((&lo, &mid), &hi)) in min.iter().zip(&opt).zip(&max).enumerate() {
            if !(lo <= mid && mid <= hi) {
                return Err(ValidationError::BoundsOrder {
                    field: "shape range".into(),
                    index,
                    min: lo,
                    opt: mid,
                    max: hi,
                });
            }
        }

        Ok(Self {
            extent: Extent::Dynamic { min, opt, max },
            dtype,
            format,
        })
    }

    /// Returns `true` if this input is specified as a range.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.extent, Extent::Dynamic { .. })
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.opt().len()
    }

    /// The fixed shape, for static specs.
    pub fn shape(&self) -> Option<&[i64]> {
        match &self.extent {
            Extent::Static { shape } => Some(shape),
            Extent::Dynamic { .. } => None,
        }
    }

    /// Lower bound. Equals the fixed shape for static specs.
    pub fn min(&self) -> &[i64] {
        match &self.extent {
            Extent::Static { shape } => shape,
            Extent::Dynamic { min, .. } => min,
        }
    }

    /// Optimisation target. Equals the fixed shape for static specs.
    pub fn opt(&self) -> &[i64] {
        match &self.extent {
            Extent::Static { shape } => shape,
            Extent::Dynamic { opt, .. } => opt,
        }
    }

    /// Upper bound. Equals the fixed shape for static specs.
    pub fn max(&self) -> &[i64] {
        match &self.extent {
            Extent::Static { shape } => shape,
            Extent::Dynamic { max, .. } => max,
        }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn format(&self) -> TensorFormat {
        self.format
    }
}

impl fmt::Display for ShapeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Input(")?;
        match &self.extent {
            Extent::Static { shape } => write!(f, "shape={}, ", render_dims(shape))?,
            Extent::Dynamic { min, opt, max } => write!(
                f,
                "min_shape={}, opt_shape={}, max_shape={}, ",
                render_dims(min),
                render_dims(opt),
                render_dims(max),
            )?,
        }
        write!(f, "dtype={}, format={})", self.dtype, self.format)
    }
}

/// Renders dimensions as a tuple with a trailing comma, e.g. `(1,3,224,)`.
pub fn render_dims(dims: &[i64]) -> String {
    let mut out = String::with_capacity(dims.len() * 4 + 2);
    out.push('(');
    for d in dims {
        out.push_str(&d.to_string());
        out.push(',');
    }
    out.push(')');
    out
}

fn check_non_negative(field: &str, dims: &[i64]) -> Result<(), ValidationError> {
    match dims.iter().find(|&&d| d < 0) {
        Some(&value) => Err(ValidationError::Negative {
            field: field.to_string(),
            value,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic(min: &[i64], opt: &[i64], max: &[i64]) -> Result<ShapeSpec, ValidationError> {
        ShapeSpec::dynamic(
            min.to_vec(),
            opt.to_vec(),
            max.to_vec(),
            DType::Float,
            TensorFormat::Contiguous,
        )
    }

    #[test]
    fn test_fixed_accessors() {
        let s = ShapeSpec::fixed(vec![1, 3, 32, 32], DType::Half, TensorFormat::ChannelLast)
            .unwrap();
        assert_eq!(s.shape(), Some(&[1, 3, 32, 32][..]));
        assert_eq!(s.min(), s.max());
        assert_eq!(s.dtype(), DType::Half);
        assert_eq!(s.format(), TensorFormat::ChannelLast);
    }

    #[test]
    fn test_fixed_accepts_dims_whose_product_overflows() {
        let s = ShapeSpec::fixed(vec![1 << 40, 1 << 40], DType::Float, TensorFormat::Contiguous)
            .unwrap();
        assert_eq!(s.max(), &[1 << 40, 1 << 40][..]);
        assert_eq!(
            s.to_string(),
            "Input(shape=(1099511627776,1099511627776,), dtype=Float, format=Contiguous/Linear/NCHW)"
        );
    }

    #[test]
    fn test_fixed_rejects_negative_dim() {
        let err = ShapeSpec::fixed(vec![1, -1], DType::Float, TensorFormat::Contiguous)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::Negative {
                field: "shape".into(),
                value: -1
            }
        );
    }

    #[test]
    fn test_dynamic_ok() {
        let s = dynamic(&[1, 3], &[4, 3], &[8, 3]).unwrap();
        assert!(s.is_dynamic());
        assert_eq!(s.shape(), None);
        assert_eq!(s.rank(), 2);
        assert_eq!(s.min(), &[1, 3]);
        assert_eq!(s.max(), &[8, 3]);
    }

    #[test]
    fn test_dynamic_equal_bounds_ok() {
        assert!(dynamic(&[2, 2], &[2, 2], &[2, 2]).is_ok());
    }

    #[test]
    fn test_dynamic_rank_mismatch() {
        let err = dynamic(&[1, 3], &[4, 3, 1], &[8, 3]).unwrap_err();
        assert!(matches!(err, ValidationError::RankMismatch { opt_rank: 3, .. }));
    }

    #[test]
    fn test_dynamic_opt_above_max() {
        let err = dynamic(&[1, 3], &[16, 3], &[8, 3]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::BoundsOrder {
                field: "shape range".into(),
                index: 0,
                min: 1,
                opt: 16,
                max: 8,
            }
        );
    }

    #[test]
    fn test_dynamic_min_above_opt() {
        let err = dynamic(&[1, 5], &[1, 4], &[1, 8]).unwrap_err();
        assert!(matches!(err, ValidationError::BoundsOrder { index: 1, .. }));
    }

    #[test]
    fn test_render_dims_trailing_comma() {
        assert_eq!(render_dims(&[1, 3, 224, 224]), "(1,3,224,224,)");
        assert_eq!(render_dims(&[]), "()");
    }

    #[test]
    fn test_display_static() {
        let s = ShapeSpec::fixed(vec![16, 3, 32, 32], DType::Float, TensorFormat::Contiguous)
            .unwrap();
        assert_eq!(
            s.to_string(),
            "Input(shape=(16,3,32,32,), dtype=Float, format=Contiguous/Linear/NCHW)"
        );
    }

    #[test]
    fn test_serialize_tagged() {
        let s = dynamic(&[1], &[2], &[3]).unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["kind"], "dynamic");
        assert_eq!(json["dtype"], "float");
        assert_eq!(json["max"][0], 3);
    }
}
