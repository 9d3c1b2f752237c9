// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-spec
//!
//! Leaf value types describing the tensors a compilation request feeds into
//! a graph:
//!
//! - [`DType`] — element types an accelerator engine can be built for
//!   (`Float`, `Half`, `Int8`, `Int32`, `Bool`).
//! - [`TensorFormat`] — memory layout (`Contiguous` or `ChannelLast`).
//! - [`ShapeSpec`] — one input's static shape, or a dynamic `min/opt/max`
//!   range, together with its dtype and format.
//! - [`ValidationError`] — the shared construction-time error used by every
//!   crate that validates user-supplied request values.
//!
//! All types are immutable once constructed: a `ShapeSpec` that exists has
//! already passed its rank and bound checks.
//!
//! # Example
//! ```
//! use tensor_spec::{DType, ShapeSpec, TensorFormat};
//!
//! let spec = ShapeSpec::dynamic(
//!     vec![1, 3, 224, 224],
//!     vec![8, 3, 224, 224],
//!     vec![32, 3, 224, 224],
//!     DType::Half,
//!     TensorFormat::Contiguous,
//! )
//! .unwrap();
//! assert!(spec.is_dynamic());
//! assert_eq!(
//!     spec.to_string(),
//!     "Input(min_shape=(1,3,224,224,), opt_shape=(8,3,224,224,), \
//!      max_shape=(32,3,224,224,), dtype=Half, format=Contiguous/Linear/NCHW)"
//! );
//! ```

mod dtype;
mod error;
mod format;
mod shape;

pub use dtype::DType;
pub use error::ValidationError;
pub use format::TensorFormat;
pub use shape::{render_dims, ShapeSpec};
