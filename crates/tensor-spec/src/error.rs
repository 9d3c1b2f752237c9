// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Construction-time validation errors.

/// Errors raised while validating request values, before any graph work.
///
/// Every variant names the offending field so the caller can fix the
/// request without re-running anything.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A numeric knob or dimension is below zero.
    #[error("{field} must be 0 or greater, got {value}")]
    Negative { field: String, value: i64 },

    /// A collection that must contain at least one element is empty.
    #[error("{field} must not be empty")]
    Empty { field: String },

    /// The min/opt/max shapes of a dynamic input disagree on rank.
    #[error("{field}: rank mismatch, min has rank {min_rank}, opt {opt_rank}, max {max_rank}")]
    RankMismatch {
        field: String,
        min_rank: usize,
        opt_rank: usize,
        max_rank: usize,
    },

    /// A dynamic input violates `min[i] <= opt[i] <= max[i]`.
    #[error("{field}: dimension {index} violates min <= opt <= max ({min} / {opt} / {max})")]
    BoundsOrder {
        field: String,
        index: usize,
        min: i64,
        opt: i64,
        max: i64,
    },

    /// A string did not name any known enum variant.
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    /// A value is outside its permitted range.
    #[error("{field} out of range: {detail}")]
    OutOfRange { field: String, detail: String },

    /// Two otherwise valid fields cannot be combined.
    #[error("{field} is incompatible with the request: {detail}")]
    Incompatible { field: String, detail: String },
}

impl ValidationError {
    /// Prefixes the offending field with `context` (e.g. `inputs[2]`).
    pub fn with_context(self, context: &str) -> Self {
        let join = |field: String| {
            if field.is_empty() {
                context.to_string()
            } else {
                format!("{context}.{field}")
            }
        };
        match self {
            Self::Negative { field, value } => Self::Negative {
                field: join(field),
                value,
            },
            Self::Empty { field } => Self::Empty { field: join(field) },
            Self::RankMismatch {
                field,
                min_rank,
                opt_rank,
                max_rank,
            } => Self::RankMismatch {
                field: join(field),
                min_rank,
                opt_rank,
                max_rank,
            },
            Self::BoundsOrder {
                field,
                index,
                min,
                opt,
                max,
            } => Self::BoundsOrder {
                field: join(field),
                index,
                min,
                opt,
                max,
            },
            Self::OutOfRange { field, detail } => Self::OutOfRange {
                field: join(field),
                detail,
            },
            Self::Incompatible { field, detail } => Self::Incompatible {
                field: join(field),
                detail,
            },
            other @ Self::UnknownVariant { .. } => other,
        }
    }

    /// Returns the offending field, if the variant carries one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Negative { field, .. }
            | Self::Empty { field }
            | Self::RankMismatch { field, .. }
            | Self::BoundsOrder { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::Incompatible { field, .. } => Some(field),
            Self::UnknownVariant { .. } => None,
        }
    }
}
