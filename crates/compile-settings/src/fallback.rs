// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Rules for sending graph regions to the general executor.

use crate::ValidationError;
use std::collections::BTreeSet;

/// Fallback policy consumed by the partitioner.
///
/// Exclusion sets are ordered so that iteration (and therefore `describe`
/// output) is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FallbackPolicy {
    enabled: bool,
    min_region_size: usize,
    excluded_operators: BTreeSet<String>,
    excluded_modules: BTreeSet<String>,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            min_region_size: 1,
            excluded_operators: BTreeSet::new(),
            excluded_modules: BTreeSet::new(),
        }
    }
}

impl FallbackPolicy {
    /// Creates a policy. `min_region_size` must be at least 1.
    pub fn new<I, J, T, U>(
        enabled: bool,
        min_region_size: i64,
        excluded_operators: I,
        excluded_modules: J,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = T>,
        J: IntoIterator<Item = U>,
        T: Into<String>,
        U: Into<String>,
    {
        if min_region_size < 1 {
            return Err(ValidationError::OutOfRange {
                field: "fallback.min_block_size".into(),
                detail: format!("must be at least 1, got {min_region_size}"),
            });
        }
        let excluded_operators: BTreeSet<String> =
            excluded_operators.into_iter().map(Into::into).collect();
        let excluded_modules: BTreeSet<String> =
            excluded_modules.into_iter().map(Into::into).collect();

        if let Some(blank) = excluded_operators
            .iter()
            .chain(&excluded_modules)
            .find(|s| s.trim().is_empty())
        {
            return Err(ValidationError::OutOfRange {
                field: "fallback".into(),
                detail: format!("exclusion entries must be non-blank, got '{blank}'"),
            });
        }

        Ok(Self {
            enabled,
            min_region_size: min_region_size as usize,
            excluded_operators,
            excluded_modules,
        })
    }

    /// Fallback enabled, no exclusions, the given minimum region size.
    pub fn enabled_with_min_size(min_region_size: i64) -> Result<Self, ValidationError> {
        Self::new(
            true,
            min_region_size,
            Vec::<String>::new(),
            Vec::<String>::new(),
        )
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn min_region_size(&self) -> usize {
        self.min_region_size
    }

    pub fn excluded_operators(&self) -> &BTreeSet<String> {
        &self.excluded_operators
    }

    pub fn excluded_modules(&self) -> &BTreeSet<String> {
        &self.excluded_modules
    }

    /// Returns `true` if operators of this kind are forced to fall back.
    pub fn excludes_operator(&self, kind: &str) -> bool {
        self.excluded_operators.contains(kind)
    }
}
