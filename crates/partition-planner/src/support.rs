// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator support oracles.
//!
//! The partitioner asks an [`OperatorSupport`] implementation whether the
//! accelerator backend can convert each operator. Oracles are pure: the same
//! operator and lowering mode always yield the same answer, which keeps
//! partitioning deterministic.

use compile_settings::LoweringMode;
use graph_ir::Operator;
use std::collections::BTreeSet;

/// Whether an operator can be converted to the accelerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Support {
    Convertible,
    Unsupported { reason: String },
}

impl Support {
    pub fn is_convertible(&self) -> bool {
        matches!(self, Support::Convertible)
    }
}

/// Trait for operator support oracles.
///
/// ```ignore
/// struct OnlyConvs;
/// impl OperatorSupport for OnlyConvs {
///     fn name(&self) -> &str { "only-convs" }
///     fn classify(&self, op: &Operator, _: LoweringMode) -> Support {
///         if op.kind == "aten::conv2d" { Support::Convertible }
///         else { Support::Unsupported { reason: "not a convolution".into() } }
///     }
/// }
/// ```
pub trait OperatorSupport: Send + Sync {
    /// Human-readable oracle name, used in logs.
    fn name(&self) -> &str;

    /// Classifies one operator under the given lowering mode.
    fn classify(&self, op: &Operator, lowering: LoweringMode) -> Support;
}

/// Table-driven oracle.
///
/// `supported` lists convertible operator kinds. Kinds in `frozen_only` are
/// convertible only when module weights are frozen into constants, so they
/// become unsupported when the lowering mode keeps the module unfrozen.
///
/// # Example
/// ```
/// use compile_settings::LoweringMode;
/// use graph_ir::Operator;
/// use partition_planner::{OperatorSupport, SupportTable};
///
/// let table = SupportTable::new(["aten::conv2d", "aten::relu"])
///     .with_frozen_only(["aten::batch_norm"]);
/// let relu = Operator::new(0, "r", "aten::relu");
/// assert!(table.classify(&relu, LoweringMode::default()).is_convertible());
///
/// let bn = Operator::new(1, "bn", "aten::batch_norm");
/// let unfrozen = LoweringMode { unfreeze_module: true, disable_cse: true };
/// assert!(table.classify(&bn, LoweringMode::default()).is_convertible());
/// assert!(!table.classify(&bn, unfrozen).is_convertible());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SupportTable {
    supported: BTreeSet<String>,
    frozen_only: BTreeSet<String>,
    accept_all: bool,
}

impl SupportTable {
    pub fn new<I, T>(supported: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            supported: supported.into_iter().map(Into::into).collect(),
            frozen_only: BTreeSet::new(),
            accept_all: false,
        }
    }

    /// An oracle that accepts every kind not marked frozen-only.
    pub fn accept_all() -> Self {
        Self {
            accept_all: true,
            ..Self::default()
        }
    }

    /// Marks kinds that need a frozen module. They are also added to the
    /// supported set.
    pub fn with_frozen_only<I, T>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        for kind in kinds {
            let kind = kind.into();
            self.supported.insert(kind.clone());
            self.frozen_only.insert(kind);
        }
        self
    }

    pub fn supported(&self) -> &BTreeSet<String> {
        &self.supported
    }

    pub fn frozen_only(&self) -> &BTreeSet<String> {
        &self.frozen_only
    }
}

impl OperatorSupport for SupportTable {
    fn name(&self) -> &str {
        if self.accept_all {
            "accept-all"
        } else {
            "support-table"
        }
    }

    fn classify(&self, op: &Operator, lowering: LoweringMode) -> Support {
        if lowering.unfreeze_module && self.frozen_only.contains(&op.kind) {
            return Support::Unsupported {
                reason: format!("'{}' converts only from a frozen module", op.kind),
            };
        }
        if self.accept_all || self.supported.contains(&op.kind) {
            Support::Convertible
        } else {
            Support::Unsupported {
                reason: format!("no converter for '{}'", op.kind),
            }
        }
    }
}
