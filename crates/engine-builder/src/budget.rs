// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cancellation and deadline budget for one build.

use crate::CancelCause;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Bounds how long a build may run.
///
/// A build never blocks indefinitely: it observes `cancel` and `deadline`
/// at every [`BuildContext::checkpoint`](crate::BuildContext::checkpoint).
///
/// # Example
/// ```
/// use engine_builder::{BuildBudget, CancelCause};
///
/// let budget = BuildBudget::unbounded();
/// assert!(budget.check().is_ok());
/// budget.cancel.cancel();
/// assert_eq!(budget.check(), Err(CancelCause::Cancelled));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BuildBudget {
    pub deadline: Option<Instant>,
    pub cancel: CancellationToken,
}

impl BuildBudget {
    /// No deadline, fresh token.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Deadline `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the token, e.g. with a child of an orchestrator-wide token.
    pub fn with_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns `Err` once the token fires or the deadline passes.
    /// Cancellation wins when both apply.
    pub fn check(&self) -> Result<(), CancelCause> {
        if self.cancel.is_cancelled() {
            return Err(CancelCause::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(CancelCause::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}
