// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Orchestrator configuration loaded from TOML files or constructed
//! programmatically.
//!
//! # TOML Format
//! ```toml
//! max_parallel_builds = 4
//! build_timeout_ms = 600000
//! ```

use crate::CompileError;
use std::path::Path;
use std::time::Duration;

/// Scheduling knobs for [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Upper bound on concurrent region builds (defaults to the number of
    /// online CPU cores).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel_builds: Option<usize>,
    /// Per-region build deadline in milliseconds. Unset means no deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_timeout_ms: Option<u64>,
}

impl OrchestratorConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CompileError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CompileError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, CompileError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| CompileError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, CompileError> {
        toml::to_string_pretty(self)
            .map_err(|e| CompileError::Config(format!("TOML serialise error: {e}")))
    }

    pub fn with_max_parallel_builds(mut self, n: usize) -> Self {
        self.max_parallel_builds = Some(n);
        self
    }

    pub fn with_build_timeout(mut self, timeout: Duration) -> Self {
        self.build_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn validate(&self) -> Result<(), CompileError> {
        if self.max_parallel_builds == Some(0) {
            return Err(CompileError::Config(
                "max_parallel_builds must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Resolves the build parallelism.
    pub fn resolve_parallelism(&self) -> usize {
        self.max_parallel_builds
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            })
            .max(1)
    }

    pub fn build_timeout(&self) -> Option<Duration> {
        self.build_timeout_ms.map(Duration::from_millis)
    }
}
