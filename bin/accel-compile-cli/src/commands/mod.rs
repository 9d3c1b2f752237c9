// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared helpers.

pub mod compile;
pub mod describe;
pub mod partition;

use crate::SupportArgs;
use anyhow::Context;
use compile_settings::{CompilationSettings, CompileRequest};
use graph_ir::{graph::Validated, ComputeGraph, GraphLoader};
use partition_planner::SupportTable;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` wins over the `-v` count.
pub fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub(crate) fn load_graph(path: &Path) -> anyhow::Result<ComputeGraph<Validated>> {
    GraphLoader::load(path)
        .with_context(|| format!("failed to load graph from '{}'", path.display()))
}

pub(crate) fn load_settings(path: &Path) -> anyhow::Result<CompilationSettings> {
    let request = CompileRequest::from_file(path)?;
    request
        .into_settings()
        .with_context(|| format!("invalid compile request '{}'", path.display()))
}

pub(crate) fn support_table(args: &SupportArgs) -> SupportTable {
    let table = if args.supported.is_empty() {
        SupportTable::accept_all()
    } else {
        SupportTable::new(args.supported.iter().cloned())
    };
    table.with_frozen_only(args.frozen_only.iter().cloned())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
