// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # accel-compile
//!
//! Command-line interface for the hybrid compilation pipeline.
//!
//! ## Usage
//! ```bash
//! # Compile a graph into engines + plan.json
//! accel-compile compile --graph model.json --settings request.toml --out ./build
//!
//! # Show the partition without building
//! accel-compile partition --graph model.json --settings request.toml
//!
//! # Print the validated settings tree
//! accel-compile describe --settings request.toml
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "accel-compile",
    about = "Hybrid accelerator compilation: partition, build engines, assemble",
    version,
    author
)]
struct Cli {
    /// Path to an orchestrator TOML file (max_parallel_builds, build_timeout_ms).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Operator-support oracle options shared by `compile` and `partition`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SupportArgs {
    /// Comma-separated operator kinds the accelerator converts. Omit to
    /// accept every kind.
    #[arg(long, value_delimiter = ',')]
    supported: Vec<String>,

    /// Comma-separated kinds convertible only from a frozen module.
    #[arg(long, value_delimiter = ',')]
    frozen_only: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Partition a graph and build one engine per accelerator region.
    Compile {
        /// Graph manifest (JSON).
        #[arg(short, long)]
        graph: PathBuf,

        /// Compile request (TOML).
        #[arg(short, long)]
        settings: PathBuf,

        /// Output directory for `region-<i>.engine` files and `plan.json`.
        #[arg(short, long, default_value = "build")]
        out: PathBuf,

        /// Int8 calibration cache to replay; updated after the compile.
        #[arg(long)]
        calibration_cache: Option<PathBuf>,

        /// Comma-separated kinds the reference backend refuses to build.
        #[arg(long, value_delimiter = ',')]
        reject: Vec<String>,

        #[command(flatten)]
        support: SupportArgs,
    },

    /// Partition a graph and print the region layout.
    Partition {
        /// Graph manifest (JSON).
        #[arg(short, long)]
        graph: PathBuf,

        /// Compile request (TOML).
        #[arg(short, long)]
        settings: PathBuf,

        /// Print the plan as JSON instead of a table.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        support: SupportArgs,
    },

    /// Validate a compile request and print its settings tree.
    Describe {
        /// Compile request (TOML).
        #[arg(short, long)]
        settings: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Compile {
            graph,
            settings,
            out,
            calibration_cache,
            reject,
            support,
        } => {
            commands::compile::execute(commands::compile::CompileArgs {
                graph,
                settings,
                out,
                calibration_cache,
                reject,
                support,
                config: cli.config,
            })
            .await
        }
        Commands::Partition {
            graph,
            settings,
            json,
            support,
        } => commands::partition::execute(graph, settings, json, support),
        Commands::Describe { settings } => commands::describe::execute(settings),
    }
}
