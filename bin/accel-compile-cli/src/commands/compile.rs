// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-compile compile`: the full pipeline, written to disk.
//!
//! ```text
//! graph.json + request.toml → partition → build (reference backend) → out/
//!                                                  region-<i>.engine
//!                                                  plan.json
//! ```

use crate::SupportArgs;
use anyhow::Context;
use compile_settings::{CacheCalibrator, Calibrator};
use engine_builder::ReferenceBackend;
use pipeline::{Orchestrator, OrchestratorConfig};
use std::path::PathBuf;
use std::sync::Arc;

pub struct CompileArgs {
    pub graph: PathBuf,
    pub settings: PathBuf,
    pub out: PathBuf,
    pub calibration_cache: Option<PathBuf>,
    pub reject: Vec<String>,
    pub support: SupportArgs,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: CompileArgs) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           accel-compile · Hybrid Compiler           ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Inputs ─────────────────────────────────────────────────
    let config = match &args.config {
        Some(path) => OrchestratorConfig::from_file(path)?,
        None => OrchestratorConfig::default(),
    };
    let graph = super::load_graph(&args.graph)?;
    let mut settings = super::load_settings(&args.settings)?;

    let calibrator = match &args.calibration_cache {
        Some(path) => {
            let calibrator = if path.exists() {
                let cache = std::fs::read(path)
                    .with_context(|| format!("cannot read calibration cache '{}'", path.display()))?;
                CacheCalibrator::with_cache("calibration-cache", 1, cache)
            } else {
                CacheCalibrator::new("calibration-cache", 1)
            };
            let calibrator = Arc::new(calibrator);
            settings = settings
                .to_builder()
                .calibrator(Arc::clone(&calibrator) as Arc<dyn Calibrator>)
                .build()?;
            Some((path, calibrator))
        }
        None => None,
    };

    println!("  Graph:     {}", graph.summary());
    println!(
        "  Precision: {:?}, device {}, workspace {}",
        settings.enabled_precisions(),
        settings.device().key(),
        settings.workspace_size()
    );
    println!("  Output:    {}", args.out.display());
    println!();

    // ── Compile ────────────────────────────────────────────────
    let backend = ReferenceBackend::new().rejecting(args.reject.iter().cloned());
    let orchestrator = Orchestrator::new(
        Arc::new(super::support_table(&args.support)),
        Arc::new(backend),
        config,
    )?;
    let exe = orchestrator
        .compile(Arc::new(graph), Arc::new(settings))
        .await?;

    // ── Write ──────────────────────────────────────────────────
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("cannot create '{}'", args.out.display()))?;
    for (segment, engine) in exe.engines() {
        let path = args.out.join(format!("region-{}.engine", segment.region));
        std::fs::write(&path, &engine.bytes)
            .with_context(|| format!("cannot write '{}'", path.display()))?;
        tracing::info!("wrote {} ({} bytes)", path.display(), engine.bytes.len());
    }
    let plan_path = args.out.join("plan.json");
    std::fs::write(&plan_path, exe.to_json()?)
        .with_context(|| format!("cannot write '{}'", plan_path.display()))?;

    if let Some((path, calibrator)) = calibrator {
        if let Some(cache) = calibrator.read_cache() {
            std::fs::write(path, cache)
                .with_context(|| format!("cannot write calibration cache '{}'", path.display()))?;
        }
    }

    // ── Report ─────────────────────────────────────────────────
    println!(
        "  {:<4} {:<16} {:>5} {:>12} {:>10}",
        "Idx", "Target", "Ops", "Engine", "Build"
    );
    println!("  {}", "-".repeat(52));
    for seg in &exe.segments {
        let (size, build) = match seg.engine() {
            Some(e) => (
                format!("{} B", e.report.engine_bytes),
                format!("{:.2?}", e.report.duration),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        println!(
            "  {:<4} {:<16} {:>5} {:>12} {:>10}",
            seg.region,
            seg.target.to_string(),
            seg.operator_names.len(),
            size,
            build
        );
    }
    println!();
    println!("  {}", exe.summary());
    println!("  {}", exe.metrics.summary());
    println!("  Plan written to {}", plan_path.display());
    Ok(())
}
