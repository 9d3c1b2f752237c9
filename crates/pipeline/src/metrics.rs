// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Compilation profiling metrics.
//!
//! [`CompileMetrics`] records where a compile spent its time: one
//! partitioning pass, then one build per accelerator region, some of which
//! overlap in wall-clock time.

use engine_builder::BuildReport;
use std::time::Duration;

/// Metrics for one region's engine build.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RegionBuildMetrics {
    pub region: usize,
    pub num_operators: usize,
    pub build_duration: Duration,
    pub engine_bytes: usize,
    pub peak_device_bytes: u64,
}

/// Aggregate metrics for one compile call.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CompileMetrics {
    /// Wall-clock time from `compile` entry to the assembled executable.
    pub total_duration: Duration,
    pub partition_duration: Duration,
    /// Sum of per-region build durations. Exceeds the wall-clock build
    /// phase when builds overlap.
    pub total_build_duration: Duration,
    /// Largest per-build device high-water mark.
    pub peak_device_bytes: u64,
    pub num_regions: usize,
    pub num_accelerator_regions: usize,
    pub num_operators: usize,
    pub num_accelerator_operators: usize,
    /// Per-region builds, in region order.
    pub region_builds: Vec<RegionBuildMetrics>,
}

impl CompileMetrics {
    pub fn new(num_regions: usize, num_operators: usize) -> Self {
        Self {
            total_duration: Duration::ZERO,
            partition_duration: Duration::ZERO,
            total_build_duration: Duration::ZERO,
            peak_device_bytes: 0,
            num_regions,
            num_accelerator_regions: 0,
            num_operators,
            num_accelerator_operators: 0,
            region_builds: Vec::new(),
        }
    }

    /// Records one finished build. Call in region order.
    pub fn record_build(&mut self, num_operators: usize, report: &BuildReport) {
        self.total_build_duration += report.duration;
        self.peak_device_bytes = self.peak_device_bytes.max(report.peak_device_bytes);
        self.num_accelerator_regions += 1;
        self.num_accelerator_operators += num_operators;
        self.region_builds.push(RegionBuildMetrics {
            region: report.region,
            num_operators,
            build_duration: report.duration,
            engine_bytes: report.engine_bytes,
            peak_device_bytes: report.peak_device_bytes,
        });
    }

    pub fn finalise(&mut self, partition: Duration, total: Duration) {
        self.partition_duration = partition;
        self.total_duration = total;
    }

    /// Fraction of operators placed on the accelerator, in `[0, 1]`.
    pub fn accelerator_coverage(&self) -> f64 {
        if self.num_operators == 0 {
            return 0.0;
        }
        self.num_accelerator_operators as f64 / self.num_operators as f64
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let peak_mb = self.peak_device_bytes as f64 / (1024.0 * 1024.0);
        format!(
            "Compile: {:.2}ms total, {:.2}ms partitioning, {} regions ({} built, {:.2}ms build time), \
             {}/{} operators on accelerator ({:.0}%), peak {:.2} MB device memory",
            self.total_duration.as_secs_f64() * 1000.0,
            self.partition_duration.as_secs_f64() * 1000.0,
            self.num_regions,
            self.num_accelerator_regions,
            self.total_build_duration.as_secs_f64() * 1000.0,
            self.num_accelerator_operators,
            self.num_operators,
            self.accelerator_coverage() * 100.0,
            peak_mb,
        )
    }
}
