// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Region → engine builds.

use crate::{
    lower, AcceleratorBackend, BackendError, BackendSettings, BuildBudget, BuildCancelled,
    BuildContext, BuildError, EngineBuildError, NetworkInput,
};
use compile_settings::CompilationSettings;
use device_memory::{DeviceArena, MemoryBudget};
use graph_ir::{graph::Validated, ComputeGraph};
use partition_planner::Region;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ── Artifacts ─────────────────────────────────────────────────────────────

/// What one engine build cost.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BuildReport {
    pub region: usize,
    pub backend: String,
    pub network: String,
    pub duration: Duration,
    pub engine_bytes: usize,
    pub peak_device_bytes: u64,
    pub reservations: u64,
    pub inputs: Vec<NetworkInput>,
}

/// A serialized engine and its build report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineArtifact {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub report: BuildReport,
}

/// The compiled form of one region.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CompiledArtifact {
    /// An accelerator region built by the backend.
    Engine(EngineArtifact),
    /// A general-executor region, run by the interpreter from the original
    /// operators.
    Interpreted {
        region: usize,
        operators: Vec<usize>,
        operator_names: Vec<String>,
    },
}

impl CompiledArtifact {
    /// Artifact for a region that stays on the general executor.
    pub fn interpreted(region: &Region) -> Self {
        CompiledArtifact::Interpreted {
            region: region.index,
            operators: region.operators.clone(),
            operator_names: region.operator_names.clone(),
        }
    }

    pub fn engine(&self) -> Option<&EngineArtifact> {
        match self {
            CompiledArtifact::Engine(e) => Some(e),
            CompiledArtifact::Interpreted { .. } => None,
        }
    }

    pub fn is_engine(&self) -> bool {
        self.engine().is_some()
    }
}

// ── Builder ───────────────────────────────────────────────────────────────

/// Builds accelerator regions through an [`AcceleratorBackend`].
///
/// Each build gets a [`DeviceArena`] bounded by the settings' workspace
/// size; every reservation made through the [`BuildContext`] is released
/// before `build` returns, on success, failure and cancellation alike.
#[derive(Clone)]
pub struct EngineBuilder {
    backend: Arc<dyn AcceleratorBackend>,
}

impl EngineBuilder {
    pub fn new(backend: Arc<dyn AcceleratorBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn AcceleratorBackend> {
        &self.backend
    }

    /// Builds `region` in a fresh arena named after the target device.
    pub fn build(
        &self,
        graph: &ComputeGraph<Validated>,
        region: &Region,
        settings: &CompilationSettings,
        budget: &BuildBudget,
    ) -> Result<CompiledArtifact, BuildError> {
        let arena = DeviceArena::new(
            settings.device().key().to_string(),
            MemoryBudget::from_workspace_size(settings.workspace_size()),
        );
        self.build_in(graph, region, settings, budget, &arena)
    }

    /// Builds `region` with reservations accounted in `arena`.
    pub fn build_in(
        &self,
        graph: &ComputeGraph<Validated>,
        region: &Region,
        settings: &CompilationSettings,
        budget: &BuildBudget,
        arena: &DeviceArena,
    ) -> Result<CompiledArtifact, BuildError> {
        let network = lower(graph, region, settings)?;
        budget.check().map_err(|cause| BuildCancelled {
            region: region.index,
            cause,
        })?;

        let backend_settings = BackendSettings::from(settings);
        let before = arena.stats();
        let start = Instant::now();
        tracing::debug!(
            "Building region {} ({} layers) with backend '{}' on {}",
            region.index,
            network.num_layers(),
            self.backend.name(),
            arena.device()
        );

        let result = {
            let mut ctx = BuildContext::new(region.index, arena, budget);
            self.backend.build_engine(&network, &backend_settings, &mut ctx)
        };
        let duration = start.elapsed();
        let after = arena.stats();

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(BackendError::Interrupted(cause)) => {
                tracing::debug!("Region {} build stopped: {}", region.index, cause);
                return Err(BuildCancelled {
                    region: region.index,
                    cause,
                }
                .into());
            }
            Err(e) => {
                tracing::debug!("Region {} build failed: {}", region.index, e);
                return Err(EngineBuildError::Backend {
                    region: region.index,
                    backend: self.backend.name().to_string(),
                    diagnostic: e.to_string(),
                }
                .into());
            }
        };

        let report = BuildReport {
            region: region.index,
            backend: self.backend.name().to_string(),
            network: network.name.clone(),
            duration,
            engine_bytes: bytes.len(),
            peak_device_bytes: after.peak_live_bytes,
            reservations: after.reservations - before.reservations,
            inputs: network.inputs,
        };
        tracing::debug!(
            "Region {} built in {:.2?}: {} byte engine, peak {} device bytes",
            region.index,
            duration,
            report.engine_bytes,
            report.peak_device_bytes
        );
        Ok(CompiledArtifact::Engine(EngineArtifact { bytes, report }))
    }
}

impl std::fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CancelCause, ReferenceBackend};
    use compile_settings::FallbackPolicy;
    use graph_ir::Operator;
    use partition_planner::{partition, PartitionPlan, SupportTable};
    use tensor_spec::{DType, ShapeSpec, TensorFormat};

    fn graph(kinds: &[&str]) -> ComputeGraph<Validated> {
        let ops = kinds
            .iter()
            .enumerate()
            .map(|(i, k)| {
                let input = if i == 0 { "x".to_string() } else { format!("t{}", i - 1) };
                Operator::new(i, format!("op{i}"), *k)
                    .with_inputs([input])
                    .with_outputs([format!("t{i}")])
            })
            .collect();
        let out = format!("t{}", kinds.len() - 1);
        ComputeGraph::new("chain".into(), vec!["x".into()], ops, vec![out])
            .validate()
            .unwrap()
    }

    fn settings(workspace: i64, excluded: &[&str]) -> CompilationSettings {
        CompilationSettings::builder()
            .input(
                ShapeSpec::dynamic(
                    vec![1, 3, 16, 16],
                    vec![2, 3, 32, 32],
                    vec![4, 3, 64, 64],
                    DType::Float,
                    TensorFormat::Contiguous,
                )
                .unwrap(),
            )
            .workspace_size(workspace)
            .fallback(
                FallbackPolicy::new(true, 1, excluded.iter().copied(), Vec::<String>::new())
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn plan(g: &ComputeGraph<Validated>, s: &CompilationSettings) -> PartitionPlan {
        partition(g, s, &SupportTable::accept_all()).unwrap()
    }

    #[test]
    fn test_build_produces_engine_with_dynamic_profile() {
        let g = graph(&["aten::conv2d", "aten::relu", "aten::add"]);
        let s = settings(0, &[]);
        let p = plan(&g, &s);
        let backend = Arc::new(ReferenceBackend::new().with_layer_workspace(256));
        let builder = EngineBuilder::new(backend);

        let artifact = builder
            .build(&g, &p.regions[0], &s, &BuildBudget::unbounded())
            .unwrap();
        let engine = artifact.engine().unwrap();
        assert!(!engine.bytes.is_empty());
        assert_eq!(engine.report.engine_bytes, engine.bytes.len());
        assert_eq!(engine.report.peak_device_bytes, 3 * 256);
        assert_eq!(engine.report.reservations, 3);
        let profile = engine.report.inputs[0].profile().unwrap();
        assert!(!profile.is_static());
        assert_eq!(profile.opt, vec![2, 3, 32, 32]);
    }

    #[test]
    fn test_general_region_is_not_buildable() {
        let g = graph(&["aten::conv2d", "custom::nms"]);
        let s = settings(0, &["custom::nms"]);
        let p = plan(&g, &s);
        let builder = EngineBuilder::new(Arc::new(ReferenceBackend::new()));

        let err = builder
            .build(&g, &p.regions[1], &s, &BuildBudget::unbounded())
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::Failed(EngineBuildError::NotAcceleratorRegion { region: 1 })
        );
        assert!(!CompiledArtifact::interpreted(&p.regions[1]).is_engine());
    }

    #[test]
    fn test_backend_failure_carries_diagnostic() {
        let g = graph(&["aten::conv2d", "aten::grid_sample"]);
        let s = settings(0, &[]);
        let p = plan(&g, &s);
        let builder =
            EngineBuilder::new(Arc::new(ReferenceBackend::new().rejecting(["aten::grid_sample"])));

        let err = builder
            .build(&g, &p.regions[0], &s, &BuildBudget::unbounded())
            .unwrap_err();
        match err {
            BuildError::Failed(EngineBuildError::Backend {
                region,
                backend,
                diagnostic,
            }) => {
                assert_eq!(region, 0);
                assert_eq!(backend, "reference");
                assert!(diagnostic.contains("aten::grid_sample"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cancel_before_build_allocates_nothing() {
        let g = graph(&["aten::conv2d"]);
        let s = settings(0, &[]);
        let p = plan(&g, &s);
        let backend = Arc::new(ReferenceBackend::new().with_layer_workspace(64));
        let builder = EngineBuilder::new(backend.clone());
        let arena = DeviceArena::new("gpu0", MemoryBudget::Unlimited);
        let budget = BuildBudget::unbounded();
        budget.cancel.cancel();

        let err = builder
            .build_in(&g, &p.regions[0], &s, &budget, &arena)
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::Cancelled(BuildCancelled {
                region: 0,
                cause: CancelCause::Cancelled
            })
        );
        assert_eq!(arena.live_bytes(), 0);
        assert_eq!(arena.stats().reservations, 0);
        assert_eq!(backend.completed_builds(), 0);
    }

    #[test]
    fn test_cancel_during_build_releases_partial_allocations() {
        let g = graph(&["a", "b", "c", "d", "e", "f", "g", "h"]);
        let s = settings(0, &[]);
        let p = plan(&g, &s);
        let backend = Arc::new(
            ReferenceBackend::new()
                .with_layer_workspace(1024)
                .with_layer_delay(Duration::from_millis(20)),
        );
        let builder = EngineBuilder::new(backend);
        let arena = DeviceArena::new("gpu0", MemoryBudget::Unlimited);
        let budget = BuildBudget::unbounded();

        let canceller = {
            let token = budget.cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                token.cancel();
            })
        };
        let err = builder
            .build_in(&g, &p.regions[0], &s, &budget, &arena)
            .unwrap_err();
        canceller.join().unwrap();

        assert!(err.is_cancelled());
        assert_eq!(arena.live_bytes(), 0);
        let stats = arena.stats();
        assert!(stats.reservations >= 1);
        assert_eq!(stats.outstanding(), 0);
    }

    #[test]
    fn test_expired_deadline_is_reported() {
        let g = graph(&["aten::conv2d"]);
        let s = settings(0, &[]);
        let p = plan(&g, &s);
        let builder = EngineBuilder::new(Arc::new(ReferenceBackend::new()));
        let err = builder
            .build(&g, &p.regions[0], &s, &BuildBudget::with_timeout(Duration::ZERO))
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::Cancelled(BuildCancelled {
                region: 0,
                cause: CancelCause::DeadlineExceeded
            })
        );
    }

    #[test]
    fn test_workspace_budget_bounds_the_build() {
        let g = graph(&["a", "b", "c"]);
        let s = settings(1000, &[]);
        let p = plan(&g, &s);
        let builder =
            EngineBuilder::new(Arc::new(ReferenceBackend::new().with_layer_workspace(400)));
        let err = builder
            .build(&g, &p.regions[0], &s, &BuildBudget::unbounded())
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Failed(EngineBuildError::Backend { .. })
        ));
        assert!(err.to_string().contains("out of memory"));
    }
}
