// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Partition → concurrent build → assemble.
//!
//! ```text
//!   ComputeGraph + CompilationSettings
//!       │  Partitioner::partition            (one pass, on the caller's task)
//!       ▼
//!   PartitionPlan ──► region 0 ─┐
//!                 ──► region 2 ─┼─ spawn_blocking builds, ≤ max_parallel_builds
//!                 ──► region 4 ─┘  (serialised per device if the backend
//!       │                           is not thread-safe)
//!       ▼
//!   HybridExecutable              (regions in plan order, wiring unchanged)
//! ```
//!
//! The first failed build cancels the shared token; the remaining builds
//! stop at their next checkpoint and are drained before `compile` returns,
//! so no build outlives the call that started it.

use crate::{CompileError, CompileMetrics, ExecutableSegment, HybridExecutable, OrchestratorConfig};
use compile_settings::{CompilationSettings, DeviceKey};
use engine_builder::{
    AcceleratorBackend, BuildBudget, CompiledArtifact, EngineBuilder,
};
use graph_ir::{graph::Validated, ComputeGraph};
use partition_planner::{OperatorSupport, PartitionPlan, Partitioner};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

type BuildOutcome = (usize, Result<CompiledArtifact, CompileError>);

/// Drives one compile from graph to [`HybridExecutable`].
///
/// An orchestrator may be shared across concurrent `compile` calls; the
/// per-device locks used for non-thread-safe backends are shared by all of
/// them.
pub struct Orchestrator {
    partitioner: Partitioner,
    builder: EngineBuilder,
    config: OrchestratorConfig,
    device_locks: std::sync::Mutex<HashMap<DeviceKey, Arc<Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        support: Arc<dyn OperatorSupport>,
        backend: Arc<dyn AcceleratorBackend>,
        config: OrchestratorConfig,
    ) -> Result<Self, CompileError> {
        config.validate()?;
        tracing::info!(
            "orchestrator created: backend '{}' ({}), oracle '{}', {} parallel builds",
            backend.name(),
            if backend.is_thread_safe() { "thread-safe" } else { "serialised per device" },
            support.name(),
            config.resolve_parallelism()
        );
        Ok(Self {
            partitioner: Partitioner::new(support),
            builder: EngineBuilder::new(backend),
            config,
            device_locks: std::sync::Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Partitions without building. Applies the same arity check as
    /// [`compile`](Self::compile).
    pub fn plan(
        &self,
        graph: &ComputeGraph<Validated>,
        settings: &CompilationSettings,
    ) -> Result<PartitionPlan, CompileError> {
        check_arity(graph, settings)?;
        Ok(self.partitioner.partition(graph, settings)?)
    }

    /// Compiles `graph` with a fresh cancellation token.
    pub async fn compile(
        &self,
        graph: Arc<ComputeGraph<Validated>>,
        settings: Arc<CompilationSettings>,
    ) -> Result<HybridExecutable, CompileError> {
        self.compile_with_cancel(graph, settings, CancellationToken::new())
            .await
    }

    /// Compiles `graph`, stopping early once `cancel` fires.
    pub async fn compile_with_cancel(
        &self,
        graph: Arc<ComputeGraph<Validated>>,
        settings: Arc<CompilationSettings>,
        cancel: CancellationToken,
    ) -> Result<HybridExecutable, CompileError> {
        let start = Instant::now();

        let plan = self.plan(&graph, &settings)?;
        let partition_duration = start.elapsed();

        let mut built = self.build_all(&graph, &settings, &plan, &cancel).await?;

        let mut metrics = CompileMetrics::new(plan.num_regions(), plan.num_operators);
        let mut segments = Vec::with_capacity(plan.num_regions());
        for region in &plan.regions {
            let artifact = if region.is_accelerator() {
                let artifact = built.remove(&region.index).ok_or_else(|| {
                    CompileError::Worker(format!("no artifact returned for region {}", region.index))
                })?;
                if let Some(engine) = artifact.engine() {
                    metrics.record_build(region.num_operators(), &engine.report);
                }
                artifact
            } else {
                CompiledArtifact::interpreted(region)
            };
            segments.push(ExecutableSegment::new(region, artifact));
        }
        metrics.finalise(partition_duration, start.elapsed());

        let executable = HybridExecutable {
            graph_name: graph.name.clone(),
            inputs: graph.inputs.clone(),
            outputs: graph.outputs.clone(),
            segments,
            metrics,
        };
        executable.validate()?;
        tracing::info!("{}", executable.metrics.summary());
        Ok(executable)
    }

    async fn build_all(
        &self,
        graph: &Arc<ComputeGraph<Validated>>,
        settings: &Arc<CompilationSettings>,
        plan: &PartitionPlan,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<usize, CompiledArtifact>, CompileError> {
        let token = cancel.child_token();
        let permits = Arc::new(Semaphore::new(self.config.resolve_parallelism()));
        let device_lock = if self.builder.backend().is_thread_safe() {
            None
        } else {
            Some(self.device_lock(settings.device().key())?)
        };
        let timeout = self.config.build_timeout();

        let mut tasks: JoinSet<BuildOutcome> = JoinSet::new();
        for region in plan.accelerator_regions() {
            let region = region.clone();
            let graph = Arc::clone(graph);
            let settings = Arc::clone(settings);
            let builder = self.builder.clone();
            let permits = Arc::clone(&permits);
            let device_lock = device_lock.clone();
            let token = token.clone();

            tasks.spawn(async move {
                let index = region.index;
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (index, Err(CompileError::Worker("build semaphore closed".into())));
                };
                let _device = match device_lock {
                    Some(lock) => Some(lock.lock_owned().await),
                    None => None,
                };

                let mut budget = BuildBudget::unbounded().with_token(token);
                if let Some(timeout) = timeout {
                    budget.deadline = Some(Instant::now() + timeout);
                }
                tracing::debug!("region {} build starting", index);
                let joined = tokio::task::spawn_blocking(move || {
                    builder.build(&graph, &region, &settings, &budget)
                })
                .await;
                let outcome = match joined {
                    Ok(result) => result.map_err(CompileError::from),
                    Err(e) => Err(CompileError::Worker(format!("region {index}: {e}"))),
                };
                (index, outcome)
            });
        }

        let mut built = BTreeMap::new();
        let mut first_error: Option<CompileError> = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok((index, outcome)) => outcome.map(|artifact| (index, artifact)),
                Err(e) => Err(CompileError::Worker(e.to_string())),
            };
            match outcome {
                Ok((index, artifact)) => {
                    built.insert(index, artifact);
                }
                Err(e) => {
                    if first_error.is_none() {
                        tracing::warn!("{e}; cancelling remaining builds");
                        token.cancel();
                        first_error = Some(e);
                    } else {
                        tracing::debug!("discarding follow-on error: {e}");
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(built),
        }
    }

    fn device_lock(&self, key: DeviceKey) -> Result<Arc<Mutex<()>>, CompileError> {
        let mut locks = self
            .device_locks
            .lock()
            .map_err(|_| CompileError::Worker("device lock table poisoned".into()))?;
        Ok(Arc::clone(locks.entry(key).or_default()))
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("builder", &self.builder)
            .field("oracle", &self.partitioner.support().name())
            .field("config", &self.config)
            .finish()
    }
}

/// Rejects settings whose input specs do not match the graph's inputs
/// one-for-one.
pub fn check_arity(
    graph: &ComputeGraph<Validated>,
    settings: &CompilationSettings,
) -> Result<(), CompileError> {
    if settings.inputs().len() != graph.inputs.len() {
        return Err(CompileError::InputArity {
            graph: graph.name.clone(),
            expected: graph.inputs.len(),
            actual: settings.inputs().len(),
        });
    }
    Ok(())
}
