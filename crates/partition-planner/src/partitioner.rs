// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fallback-aware graph segmentation.
//!
//! # Algorithm
//!
//! 1. Walk the operators in topological order and classify each one as
//!    accelerator-eligible or not. An operator is ineligible if its kind is
//!    an excluded operator, any module on its `module_path` is an excluded
//!    module, or the support oracle rejects it under the settings' lowering
//!    mode.
//! 2. With fallback disabled, the first ineligible operator fails the whole
//!    graph; otherwise the graph is one accelerator region.
//! 3. Merge consecutive operators with equal eligibility into runs.
//! 4. Demote accelerator runs shorter than `min_region_size` and merge them
//!    with neighbouring general-executor runs.
//! 5. Compute each region's boundary tensors from the graph's dataflow.
//!
//! The partitioner is a pure function of graph, settings and oracle.

use crate::plan::PlanBuilder;
use crate::{FallbackReason, OperatorSupport, PartitionError, PartitionPlan, RegionTarget, Support};
use compile_settings::{CompilationSettings, FallbackPolicy, LoweringMode};
use graph_ir::graph::Validated;
use graph_ir::{ComputeGraph, Operator};
use std::collections::HashSet;
use std::sync::Arc;

/// Splits validated graphs into accelerator and general-executor regions.
#[derive(Clone)]
pub struct Partitioner {
    support: Arc<dyn OperatorSupport>,
}

/// A maximal run of operators sharing one target, before boundary analysis.
#[derive(Debug)]
struct Run {
    target: RegionTarget,
    start: usize,
    end: usize,
    reasons: Vec<FallbackReason>,
}

impl Run {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

impl Partitioner {
    pub fn new(support: Arc<dyn OperatorSupport>) -> Self {
        Self { support }
    }

    /// The support oracle in use.
    pub fn support(&self) -> &dyn OperatorSupport {
        self.support.as_ref()
    }

    /// Partitions `graph` according to the fallback policy and lowering mode
    /// carried by `settings`.
    pub fn partition(
        &self,
        graph: &ComputeGraph<Validated>,
        settings: &CompilationSettings,
    ) -> Result<PartitionPlan, PartitionError> {
        if graph.num_operators() == 0 {
            return Err(PartitionError::EmptyGraph);
        }

        let policy = settings.fallback();
        let lowering = settings.lowering();

        let verdicts: Vec<Option<FallbackReason>> = graph
            .iter_operators()
            .map(|op| self.classify(op, policy, lowering))
            .collect();

        let runs = if policy.enabled() {
            let runs = merge_runs(&verdicts);
            enforce_min_region_size(runs, policy.min_region_size())
        } else {
            if let Some((op, reason)) = graph
                .iter_operators()
                .zip(&verdicts)
                .find_map(|(op, v)| v.as_ref().map(|r| (op, r)))
            {
                return Err(PartitionError::UnsupportedGraph {
                    operator: op.name.clone(),
                    kind: op.kind.clone(),
                    reason: reason.to_string(),
                });
            }
            vec![Run {
                target: RegionTarget::Accelerator,
                start: 0,
                end: graph.num_operators(),
                reasons: Vec::new(),
            }]
        };

        let mut builder = PlanBuilder::new(&graph.name, graph.num_operators());
        for run in runs {
            let operators: Vec<usize> = (run.start..run.end).collect();
            let names = graph.operators[run.start..run.end]
                .iter()
                .map(|op| op.name.clone())
                .collect();
            let boundary = region_boundary(graph, run.start, run.end);
            tracing::debug!(
                "region {:?} ops {}..{}: {} in, {} out",
                run.target,
                run.start,
                run.end,
                boundary.0.len(),
                boundary.1.len()
            );
            builder.add_region(run.target, operators, names, boundary, run.reasons);
        }

        let plan = builder.build();
        plan.validate()?;
        tracing::info!("{} (oracle: {})", plan.summary(), self.support.name());
        Ok(plan)
    }

    /// Returns `None` if the operator is accelerator-eligible, otherwise the
    /// first reason it is not.
    fn classify(
        &self,
        op: &Operator,
        policy: &FallbackPolicy,
        lowering: LoweringMode,
    ) -> Option<FallbackReason> {
        if policy.excludes_operator(&op.kind) {
            return Some(FallbackReason::ExcludedOperator);
        }
        if let Some(module) = op
            .module_path
            .iter()
            .find(|m| policy.excluded_modules().contains(*m))
        {
            return Some(FallbackReason::ExcludedModule {
                module: module.clone(),
            });
        }
        match self.support.classify(op, lowering) {
            Support::Convertible => None,
            Support::Unsupported { reason } => Some(FallbackReason::Unsupported { reason }),
        }
    }
}

impl std::fmt::Debug for Partitioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partitioner")
            .field("support", &self.support.name())
            .finish()
    }
}

/// Groups consecutive operators with equal eligibility.
fn merge_runs(verdicts: &[Option<FallbackReason>]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (i, verdict) in verdicts.iter().enumerate() {
        let target = match verdict {
            None => RegionTarget::Accelerator,
            Some(_) => RegionTarget::GeneralExecutor,
        };
        match runs.last_mut() {
            Some(run) if run.target == target => {
                run.end = i + 1;
                if let Some(reason) = verdict {
                    run.reasons.push(reason.clone());
                }
            }
            _ => runs.push(Run {
                target,
                start: i,
                end: i + 1,
                reasons: verdict.iter().cloned().collect(),
            }),
        }
    }
    runs
}

/// Demotes short accelerator runs and coalesces adjacent general runs.
fn enforce_min_region_size(runs: Vec<Run>, min_region_size: usize) -> Vec<Run> {
    let mut out: Vec<Run> = Vec::with_capacity(runs.len());
    for mut run in runs {
        if run.target == RegionTarget::Accelerator && run.len() < min_region_size {
            tracing::debug!(
                "demoting accelerator run {}..{} ({} < {min_region_size})",
                run.start,
                run.end,
                run.len()
            );
            let reason = FallbackReason::BelowMinRegionSize {
                run_len: run.len(),
                min_region_size,
            };
            run.reasons = vec![reason; run.len()];
            run.target = RegionTarget::GeneralExecutor;
        }
        match out.last_mut() {
            Some(prev) if prev.target == run.target => {
                prev.end = run.end;
                prev.reasons.append(&mut run.reasons);
            }
            _ => out.push(run),
        }
    }
    out
}

/// Boundary tensors of operators `start..end`: inputs read but produced
/// outside the range, and outputs still live after the range.
fn region_boundary(
    graph: &ComputeGraph<Validated>,
    start: usize,
    end: usize,
) -> (Vec<String>, Vec<String>) {
    let ops = &graph.operators[start..end];
    let last = end - 1;

    let mut seen = HashSet::new();
    let mut inputs = Vec::new();
    for op in ops {
        for t in &op.inputs {
            let produced_inside = graph
                .tensor(t)
                .and_then(|info| info.producer)
                .is_some_and(|p| p >= start && p < end);
            if !produced_inside && seen.insert(t.as_str()) {
                inputs.push(t.clone());
            }
        }
    }

    let outputs = ops
        .iter()
        .flat_map(|op| op.outputs.iter())
        .filter(|t| graph.tensor(t).is_some_and(|info| info.live_after(last)))
        .cloned()
        .collect();

    (inputs, outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SupportTable;
    use graph_ir::graph::Loaded;
    use proptest::prelude::*;
    use tensor_spec::{DType, ShapeSpec, TensorFormat};

    /// A linear chain x -> t0 -> t1 ... with the given operator kinds.
    fn chain(kinds: &[&str]) -> ComputeGraph<Validated> {
        let ops = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let input = if i == 0 { "x".to_string() } else { format!("t{}", i - 1) };
                Operator::new(i, format!("op{i}"), *kind)
                    .with_inputs([input])
                    .with_outputs([format!("t{i}")])
            })
            .collect();
        let g: ComputeGraph<Loaded> = ComputeGraph::new(
            "chain".into(),
            vec!["x".into()],
            ops,
            vec![format!("t{}", kinds.len() - 1)],
        );
        g.validate().unwrap()
    }

    fn settings(fallback: FallbackPolicy) -> CompilationSettings {
        CompilationSettings::builder()
            .input(ShapeSpec::fixed(vec![1, 8], DType::Float, TensorFormat::Contiguous).unwrap())
            .fallback(fallback)
            .build()
            .unwrap()
    }

    fn accept_all() -> Partitioner {
        Partitioner::new(Arc::new(SupportTable::accept_all()))
    }

    fn layout(plan: &PartitionPlan) -> Vec<(RegionTarget, Vec<String>)> {
        plan.regions
            .iter()
            .map(|r| (r.target, r.operator_names.clone()))
            .collect()
    }

    fn names(ns: &[&str]) -> Vec<String> {
        ns.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_excluded_operator_splits_graph() {
        // A, B, D eligible; C excluded by kind.
        let g = chain(&["k::a", "k::b", "k::c", "k::d"]);
        let s = settings(FallbackPolicy::new(true, 1, ["k::c"], Vec::<String>::new()).unwrap());
        let plan = accept_all().partition(&g, &s).unwrap();
        assert_eq!(
            layout(&plan),
            vec![
                (RegionTarget::Accelerator, names(&["op0", "op1"])),
                (RegionTarget::GeneralExecutor, names(&["op2"])),
                (RegionTarget::Accelerator, names(&["op3"])),
            ]
        );
        assert_eq!(plan.regions[1].fallback_reasons, vec![FallbackReason::ExcludedOperator]);
    }

    #[test]
    fn test_fallback_disabled_fails_on_excluded() {
        let g = chain(&["k::a", "k::b", "k::c", "k::d"]);
        let s = settings(FallbackPolicy::new(false, 1, ["k::c"], Vec::<String>::new()).unwrap());
        match accept_all().partition(&g, &s) {
            Err(PartitionError::UnsupportedGraph { operator, kind, .. }) => {
                assert_eq!(operator, "op2");
                assert_eq!(kind, "k::c");
            }
            other => panic!("expected UnsupportedGraph, got {other:?}"),
        }
    }

    #[test]
    fn test_fallback_disabled_single_region() {
        let g = chain(&["k::a", "k::b"]);
        let s = settings(FallbackPolicy::new(false, 5, Vec::<String>::new(), Vec::<String>::new()).unwrap());
        let plan = accept_all().partition(&g, &s).unwrap();
        // min_region_size is not applied without fallback.
        assert_eq!(plan.num_regions(), 1);
        assert!(plan.regions[0].is_accelerator());
        assert_eq!(plan.regions[0].inputs, names(&["x"]));
        assert_eq!(plan.regions[0].outputs, names(&["t1"]));
    }

    #[test]
    fn test_fallback_disabled_fails_on_unsupported() {
        let g = chain(&["aten::relu", "aten::scatter"]);
        let s = settings(FallbackPolicy::default());
        let p = Partitioner::new(Arc::new(SupportTable::new(["aten::relu"])));
        match p.partition(&g, &s) {
            Err(PartitionError::UnsupportedGraph { operator, reason, .. }) => {
                assert_eq!(operator, "op1");
                assert!(reason.contains("aten::scatter"));
            }
            other => panic!("expected UnsupportedGraph, got {other:?}"),
        }
    }

    #[test]
    fn test_module_exclusion_matches_any_ancestor() {
        let mut ops: Vec<Operator> = (0..3)
            .map(|i| {
                let input = if i == 0 { "x".to_string() } else { format!("t{}", i - 1) };
                Operator::new(i, format!("op{i}"), "k::a")
                    .with_inputs([input])
                    .with_outputs([format!("t{i}")])
                    .with_module_path(["Net"])
            })
            .collect();
        ops[1].module_path = names(&["Net", "Head", "Linear"]);
        let g = ComputeGraph::new("m".into(), vec!["x".into()], ops, vec!["t2".into()])
            .validate()
            .unwrap();
        let s = settings(FallbackPolicy::new(true, 1, Vec::<String>::new(), ["Head"]).unwrap());
        let plan = accept_all().partition(&g, &s).unwrap();
        assert_eq!(plan.num_regions(), 3);
        assert_eq!(
            plan.regions[1].fallback_reasons,
            vec![FallbackReason::ExcludedModule {
                module: "Head".into()
            }]
        );
    }

    #[test]
    fn test_min_region_size_demotes_and_merges() {
        // G A G A A A : the lone A is demoted and absorbed.
        let g = chain(&["k::x", "k::a", "k::x", "k::a", "k::a", "k::a"]);
        let s = settings(FallbackPolicy::new(true, 2, ["k::x"], Vec::<String>::new()).unwrap());
        let plan = accept_all().partition(&g, &s).unwrap();
        assert_eq!(
            layout(&plan),
            vec![
                (RegionTarget::GeneralExecutor, names(&["op0", "op1", "op2"])),
                (RegionTarget::Accelerator, names(&["op3", "op4", "op5"])),
            ]
        );
        assert_eq!(
            plan.regions[0].fallback_reasons[1],
            FallbackReason::BelowMinRegionSize {
                run_len: 1,
                min_region_size: 2
            }
        );
    }

    #[test]
    fn test_fully_demoted_graph() {
        let g = chain(&["k::a", "k::b"]);
        let s = settings(FallbackPolicy::enabled_with_min_size(3).unwrap());
        let plan = accept_all().partition(&g, &s).unwrap();
        assert_eq!(plan.num_regions(), 1);
        assert_eq!(plan.regions[0].target, RegionTarget::GeneralExecutor);
        assert_eq!(plan.accelerator_regions().count(), 0);
    }

    #[test]
    fn test_frozen_only_kind_ineligible_under_unfrozen_lowering() {
        let g = chain(&["aten::conv2d", "aten::batch_norm", "aten::relu"]);
        let table = SupportTable::new(["aten::conv2d", "aten::relu"])
            .with_frozen_only(["aten::batch_norm"]);
        let p = Partitioner::new(Arc::new(table));

        let fp32 = settings(FallbackPolicy::enabled_with_min_size(1).unwrap());
        assert_eq!(p.partition(&g, &fp32).unwrap().num_regions(), 1);

        let int8 = fp32.to_builder().enabled_precision(DType::Int8).build().unwrap();
        assert!(int8.lowering().unfreeze_module);
        let plan = p.partition(&g, &int8).unwrap();
        let targets: Vec<RegionTarget> = plan.regions.iter().map(|r| r.target).collect();
        assert_eq!(
            targets,
            vec![
                RegionTarget::Accelerator,
                RegionTarget::GeneralExecutor,
                RegionTarget::Accelerator
            ]
        );
    }

    #[test]
    fn test_boundaries_with_skip_connection() {
        // op0: x -> a ; op1: a -> b ; op2 (excluded): b -> c ; op3: a,c -> y
        let ops = vec![
            Operator::new(0, "op0", "k::a").with_inputs(["x"]).with_outputs(["a"]),
            Operator::new(1, "op1", "k::a").with_inputs(["a"]).with_outputs(["b"]),
            Operator::new(2, "op2", "k::x").with_inputs(["b"]).with_outputs(["c"]),
            Operator::new(3, "op3", "k::a").with_inputs(["a", "c"]).with_outputs(["y"]),
        ];
        let g = ComputeGraph::new("skip".into(), vec!["x".into()], ops, vec!["y".into()])
            .validate()
            .unwrap();
        let s = settings(FallbackPolicy::new(true, 1, ["k::x"], Vec::<String>::new()).unwrap());
        let plan = accept_all().partition(&g, &s).unwrap();

        assert_eq!(plan.regions[0].inputs, names(&["x"]));
        assert_eq!(plan.regions[0].outputs, names(&["a", "b"]));
        assert_eq!(plan.regions[1].inputs, names(&["b"]));
        assert_eq!(plan.regions[1].outputs, names(&["c"]));
        assert_eq!(plan.regions[2].inputs, names(&["a", "c"]));
        assert_eq!(plan.regions[2].outputs, names(&["y"]));
    }

    #[test]
    fn test_partition_is_deterministic() {
        let g = chain(&["k::a", "k::x", "k::a", "k::a", "k::x"]);
        let s = settings(FallbackPolicy::new(true, 2, ["k::x"], Vec::<String>::new()).unwrap());
        let p = accept_all();
        assert_eq!(p.partition(&g, &s).unwrap(), p.partition(&g, &s).unwrap());
    }

    // ── Properties ─────────────────────────────────────────────────

    proptest! {
        #[test]
        fn prop_regions_cover_graph_exactly_once(
            excluded in proptest::collection::vec(any::<bool>(), 1..40),
            min_size in 1i64..6,
        ) {
            let kinds: Vec<&str> = excluded.iter().map(|&e| if e { "k::x" } else { "k::a" }).collect();
            let g = chain(&kinds);
            let s = settings(FallbackPolicy::new(true, min_size, ["k::x"], Vec::<String>::new()).unwrap());
            let plan = accept_all().partition(&g, &s).unwrap();

            let flat: Vec<usize> = plan.regions.iter().flat_map(|r| r.operators.iter().copied()).collect();
            prop_assert_eq!(flat, (0..kinds.len()).collect::<Vec<_>>());

            for r in plan.accelerator_regions() {
                prop_assert!(r.num_operators() >= min_size as usize);
            }
            for r in plan.regions.iter().filter(|r| r.is_accelerator()) {
                for &i in &r.operators {
                    prop_assert!(!excluded[i]);
                }
            }
        }

        #[test]
        fn prop_partition_idempotent(
            excluded in proptest::collection::vec(any::<bool>(), 1..30),
            min_size in 1i64..4,
        ) {
            let kinds: Vec<&str> = excluded.iter().map(|&e| if e { "k::x" } else { "k::a" }).collect();
            let g = chain(&kinds);
            let s = settings(FallbackPolicy::new(true, min_size, ["k::x"], Vec::<String>::new()).unwrap());
            let p = accept_all();
            prop_assert_eq!(p.partition(&g, &s).unwrap(), p.partition(&g, &s).unwrap());
        }
    }
}
