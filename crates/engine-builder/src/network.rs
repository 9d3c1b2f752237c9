// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lowering of an accelerator region into the backend's network form.
//!
//! The backend never sees the full graph, only the operators of one region
//! and the boundary tensors that connect it to its neighbours. Region inputs
//! that are graph inputs are bound to the user's [`ShapeSpec`]; every other
//! boundary tensor is produced by an earlier region and its shape is left
//! for the backend to infer.

use crate::EngineBuildError;
use compile_settings::CompilationSettings;
use graph_ir::{graph::Validated, ComputeGraph};
use partition_planner::Region;
use tensor_spec::{render_dims, DType, ShapeSpec, TensorFormat};

// ── Shapes ────────────────────────────────────────────────────────────────

/// Min/opt/max binding for one network input.
///
/// Static inputs collapse to `min == opt == max`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OptimizationProfile {
    pub min: Vec<i64>,
    pub opt: Vec<i64>,
    pub max: Vec<i64>,
    pub dtype: DType,
    pub format: TensorFormat,
}

impl OptimizationProfile {
    pub fn from_spec(spec: &ShapeSpec) -> Self {
        Self {
            min: spec.min().to_vec(),
            opt: spec.opt().to_vec(),
            max: spec.max().to_vec(),
            dtype: spec.dtype(),
            format: spec.format(),
        }
    }

    /// True when the profile admits exactly one shape.
    pub fn is_static(&self) -> bool {
        self.min == self.opt && self.opt == self.max
    }

    pub fn summary(&self) -> String {
        if self.is_static() {
            format!("{} {}", render_dims(&self.opt), self.dtype)
        } else {
            format!(
                "{}..{}..{} {}",
                render_dims(&self.min),
                render_dims(&self.opt),
                render_dims(&self.max),
                self.dtype
            )
        }
    }
}

/// How a network input obtains its shape.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum InputBinding {
    /// A graph input bound to the caller's shape descriptor.
    Profile(OptimizationProfile),
    /// An interior tensor whose shape the backend infers.
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NetworkInput {
    pub name: String,
    pub binding: InputBinding,
}

impl NetworkInput {
    pub fn profile(&self) -> Option<&OptimizationProfile> {
        match &self.binding {
            InputBinding::Profile(p) => Some(p),
            InputBinding::Inferred => None,
        }
    }
}

// ── Network ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BackendLayer {
    pub name: String,
    pub kind: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// The backend-facing form of one accelerator region.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BackendNetwork {
    pub region: usize,
    pub name: String,
    pub layers: Vec<BackendLayer>,
    pub inputs: Vec<NetworkInput>,
    pub outputs: Vec<String>,
}

impl BackendNetwork {
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Inputs bound to an optimisation profile, in input order.
    pub fn profiles(&self) -> impl Iterator<Item = (&str, &OptimizationProfile)> {
        self.inputs
            .iter()
            .filter_map(|i| i.profile().map(|p| (i.name.as_str(), p)))
    }

    pub fn has_dynamic_inputs(&self) -> bool {
        self.profiles().any(|(_, p)| !p.is_static())
    }
}

/// Lowers `region` of `graph` into a [`BackendNetwork`].
///
/// Graph inputs are matched to `settings.inputs()` by position in
/// `graph.inputs`.
pub fn lower(
    graph: &ComputeGraph<Validated>,
    region: &Region,
    settings: &CompilationSettings,
) -> Result<BackendNetwork, EngineBuildError> {
    if !region.is_accelerator() {
        return Err(EngineBuildError::NotAcceleratorRegion {
            region: region.index,
        });
    }

    let mut layers = Vec::with_capacity(region.num_operators());
    for &idx in &region.operators {
        let op = graph.operator(idx).ok_or_else(|| EngineBuildError::Lowering {
            region: region.index,
            detail: format!(
                "operator index {} out of range for graph '{}' ({} operators)",
                idx,
                graph.name,
                graph.num_operators()
            ),
        })?;
        layers.push(BackendLayer {
            name: op.name.clone(),
            kind: op.kind.clone(),
            inputs: op.inputs.clone(),
            outputs: op.outputs.clone(),
        });
    }

    let mut inputs = Vec::with_capacity(region.inputs.len());
    for name in &region.inputs {
        let binding = match graph.inputs.iter().position(|g| g == name) {
            Some(pos) => {
                let spec = settings.inputs().get(pos).ok_or_else(|| EngineBuildError::Lowering {
                    region: region.index,
                    detail: format!(
                        "graph input '{}' is input #{} but only {} input specs were given",
                        name,
                        pos,
                        settings.inputs().len()
                    ),
                })?;
                InputBinding::Profile(OptimizationProfile::from_spec(spec))
            }
            None => InputBinding::Inferred,
        };
        inputs.push(NetworkInput {
            name: name.clone(),
            binding,
        });
    }

    let network = BackendNetwork {
        region: region.index,
        name: format!("{}.region{}", graph.name, region.index),
        layers,
        inputs,
        outputs: region.outputs.clone(),
    };
    tracing::debug!(
        "Lowered region {} to '{}': {} layers, {} inputs ({} profiled), {} outputs",
        region.index,
        network.name,
        network.num_layers(),
        network.inputs.len(),
        network.profiles().count(),
        network.outputs.len()
    );
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compile_settings::FallbackPolicy;
    use graph_ir::Operator;
    use partition_planner::{partition, RegionTarget, SupportTable};

    fn graph() -> ComputeGraph<Validated> {
        let ops = vec![
            Operator::new(0, "conv", "aten::conv2d")
                .with_inputs(["x"])
                .with_outputs(["a"]),
            Operator::new(1, "nms", "custom::nms")
                .with_inputs(["a"])
                .with_outputs(["b"]),
            Operator::new(2, "add", "aten::add")
                .with_inputs(["b", "mask"])
                .with_outputs(["y"]),
        ];
        ComputeGraph::new(
            "det".into(),
            vec!["x".into(), "mask".into()],
            ops,
            vec!["y".into()],
        )
        .validate()
        .unwrap()
    }

    fn settings() -> CompilationSettings {
        CompilationSettings::builder()
            .input(
                ShapeSpec::dynamic(
                    vec![1, 3, 32, 32],
                    vec![4, 3, 64, 64],
                    vec![8, 3, 128, 128],
                    DType::Float,
                    TensorFormat::Contiguous,
                )
                .unwrap(),
            )
            .input(ShapeSpec::fixed(vec![1, 16], DType::Bool, TensorFormat::Contiguous).unwrap())
            .fallback(FallbackPolicy::new(true, 1, ["custom::nms"], Vec::<String>::new()).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_graph_inputs_bind_to_specs_by_position() {
        let g = graph();
        let s = settings();
        let plan = partition(&g, &s, &SupportTable::accept_all()).unwrap();
        assert_eq!(plan.num_regions(), 3);

        let first = lower(&g, &plan.regions[0], &s).unwrap();
        assert_eq!(first.name, "det.region0");
        assert_eq!(first.inputs.len(), 1);
        let profile = first.inputs[0].profile().unwrap();
        assert_eq!(profile.min, vec![1, 3, 32, 32]);
        assert_eq!(profile.max, vec![8, 3, 128, 128]);
        assert!(first.has_dynamic_inputs());
        assert_eq!(first.outputs, vec!["a".to_string()]);
    }

    #[test]
    fn test_interior_boundary_is_inferred() {
        let g = graph();
        let s = settings();
        let plan = partition(&g, &s, &SupportTable::accept_all()).unwrap();
        let last = lower(&g, &plan.regions[2], &s).unwrap();

        assert_eq!(last.inputs[0].name, "b");
        assert_eq!(last.inputs[0].binding, InputBinding::Inferred);
        assert_eq!(last.inputs[1].name, "mask");
        let mask = last.inputs[1].profile().unwrap();
        assert!(mask.is_static());
        assert_eq!(mask.min, mask.max);
        assert_eq!(mask.dtype, DType::Bool);
        assert!(!last.has_dynamic_inputs());
    }

    #[test]
    fn test_general_region_is_rejected() {
        let g = graph();
        let s = settings();
        let plan = partition(&g, &s, &SupportTable::accept_all()).unwrap();
        assert_eq!(plan.regions[1].target, RegionTarget::GeneralExecutor);
        assert_eq!(
            lower(&g, &plan.regions[1], &s),
            Err(EngineBuildError::NotAcceleratorRegion { region: 1 })
        );
    }

    #[test]
    fn test_missing_input_spec_is_a_lowering_error() {
        let g = graph();
        let s = settings();
        let plan = partition(&g, &s, &SupportTable::accept_all()).unwrap();
        let short = s
            .to_builder()
            .inputs([ShapeSpec::fixed(vec![1, 3, 32, 32], DType::Float, TensorFormat::Contiguous).unwrap()])
            .build()
            .unwrap();
        let err = lower(&g, &plan.regions[2], &short).unwrap_err();
        assert!(matches!(err, EngineBuildError::Lowering { region: 2, .. }));
    }

    #[test]
    fn test_profile_summary() {
        let p = OptimizationProfile::from_spec(
            &ShapeSpec::fixed(vec![2, 4], DType::Half, TensorFormat::Contiguous).unwrap(),
        );
        assert!(p.summary().contains("Half"));
    }
}
