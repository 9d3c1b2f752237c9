// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Deterministic, human-readable dump of a [`CompilationSettings`] tree.
//!
//! Booleans render as `True`/`False`, shapes as `(d0,d1,...,)`, and lists one
//! element per line with a trailing comma. Every collection in the settings
//! is ordered, so identical settings always produce identical bytes.

use crate::CompilationSettings;
use std::fmt::{self, Write};

const INDENT: &str = "    ";
const ITEM_INDENT: &str = "        ";

/// Renders the full settings tree.
///
/// # Example
/// ```
/// use compile_settings::{describe, CompilationSettings};
/// use tensor_spec::{DType, ShapeSpec, TensorFormat};
///
/// let settings = CompilationSettings::builder()
///     .input(ShapeSpec::fixed(vec![1, 3, 224, 224], DType::Float, TensorFormat::Contiguous).unwrap())
///     .build()
///     .unwrap();
/// let text = describe(&settings);
/// assert!(text.starts_with("Compile Settings: {\n"));
/// assert!(text.contains("Input(shape=(1,3,224,224,), dtype=Float, format=Contiguous/Linear/NCHW),"));
/// ```
pub fn describe(settings: &CompilationSettings) -> String {
    SettingsTree(settings).to_string()
}

/// Display adapter behind [`describe`].
struct SettingsTree<'a>(&'a CompilationSettings);

impl fmt::Display for SettingsTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_settings(f, self.0)
    }
}

fn write_settings(out: &mut impl Write, s: &CompilationSettings) -> fmt::Result {
    writeln!(out, "Compile Settings: {{")?;

    write_list(out, INDENT, "Inputs", s.inputs().iter())?;
    write_list(out, INDENT, "Enabled Precision", s.enabled_precisions().iter())?;

    field(out, INDENT, "TF32 Disabled", py_bool(s.disable_tf32()))?;
    field(out, INDENT, "Sparsity", py_bool(s.sparse_weights()))?;
    field(out, INDENT, "Refit", py_bool(s.refit()))?;
    field(out, INDENT, "Debug", py_bool(s.debug()))?;
    field(out, INDENT, "Strict Types", py_bool(s.strict_types()))?;

    let device = s.device();
    writeln!(out, "{INDENT}\"Device\": {{")?;
    field(out, ITEM_INDENT, "device_type", device.kind())?;
    field(
        out,
        ITEM_INDENT,
        "allow_gpu_fallback",
        py_bool(device.allow_fallback_to_general_device()),
    )?;
    field(out, ITEM_INDENT, "gpu_id", device.primary_id())?;
    field(out, ITEM_INDENT, "dla_core", device.aux_core_id())?;
    writeln!(out, "{INDENT}}}")?;

    field(out, INDENT, "Engine Capability", s.capability())?;
    field(out, INDENT, "Num Min Timing Iters", s.num_min_timing_iters())?;
    field(out, INDENT, "Num Avg Timing Iters", s.num_avg_timing_iters())?;
    field(out, INDENT, "Workspace Size", s.workspace_size())?;
    field(out, INDENT, "Max Batch Size", s.max_batch_size())?;
    field(
        out,
        INDENT,
        "Truncate long and double",
        py_bool(s.truncate_long_and_double()),
    )?;
    match s.calibrator() {
        Some(cal) => field(out, INDENT, "Calibrator", cal.name())?,
        None => field(out, INDENT, "Calibrator", "None")?,
    }

    let lowering = s.lowering();
    writeln!(out, "{INDENT}\"Lowering\": {{")?;
    field(out, ITEM_INDENT, "unfreeze_module", py_bool(lowering.unfreeze_module))?;
    field(out, ITEM_INDENT, "disable_cse", py_bool(lowering.disable_cse))?;
    writeln!(out, "{INDENT}}}")?;

    let fallback = s.fallback();
    writeln!(out, "{INDENT}\"Fallback\": {{")?;
    field(out, ITEM_INDENT, "enabled", py_bool(fallback.enabled()))?;
    field(out, ITEM_INDENT, "min_block_size", fallback.min_region_size())?;
    write_list(
        out,
        ITEM_INDENT,
        "forced_fallback_operators",
        fallback.excluded_operators().iter(),
    )?;
    write_list(
        out,
        ITEM_INDENT,
        "forced_fallback_modules",
        fallback.excluded_modules().iter(),
    )?;
    writeln!(out, "{INDENT}}}")?;

    writeln!(out, "}}")
}

fn field(out: &mut impl Write, indent: &str, key: &str, value: impl fmt::Display) -> fmt::Result {
    writeln!(out, "{indent}\"{key}\": {value}")
}

fn write_list<T: fmt::Display>(
    out: &mut impl Write,
    indent: &str,
    key: &str,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    writeln!(out, "{indent}\"{key}\": [")?;
    for item in items {
        writeln!(out, "{indent}{INDENT}{item},")?;
    }
    writeln!(out, "{indent}]")
}

fn py_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheCalibrator, DeviceSpec, EngineCapability, FallbackPolicy};
    use std::sync::Arc;
    use tensor_spec::{DType, ShapeSpec, TensorFormat};

    fn input() -> ShapeSpec {
        ShapeSpec::fixed(vec![1, 3, 224, 224], DType::Float, TensorFormat::Contiguous).unwrap()
    }

    #[test]
    fn test_default_layout() {
        let s = CompilationSettings::builder().input(input()).build().unwrap();
        let expected = r#"Compile Settings: {
    "Inputs": [
        Input(shape=(1,3,224,224,), dtype=Float, format=Contiguous/Linear/NCHW),
    ]
    "Enabled Precision": [
        Float,
    ]
    "TF32 Disabled": False
    "Sparsity": False
    "Refit": False
    "Debug": False
    "Strict Types": False
    "Device": {
        "device_type": GPU
        "allow_gpu_fallback": False
        "gpu_id": 0
        "dla_core": 0
    }
    "Engine Capability": Default
    "Num Min Timing Iters": 2
    "Num Avg Timing Iters": 1
    "Workspace Size": 0
    "Max Batch Size": 0
    "Truncate long and double": False
    "Calibrator": None
    "Lowering": {
        "unfreeze_module": False
        "disable_cse": False
    }
    "Fallback": {
        "enabled": False
        "min_block_size": 1
        "forced_fallback_operators": [
        ]
        "forced_fallback_modules": [
        ]
    }
}
"#;
        assert_eq!(describe(&s), expected);
    }

    #[test]
    fn test_non_default_values_are_rendered() {
        let s = CompilationSettings::builder()
            .input(input())
            .input(
                ShapeSpec::dynamic(
                    vec![1, 16],
                    vec![4, 16],
                    vec![8, 16],
                    DType::Half,
                    TensorFormat::ChannelLast,
                )
                .unwrap(),
            )
            .enabled_precisions([DType::Half, DType::Int8, DType::Float])
            .device(DeviceSpec::auxiliary(1, 1, true).unwrap())
            .capability(EngineCapability::SafeDla)
            .fallback(
                FallbackPolicy::new(true, 4, ["aten::softmax", "aten::add"], ["Net.Head"])
                    .unwrap(),
            )
            .workspace_size(1 << 20)
            .max_batch_size(32)
            .refit(true)
            .calibrator(Arc::new(CacheCalibrator::new("imagenet", 8)))
            .build()
            .unwrap();
        let text = describe(&s);

        assert!(text.contains(
            "        Input(min_shape=(1,16,), opt_shape=(4,16,), max_shape=(8,16,), dtype=Half, format=Channel Last/NHWC),\n"
        ));
        assert!(text.contains("        Float,\n        Half,\n        Int8,\n"));
        assert!(text.contains("\"device_type\": DLA"));
        assert!(text.contains("\"allow_gpu_fallback\": True"));
        assert!(text.contains("\"gpu_id\": 1"));
        assert!(text.contains("\"Engine Capability\": Safe DLA"));
        assert!(text.contains("\"Workspace Size\": 1048576"));
        assert!(text.contains("\"Max Batch Size\": 32"));
        assert!(text.contains("\"Refit\": True"));
        assert!(text.contains("\"Calibrator\": imagenet"));
        assert!(text.contains("\"min_block_size\": 4"));
        assert!(text.contains(
            "\"forced_fallback_operators\": [\n            aten::add,\n            aten::softmax,\n        ]"
        ));
        assert!(text.contains("            Net.Head,\n"));
    }

    #[test]
    fn test_lowering_flags_rendered() {
        let s = CompilationSettings::builder()
            .input(input())
            .enabled_precision(DType::Int8)
            .build()
            .unwrap();
        let text = describe(&s);
        assert!(text.contains("\"unfreeze_module\": True"));
        assert!(text.contains("\"disable_cse\": True"));
    }

    #[test]
    fn test_output_is_byte_stable() {
        let make = || {
            CompilationSettings::builder()
                .input(input())
                .fallback(FallbackPolicy::new(true, 2, ["b", "a", "c"], ["z", "y"]).unwrap())
                .enabled_precisions([DType::Int8, DType::Half])
                .build()
                .unwrap()
        };
        let a = make();
        assert_eq!(describe(&a), describe(&a));
        assert_eq!(describe(&a), describe(&make()));
    }

    #[test]
    fn test_tree_streams_into_existing_writer() {
        let s = CompilationSettings::builder().input(input()).build().unwrap();
        let mut out = String::from("request:\n");
        write!(out, "{}", SettingsTree(&s)).unwrap();
        assert_eq!(out, format!("request:\n{}", describe(&s)));
        assert!(out.ends_with("    }\n}\n"));
    }
}
