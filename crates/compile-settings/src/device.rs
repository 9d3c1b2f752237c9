// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Target device selection.

use crate::ValidationError;
use std::fmt;
use std::str::FromStr;

/// Which accelerator an engine is built for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// The main GPU.
    #[default]
    Primary,
    /// An auxiliary low-power deep-learning accelerator core (DLA).
    AuxiliaryLowPower,
}

impl DeviceKind {
    /// Label used in settings dumps.
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Primary => "GPU",
            DeviceKind::AuxiliaryLowPower => "DLA",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gpu" | "primary" => Ok(DeviceKind::Primary),
            "dla" | "auxiliary" | "auxiliary_low_power" => Ok(DeviceKind::AuxiliaryLowPower),
            _ => Err(ValidationError::UnknownVariant {
                kind: "device type",
                value: s.to_string(),
            }),
        }
    }
}

/// Restrictions on the kernels a built engine may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineCapability {
    /// No restriction.
    #[default]
    Default,
    /// Safety-certified GPU kernels only.
    SafeGpu,
    /// Standalone DLA engine; requires an auxiliary device.
    SafeDla,
}

impl EngineCapability {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineCapability::Default => "Default",
            EngineCapability::SafeGpu => "Safe GPU",
            EngineCapability::SafeDla => "Safe DLA",
        }
    }
}

impl fmt::Display for EngineCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineCapability {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "default" | "standard" => Ok(EngineCapability::Default),
            "safe_gpu" | "safety" => Ok(EngineCapability::SafeGpu),
            "safe_dla" | "dla_standalone" => Ok(EngineCapability::SafeDla),
            _ => Err(ValidationError::UnknownVariant {
                kind: "engine capability",
                value: s.to_string(),
            }),
        }
    }
}

/// Identifies one physical device. Builds that share a key contend for the
/// same device context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey {
    pub gpu_id: u32,
    /// `Some` only for auxiliary-core targets.
    pub aux_core: Option<u32>,
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.aux_core {
            Some(core) => write!(f, "gpu{}/dla{}", self.gpu_id, core),
            None => write!(f, "gpu{}", self.gpu_id),
        }
    }
}

/// Target accelerator plus fallback permission.
///
/// `aux_core_id` is only meaningful for [`DeviceKind::AuxiliaryLowPower`];
/// it is carried but ignored for primary targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct DeviceSpec {
    kind: DeviceKind,
    primary_id: u32,
    aux_core_id: u32,
    allow_fallback_to_general_device: bool,
}

impl Default for DeviceSpec {
    fn default() -> Self {
        Self {
            kind: DeviceKind::Primary,
            primary_id: 0,
            aux_core_id: 0,
            allow_fallback_to_general_device: false,
        }
    }
}

impl DeviceSpec {
    /// Creates a device spec, rejecting negative ids.
    pub fn new(
        kind: DeviceKind,
        primary_id: i64,
        aux_core_id: i64,
        allow_fallback_to_general_device: bool,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            kind,
            primary_id: to_id("device.gpu_id", primary_id)?,
            aux_core_id: to_id("device.dla_core", aux_core_id)?,
            allow_fallback_to_general_device,
        })
    }

    /// The primary GPU with the given id.
    pub fn primary(gpu_id: i64) -> Result<Self, ValidationError> {
        Self::new(DeviceKind::Primary, gpu_id, 0, false)
    }

    /// An auxiliary core attached to the given GPU.
    pub fn auxiliary(
        gpu_id: i64,
        core: i64,
        allow_fallback_to_general_device: bool,
    ) -> Result<Self, ValidationError> {
        Self::new(
            DeviceKind::AuxiliaryLowPower,
            gpu_id,
            core,
            allow_fallback_to_general_device,
        )
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn primary_id(&self) -> u32 {
        self.primary_id
    }

    /// The auxiliary core, or `None` when targeting the primary device.
    pub fn aux_core(&self) -> Option<u32> {
        match self.kind {
            DeviceKind::AuxiliaryLowPower => Some(self.aux_core_id),
            DeviceKind::Primary => None,
        }
    }

    /// The raw auxiliary core id, as supplied.
    pub fn aux_core_id(&self) -> u32 {
        self.aux_core_id
    }

    pub fn allow_fallback_to_general_device(&self) -> bool {
        self.allow_fallback_to_general_device
    }

    /// Physical device identity used to serialise builds.
    pub fn key(&self) -> DeviceKey {
        DeviceKey {
            gpu_id: self.primary_id,
            aux_core: self.aux_core(),
        }
    }
}

fn to_id(field: &str, value: i64) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
            value,
        });
    }
    u32::try_from(value).map_err(|_| ValidationError::OutOfRange {
        field: field.to_string(),
        detail: format!("{value} does not fit a device id"),
    })
}
