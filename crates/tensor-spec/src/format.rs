// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor memory layouts.

use crate::ValidationError;
use std::fmt;
use std::str::FromStr;

/// Memory layout of an input tensor.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TensorFormat {
    /// Row-major NCHW.
    #[default]
    Contiguous,
    /// Channels-last NHWC.
    ChannelLast,
}

impl TensorFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            TensorFormat::Contiguous => "Contiguous/Linear/NCHW",
            TensorFormat::ChannelLast => "Channel Last/NHWC",
        }
    }
}

impl fmt::Display for TensorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TensorFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contiguous" | "linear" | "nchw" => Ok(TensorFormat::Contiguous),
            "channel_last" | "channels_last" | "channel-last" | "nhwc" => {
                Ok(TensorFormat::ChannelLast)
            }
            _ => Err(ValidationError::UnknownVariant {
                kind: "tensor format",
                value: s.to_string(),
            }),
        }
    }
}
