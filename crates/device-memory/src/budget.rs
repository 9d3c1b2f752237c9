// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Arena budgets.

/// Ceiling for a [`DeviceArena`](crate::DeviceArena).
///
/// A workspace size of `0` in a compilation request means "let the backend
/// decide", which maps to [`MemoryBudget::Unlimited`].
///
/// # Examples
/// ```
/// use device_memory::MemoryBudget;
///
/// assert_eq!(MemoryBudget::from_workspace_size(1 << 30).limit(), Some(1 << 30));
/// assert_eq!(MemoryBudget::from_workspace_size(0), MemoryBudget::Unlimited);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBudget {
    Unlimited,
    Limited(u64),
}

impl MemoryBudget {
    pub fn from_bytes(bytes: u64) -> Self {
        MemoryBudget::Limited(bytes)
    }

    /// Maps a request's workspace size onto a budget; `0` is unlimited.
    pub fn from_workspace_size(bytes: u64) -> Self {
        match bytes {
            0 => MemoryBudget::Unlimited,
            n => MemoryBudget::Limited(n),
        }
    }

    /// The byte ceiling, or `None` when unlimited.
    pub fn limit(&self) -> Option<u64> {
        match self {
            MemoryBudget::Unlimited => None,
            MemoryBudget::Limited(n) => Some(*n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_workspace_is_unlimited() {
        assert_eq!(MemoryBudget::from_workspace_size(0), MemoryBudget::Unlimited);
        assert_eq!(MemoryBudget::Unlimited.limit(), None);
    }

    #[test]
    fn test_workspace_size_is_byte_ceiling() {
        assert_eq!(
            MemoryBudget::from_workspace_size(4096),
            MemoryBudget::from_bytes(4096)
        );
        assert_eq!(MemoryBudget::from_workspace_size(u64::MAX).limit(), Some(u64::MAX));
    }

    #[test]
    fn test_serde_roundtrip() {
        let b = MemoryBudget::from_bytes(256 << 20);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, r#"{"limited":268435456}"#);
        let back: MemoryBudget = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }
}
