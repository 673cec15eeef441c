// Copyright 2025 Power Tuner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Identifier and classification types.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Memory configuration under test, in MB.
///
/// Ordered numerically, so maps keyed by it iterate from the smallest
/// configuration to the largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationKey(u32);

impl ConfigurationKey {
    /// Create a key from a memory size in MB.
    pub const fn new(memory_mb: u32) -> Self {
        Self(memory_mb)
    }

    /// Memory size in MB.
    pub const fn memory_mb(&self) -> u32 {
        self.0
    }

    /// Configuration value as a float, for cost arithmetic.
    pub fn value(&self) -> f64 {
        f64::from(self.0)
    }
}

impl fmt::Display for ConfigurationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ConfigurationKey {
    fn from(memory_mb: u32) -> Self {
        Self(memory_mb)
    }
}

impl FromStr for ConfigurationKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches("MB").trim();
        trimmed
            .parse::<u32>()
            .map(Self)
            .map_err(|_| Error::invalid_input(format!("invalid configuration key: {}", s)))
    }
}

/// Instruction set the benchmarked function runs on; selects the price list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Architecture {
    /// 64-bit x86.
    #[serde(rename = "x86_64")]
    X86_64,
    /// 64-bit ARM (Graviton).
    #[serde(rename = "arm64")]
    Arm64,
}

impl Default for Architecture {
    fn default() -> Self {
        Architecture::X86_64
    }
}

impl Architecture {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "x86_64" | "x86-64" | "amd64" => Ok(Architecture::X86_64),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            _ => Err(Error::invalid_input(format!("unsupported architecture: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_key_ordering() {
        let mut keys = vec![
            ConfigurationKey::new(1024),
            ConfigurationKey::new(128),
            ConfigurationKey::new(512),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ConfigurationKey::new(128),
                ConfigurationKey::new(512),
                ConfigurationKey::new(1024)
            ]
        );
    }

    #[test]
    fn test_configuration_key_parse() {
        assert_eq!("256".parse::<ConfigurationKey>().unwrap(), ConfigurationKey::new(256));
        assert_eq!("256 MB".parse::<ConfigurationKey>().unwrap(), ConfigurationKey::new(256));
        assert!("large".parse::<ConfigurationKey>().is_err());
    }

    #[test]
    fn test_configuration_key_serializes_as_number() {
        let json = serde_json::to_string(&ConfigurationKey::new(640)).unwrap();
        assert_eq!(json, "640");
    }

    #[test]
    fn test_architecture_parse() {
        assert_eq!("arm64".parse::<Architecture>().unwrap(), Architecture::Arm64);
        assert_eq!("x86_64".parse::<Architecture>().unwrap(), Architecture::X86_64);
        assert_eq!("AARCH64".parse::<Architecture>().unwrap(), Architecture::Arm64);
        assert!(matches!(
            "mips".parse::<Architecture>(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_architecture_serde_names() {
        assert_eq!(serde_json::to_string(&Architecture::Arm64).unwrap(), "\"arm64\"");
        let arch: Architecture = serde_json::from_str("\"x86_64\"").unwrap();
        assert_eq!(arch, Architecture::X86_64);
    }
}
