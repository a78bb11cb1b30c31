// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Platform description and device discovery.
//!
//! # TOML Format
//! ```toml
//! vendor = "HostSim"
//! name = "HostSim Compute Platform"
//! version = "1.2"
//! device_count = 4
//! device_name = "HostSim Virtual Accelerator"
//! device_memory = "1G"
//!
//! [[faults]]
//! device_index = 2
//! kind = "kernel"
//! after = 3
//! ```

use crate::{CommandKind, MemoryCapacity, PlatformError};

/// Configuration of the simulated platform.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub vendor: String,
    pub name: String,
    pub version: String,
    /// Number of devices the platform exposes.
    pub device_count: usize,
    pub device_name: String,
    /// Per-device memory (human-readable, e.g. `"1G"`).
    pub device_memory: String,
    pub faults: Vec<FaultInjection>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            vendor: "HostSim".into(),
            name: "HostSim Compute Platform".into(),
            version: "1.2".into(),
            device_count: 2,
            device_name: "HostSim Virtual Accelerator".into(),
            device_memory: "1G".into(),
            faults: Vec::new(),
        }
    }
}

/// Makes the `after`-th command (0-based) of `kind` on `device_index` fail
/// with `OUT_OF_RESOURCES`. Fires once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FaultInjection {
    pub device_index: usize,
    pub kind: CommandKind,
    pub after: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PlatformInfo {
    pub vendor: String,
    pub name: String,
    pub version: String,
}

/// One discovered device.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub vendor: String,
    pub memory: MemoryCapacity,
}

/// A discovered platform and its devices.
#[derive(Debug, Clone)]
pub struct Platform {
    info: PlatformInfo,
    devices: Vec<DeviceInfo>,
    faults: Vec<FaultInjection>,
}

impl Platform {
    /// Discovers the platform described by `config`.
    ///
    /// `vendor_filter` is matched as a substring of the vendor name; an
    /// empty filter matches any vendor.
    pub fn discover(config: &PlatformConfig, vendor_filter: &str) -> Result<Self, PlatformError> {
        if !config.vendor.contains(vendor_filter) {
            tracing::debug!(
                "platform vendor '{}' does not match filter '{vendor_filter}'",
                config.vendor
            );
            return Err(PlatformError::NoDeviceFound {
                vendor_filter: vendor_filter.to_string(),
            });
        }
        if config.device_count == 0 {
            return Err(PlatformError::NoDeviceFound {
                vendor_filter: vendor_filter.to_string(),
            });
        }

        let memory = MemoryCapacity::parse(&config.device_memory)?;
        if let Some(fault) = config
            .faults
            .iter()
            .find(|f| f.device_index >= config.device_count)
        {
            return Err(PlatformError::ConfigError(format!(
                "fault injection targets device {} but only {} device(s) exist",
                fault.device_index, config.device_count
            )));
        }

        let devices = (0..config.device_count)
            .map(|index| DeviceInfo {
                index,
                name: config.device_name.clone(),
                vendor: config.vendor.clone(),
                memory,
            })
            .collect();

        Ok(Self {
            info: PlatformInfo {
                vendor: config.vendor.clone(),
                name: config.name.clone(),
                version: config.version.clone(),
            },
            devices,
            faults: config.faults.clone(),
        })
    }

    pub fn info(&self) -> &PlatformInfo {
        &self.info
    }

    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Keeps only the first `n` devices.
    pub fn truncate_devices(&mut self, n: usize) {
        self.devices.truncate(n);
        self.faults.retain(|f| f.device_index < n);
    }

    /// Faults targeting `device_index`.
    pub(crate) fn faults_for(&self, device_index: usize) -> Vec<FaultInjection> {
        self.faults
            .iter()
            .filter(|f| f.device_index == device_index)
            .copied()
            .collect()
    }
}
