// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmark configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! num_images = 30
//! width = 1024
//! height = 1024
//! kernel_source = "kernels/nlm.toml"
//! kernel_entry = "nlm"
//! build_options = "-DSEARCH_RADIUS=3"
//! strategies = ["single", "multi-serial", "multi-threaded"]
//! enable_profiling = false
//! seed = 42
//! max_devices = 4
//!
//! [platform]
//! device_count = 4
//! device_memory = "1G"
//! ```

use crate::BenchError;
use compute_platform::PlatformConfig;
use device_pool::PoolConfig;
use dispatch::{strategy_from_name, DispatchStrategy};
use std::path::{Path, PathBuf};
use work_store::ImageSpec;

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 0x5eed_0001;

/// Configuration for one benchmark session.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Number of images processed by each strategy.
    pub num_images: usize,
    pub width: usize,
    pub height: usize,
    /// Path to the kernel descriptor.
    pub kernel_source: PathBuf,
    /// Kernel entry point to run.
    pub kernel_entry: String,
    /// `-DNAME=VALUE` build options.
    pub build_options: String,
    /// Strategy names, in run order. The baseline always runs first.
    pub strategies: Vec<String>,
    /// Collect per-command device timestamps.
    pub enable_profiling: bool,
    /// Seed for the synthetic input images.
    pub seed: u64,
    /// Substring the platform vendor must contain.
    pub vendor_filter: String,
    /// Use at most this many devices.
    pub max_devices: Option<usize>,
    /// Make each upload wait on the previous download on the same device.
    pub reuse_dependency: bool,
    pub platform: PlatformConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            num_images: 30,
            width: 1024,
            height: 1024,
            kernel_source: PathBuf::from("kernels/nlm.toml"),
            kernel_entry: "nlm".to_string(),
            build_options: String::new(),
            strategies: vec![
                "single".to_string(),
                "multi-serial".to_string(),
                "multi-threaded".to_string(),
            ],
            enable_profiling: false,
            seed: DEFAULT_SEED,
            vendor_filter: String::new(),
            max_devices: None,
            reuse_dependency: true,
            platform: PlatformConfig::default(),
        }
    }
}

impl BenchmarkConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, BenchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BenchError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, BenchError> {
        toml::from_str(toml_str)
            .map_err(|e| BenchError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, BenchError> {
        toml::to_string_pretty(self)
            .map_err(|e| BenchError::ConfigError(format!("TOML serialise error: {e}")))
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        self.image_spec().validate()?;
        if self.kernel_entry.trim().is_empty() {
            return Err(BenchError::ConfigError("kernel_entry must not be empty".into()));
        }
        if self.strategies.is_empty() {
            return Err(BenchError::ConfigError("at least one strategy is required".into()));
        }
        self.create_strategies()?;
        Ok(())
    }

    pub fn image_spec(&self) -> ImageSpec {
        ImageSpec::new(self.num_images, self.width, self.height)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            platform: self.platform.clone(),
            vendor_filter: self.vendor_filter.clone(),
            max_devices: self.max_devices,
            profiling: self.enable_profiling,
        }
    }

    /// Creates the configured strategies, dropping duplicates and moving
    /// baseline strategies to the front so multi-device runs have
    /// something to be compared against.
    pub fn create_strategies(&self) -> Result<Vec<Box<dyn DispatchStrategy>>, BenchError> {
        let mut strategies: Vec<Box<dyn DispatchStrategy>> = Vec::new();
        for name in &self.strategies {
            let strategy = strategy_from_name(name)?;
            if strategies.iter().all(|s| s.name() != strategy.name()) {
                strategies.push(strategy);
            }
        }
        strategies.sort_by_key(|s| s.target() != work_store::ResultSet::Baseline);
        Ok(strategies)
    }
}
