// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The benchmark error taxonomy.
//!
//! Errors from the lower crates are folded into the operator-facing
//! categories on conversion, so a caller only has to match on this enum.

use compute_platform::PlatformError;
use device_pool::PoolError;
use dispatch::{DispatchError, Stage};
use work_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// Discovery yielded no usable device.
    #[error("no device found (vendor filter: '{vendor_filter}')")]
    NoDeviceFound { vendor_filter: String },

    /// The kernel source could not be read.
    #[error("cannot read kernel source '{path}': {source}")]
    SourceUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The kernel source failed to build. `log` is the full build log.
    #[error("kernel build failed for '{source_path}':\n{log}")]
    BuildFailure { source_path: String, log: String },

    /// Device memory could not be reserved.
    #[error("allocation failed for {resource} on device {device_index}: {source}")]
    AllocationFailure {
        resource: String,
        device_index: usize,
        #[source]
        source: PlatformError,
    },

    /// A pipeline stage failed; the run's timing is invalid.
    #[error("{stage} failed on device {device_index}: {source}")]
    DeviceOperationFailed {
        stage: Stage,
        device_index: usize,
        #[source]
        source: PlatformError,
    },

    /// Command-line options could not be parsed.
    #[error("option parse failure: {0}")]
    OptionParseFailure(String),

    /// The benchmark configuration is invalid.
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("platform error: {0}")]
    Platform(PlatformError),

    #[error("device pool error: {0}")]
    Pool(PoolError),

    #[error("work store error: {0}")]
    Store(StoreError),

    #[error("dispatch error: {0}")]
    Dispatch(DispatchError),
}

impl From<PlatformError> for BenchError {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::NoDeviceFound { vendor_filter } => BenchError::NoDeviceFound { vendor_filter },
            PlatformError::SourceUnavailable { path, source } => {
                BenchError::SourceUnavailable { path, source }
            }
            PlatformError::BuildFailure { source_path, log } => {
                BenchError::BuildFailure { source_path, log }
            }
            e @ PlatformError::AllocationFailure { device_index, .. } => BenchError::AllocationFailure {
                resource: "device memory".into(),
                device_index,
                source: e,
            },
            PlatformError::ConfigError(msg) => BenchError::ConfigError(msg),
            other => BenchError::Platform(other),
        }
    }
}

impl From<PoolError> for BenchError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::NoDeviceFound { vendor_filter } => BenchError::NoDeviceFound { vendor_filter },
            PoolError::Platform(e) => e.into(),
            other => BenchError::Pool(other),
        }
    }
}

impl From<StoreError> for BenchError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AllocationFailure {
                resource,
                device_index,
                source,
            } => BenchError::AllocationFailure {
                resource: resource.into(),
                device_index,
                source,
            },
            StoreError::InvalidSpec(msg) => BenchError::ConfigError(msg),
            StoreError::Pool(e) => e.into(),
            other => BenchError::Store(other),
        }
    }
}

impl From<DispatchError> for BenchError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::DeviceOperationFailed {
                stage,
                device_index,
                source,
            } => BenchError::DeviceOperationFailed {
                stage,
                device_index,
                source,
            },
            DispatchError::UnknownStrategy(name) => {
                BenchError::ConfigError(format!("unknown strategy '{name}'"))
            }
            DispatchError::Store(e) => e.into(),
            other => BenchError::Dispatch(other),
        }
    }
}
