// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the compute platform.

use crate::{CommandKind, StatusCode};

/// Errors that can occur while discovering devices, building programs,
/// allocating device memory, or submitting and completing commands.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// Discovery found no device matching the vendor filter.
    #[error("no device found (vendor filter: {vendor_filter})")]
    NoDeviceFound { vendor_filter: String },

    /// The kernel source file could not be read.
    #[error("cannot read kernel source '{path}': {source}")]
    SourceUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The kernel source failed to build. `log` is the full build log.
    #[error("build failed for '{source_path}'")]
    BuildFailure { source_path: String, log: String },

    /// Device memory could not be reserved.
    #[error("allocation of {requested_bytes} bytes failed on device {device_index}: only {available_bytes} of {capacity_bytes} bytes available")]
    AllocationFailure {
        device_index: usize,
        requested_bytes: usize,
        available_bytes: usize,
        capacity_bytes: usize,
    },

    /// A call was rejected before anything was submitted to a device.
    #[error("{op} rejected: {status}")]
    Rejected { op: &'static str, status: StatusCode },

    /// A submitted command finished with a failure status.
    #[error("{kind} '{label}' failed on device {device_index}: {status}")]
    CommandFailed {
        kind: CommandKind,
        label: String,
        device_index: usize,
        status: StatusCode,
    },

    /// Configuration of the simulated platform is invalid.
    #[error("platform configuration error: {0}")]
    ConfigError(String),
}

impl PlatformError {
    /// The device status behind this error, when there is one.
    pub fn status(&self) -> StatusCode {
        match self {
            PlatformError::NoDeviceFound { .. } => StatusCode::DeviceNotFound,
            PlatformError::SourceUnavailable { .. } => StatusCode::InvalidProgram,
            PlatformError::BuildFailure { .. } => StatusCode::BuildProgramFailure,
            PlatformError::AllocationFailure { .. } => StatusCode::MemObjectAllocationFailure,
            PlatformError::Rejected { status, .. } => *status,
            PlatformError::CommandFailed { status, .. } => *status,
            PlatformError::ConfigError(_) => StatusCode::InvalidValue,
        }
    }

    pub(crate) fn rejected(op: &'static str, status: StatusCode) -> Self {
        PlatformError::Rejected { op, status }
    }
}
