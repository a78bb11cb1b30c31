// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for dispatch.

use crate::Stage;
use compute_platform::PlatformError;
use work_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A pipeline stage could not be submitted or did not complete.
    #[error("{stage} failed on device {device_index}: {source}")]
    DeviceOperationFailed {
        stage: Stage,
        device_index: usize,
        #[source]
        source: PlatformError,
    },

    /// A device has no kernel installed.
    #[error("no kernel installed on device {device_index}")]
    KernelNotInstalled { device_index: usize },

    /// The store has no buffer pair for a device.
    #[error("no device buffers allocated for device {device_index}")]
    MissingBuffers { device_index: usize },

    /// Dispatch was requested with zero devices.
    #[error("no devices available for dispatch")]
    NoDevices,

    /// A batch plan is inconsistent with the lanes or the store.
    #[error("invalid batch plan: {0}")]
    InvalidPlan(String),

    /// A per-device controller thread panicked.
    #[error("controller thread for device {device_index} panicked")]
    WorkerPanicked { device_index: usize },

    /// No strategy has the given name.
    #[error("unknown dispatch strategy '{0}' (expected single, multi-serial or multi-threaded)")]
    UnknownStrategy(String),

    #[error("work store error: {0}")]
    Store(#[from] StoreError),
}
