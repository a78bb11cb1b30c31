// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the work item store.

use compute_platform::PlatformError;
use device_pool::PoolError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Image count or dimensions are unusable.
    #[error("invalid image spec: {0}")]
    InvalidSpec(String),

    /// Device memory for a buffer pair could not be reserved.
    #[error("allocation failed for {resource} on device {device_index}: {source}")]
    AllocationFailure {
        resource: &'static str,
        device_index: usize,
        #[source]
        source: PlatformError,
    },

    /// A result range extends past the last work item.
    #[error("range {start}..{end} out of bounds for {len} work item(s)")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    /// The store has already been released.
    #[error("work item store has been released")]
    Released,

    #[error("device pool error: {0}")]
    Pool(#[from] PoolError),
}
