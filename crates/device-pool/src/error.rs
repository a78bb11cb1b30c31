// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the device pool.

use compute_platform::PlatformError;

/// Errors raised while bringing up, using, or tearing down the pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Discovery (after applying the selection policy) yielded no device.
    #[error("no device found (vendor filter: '{vendor_filter}')")]
    NoDeviceFound { vendor_filter: String },

    /// The pool has already been shut down.
    #[error("device pool has been shut down")]
    ShutDown,

    /// A device operation failed.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}
