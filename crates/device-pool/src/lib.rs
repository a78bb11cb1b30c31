// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # device-pool
//!
//! Discovers accelerator devices and owns exactly one in-order command
//! queue per device for the lifetime of a benchmark session.
//!
//! - [`DevicePool::initialize`] applies the vendor filter and the
//!   `max_devices` selection policy, then creates the queues.
//! - [`DevicePool::install_kernels`] creates one kernel instance per device.
//! - [`DevicePool::shutdown`] drains and releases every queue before the
//!   shared context. It is idempotent and also runs on drop.

pub mod error;
pub mod pool;

pub use error::PoolError;
pub use pool::{Device, DevicePool, PoolConfig};
