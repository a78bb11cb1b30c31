// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # work-store
//!
//! Owns the host and device buffers of a benchmark session.
//!
//! Every [`WorkItem`] has one input buffer, filled once from a seeded
//! generator so every strategy sees identical data, and two result buffers
//! (baseline and multi-device) that never alias. Device-side buffers are
//! allocated per device, not per image.

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{DeviceBufferPair, ImageSpec, ResultSet, WorkItem, WorkItemStore};
