// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # dispatch
//!
//! Multi-device asynchronous dispatch.
//!
//! - [`BatchPlan`]: contiguous, index-ordered assignment of images to devices.
//! - [`DeviceLane`]: exclusive handle on one device and its buffer pair for
//!   the duration of a run.
//! - [`run_one`]: the upload → compute → download chain for one image,
//!   ordered by completion tokens.
//! - [`DispatchStrategy`]: sequencing policies over `run_one`.
//!
//! # Strategies
//!
//! | Strategy | Devices | Controller threads | Results |
//! |---|---|---|---|
//! | [`SingleDevice`] | device 0 | 1 | baseline |
//! | [`MultiDeviceSerial`] | all | 1 | multi-device |
//! | [`MultiDeviceThreaded`] | all | one per device | multi-device |

pub mod batch;
mod error;
pub mod lane;
pub mod pipeline;
pub mod strategy;

pub use batch::{Batch, BatchPlan};
pub use error::DispatchError;
pub use lane::DeviceLane;
pub use pipeline::{run_one, wait_for_pipelines, PipelineTokens, Stage};
pub use strategy::{
    all_strategies, strategy_from_name, DispatchStrategy, MultiDeviceSerial, MultiDeviceThreaded,
    SingleDevice,
};
