// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Multi-device strategy with one controller thread.
//!
//! Batches are issued device after device from the calling thread. Queues
//! run asynchronously, so devices still overlap even though submission is
//! serial; this shows whether serial submission already saturates them.

use super::{check_lanes, issue_batch, DispatchStrategy};
use crate::{BatchPlan, DeviceLane, DispatchError, PipelineTokens};
use work_store::{ResultSet, WorkItemStore};

#[derive(Debug, Clone, Default)]
pub struct MultiDeviceSerial;

impl MultiDeviceSerial {
    pub fn new() -> Self {
        Self
    }
}

impl DispatchStrategy for MultiDeviceSerial {
    fn name(&self) -> &str {
        "multi-serial"
    }

    fn label(&self, num_devices: usize) -> String {
        format!("{num_devices}x device (single thread)")
    }

    fn target(&self) -> ResultSet {
        ResultSet::Multi
    }

    fn plan(&self, num_images: usize, num_devices: usize) -> Result<BatchPlan, DispatchError> {
        BatchPlan::partitioned(num_images, num_devices)
    }

    fn dispatch(
        &self,
        plan: &BatchPlan,
        lanes: &mut [DeviceLane<'_>],
        store: &WorkItemStore,
    ) -> Result<Vec<PipelineTokens>, DispatchError> {
        check_lanes(plan, lanes)?;
        let mut pipelines = Vec::with_capacity(plan.covered());
        for (lane, batch) in lanes.iter_mut().zip(&plan.batches) {
            pipelines.extend(issue_batch(lane, batch.images.clone(), store, plan.target)?);
        }
        Ok(pipelines)
    }
}
