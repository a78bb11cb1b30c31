// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Single-device strategy: every image on device 0, one controller thread.
//! Produces the baseline results the multi-device runs are checked against.

use super::{issue_batch, DispatchStrategy};
use crate::{BatchPlan, DeviceLane, DispatchError, PipelineTokens};
use work_store::{ResultSet, WorkItemStore};

#[derive(Debug, Clone, Default)]
pub struct SingleDevice;

impl SingleDevice {
    pub fn new() -> Self {
        Self
    }
}

impl DispatchStrategy for SingleDevice {
    fn name(&self) -> &str {
        "single"
    }

    fn label(&self, _num_devices: usize) -> String {
        "single device".to_string()
    }

    fn target(&self) -> ResultSet {
        ResultSet::Baseline
    }

    fn plan(&self, num_images: usize, num_devices: usize) -> Result<BatchPlan, DispatchError> {
        if num_devices == 0 {
            return Err(DispatchError::NoDevices);
        }
        Ok(BatchPlan::single(num_images))
    }

    fn dispatch(
        &self,
        plan: &BatchPlan,
        lanes: &mut [DeviceLane<'_>],
        store: &WorkItemStore,
    ) -> Result<Vec<PipelineTokens>, DispatchError> {
        plan.validate()?;
        let lane = lanes.first_mut().ok_or(DispatchError::NoDevices)?;
        let batch = &plan.batches[0];
        issue_batch(lane, batch.images.clone(), store, plan.target)
    }
}
