// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Multi-device strategy with one controller thread per device.
//!
//! Each scoped thread receives exactly one `&mut DeviceLane` and issues its
//! own batch. Lanes are disjoint borrows, so no lock is needed; all threads
//! are joined before `dispatch` returns.

use super::{check_lanes, issue_batch, DispatchStrategy};
use crate::{BatchPlan, DeviceLane, DispatchError, PipelineTokens};
use work_store::{ResultSet, WorkItemStore};

#[derive(Debug, Clone, Default)]
pub struct MultiDeviceThreaded;

impl MultiDeviceThreaded {
    pub fn new() -> Self {
        Self
    }
}

impl DispatchStrategy for MultiDeviceThreaded {
    fn name(&self) -> &str {
        "multi-threaded"
    }

    fn label(&self, num_devices: usize) -> String {
        format!("{num_devices}x device (multi thread)")
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
        let target = plan.target;

        let outcomes = std::thread::scope(|scope| {
            let handles: Vec<_> = lanes
                .iter_mut()
                .zip(&plan.batches)
                .map(|(lane, batch)| {
                    let images = batch.images.clone();
                    let handle = scope.spawn(move || issue_batch(lane, images, store, target));
                    (batch.device_index, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(device_index, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        tracing::error!("controller thread for device {device_index} panicked");
                        Err(DispatchError::WorkerPanicked { device_index })
                    })
                })
                .collect::<Vec<_>>()
        });

        let mut pipelines = Vec::with_capacity(plan.covered());
        let mut first_err = None;
        for outcome in outcomes {
            match outcome {
                Ok(tokens) => pipelines.extend(tokens),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(pipelines),
        }
    }
}
