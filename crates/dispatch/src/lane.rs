// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device lanes: exclusive ownership of one device for one run.
//!
//! A [`DeviceLane`] holds `&mut Device`, so for the lifetime of a run no
//! other lane (and no other thread) can reach that device's queue or
//! kernel. The multi-threaded strategy moves each lane into its own
//! controller thread; the borrow checker proves the lanes are disjoint.

use crate::DispatchError;
use crate::PipelineTokens;
use compute_platform::CompletionToken;
use device_pool::Device;
use work_store::{DeviceBufferPair, WorkItemStore};

/// One device, its buffer pair, and the last pipeline issued on it.
pub struct DeviceLane<'a> {
    pub(crate) device: &'a mut Device,
    pub(crate) buffers: &'a DeviceBufferPair,
    pub(crate) global_size: [usize; 2],
    pub(crate) reuse_dependency: bool,
    pub(crate) last_pipeline: Option<PipelineTokens>,
}

impl<'a> DeviceLane<'a> {
    /// Builds one lane per device, pairing each with its buffers in `store`.
    ///
    /// With `reuse_dependency`, each upload also waits on the previous
    /// download issued on the same lane, since both touch the lane's one
    /// buffer pair.
    pub fn bind_all(
        devices: &'a mut [Device],
        store: &'a WorkItemStore,
        reuse_dependency: bool,
    ) -> Result<Vec<DeviceLane<'a>>, DispatchError> {
        let spec = store.spec();
        devices
            .iter_mut()
            .map(|device| {
                let device_index = device.index();
                let buffers = store
                    .buffer_pair(device_index)
                    .ok_or(DispatchError::MissingBuffers { device_index })?;
                if device.kernel().is_none() {
                    return Err(DispatchError::KernelNotInstalled { device_index });
                }
                Ok(DeviceLane {
                    device,
                    buffers,
                    global_size: [spec.width, spec.height],
                    reuse_dependency,
                    last_pipeline: None,
                })
            })
            .collect()
    }

    pub fn device_index(&self) -> usize {
        self.device.index()
    }

    /// The most recent download token issued on this lane.
    pub fn last_download(&self) -> Option<&CompletionToken> {
        self.last_pipeline.as_ref().map(|p| &p.download)
    }

    pub fn reuse_dependency(&self) -> bool {
        self.reuse_dependency
    }
}

/// A lane's kernel bindings end with the lane, so the store can free the
/// buffer pair once the run is over. Queued commands keep their own handles.
impl Drop for DeviceLane<'_> {
    fn drop(&mut self) {
        self.device.unbind_kernel();
    }
}

impl std::fmt::Debug for DeviceLane<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLane")
            .field("device_index", &self.device.index())
            .field("global_size", &self.global_size)
            .field("reuse_dependency", &self.reuse_dependency)
            .finish()
    }
}
