// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Work items and the store that owns them.
//!
//! Host buffers are per image and live for the whole session. Device
//! buffers are per device: one input/output pair, reused by every image the
//! device processes in a run.

use crate::StoreError;
use compute_platform::{DeviceBuffer, HostBuffer};
use device_pool::DevicePool;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;

/// Image count and dimensions for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageSpec {
    pub num_images: usize,
    pub width: usize,
    pub height: usize,
}

impl ImageSpec {
    pub fn new(num_images: usize, width: usize, height: usize) -> Self {
        Self {
            num_images,
            width,
            height,
        }
    }

    /// Pixels per image.
    pub fn pixels(&self) -> usize {
        self.width * self.height
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.num_images == 0 {
            return Err(StoreError::InvalidSpec("num_images must be at least 1".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(StoreError::InvalidSpec(format!(
                "image dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width.checked_mul(self.height).is_none() {
            return Err(StoreError::InvalidSpec(format!(
                "image dimensions {}x{} overflow",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Which of a work item's two result buffers a run writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultSet {
    /// Written by the single-device run.
    Baseline,
    /// Written by the multi-device runs.
    Multi,
}

/// One image: its input and two independent result buffers.
#[derive(Debug)]
pub struct WorkItem {
    index: usize,
    input: HostBuffer,
    baseline: HostBuffer,
    multi: HostBuffer,
}

impl WorkItem {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn input(&self) -> &HostBuffer {
        &self.input
    }

    pub fn result(&self, set: ResultSet) -> &HostBuffer {
        match set {
            ResultSet::Baseline => &self.baseline,
            ResultSet::Multi => &self.multi,
        }
    }
}

/// The device-side input/output buffers of one device.
#[derive(Debug)]
pub struct DeviceBufferPair {
    pub device_index: usize,
    pub input: DeviceBuffer,
    pub output: DeviceBuffer,
}

/// Owns every host and device buffer of a benchmark session.
#[derive(Debug)]
pub struct WorkItemStore {
    spec: ImageSpec,
    items: Vec<WorkItem>,
    device_buffers: Vec<DeviceBufferPair>,
    released: bool,
}

impl WorkItemStore {
    /// Creates `spec.num_images` work items with inputs drawn from a
    /// `seed`ed generator, and one buffer pair per pool device.
    ///
    /// An allocation failure is returned as-is; nothing is retried.
    pub fn allocate(pool: &DevicePool, spec: ImageSpec, seed: u64) -> Result<Self, StoreError> {
        spec.validate()?;
        let context = pool.context()?;
        let pixels = spec.pixels();

        let mut device_buffers = Vec::with_capacity(pool.device_count());
        for device in pool.devices() {
            let device_index = device.index();
            let alloc = |resource: &'static str| {
                context
                    .create_buffer(device_index, pixels)
                    .map_err(|source| StoreError::AllocationFailure {
                        resource,
                        device_index,
                        source,
                    })
            };
            let input = alloc("device input buffer")?;
            let output = alloc("device output buffer")?;
            device_buffers.push(DeviceBufferPair {
                device_index,
                input,
                output,
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let items = (0..spec.num_images)
            .map(|index| {
                let data: Vec<f32> = (0..pixels).map(|_| rng.gen::<f32>()).collect();
                WorkItem {
                    index,
                    input: HostBuffer::from_vec(data),
                    baseline: HostBuffer::zeroed(pixels),
                    multi: HostBuffer::zeroed(pixels),
                }
            })
            .collect();

        tracing::info!(
            "allocated {} image(s) of {}x{} and {} device buffer pair(s)",
            spec.num_images,
            spec.width,
            spec.height,
            device_buffers.len()
        );

        Ok(Self {
            spec,
            items,
            device_buffers,
            released: false,
        })
    }

    pub fn spec(&self) -> ImageSpec {
        self.spec
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&WorkItem> {
        self.items.get(index)
    }

    pub fn device_buffers(&self) -> &[DeviceBufferPair] {
        &self.device_buffers
    }

    pub fn buffer_pair(&self, device_index: usize) -> Option<&DeviceBufferPair> {
        self.device_buffers
            .iter()
            .find(|pair| pair.device_index == device_index)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Zeroes one result set across every work item.
    pub fn clear_results(&self, set: ResultSet) -> Result<(), StoreError> {
        self.check_live()?;
        for item in &self.items {
            item.result(set).fill(0.0);
        }
        Ok(())
    }

    /// Copies the `set` results of the work items in `range`.
    pub fn snapshot(&self, set: ResultSet, range: Range<usize>) -> Result<Vec<Vec<f32>>, StoreError> {
        self.check_live()?;
        let items = self.items_in(range)?;
        Ok(items.iter().map(|item| item.result(set).to_vec()).collect())
    }

    /// Work items in `range`, bounds-checked.
    pub fn items_in(&self, range: Range<usize>) -> Result<&[WorkItem], StoreError> {
        self.items
            .get(range.clone())
            .ok_or(StoreError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                len: self.items.len(),
            })
    }

    /// Frees every host and device buffer. Calling it again is a no-op.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.device_buffers.clear();
        self.items.clear();
        tracing::debug!("work item store released");
    }

    fn check_live(&self) -> Result<(), StoreError> {
        if self.released {
            return Err(StoreError::Released);
        }
        Ok(())
    }
}

impl Drop for WorkItemStore {
    fn drop(&mut self) {
        self.release();
    }
}
