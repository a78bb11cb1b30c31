// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Batch plans: which device processes which images.
//!
//! Multi-device plans split the images into `num_devices` contiguous,
//! index-ordered batches of `num_images / num_devices`. Device `i` gets
//! `[i * batch_size, (i + 1) * batch_size)`; images past
//! `num_devices * batch_size` are dropped from the plan.

use crate::DispatchError;
use std::ops::Range;
use work_store::ResultSet;

/// The images one device processes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Batch {
    pub device_index: usize,
    pub images: Range<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Assignment of images to devices for one run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BatchPlan {
    pub num_images: usize,
    pub num_devices: usize,
    pub batch_size: usize,
    pub batches: Vec<Batch>,
    /// Result buffer the run writes into.
    pub target: ResultSet,
}

impl BatchPlan {
    /// Every image on device 0, into the baseline results.
    pub fn single(num_images: usize) -> Self {
        Self {
            num_images,
            num_devices: 1,
            batch_size: num_images,
            batches: vec![Batch {
                device_index: 0,
                images: 0..num_images,
            }],
            target: ResultSet::Baseline,
        }
    }

    /// Contiguous batches across `num_devices`, into the multi-device results.
    pub fn partitioned(num_images: usize, num_devices: usize) -> Result<Self, DispatchError> {
        if num_devices == 0 {
            return Err(DispatchError::NoDevices);
        }
        let batch_size = num_images / num_devices;
        let batches = (0..num_devices)
            .map(|device_index| Batch {
                device_index,
                images: device_index * batch_size..(device_index + 1) * batch_size,
            })
            .collect();
        let plan = Self {
            num_images,
            num_devices,
            batch_size,
            batches,
            target: ResultSet::Multi,
        };
        if !plan.dropped().is_empty() {
            tracing::debug!(
                "{} image(s) not divisible across {num_devices} device(s); images {:?} are skipped",
                plan.dropped().len(),
                plan.dropped()
            );
        }
        Ok(plan)
    }

    /// Number of images the plan processes.
    pub fn covered(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }

    /// Images left out of every batch.
    pub fn dropped(&self) -> Range<usize> {
        self.covered().min(self.num_images)..self.num_images
    }

    /// Images whose results this run produces, for cross-run comparison.
    pub fn compared_range(&self) -> Range<usize> {
        0..self.covered()
    }

    /// Checks that batches are contiguous from 0, one per device, in
    /// device order, equally sized, and within the image count.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.batches.len() != self.num_devices {
            return Err(DispatchError::InvalidPlan(format!(
                "{} batch(es) for {} device(s)",
                self.batches.len(),
                self.num_devices
            )));
        }
        let mut next = 0;
        for (i, batch) in self.batches.iter().enumerate() {
            if batch.device_index != i {
                return Err(DispatchError::InvalidPlan(format!(
                    "batch {i} is assigned to device {}",
                    batch.device_index
                )));
            }
            if batch.images.start != next {
                return Err(DispatchError::InvalidPlan(format!(
                    "batch {i} starts at image {}, expected {next}",
                    batch.images.start
                )));
            }
            if batch.len() != self.batch_size {
                return Err(DispatchError::InvalidPlan(format!(
                    "batch {i} has {} image(s), expected {}",
                    batch.len(),
                    self.batch_size
                )));
            }
            next = batch.images.end;
        }
        if next > self.num_images {
            return Err(DispatchError::InvalidPlan(format!(
                "plan covers {next} image(s) but only {} exist",
                self.num_images
            )));
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        let sizes: Vec<usize> = self.batches.iter().map(Batch::len).collect();
        format!(
            "{} image(s) over {} device(s): batch size {}, {} covered, {} dropped, batches {:?}",
            self.num_images,
            self.num_devices,
            self.batch_size,
            self.covered(),
            self.dropped().len(),
            sizes
        )
    }
}
