// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`DispatchStrategy`] trait and the three strategies.

pub mod serial;
pub mod single;
pub mod threaded;

use crate::{run_one, BatchPlan, DeviceLane, DispatchError, PipelineTokens};
use std::ops::Range;
use work_store::{ResultSet, WorkItemStore};

pub use serial::MultiDeviceSerial;
pub use single::SingleDevice;
pub use threaded::MultiDeviceThreaded;

/// A sequencing policy over pipeline submissions.
///
/// `dispatch` only submits work; the caller waits on the returned download
/// tokens.
pub trait DispatchStrategy: Send + Sync {
    /// Short name, as accepted by [`strategy_from_name`].
    fn name(&self) -> &str;

    /// Report label for a run over `num_devices` devices.
    fn label(&self, num_devices: usize) -> String;

    /// Result buffer this strategy writes into.
    fn target(&self) -> ResultSet;

    /// Assigns images to devices.
    fn plan(&self, num_images: usize, num_devices: usize) -> Result<BatchPlan, DispatchError>;

    /// Submits every pipeline of `plan`, one lane per device.
    fn dispatch(
        &self,
        plan: &BatchPlan,
        lanes: &mut [DeviceLane<'_>],
        store: &WorkItemStore,
    ) -> Result<Vec<PipelineTokens>, DispatchError>;
}

/// Looks up a strategy by name.
pub fn strategy_from_name(name: &str) -> Result<Box<dyn DispatchStrategy>, DispatchError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "single" | "single-device" => Ok(Box::new(SingleDevice::new())),
        "multi-serial" | "serial" => Ok(Box::new(MultiDeviceSerial::new())),
        "multi-threaded" | "threaded" => Ok(Box::new(MultiDeviceThreaded::new())),
        _ => Err(DispatchError::UnknownStrategy(name.to_string())),
    }
}

/// All strategies, baseline first.
pub fn all_strategies() -> Vec<Box<dyn DispatchStrategy>> {
    vec![
        Box::new(SingleDevice::new()),
        Box::new(MultiDeviceSerial::new()),
        Box::new(MultiDeviceThreaded::new()),
    ]
}

/// Issues `images` on `lane`, in index order, into the `target` results.
pub(crate) fn issue_batch(
    lane: &mut DeviceLane<'_>,
    images: Range<usize>,
    store: &WorkItemStore,
    target: ResultSet,
) -> Result<Vec<PipelineTokens>, DispatchError> {
    let items = store.items_in(images.clone())?;
    tracing::debug!("device {}: issuing images {images:?}", lane.device_index());
    items
        .iter()
        .map(|item| run_one(lane, item, item.result(target)))
        .collect()
}

/// Checks that batch `i` belongs to the device of lane `i`.
pub(crate) fn check_lanes(plan: &BatchPlan, lanes: &[DeviceLane<'_>]) -> Result<(), DispatchError> {
    plan.validate()?;
    if lanes.len() != plan.batches.len() {
        return Err(DispatchError::InvalidPlan(format!(
            "{} batch(es) for {} lane(s)",
            plan.batches.len(),
            lanes.len()
        )));
    }
    if let Some((lane, batch)) = lanes
        .iter()
        .zip(&plan.batches)
        .find(|(lane, batch)| lane.device_index() != batch.device_index)
    {
        return Err(DispatchError::InvalidPlan(format!(
            "batch for device {} paired with lane for device {}",
            batch.device_index,
            lane.device_index()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_from_name() {
        assert_eq!(strategy_from_name("single").unwrap().name(), "single");
        assert_eq!(strategy_from_name("single-device").unwrap().name(), "single");
        assert_eq!(strategy_from_name("Serial").unwrap().name(), "multi-serial");
        assert_eq!(strategy_from_name(" multi-threaded ").unwrap().name(), "multi-threaded");
        assert!(matches!(
            strategy_from_name("round-robin"),
            Err(DispatchError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_labels() {
        let names: Vec<String> = all_strategies().iter().map(|s| s.label(4)).collect();
        assert_eq!(
            names,
            vec![
                "single device",
                "4x device (single thread)",
                "4x device (multi thread)"
            ]
        );
    }

    #[test]
    fn test_targets() {
        let targets: Vec<ResultSet> = all_strategies().iter().map(|s| s.target()).collect();
        assert_eq!(targets, vec![ResultSet::Baseline, ResultSet::Multi, ResultSet::Multi]);
    }
}
