// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The per-image pipeline: upload → compute → download.
//!
//! ```text
//!  host input ──upload──► dev input ──kernel──► dev output ──download──► result
//!             (blocking)            waits on              waits on
//!                                   upload                compute
//! ```
//!
//! Ordering between stages is carried by completion tokens, not by
//! blocking the issuing thread. Only the upload blocks, which bounds how
//! far the controller can run ahead of the device.

use crate::{DeviceLane, DispatchError};
use compute_platform::{
    CommandKind, CommandStatus, CompletionToken, HostBuffer, PlatformError, StatusCode,
};
use std::fmt;
use work_store::WorkItem;

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Upload,
    Compute,
    Download,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Upload, Stage::Compute, Stage::Download];

    /// The stage a command of `kind` belongs to.
    pub fn from_kind(kind: CommandKind) -> Option<Stage> {
        match kind {
            CommandKind::WriteBuffer => Some(Stage::Upload),
            CommandKind::Kernel => Some(Stage::Compute),
            CommandKind::ReadBuffer => Some(Stage::Download),
            CommandKind::Marker => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Upload => "upload",
            Stage::Compute => "compute",
            Stage::Download => "download",
        })
    }
}

/// The three tokens of one image's pipeline.
#[derive(Debug, Clone)]
pub struct PipelineTokens {
    pub image: usize,
    pub device_index: usize,
    pub upload: CompletionToken,
    pub compute: CompletionToken,
    pub download: CompletionToken,
}

impl PipelineTokens {
    pub fn token(&self, stage: Stage) -> &CompletionToken {
        match stage {
            Stage::Upload => &self.upload,
            Stage::Compute => &self.compute,
            Stage::Download => &self.download,
        }
    }

    /// `(stage, token)` pairs in pipeline order.
    pub fn stages(&self) -> impl Iterator<Item = (Stage, &CompletionToken)> {
        Stage::ALL.into_iter().map(move |stage| (stage, self.token(stage)))
    }
}

/// Issues the upload → compute → download chain for `item` on `lane`,
/// downloading into `output`.
pub fn run_one(
    lane: &mut DeviceLane<'_>,
    item: &WorkItem,
    output: &HostBuffer,
) -> Result<PipelineTokens, DispatchError> {
    let device_index = lane.device.index();
    let failed = |stage: Stage| {
        move |source: PlatformError| DispatchError::DeviceOperationFailed {
            stage,
            device_index,
            source,
        }
    };

    let (queue, kernel) = lane.device.queue_and_kernel_mut();
    let kernel = kernel.ok_or(DispatchError::KernelNotInstalled { device_index })?;
    let buffers = lane.buffers;

    let reuse = lane.reuse_dependency;
    let previous = lane.last_pipeline.as_ref().filter(|_| reuse);
    let reuse_wait: Vec<CompletionToken> = previous.map(|p| p.download.clone()).into_iter().collect();
    let upload = match queue.enqueue_write_buffer(&buffers.input, true, item.input(), &reuse_wait) {
        Ok(token) => token,
        Err(source) => {
            // A failed predecessor on this lane is the root cause.
            if let Some(Err(root)) = previous.map(|p| wait_for_pipelines(std::slice::from_ref(p))) {
                return Err(root);
            }
            return Err(failed(Stage::Upload)(source));
        }
    };

    kernel
        .set_arg(0, &buffers.input)
        .and_then(|()| kernel.set_arg(1, &buffers.output))
        .map_err(failed(Stage::Compute))?;
    let compute = queue
        .enqueue_kernel(kernel, lane.global_size, std::slice::from_ref(&upload))
        .map_err(failed(Stage::Compute))?;

    let download = queue
        .enqueue_read_buffer(&buffers.output, false, output, std::slice::from_ref(&compute))
        .map_err(failed(Stage::Download))?;

    tracing::trace!("image {} issued on device {device_index}", item.index());
    let tokens = PipelineTokens {
        image: item.index(),
        device_index,
        upload,
        compute,
        download,
    };
    lane.last_pipeline = Some(tokens.clone());
    Ok(tokens)
}

/// Blocks until every download in `pipelines` has signalled.
///
/// On failure, reports the stage that failed first-hand rather than one
/// that failed only because a dependency did.
pub fn wait_for_pipelines(pipelines: &[PipelineTokens]) -> Result<(), DispatchError> {
    if CompletionToken::wait_all(pipelines.iter().map(|p| &p.download)).is_ok() {
        return Ok(());
    }
    // Every upstream token is terminal once its download is.
    let failed = pipelines
        .iter()
        .flat_map(|p| p.stages().map(move |(stage, token)| (p.device_index, stage, token)))
        .filter(|(_, _, token)| matches!(token.status(), CommandStatus::Failed(_)));

    let mut fallback = None;
    for (device_index, stage, token) in failed {
        let Err(source) = token.wait() else { continue };
        if source.status() != StatusCode::ExecStatusErrorForEventsInWaitList {
            return Err(DispatchError::DeviceOperationFailed {
                stage,
                device_index,
                source,
            });
        }
        fallback.get_or_insert(DispatchError::DeviceOperationFailed {
            stage,
            device_index,
            source,
        });
    }
    match fallback {
        Some(e) => Err(e),
        None => Err(DispatchError::InvalidPlan(
            "a download failed but no failed stage was found".into(),
        )),
    }
}
