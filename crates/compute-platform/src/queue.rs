// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! In-order command queues.
//!
//! Each queue owns one worker thread fed over a channel. Commands run
//! strictly in submission order; before running, a command waits on every
//! token in its wait list, which may belong to any queue.

use crate::{
    CommandKind, CompletionToken, DeviceBuffer, FaultInjection, HostBuffer, Kernel,
    KernelAlgorithm, PlatformError, StatusCode,
};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::thread::JoinHandle;
use std::time::Instant;

/// Label carried by write-buffer tokens.
pub const WRITE_LABEL: &str = "upload";
/// Label carried by read-buffer tokens.
pub const READ_LABEL: &str = "download";
const MARKER_LABEL: &str = "finish";

/// Nanoseconds since context creation. Never returns zero.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeviceClock {
    epoch: Instant,
}

impl DeviceClock {
    pub(crate) fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    pub(crate) fn now_ns(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos())
            .unwrap_or(u64::MAX)
            .max(1)
    }
}

enum Operation {
    Write {
        dst: DeviceBuffer,
        src: HostBuffer,
    },
    Kernel {
        algorithm: KernelAlgorithm,
        input: DeviceBuffer,
        output: DeviceBuffer,
        width: usize,
        height: usize,
    },
    Read {
        src: DeviceBuffer,
        dst: HostBuffer,
    },
    Marker,
}

struct Command {
    token: CompletionToken,
    wait_list: Vec<CompletionToken>,
    op: Operation,
}

/// An in-order command queue bound to one device.
pub struct CommandQueue {
    device_index: usize,
    profiling: bool,
    clock: DeviceClock,
    sender: Mutex<Option<Sender<Command>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CommandQueue {
    pub(crate) fn spawn(
        device_index: usize,
        profiling: bool,
        clock: DeviceClock,
        faults: Vec<FaultInjection>,
    ) -> Result<Self, PlatformError> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let worker = std::thread::Builder::new()
            .name(format!("device-{device_index}-queue"))
            .spawn(move || run_worker(device_index, clock, faults, receiver))
            .map_err(|e| {
                tracing::error!("failed to spawn queue worker for device {device_index}: {e}");
                PlatformError::rejected("create_queue", StatusCode::OutOfHostMemory)
            })?;

        tracing::debug!("command queue created on device {device_index} (profiling: {profiling})");
        Ok(Self {
            device_index,
            profiling,
            clock,
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn device_index(&self) -> usize {
        self.device_index
    }

    pub fn profiling_enabled(&self) -> bool {
        self.profiling
    }

    /// Returns `true` after [`release`](Self::release).
    pub fn is_released(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Copies `src` into the device buffer `dst`.
    ///
    /// With `blocking`, returns only after the copy has completed.
    pub fn enqueue_write_buffer(
        &self,
        dst: &DeviceBuffer,
        blocking: bool,
        src: &HostBuffer,
        wait_list: &[CompletionToken],
    ) -> Result<CompletionToken, PlatformError> {
        const OP: &str = "enqueue_write_buffer";
        self.check_device(OP, dst)?;
        if dst.len() != src.len() {
            return Err(PlatformError::rejected(OP, StatusCode::InvalidBufferSize));
        }
        let token = self.submit(
            OP,
            CommandKind::WriteBuffer,
            WRITE_LABEL,
            wait_list,
            Operation::Write {
                dst: dst.clone(),
                src: src.clone(),
            },
        )?;
        if blocking {
            token.wait()?;
        }
        Ok(token)
    }

    /// Runs `kernel` over a `[width, height]` grid.
    ///
    /// Arguments are captured at submission; rebinding the kernel afterwards
    /// does not affect commands already queued.
    pub fn enqueue_kernel(
        &self,
        kernel: &Kernel,
        global_size: [usize; 2],
        wait_list: &[CompletionToken],
    ) -> Result<CompletionToken, PlatformError> {
        const OP: &str = "enqueue_kernel";
        let (input, output) = kernel
            .bound_args()
            .ok_or_else(|| PlatformError::rejected(OP, StatusCode::InvalidKernelArgs))?;
        self.check_device(OP, input)?;
        self.check_device(OP, output)?;

        let [width, height] = global_size;
        let cells = width.checked_mul(height).unwrap_or(0);
        if cells == 0 || cells != input.len() || cells != output.len() {
            return Err(PlatformError::rejected(OP, StatusCode::InvalidGlobalWorkSize));
        }

        self.submit(
            OP,
            CommandKind::Kernel,
            kernel.name(),
            wait_list,
            Operation::Kernel {
                algorithm: kernel.algorithm().clone(),
                input: input.clone(),
                output: output.clone(),
                width,
                height,
            },
        )
    }

    /// Copies the device buffer `src` into `dst`.
    pub fn enqueue_read_buffer(
        &self,
        src: &DeviceBuffer,
        blocking: bool,
        dst: &HostBuffer,
        wait_list: &[CompletionToken],
    ) -> Result<CompletionToken, PlatformError> {
        const OP: &str = "enqueue_read_buffer";
        self.check_device(OP, src)?;
        if dst.len() != src.len() {
            return Err(PlatformError::rejected(OP, StatusCode::InvalidBufferSize));
        }
        let token = self.submit(
            OP,
            CommandKind::ReadBuffer,
            READ_LABEL,
            wait_list,
            Operation::Read {
                src: src.clone(),
                dst: dst.clone(),
            },
        )?;
        if blocking {
            token.wait()?;
        }
        Ok(token)
    }

    /// Blocks until every previously submitted command has finished.
    pub fn finish(&self) -> Result<(), PlatformError> {
        let marker = self.submit("finish", CommandKind::Marker, MARKER_LABEL, &[], Operation::Marker)?;
        marker.wait()
    }

    /// Stops accepting commands, drains the queue, and joins the worker.
    /// Calling it again is a no-op.
    pub fn release(&self) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        drop(sender);
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::warn!("queue worker for device {} panicked", self.device_index);
            }
        }
        tracing::debug!("command queue on device {} released", self.device_index);
    }

    fn check_device(&self, op: &'static str, buffer: &DeviceBuffer) -> Result<(), PlatformError> {
        if buffer.device_index() != self.device_index {
            return Err(PlatformError::rejected(op, StatusCode::InvalidMemObject));
        }
        Ok(())
    }

    fn submit(
        &self,
        op_name: &'static str,
        kind: CommandKind,
        label: &str,
        wait_list: &[CompletionToken],
        op: Operation,
    ) -> Result<CompletionToken, PlatformError> {
        let sender = self.sender.lock();
        let sender = sender
            .as_ref()
            .ok_or_else(|| PlatformError::rejected(op_name, StatusCode::InvalidCommandQueue))?;

        let token = CompletionToken::new(
            kind,
            label,
            self.device_index,
            wait_list,
            self.profiling,
            self.clock.now_ns(),
        );
        let command = Command {
            token: token.clone(),
            wait_list: wait_list.to_vec(),
            op,
        };
        sender
            .send(command)
            .map_err(|_| PlatformError::rejected(op_name, StatusCode::InvalidCommandQueue))?;
        Ok(token)
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue")
            .field("device_index", &self.device_index)
            .field("profiling", &self.profiling)
            .field("released", &self.is_released())
            .finish()
    }
}

fn run_worker(
    device_index: usize,
    clock: DeviceClock,
    mut faults: Vec<FaultInjection>,
    receiver: Receiver<Command>,
) {
    let mut executed: HashMap<CommandKind, usize> = HashMap::new();

    for command in receiver {
        let token = command.token;
        token.mark_submitted(clock.now_ns());

        if CompletionToken::wait_all(&command.wait_list).is_err() {
            tracing::warn!(
                "device {device_index}: {} '{}' skipped, a dependency failed",
                token.kind(),
                token.label()
            );
            // Buffer handles go before the token signals.
            drop(command.op);
            token.fail(StatusCode::ExecStatusErrorForEventsInWaitList, clock.now_ns());
            continue;
        }

        let nth = executed.entry(token.kind()).or_insert(0);
        let ordinal = *nth;
        *nth += 1;
        if let Some(pos) = faults
            .iter()
            .position(|f| f.kind == token.kind() && f.after == ordinal)
        {
            faults.remove(pos);
            tracing::warn!(
                "device {device_index}: injected fault on {} '{}' (#{ordinal})",
                token.kind(),
                token.label()
            );
            drop(command.op);
            token.fail(StatusCode::OutOfResources, clock.now_ns());
            continue;
        }

        token.mark_running(clock.now_ns());
        match execute(command.op) {
            Ok(()) => {
                token.complete(clock.now_ns());
                tracing::trace!("device {device_index}: {} '{}' complete", token.kind(), token.label());
            }
            Err(status) => {
                tracing::warn!(
                    "device {device_index}: {} '{}' failed: {status}",
                    token.kind(),
                    token.label()
                );
                token.fail(status, clock.now_ns());
            }
        }
    }
}

/// Host buffers may be resized between submission and execution, so
/// lengths are checked again here.
fn execute(op: Operation) -> Result<(), StatusCode> {
    match op {
        Operation::Write { dst, src } => copy_checked(&src.read(), &mut dst.write()),
        Operation::Read { src, dst } => copy_checked(&src.read(), &mut dst.write()),
        Operation::Kernel {
            algorithm,
            input,
            output,
            width,
            height,
        } => {
            if input.shares_storage_with(&output) {
                let snapshot = input.read().clone();
                algorithm.apply(&snapshot, &mut output.write(), width, height);
            } else {
                algorithm.apply(&input.read(), &mut output.write(), width, height);
            }
            Ok(())
        }
        Operation::Marker => Ok(()),
    }
}

fn copy_checked(src: &[f32], dst: &mut [f32]) -> Result<(), StatusCode> {
    if src.len() != dst.len() {
        return Err(StatusCode::InvalidBufferSize);
    }
    dst.copy_from_slice(src);
    Ok(())
}
