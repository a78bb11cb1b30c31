// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # compute-platform
//!
//! Host-simulated accelerator platform. Each device is backed by a worker
//! thread running an in-order command queue, so multi-device dispatch code
//! can be exercised on any machine.
//!
//! ## Key types
//! - [`Platform`] / [`Context`]: device discovery and ownership
//! - [`CommandQueue`]: in-order submission of write / kernel / read commands
//! - [`CompletionToken`]: per-command completion handle with profiling timestamps
//! - [`Program`] / [`Kernel`]: kernel build from a TOML descriptor
//! - [`StatusCode`]: the device status table
//!
//! ## Example
//! ```
//! use compute_platform::{Context, HostBuffer, Platform, PlatformConfig, Program};
//!
//! let platform = Platform::discover(&PlatformConfig::default(), "").unwrap();
//! let ctx = Context::new(platform);
//! let queue = ctx.create_queue(0, true).unwrap();
//!
//! let program = Program::build("inline", "[kernels.copy]\nalgorithm = \"copy\"\n", "").unwrap();
//! let mut kernel = program.create_kernel("copy").unwrap();
//! let input = ctx.create_buffer(0, 4).unwrap();
//! let output = ctx.create_buffer(0, 4).unwrap();
//! kernel.set_arg(0, &input).unwrap();
//! kernel.set_arg(1, &output).unwrap();
//!
//! let host_in = HostBuffer::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
//! let host_out = HostBuffer::zeroed(4);
//! let up = queue.enqueue_write_buffer(&input, false, &host_in, &[]).unwrap();
//! let run = queue.enqueue_kernel(&kernel, [2, 2], &[up]).unwrap();
//! queue.enqueue_read_buffer(&output, true, &host_out, &[run]).unwrap();
//! assert_eq!(host_out.to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
//! ```

pub mod buffer;
pub mod context;
pub mod error;
pub mod kernel;
pub mod memory;
pub mod platform;
pub mod program;
pub mod queue;
pub mod status;
pub mod token;

pub use buffer::{DeviceBuffer, HostBuffer};
pub use context::Context;
pub use error::PlatformError;
pub use kernel::{Kernel, KernelAlgorithm, KERNEL_ARG_COUNT};
pub use memory::{DeviceMemory, MemoryCapacity, MemoryStats, Reservation};
pub use platform::{DeviceInfo, FaultInjection, Platform, PlatformConfig, PlatformInfo};
pub use program::Program;
pub use queue::{CommandQueue, READ_LABEL, WRITE_LABEL};
pub use status::StatusCode;
pub use token::{CommandKind, CommandStatus, CompletionToken, ProfilingInfo};
