// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Context: the shared device clock and per-device memory.

use crate::queue::DeviceClock;
use crate::{
    CommandQueue, DeviceBuffer, DeviceMemory, MemoryStats, Platform, PlatformError, Program,
    StatusCode,
};
use std::path::Path;
use std::sync::Arc;

struct ContextInner {
    platform: Platform,
    clock: DeviceClock,
    memory: Vec<DeviceMemory>,
}

/// Owns every device of a discovered platform. Cheap to clone.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub fn new(platform: Platform) -> Self {
        let memory = platform
            .devices()
            .iter()
            .map(|d| DeviceMemory::new(d.index, d.memory))
            .collect();
        Self {
            inner: Arc::new(ContextInner {
                platform,
                clock: DeviceClock::new(),
                memory,
            }),
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.inner.platform
    }

    pub fn device_count(&self) -> usize {
        self.inner.memory.len()
    }

    /// Nanoseconds on the device clock shared by every queue of this context.
    pub fn now_ns(&self) -> u64 {
        self.inner.clock.now_ns()
    }

    /// Creates an in-order queue on `device_index`.
    pub fn create_queue(
        &self,
        device_index: usize,
        profiling: bool,
    ) -> Result<CommandQueue, PlatformError> {
        self.check_device("create_queue", device_index)?;
        CommandQueue::spawn(
            device_index,
            profiling,
            self.inner.clock,
            self.inner.platform.faults_for(device_index),
        )
    }

    /// Allocates a zeroed buffer of `len` f32 elements on `device_index`.
    pub fn create_buffer(&self, device_index: usize, len: usize) -> Result<DeviceBuffer, PlatformError> {
        self.check_device("create_buffer", device_index)?;
        if len == 0 {
            return Err(PlatformError::rejected("create_buffer", StatusCode::InvalidBufferSize));
        }
        let bytes = len
            .checked_mul(std::mem::size_of::<f32>())
            .ok_or_else(|| PlatformError::rejected("create_buffer", StatusCode::InvalidBufferSize))?;
        let reservation = self.inner.memory[device_index].reserve(bytes)?;
        Ok(DeviceBuffer::new(device_index, len, reservation))
    }

    /// Reads and builds a kernel program for every device of this context.
    pub fn build_program(&self, path: &Path, options: &str) -> Result<Program, PlatformError> {
        Program::build_from_file(path, options)
    }

    pub fn device_memory(&self, device_index: usize) -> Option<&DeviceMemory> {
        self.inner.memory.get(device_index)
    }

    pub fn memory_stats(&self, device_index: usize) -> Option<MemoryStats> {
        self.device_memory(device_index).map(DeviceMemory::stats)
    }

    fn check_device(&self, op: &'static str, device_index: usize) -> Result<(), PlatformError> {
        if device_index >= self.device_count() {
            return Err(PlatformError::rejected(op, StatusCode::InvalidDevice));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("platform", &self.inner.platform.info().name)
            .field("devices", &self.device_count())
            .finish()
    }
}
