// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The device pool: one [`Device`] per selected accelerator.
//!
//! ```text
//! DevicePool::initialize(config)
//!       │  discover → select → context → one queue per device
//!       ▼
//!   DevicePool ── install_kernels(program, entry)
//!       │
//!       ▼
//!   shutdown()  (finish + release every queue, then drop the context)
//! ```

use crate::PoolError;
use compute_platform::{
    CommandQueue, Context, DeviceInfo, Kernel, Platform, PlatformConfig, PlatformError,
    PlatformInfo, Program,
};

/// Pool configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Description of the platform to discover.
    pub platform: PlatformConfig,
    /// Substring the platform vendor must contain. Empty matches any vendor.
    pub vendor_filter: String,
    /// Use at most this many of the discovered devices.
    pub max_devices: Option<usize>,
    /// Create queues with profiling timestamps enabled.
    pub profiling: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            platform: PlatformConfig::default(),
            vendor_filter: String::new(),
            max_devices: None,
            profiling: false,
        }
    }
}

/// One device with its queue and (once installed) its kernel.
///
/// The kernel is owned by the device: argument binding needs `&mut Device`,
/// so two callers can never interleave bind-then-submit on one device.
pub struct Device {
    info: DeviceInfo,
    queue: CommandQueue,
    kernel: Option<Kernel>,
}

impl Device {
    pub fn index(&self) -> usize {
        self.info.index
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn kernel(&self) -> Option<&Kernel> {
        self.kernel.as_ref()
    }

    /// Queue and kernel together, for binding arguments then submitting.
    pub fn queue_and_kernel_mut(&mut self) -> (&CommandQueue, Option<&mut Kernel>) {
        (&self.queue, self.kernel.as_mut())
    }

    /// Drops the kernel's argument bindings so the bound buffers can be
    /// freed by their owner.
    pub fn unbind_kernel(&mut self) {
        if let Some(kernel) = self.kernel.as_mut() {
            kernel.clear_args();
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("index", &self.info.index)
            .field("name", &self.info.name)
            .field("kernel", &self.kernel.as_ref().map(Kernel::name))
            .finish()
    }
}

/// Owns every selected device and the shared context.
#[derive(Debug)]
pub struct DevicePool {
    platform: PlatformInfo,
    devices: Vec<Device>,
    context: Option<Context>,
    profiling: bool,
}

impl DevicePool {
    /// Discovers devices and creates one queue per selected device.
    pub fn initialize(config: &PoolConfig) -> Result<Self, PoolError> {
        let no_device = || PoolError::NoDeviceFound {
            vendor_filter: config.vendor_filter.clone(),
        };

        let mut platform = match Platform::discover(&config.platform, &config.vendor_filter) {
            Ok(p) => p,
            Err(PlatformError::NoDeviceFound { .. }) => return Err(no_device()),
            Err(e) => return Err(e.into()),
        };
        if let Some(max) = config.max_devices {
            if max == 0 {
                return Err(no_device());
            }
            platform.truncate_devices(max);
        }

        let info = platform.info().clone();
        tracing::info!("platform: {} ({}), version {}", info.name, info.vendor, info.version);

        let context = Context::new(platform);
        let mut devices = Vec::with_capacity(context.device_count());
        for device_info in context.platform().devices() {
            tracing::info!(
                "device {}: {} [{}]",
                device_info.index,
                device_info.name,
                device_info.memory
            );
            let queue = context.create_queue(device_info.index, config.profiling)?;
            devices.push(Device {
                info: device_info.clone(),
                queue,
                kernel: None,
            });
        }

        Ok(Self {
            platform: info,
            devices,
            context: Some(context),
            profiling: config.profiling,
        })
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    /// The shared context. Fails after [`shutdown`](Self::shutdown).
    pub fn context(&self) -> Result<&Context, PoolError> {
        self.context.as_ref().ok_or(PoolError::ShutDown)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Exclusive access to every device, for handing out to dispatch lanes.
    pub fn devices_mut(&mut self) -> &mut [Device] {
        &mut self.devices
    }

    pub fn device(&self, index: usize) -> Option<&Device> {
        self.devices.get(index)
    }

    pub fn profiling_enabled(&self) -> bool {
        self.profiling
    }

    pub fn is_shut_down(&self) -> bool {
        self.context.is_none()
    }

    /// Creates one `entry_point` kernel per device.
    pub fn install_kernels(&mut self, program: &Program, entry_point: &str) -> Result<(), PoolError> {
        if self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }
        for device in &mut self.devices {
            device.kernel = Some(program.create_kernel(entry_point)?);
        }
        tracing::debug!(
            "kernel '{entry_point}' installed on {} device(s)",
            self.devices.len()
        );
        Ok(())
    }

    /// Unbinds the kernel arguments on every device.
    pub fn unbind_kernels(&mut self) {
        for device in &mut self.devices {
            device.unbind_kernel();
        }
    }

    /// Blocks until every queue is idle. Every queue is drained even if
    /// one of them fails; the first failure is returned.
    pub fn finish_all(&self) -> Result<(), PoolError> {
        let mut first_err = None;
        for device in &self.devices {
            if let Err(e) = device.queue.finish() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Releases every queue, then the context. Calling it again is a no-op.
    pub fn shutdown(&mut self) {
        let Some(context) = self.context.take() else {
            return;
        };
        for device in self.devices.drain(..) {
            if let Err(e) = device.queue.finish() {
                tracing::warn!("device {}: drain before release failed: {e}", device.info.index);
            }
            device.queue.release();
        }
        drop(context);
        tracing::info!("device pool shut down");
    }
}

impl Drop for DevicePool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
