// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host- and device-resident `f32` image buffers.
//!
//! Both buffer types are shared handles: cloning one yields another handle
//! to the same storage. A queue worker holds a clone while a transfer or
//! kernel that touches the buffer is in flight, so storage cannot be freed
//! under a running command.

use crate::memory::Reservation;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::sync::Arc;

/// A host-side image buffer.
#[derive(Clone)]
pub struct HostBuffer {
    data: Arc<RwLock<Vec<f32>>>,
}

impl HostBuffer {
    /// A zero-filled buffer of `len` elements.
    pub fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![0.0; len])
    }

    pub fn from_vec(data: Vec<f32>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Number of `f32` elements.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<f32>> {
        self.data.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<f32>> {
        self.data.write()
    }

    /// Copies the current contents out.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.read().clone()
    }

    /// Overwrites every element with `value`.
    pub fn fill(&self, value: f32) {
        self.data.write().fill(value);
    }

    /// Returns `true` if both handles refer to the same storage.
    pub fn shares_storage_with(&self, other: &HostBuffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBuffer").field("len", &self.len()).finish()
    }
}

/// A buffer resident on one device.
///
/// Device buffers are created through
/// [`Context::create_buffer`](crate::Context::create_buffer), which reserves
/// the device memory. Contents are only reachable through commands
/// submitted to that device's queue.
#[derive(Clone)]
pub struct DeviceBuffer {
    inner: Arc<DeviceBufferInner>,
}

struct DeviceBufferInner {
    device_index: usize,
    data: RwLock<Vec<f32>>,
    _reservation: Reservation,
}

impl DeviceBuffer {
    pub(crate) fn new(device_index: usize, len: usize, reservation: Reservation) -> Self {
        Self {
            inner: Arc::new(DeviceBufferInner {
                device_index,
                data: RwLock::new(vec![0.0; len]),
                _reservation: reservation,
            }),
        }
    }

    pub fn device_index(&self) -> usize {
        self.inner.device_index
    }

    pub fn len(&self) -> usize {
        self.inner.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.len() * std::mem::size_of::<f32>()
    }

    /// Returns `true` if both handles refer to the same device allocation.
    pub fn shares_storage_with(&self, other: &DeviceBuffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<f32>> {
        self.inner.data.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Vec<f32>> {
        self.inner.data.write()
    }
}

impl fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("device_index", &self.inner.device_index)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceMemory, MemoryCapacity};

    #[test]
    fn test_host_buffer_basics() {
        let b = HostBuffer::zeroed(8);
        assert_eq!(b.len(), 8);
        assert!(b.read().iter().all(|&v| v == 0.0));
        b.fill(1.5);
        assert_eq!(b.to_vec(), vec![1.5; 8]);
    }

    #[test]
    fn test_host_buffer_aliasing() {
        let a = HostBuffer::zeroed(4);
        let alias = a.clone();
        let other = HostBuffer::zeroed(4);
        assert!(a.shares_storage_with(&alias));
        assert!(!a.shares_storage_with(&other));

        alias.write()[0] = 7.0;
        assert_eq!(a.read()[0], 7.0);
        assert_eq!(other.read()[0], 0.0);
    }

    #[test]
    fn test_device_buffer_releases_memory_on_last_drop() {
        let mem = DeviceMemory::new(1, MemoryCapacity::from_bytes(1024));
        let buf = DeviceBuffer::new(1, 16, mem.reserve(64).unwrap());
        assert_eq!(buf.size_bytes(), 64);
        assert_eq!(buf.device_index(), 1);

        let handle = buf.clone();
        drop(buf);
        assert_eq!(mem.reserved_bytes(), 64);
        drop(handle);
        assert_eq!(mem.reserved_bytes(), 0);
    }
}
