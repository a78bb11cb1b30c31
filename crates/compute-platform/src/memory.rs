// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-device memory accounting.
//!
//! Each simulated device has a fixed [`MemoryCapacity`]. Buffers reserve
//! bytes from their device's [`DeviceMemory`] and hold a [`Reservation`];
//! dropping the reservation returns the bytes.
//!
//! ```text
//! DeviceMemory::reserve(bytes)
//!       │
//!       ▼
//!   Reservation  ◄─── holds Arc<MemoryInner>
//!       │
//!       │  drop()
//!       ▼
//!   MemoryInner::release(bytes)
//! ```
//!
//! Exceeding the capacity is a hard failure. There is no eviction and no
//! retry: a benchmark that cannot place its buffers must not run.

use crate::PlatformError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Memory capacity of one device.
///
/// # Parsing
/// - `"512M"` or `"512MB"` → 512 × 1024² bytes
/// - `"1G"` or `"1GB"` → 1024³ bytes
/// - `"2048K"` or `"2048KB"` → 2048 × 1024 bytes
/// - `"1073741824"` → raw byte count
///
/// ```
/// use compute_platform::MemoryCapacity;
///
/// assert_eq!(MemoryCapacity::parse("1G").unwrap().as_mb(), 1024);
/// assert_eq!(MemoryCapacity::from_mb(64).as_bytes(), 64 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MemoryCapacity {
    bytes: usize,
}

impl MemoryCapacity {
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    pub fn from_mb(mb: usize) -> Self {
        Self {
            bytes: mb * 1024 * 1024,
        }
    }

    pub fn from_gb(gb: usize) -> Self {
        Self {
            bytes: gb * 1024 * 1024 * 1024,
        }
    }

    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Capacity in megabytes (truncated).
    pub fn as_mb(&self) -> usize {
        self.bytes / (1024 * 1024)
    }

    /// Parses a human-readable capacity string. Case-insensitive.
    pub fn parse(s: &str) -> Result<Self, PlatformError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PlatformError::ConfigError(
                "empty device memory capacity".into(),
            ));
        }

        let upper = s.to_uppercase();
        let (num_str, multiplier) = if upper.ends_with("GB") {
            (&s[..s.len() - 2], 1024 * 1024 * 1024)
        } else if upper.ends_with('G') {
            (&s[..s.len() - 1], 1024 * 1024 * 1024)
        } else if upper.ends_with("MB") {
            (&s[..s.len() - 2], 1024 * 1024)
        } else if upper.ends_with('M') {
            (&s[..s.len() - 1], 1024 * 1024)
        } else if upper.ends_with("KB") {
            (&s[..s.len() - 2], 1024)
        } else if upper.ends_with('K') {
            (&s[..s.len() - 1], 1024)
        } else if upper.ends_with('B') {
            (&s[..s.len() - 1], 1)
        } else {
            (s, 1)
        };

        let value: usize = num_str.trim().parse().map_err(|_| {
            PlatformError::ConfigError(format!(
                "invalid device memory '{s}': expected a number with an optional K/M/G suffix"
            ))
        })?;
        let bytes = value.checked_mul(multiplier).ok_or_else(|| {
            PlatformError::ConfigError(format!("device memory overflow: '{s}'"))
        })?;
        if bytes == 0 {
            return Err(PlatformError::ConfigError(
                "device memory capacity must be non-zero".into(),
            ));
        }
        Ok(Self { bytes })
    }
}

impl fmt::Display for MemoryCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const GB: usize = 1024 * 1024 * 1024;
        const MB: usize = 1024 * 1024;
        if self.bytes >= GB && self.bytes % GB == 0 {
            write!(f, "{} GB", self.bytes / GB)
        } else if self.bytes >= MB && self.bytes % MB == 0 {
            write!(f, "{} MB", self.bytes / MB)
        } else if self.bytes >= 1024 && self.bytes % 1024 == 0 {
            write!(f, "{} KB", self.bytes / 1024)
        } else {
            write!(f, "{} B", self.bytes)
        }
    }
}

/// Cumulative allocation statistics for one device.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MemoryStats {
    /// Successful reservations.
    pub allocations: u64,
    /// Reservations returned.
    pub releases: u64,
    /// Reservation requests refused for lack of capacity.
    pub failed_allocations: u64,
    /// High-water mark of reserved bytes.
    pub peak_reserved_bytes: usize,
}

struct MemoryInner {
    device_index: usize,
    capacity: MemoryCapacity,
    reserved: AtomicUsize,
    stats: Mutex<MemoryStats>,
}

impl MemoryInner {
    fn release(&self, bytes: usize) {
        self.reserved.fetch_sub(bytes, Ordering::AcqRel);
        self.stats.lock().releases += 1;
    }
}

/// Memory accountant for one device.
#[derive(Clone)]
pub struct DeviceMemory {
    inner: Arc<MemoryInner>,
}

impl DeviceMemory {
    pub fn new(device_index: usize, capacity: MemoryCapacity) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                device_index,
                capacity,
                reserved: AtomicUsize::new(0),
                stats: Mutex::new(MemoryStats::default()),
            }),
        }
    }

    /// Reserves `bytes` of device memory.
    pub fn reserve(&self, bytes: usize) -> Result<Reservation, PlatformError> {
        let capacity = self.inner.capacity.as_bytes();
        let mut current = self.inner.reserved.load(Ordering::Acquire);
        loop {
            let next = current.checked_add(bytes).filter(|&n| n <= capacity);
            let Some(next) = next else {
                self.inner.stats.lock().failed_allocations += 1;
                return Err(PlatformError::AllocationFailure {
                    device_index: self.inner.device_index,
                    requested_bytes: bytes,
                    available_bytes: capacity.saturating_sub(current),
                    capacity_bytes: capacity,
                });
            };
            match self.inner.reserved.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let mut stats = self.inner.stats.lock();
                    stats.allocations += 1;
                    stats.peak_reserved_bytes = stats.peak_reserved_bytes.max(next);
                    break;
                }
                Err(observed) => current = observed,
            }
        }
        Ok(Reservation {
            memory: Arc::clone(&self.inner),
            bytes,
        })
    }

    pub fn capacity(&self) -> MemoryCapacity {
        self.inner.capacity
    }

    pub fn reserved_bytes(&self) -> usize {
        self.inner.reserved.load(Ordering::Acquire)
    }

    pub fn available_bytes(&self) -> usize {
        self.inner
            .capacity
            .as_bytes()
            .saturating_sub(self.reserved_bytes())
    }

    pub fn stats(&self) -> MemoryStats {
        self.inner.stats.lock().clone()
    }
}

impl fmt::Debug for DeviceMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceMemory")
            .field("device_index", &self.inner.device_index)
            .field("capacity", &self.inner.capacity)
            .field("reserved_bytes", &self.reserved_bytes())
            .finish()
    }
}

/// RAII handle on reserved device memory.
pub struct Reservation {
    memory: Arc<MemoryInner>,
    bytes: usize,
}

impl Reservation {
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.memory.release(self.bytes);
    }
}

impl fmt::Debug for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("device_index", &self.memory.device_index)
            .field("bytes", &self.bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(MemoryCapacity::parse("512M").unwrap().as_mb(), 512);
        assert_eq!(MemoryCapacity::parse("512mb").unwrap().as_mb(), 512);
        assert_eq!(MemoryCapacity::parse("2G").unwrap().as_mb(), 2048);
        assert_eq!(MemoryCapacity::parse("1024K").unwrap().as_bytes(), 1024 * 1024);
        assert_eq!(MemoryCapacity::parse("4096").unwrap().as_bytes(), 4096);
        assert_eq!(MemoryCapacity::parse("  1GB ").unwrap().as_mb(), 1024);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(MemoryCapacity::parse("").is_err());
        assert!(MemoryCapacity::parse("lots").is_err());
        assert!(MemoryCapacity::parse("0M").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(MemoryCapacity::from_gb(1).to_string(), "1 GB");
        assert_eq!(MemoryCapacity::from_mb(256).to_string(), "256 MB");
        assert_eq!(MemoryCapacity::from_bytes(2048).to_string(), "2 KB");
        assert_eq!(MemoryCapacity::from_bytes(10).to_string(), "10 B");
    }

    #[test]
    fn test_serde_roundtrip() {
        let c = MemoryCapacity::from_mb(64);
        let json = serde_json::to_string(&c).unwrap();
        let back: MemoryCapacity = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }

    #[test]
    fn test_reserve_and_release() {
        let mem = DeviceMemory::new(0, MemoryCapacity::from_bytes(1000));
        let r = mem.reserve(600).unwrap();
        assert_eq!(mem.reserved_bytes(), 600);
        assert_eq!(mem.available_bytes(), 400);
        assert_eq!(r.bytes(), 600);
        drop(r);
        assert_eq!(mem.reserved_bytes(), 0);

        let stats = mem.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.releases, 1);
        assert_eq!(stats.peak_reserved_bytes, 600);
    }

    #[test]
    fn test_over_capacity() {
        let mem = DeviceMemory::new(3, MemoryCapacity::from_bytes(1000));
        let _a = mem.reserve(800).unwrap();
        let err = mem.reserve(300).unwrap_err();
        match err {
            PlatformError::AllocationFailure {
                device_index,
                requested_bytes,
                available_bytes,
                ..
            } => {
                assert_eq!(device_index, 3);
                assert_eq!(requested_bytes, 300);
                assert_eq!(available_bytes, 200);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(mem.stats().failed_allocations, 1);
        assert_eq!(mem.reserved_bytes(), 800);
    }

    #[test]
    fn test_exact_fit() {
        let mem = DeviceMemory::new(0, MemoryCapacity::from_bytes(1000));
        let _a = mem.reserve(1000).unwrap();
        assert_eq!(mem.available_bytes(), 0);
        assert!(mem.reserve(1).is_err());
    }
}
