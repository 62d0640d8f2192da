//! Common test utilities
#![allow(dead_code)]

use numr_geometry::error::{Error, Result};
use numr_geometry::runtime::{Device, MemcpyKind, Runtime};
use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::cell::Cell;

// ---------------------------------------------------------------------------
// Mock multi-device runtime
// ---------------------------------------------------------------------------

/// Number of devices the mock runtime exposes
pub const MOCK_DEVICES: usize = 4;

thread_local! {
    static CURRENT: Cell<usize> = const { Cell::new(0) };
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
    static SWITCHES: Cell<usize> = const { Cell::new(0) };
}

/// A device of the mock runtime, backed by host memory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockDevice {
    id: usize,
    index_limit: usize,
}

impl MockDevice {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            index_limit: numr_geometry::tensor::INDEX_32BIT_LIMIT,
        }
    }

    /// A device whose kernels switch to 64-bit indexing at `limit`
    pub fn with_index_limit(id: usize, limit: usize) -> Self {
        Self {
            id,
            index_limit: limit,
        }
    }
}

impl Device for MockDevice {
    fn id(&self) -> usize {
        self.id
    }

    fn name(&self) -> String {
        format!("mock:{}", self.id)
    }

    fn max_32bit_index(&self) -> usize {
        self.index_limit
    }
}

/// Runtime that records allocations and device switches per thread
#[derive(Clone, Debug, Default)]
pub struct MockRuntime;

impl MockRuntime {
    /// Reset counters and make device 0 current
    pub fn reset() {
        CURRENT.with(|c| c.set(0));
        ALLOCATIONS.with(|c| c.set(0));
        SWITCHES.with(|c| c.set(0));
    }

    pub fn allocations() -> usize {
        ALLOCATIONS.with(Cell::get)
    }

    pub fn switches() -> usize {
        SWITCHES.with(Cell::get)
    }

    pub fn current_id() -> usize {
        CURRENT.with(Cell::get)
    }
}

fn layout(size_bytes: usize) -> Result<Layout> {
    Layout::from_size_align(size_bytes, 16).map_err(|_| Error::OutOfMemory { size: size_bytes })
}

impl Runtime for MockRuntime {
    type Device = MockDevice;

    fn name() -> &'static str {
        "mock"
    }

    fn allocate(size_bytes: usize, _device: &Self::Device) -> Result<u64> {
        ALLOCATIONS.with(|c| c.set(c.get() + 1));
        if size_bytes == 0 {
            return Ok(0);
        }
        let ptr = unsafe { alloc_zeroed(layout(size_bytes)?) };
        if ptr.is_null() {
            return Err(Error::OutOfMemory { size: size_bytes });
        }
        Ok(ptr as u64)
    }

    fn deallocate(ptr: u64, size_bytes: usize, _device: &Self::Device) {
        if ptr == 0 || size_bytes == 0 {
            return;
        }
        if let Ok(layout) = layout(size_bytes) {
            unsafe { dealloc(ptr as *mut u8, layout) };
        }
    }

    fn memcpy(
        dst: u64,
        src: u64,
        size_bytes: usize,
        _kind: MemcpyKind,
        _device: &Self::Device,
    ) -> Result<()> {
        if size_bytes == 0 {
            return Ok(());
        }
        if src == 0 || dst == 0 {
            return Err(Error::Backend("mock: null pointer".into()));
        }
        unsafe { std::ptr::copy(src as *const u8, dst as *mut u8, size_bytes) };
        Ok(())
    }

    fn memset(ptr: u64, value: u8, size_bytes: usize, _device: &Self::Device) -> Result<()> {
        if size_bytes == 0 {
            return Ok(());
        }
        if ptr == 0 {
            return Err(Error::Backend("mock: null pointer".into()));
        }
        unsafe { std::ptr::write_bytes(ptr as *mut u8, value, size_bytes) };
        Ok(())
    }

    fn default_device() -> Self::Device {
        MockDevice::new(0)
    }

    fn current_device() -> Self::Device {
        MockDevice::new(CURRENT.with(Cell::get))
    }

    fn set_device(device: &Self::Device) -> Result<()> {
        if device.id() >= MOCK_DEVICES {
            return Err(Error::Backend(format!("mock: no device {}", device.id())));
        }
        CURRENT.with(|c| c.set(device.id()));
        SWITCHES.with(|c| c.set(c.get() + 1));
        Ok(())
    }
}
