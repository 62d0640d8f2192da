//! CPU runtime implementation

use super::device::CpuDevice;
use crate::error::{Error, Result};
use crate::runtime::{Device, MemcpyKind, Runtime};
use std::alloc::{Layout as AllocLayout, alloc_zeroed, dealloc};

/// Alignment of every host allocation (AVX-512 width)
const ALIGN: usize = 64;

/// CPU runtime
///
/// Host heap memory behind the `Runtime` seam. Every memcpy kind is a plain
/// memory move here; asynchronous variants complete before returning.
#[derive(Clone, Debug, Default)]
pub struct CpuRuntime;

fn host_layout(size_bytes: usize) -> Result<AllocLayout> {
    AllocLayout::from_size_align(size_bytes, ALIGN).map_err(|_| Error::OutOfMemory {
        size: size_bytes,
    })
}

impl Runtime for CpuRuntime {
    type Device = CpuDevice;

    fn name() -> &'static str {
        "cpu"
    }

    fn allocate(size_bytes: usize, _device: &Self::Device) -> Result<u64> {
        if size_bytes == 0 {
            return Ok(0);
        }

        let layout = host_layout(size_bytes)?;
        let ptr = unsafe { alloc_zeroed(layout) };

        if ptr.is_null() {
            return Err(Error::OutOfMemory { size: size_bytes });
        }

        Ok(ptr as u64)
    }

    fn deallocate(ptr: u64, size_bytes: usize, _device: &Self::Device) {
        if ptr == 0 || size_bytes == 0 {
            return;
        }

        let Ok(layout) = host_layout(size_bytes) else {
            log::warn!("cpu: refusing to free {size_bytes} bytes with an invalid layout");
            return;
        };

        unsafe {
            dealloc(ptr as *mut u8, layout);
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
            return Err(Error::Backend(format!(
                "cpu: memcpy of {size_bytes} bytes with a null pointer"
            )));
        }

        unsafe {
            // copy (not copy_nonoverlapping): device-to-device moves may alias
            std::ptr::copy(src as *const u8, dst as *mut u8, size_bytes);
        }
        Ok(())
    }

    fn memset(ptr: u64, value: u8, size_bytes: usize, _device: &Self::Device) -> Result<()> {
        if size_bytes == 0 {
            return Ok(());
        }
        if ptr == 0 {
            return Err(Error::Backend(format!(
                "cpu: memset of {size_bytes} bytes on a null pointer"
            )));
        }

        unsafe {
            std::ptr::write_bytes(ptr as *mut u8, value, size_bytes);
        }
        Ok(())
    }

    fn default_device() -> Self::Device {
        CpuDevice::new()
    }

    fn current_device() -> Self::Device {
        CpuDevice::new()
    }

    fn set_device(device: &Self::Device) -> Result<()> {
        if device.id() != 0 {
            return Err(Error::Backend(format!(
                "cpu: no device with id {}",
                device.id()
            )));
        }
        Ok(())
    }
}
