//! Core trait for device memory runtimes

use crate::dtype::Element;
use crate::error::Result;

/// Direction of a memory copy
///
/// Host addresses and device handles are both carried as `u64`; the kind tells
/// the runtime which side each one lives on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemcpyKind {
    /// Host memory into device memory
    HostToDevice,
    /// Device memory into host memory
    DeviceToHost,
    /// Between two device buffers
    DeviceToDevice,
}

/// Core trait for device memory runtimes
///
/// `Runtime` is the seam between the geometry core and whatever owns device
/// memory and queues. The core only calls into it to grow storage, to move
/// bytes while doing so, and to route allocations to the right device.
/// It uses static dispatch via generics for zero-cost abstraction.
///
/// # Example
///
/// ```ignore
/// let device = CpuRuntime::default_device();
/// let ptr = CpuRuntime::allocate(1024, &device)?;
/// // ... use memory ...
/// CpuRuntime::deallocate(ptr, 1024, &device);
/// ```
pub trait Runtime: Clone + Send + Sync + 'static {
    /// Device identifier type
    type Device: super::Device;

    /// Human-readable name of this runtime
    fn name() -> &'static str;

    /// Allocate device memory
    ///
    /// Returns a device pointer (u64). A zero-byte request may return 0.
    /// Returns `Err(OutOfMemory)` if allocation fails.
    fn allocate(size_bytes: usize, device: &Self::Device) -> Result<u64>;

    /// Deallocate device memory
    fn deallocate(ptr: u64, size_bytes: usize, device: &Self::Device);

    /// Synchronous copy of `size_bytes` from `src` to `dst`
    fn memcpy(
        dst: u64,
        src: u64,
        size_bytes: usize,
        kind: MemcpyKind,
        device: &Self::Device,
    ) -> Result<()>;

    /// Asynchronous copy, ordered on the device's current queue
    ///
    /// Runtimes without queues complete the copy before returning.
    fn memcpy_async(
        dst: u64,
        src: u64,
        size_bytes: usize,
        kind: MemcpyKind,
        device: &Self::Device,
    ) -> Result<()> {
        Self::memcpy(dst, src, size_bytes, kind, device)
    }

    /// Set `size_bytes` bytes at `ptr` to `value`
    fn memset(ptr: u64, value: u8, size_bytes: usize, device: &Self::Device) -> Result<()>;

    /// Fill `n_elems` elements at `ptr` with `value`
    fn fill<T: Element>(ptr: u64, value: T, n_elems: usize, device: &Self::Device) -> Result<()> {
        if n_elems == 0 {
            return Ok(());
        }
        let host = vec![value; n_elems];
        Self::copy_to_device(bytemuck::cast_slice(&host), ptr, device)
    }

    /// Copy data from host to device
    fn copy_to_device(src: &[u8], dst: u64, device: &Self::Device) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        Self::memcpy(
            dst,
            src.as_ptr() as u64,
            src.len(),
            MemcpyKind::HostToDevice,
            device,
        )
    }

    /// Copy data from device to host
    fn copy_from_device(src: u64, dst: &mut [u8], device: &Self::Device) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        let len = dst.len();
        Self::memcpy(
            dst.as_mut_ptr() as u64,
            src,
            len,
            MemcpyKind::DeviceToHost,
            device,
        )
    }

    /// Copy data within device (device to device)
    fn copy_within_device(
        src: u64,
        dst: u64,
        size_bytes: usize,
        device: &Self::Device,
    ) -> Result<()> {
        Self::memcpy(dst, src, size_bytes, MemcpyKind::DeviceToDevice, device)
    }

    /// Get the default device
    fn default_device() -> Self::Device;

    /// Device that allocations on the calling thread are currently routed to
    fn current_device() -> Self::Device;

    /// Route subsequent allocations on the calling thread to `device`
    fn set_device(device: &Self::Device) -> Result<()>;
}
