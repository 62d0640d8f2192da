//! Storage: shared, growable device memory
//!
//! Every view of a buffer holds a `Storage` clone. Growing the buffer swaps
//! the block behind the shared record, so all views observe the new capacity.

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::{Device, Runtime};
use parking_lot::RwLock;
use std::sync::Arc;

/// Storage for tensor data on a device
///
/// Memory is deallocated through the runtime when the last reference drops.
/// Reference counting is atomic; the block itself is behind a lock so that a
/// growth on one thread never frees memory another thread is reading.
pub struct Storage<R: Runtime> {
    inner: Arc<StorageInner<R>>,
}

#[derive(Copy, Clone, Debug)]
struct Block {
    /// Raw device pointer (GPU address or CPU ptr cast to u64)
    ptr: u64,
    /// Number of elements (not bytes)
    len: usize,
    /// If true, we own this memory and should deallocate on drop
    owned: bool,
}

struct StorageInner<R: Runtime> {
    block: RwLock<Block>,
    dtype: DType,
    device: R::Device,
}

impl<R: Runtime> Storage<R> {
    fn from_block(block: Block, dtype: DType, device: &R::Device) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                block: RwLock::new(block),
                dtype,
                device: device.clone(),
            }),
        }
    }

    /// Allocate storage for `len` elements of `dtype`
    pub fn new(len: usize, dtype: DType, device: &R::Device) -> Result<Self> {
        let size_bytes = len
            .checked_mul(dtype.size_in_bytes())
            .ok_or(Error::OutOfMemory { size: usize::MAX })?;
        let ptr = R::allocate(size_bytes, device)?;
        Ok(Self::from_block(
            Block {
                ptr,
                len,
                owned: true,
            },
            dtype,
            device,
        ))
    }

    /// Zero-capacity storage; allocates nothing until grown
    pub fn empty(dtype: DType, device: &R::Device) -> Self {
        Self::from_block(
            Block {
                ptr: 0,
                len: 0,
                owned: true,
            },
            dtype,
            device,
        )
    }

    /// Create storage holding a copy of `data`
    pub fn from_slice<T: Element>(data: &[T], device: &R::Device) -> Result<Self> {
        let storage = Self::new(data.len(), T::DTYPE, device)?;
        R::copy_to_device(bytemuck::cast_slice(data), storage.ptr(), device)?;
        Ok(storage)
    }

    /// Wrap existing device memory without taking ownership
    ///
    /// # Safety
    /// - `ptr` must point to valid device memory of at least `len` elements
    /// - The memory must remain valid for the lifetime of this Storage
    /// - Caller is responsible for eventual deallocation
    pub unsafe fn from_ptr(ptr: u64, len: usize, dtype: DType, device: &R::Device) -> Self {
        Self::from_block(
            Block {
                ptr,
                len,
                owned: false,
            },
            dtype,
            device,
        )
    }

    /// Raw device pointer of the current block
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.inner.block.read().ptr
    }

    /// Capacity in elements
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.block.read().len
    }

    /// Check if storage has zero capacity
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.inner.dtype
    }

    /// Get the device
    #[inline]
    pub fn device(&self) -> &R::Device {
        &self.inner.device
    }

    /// Capacity in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.len() * self.inner.dtype.size_in_bytes()
    }

    /// Get the reference count
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Check if this is the only reference
    #[inline]
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Whether both handles refer to the same storage
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Grow to at least `required` elements
    ///
    /// Never shrinks. The old contents are copied into the new block and the
    /// old block is released. Returns whether a reallocation happened.
    pub fn ensure_capacity(&self, required: usize) -> Result<bool> {
        let mut block = self.inner.block.write();
        if required <= block.len {
            return Ok(false);
        }
        if !block.owned {
            return Err(Error::invalid_argument(
                "storage",
                "cannot grow storage that wraps borrowed memory",
            ));
        }

        let elem_size = self.inner.dtype.size_in_bytes();
        let new_bytes = required
            .checked_mul(elem_size)
            .ok_or(Error::OutOfMemory { size: usize::MAX })?;
        let device = &self.inner.device;
        let new_ptr = R::allocate(new_bytes, device)?;

        let old_bytes = block.len * elem_size;
        if old_bytes > 0 && block.ptr != 0 {
            if let Err(err) = R::copy_within_device(block.ptr, new_ptr, old_bytes, device) {
                R::deallocate(new_ptr, new_bytes, device);
                return Err(err);
            }
            R::deallocate(block.ptr, old_bytes, device);
        }

        log::debug!(
            "{}: grew {} storage on {} from {} to {} elements",
            R::name(),
            self.inner.dtype,
            device.name(),
            block.len,
            required
        );

        *block = Block {
            ptr: new_ptr,
            len: required,
            owned: true,
        };
        Ok(true)
    }

    /// Copy the whole buffer to the host
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.inner.dtype {
            return Err(Error::DTypeMismatch {
                lhs: self.inner.dtype,
                rhs: T::DTYPE,
            });
        }

        let block = self.inner.block.read();
        // Allocate as T so the byte view has T's alignment
        let mut result = vec![T::zeroed(); block.len];
        if block.len > 0 {
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut result);
            R::copy_from_device(block.ptr, bytes, &self.inner.device)?;
        }
        Ok(result)
    }
}

impl<R: Runtime> Clone for Storage<R> {
    /// Clone increments the reference count (zero-copy)
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Runtime> Drop for StorageInner<R> {
    fn drop(&mut self) {
        let block = *self.block.get_mut();
        if block.owned && block.ptr != 0 {
            R::deallocate(
                block.ptr,
                block.len * self.dtype.size_in_bytes(),
                &self.device,
            );
        }
    }
}

impl<R: Runtime> std::fmt::Debug for Storage<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let block = *self.inner.block.read();
        f.debug_struct("Storage")
            .field("ptr", &format!("0x{:x}", block.ptr))
            .field("len", &block.len)
            .field("dtype", &self.inner.dtype)
            .field("owned", &block.owned)
            .field("refs", &Arc::strong_count(&self.inner))
            .finish()
    }
}
