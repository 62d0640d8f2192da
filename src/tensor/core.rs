//! Core Tensor handle

use super::shape::{Sizes, Strides};
use super::{ShapeVector, Storage, TensorId};
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::{Device, Runtime};
use std::fmt;

/// One logical view into a storage
///
/// `Tensor` is the handle every kernel operates on. It consists of:
/// - **Storage**: shared, reference-counted device memory
/// - **Geometry**: (size, stride) pairs defining the view
/// - **Offset**: element offset of the first logical element
/// - **DType / Device**: what the storage holds and where it lives
///
/// Cloning a handle creates a new view with its own identity that shares the
/// storage. Geometry is mutated in place through `&mut self` methods; the
/// storage may be grown by any of its views.
pub struct Tensor<R: Runtime> {
    id: TensorId,
    storage: Option<Storage<R>>,
    geometry: ShapeVector,
    offset: usize,
    dtype: DType,
    device: R::Device,
}

impl<R: Runtime> Tensor<R> {
    /// Create a handle over `storage` with the given geometry and offset
    ///
    /// Fails if a non-empty view would reach past the storage's capacity.
    pub fn from_parts(storage: Storage<R>, geometry: ShapeVector, offset: usize) -> Result<Self> {
        if !geometry.has_zero_size() {
            let extent = geometry.storage_extent().unwrap_or(isize::MAX);
            let offset_elems = isize::try_from(offset).unwrap_or(isize::MAX);
            let needed = extent.saturating_add(offset_elems);
            if needed > isize::try_from(storage.len()).unwrap_or(isize::MAX) {
                return Err(Error::invalid_argument(
                    "geometry",
                    format!(
                        "view {geometry:?} at offset {offset} needs {needed} elements, storage has {}",
                        storage.len()
                    ),
                ));
            }
        }

        Ok(Self {
            id: TensorId::new(),
            dtype: storage.dtype(),
            device: storage.device().clone(),
            storage: Some(storage),
            geometry,
            offset,
        })
    }

    /// Allocate a contiguous tensor with unspecified contents
    pub fn empty(sizes: &[usize], dtype: DType, device: &R::Device) -> Result<Self> {
        let geometry = ShapeVector::contiguous(sizes)?;
        let len = geometry
            .checked_numel()
            .ok_or_else(|| Error::invalid_argument("sizes", "element count overflows"))?;
        let storage = Storage::new(len, dtype, device)?;
        Self::from_parts(storage, geometry, 0)
    }

    /// Create a contiguous tensor holding a copy of `data`
    pub fn from_slice<T: Element>(data: &[T], sizes: &[usize], device: &R::Device) -> Result<Self> {
        let geometry = ShapeVector::contiguous(sizes)?;
        let expected = geometry.checked_numel();
        if expected != Some(data.len()) {
            return Err(Error::invalid_argument(
                "data",
                format!(
                    "{} elements do not fill shape {:?}",
                    data.len(),
                    geometry.sizes().as_slice()
                ),
            ));
        }

        let storage = Storage::from_slice(data, device)?;
        Self::from_parts(storage, geometry, 0)
    }

    /// A 0-dim handle whose storage has not been established yet
    ///
    /// Geometry queries work; anything that needs memory fails with
    /// `UninitializedStorage` until [`Tensor::rebind`] attaches a storage.
    pub fn unbound(dtype: DType, device: &R::Device) -> Self {
        Self {
            id: TensorId::new(),
            storage: None,
            geometry: ShapeVector::scalar(),
            offset: 0,
            dtype,
            device: device.clone(),
        }
    }

    // ===== Accessors =====

    /// Get the handle ID
    #[inline]
    pub fn id(&self) -> TensorId {
        self.id
    }

    /// Get the storage, if one is bound
    #[inline]
    pub fn storage(&self) -> Option<&Storage<R>> {
        self.storage.as_ref()
    }

    /// Get the storage or fail with `UninitializedStorage`
    pub fn bound_storage(&self) -> Result<&Storage<R>> {
        self.storage.as_ref().ok_or(Error::UninitializedStorage)
    }

    /// Get the geometry
    #[inline]
    pub fn geometry(&self) -> &ShapeVector {
        &self.geometry
    }

    /// Get the sizes
    #[inline]
    pub fn sizes(&self) -> Sizes {
        self.geometry.sizes()
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> Strides {
        self.geometry.strides()
    }

    /// Get the number of dimensions (rank)
    #[inline]
    pub fn ndim(&self) -> usize {
        self.geometry.ndim()
    }

    /// Number of elements (0 for empty tensors, 1 for scalars)
    #[inline]
    pub fn numel(&self) -> usize {
        self.geometry.element_count()
    }

    /// Element offset of the first logical element in storage
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Get the device
    #[inline]
    pub fn device(&self) -> &R::Device {
        &self.device
    }

    /// Check if the view is row-major contiguous
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.geometry.is_contiguous()
    }

    /// Whether kernels may index this view with 32-bit arithmetic
    #[inline]
    pub fn can_use_32bit_index_math(&self, limit: usize) -> bool {
        self.geometry.fits_in_32bit_indexing(limit)
    }

    /// Device address of the first logical element
    pub fn data_ptr(&self) -> Result<u64> {
        let storage = self.bound_storage()?;
        self.offset
            .checked_mul(self.dtype.size_in_bytes())
            .and_then(|bytes| u64::try_from(bytes).ok())
            .and_then(|bytes| storage.ptr().checked_add(bytes))
            .ok_or_else(|| {
                Error::invalid_argument(
                    "offset",
                    format!("byte offset of element {} overflows", self.offset),
                )
            })
    }

    /// Storage index of a multi-index
    pub fn storage_index(&self, indices: &[usize]) -> Result<usize> {
        let relative = self.geometry.offset_of(indices)?;
        let absolute = isize::try_from(self.offset)
            .ok()
            .and_then(|offset| offset.checked_add(relative))
            .ok_or_else(|| Error::invalid_argument("indices", "storage index overflows"))?;
        usize::try_from(absolute).map_err(|_| Error::InvalidOffset { offset: absolute })
    }

    /// Copy the view's elements to the host in row-major order
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if self.geometry.has_zero_size() {
            return Ok(Vec::new());
        }
        let numel = self
            .geometry
            .checked_numel()
            .ok_or_else(|| Error::invalid_argument("geometry", "element count overflows"))?;

        let buffer = self.bound_storage()?.to_vec::<T>()?;
        let sizes = self.sizes();
        let mut indices = vec![0usize; sizes.len()];
        let mut out = Vec::with_capacity(numel);

        for _ in 0..numel {
            let idx = self.storage_index(&indices)?;
            let value = buffer.get(idx).copied().ok_or_else(|| {
                Error::invalid_argument("geometry", "view reaches past the storage")
            })?;
            out.push(value);

            // Increment indices (row-major order)
            for dim in (0..sizes.len()).rev() {
                indices[dim] += 1;
                if indices[dim] < sizes[dim] {
                    break;
                }
                indices[dim] = 0;
            }
        }

        Ok(out)
    }

    // ===== Crate-internal field access for mutators =====

    pub(crate) fn geometry_mut(&mut self) -> &mut ShapeVector {
        &mut self.geometry
    }

    pub(crate) fn set_geometry(&mut self, geometry: ShapeVector) {
        self.geometry = geometry;
    }

    pub(crate) fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub(crate) fn replace_storage(&mut self, storage: Storage<R>) -> Option<Storage<R>> {
        self.storage.replace(storage)
    }
}

impl<R: Runtime> Clone for Tensor<R> {
    /// A new view of the same storage, with its own identity
    fn clone(&self) -> Self {
        Self {
            id: TensorId::new(),
            storage: self.storage.clone(),
            geometry: self.geometry.clone(),
            offset: self.offset,
            dtype: self.dtype,
            device: self.device.clone(),
        }
    }
}

impl<R: Runtime> fmt::Debug for Tensor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("id", &self.id)
            .field("sizes", &self.geometry.sizes().as_slice())
            .field("strides", &self.geometry.strides().as_slice())
            .field("offset", &self.offset)
            .field("dtype", &self.dtype)
            .field("device", &self.device.name())
            .field("storage", &self.storage)
            .finish()
    }
}
