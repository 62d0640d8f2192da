//! Binding a handle to a storage
//!
//! A handle's storage can be replaced only by one that holds the same dtype
//! on the same device. Validation happens before anything is changed.

use super::{ShapeVector, Storage, Tensor};
use crate::error::{Error, Result};
use crate::runtime::{Device, GuardMode, Runtime};

impl<R: Runtime> Tensor<R> {
    /// Replace the bound storage with `storage`
    ///
    /// Fails with `NullStorage`, `DTypeMismatch` or `DeviceMismatch` and
    /// leaves the current binding untouched. On success the previous
    /// reference is released.
    pub fn rebind(&mut self, storage: Option<Storage<R>>) -> Result<()> {
        let storage = storage.ok_or(Error::NullStorage)?;
        self.check_bindable(&storage)?;
        drop(self.replace_storage(storage));
        Ok(())
    }

    fn check_bindable(&self, storage: &Storage<R>) -> Result<()> {
        if storage.dtype() != self.dtype() {
            return Err(Error::DTypeMismatch {
                lhs: self.dtype(),
                rhs: storage.dtype(),
            });
        }
        if !storage.device().is_same(self.device()) {
            return Err(Error::device_mismatch(
                self.device().name(),
                storage.device().name(),
            ));
        }
        Ok(())
    }

    /// Point this handle at `storage` with the given offset and geometry
    ///
    /// The handle must already be bound. If `storage` is a different storage
    /// it is rebound; `None` binds a fresh empty storage of the handle's
    /// dtype on its device. The target storage is grown to cover
    /// `offset + extent` of a non-empty view before anything on the handle
    /// changes, then the geometry is applied with [`Tensor::resize_impl`].
    pub fn set_storage_and_geometry(
        &mut self,
        storage: Option<Storage<R>>,
        offset: isize,
        sizes: &[usize],
        strides: Option<&[isize]>,
    ) -> Result<()> {
        let current = self.bound_storage()?;
        if let Some(strides) = strides {
            if strides.len() != sizes.len() {
                return Err(Error::invalid_argument(
                    "strides",
                    format!(
                        "inconsistent size/stride lengths: {} sizes, {} strides",
                        sizes.len(),
                        strides.len()
                    ),
                ));
            }
        }
        if offset < 0 {
            return Err(Error::InvalidOffset { offset });
        }

        let geometry = match strides {
            Some(strides) => ShapeVector::from_sizes_strides(sizes, strides)?,
            None => ShapeVector::contiguous(sizes)?,
        };
        let needed = if geometry.has_zero_size() {
            0
        } else {
            geometry
                .storage_extent()
                .and_then(|extent| extent.checked_add(offset))
                .ok_or_else(|| Error::invalid_argument("sizes", "storage size overflows"))?
        };

        let replacement = match storage {
            Some(storage) if storage.ptr_eq(current) => None,
            Some(storage) => Some(storage),
            None => Some(Storage::empty(self.dtype(), self.device())),
        };
        if let Some(storage) = &replacement {
            self.check_bindable(storage)?;
        }
        if needed > 0 {
            replacement
                .as_ref()
                .unwrap_or(current)
                .ensure_capacity(needed as usize)?;
        }

        if let Some(storage) = replacement {
            drop(self.replace_storage(storage));
        }
        self.set_offset(offset as usize);
        self.resize_impl(sizes, strides, GuardMode::Skip)
    }
}
