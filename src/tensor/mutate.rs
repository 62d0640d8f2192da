//! In-place geometry mutation
//!
//! Resizes replace the whole (size, stride) vector and make sure the storage
//! is large enough before the new geometry becomes visible. Squeeze and
//! unsqueeze first make the handle a view of their source, then edit one
//! dimension.

use super::query::LegacyDims;
use super::shape::MAX_DIMS;
use super::{ShapeVector, Tensor};
use crate::error::{Error, Result};
use crate::runtime::{DeviceGuard, GuardMode, Runtime};

impl<R: Runtime> Tensor<R> {
    /// Resize to `sizes`, optionally with explicit `strides`
    ///
    /// Selects the tensor's device while it may allocate. See
    /// [`Tensor::resize_impl`].
    pub fn resize(&mut self, sizes: &[usize], strides: Option<&[isize]>) -> Result<()> {
        self.resize_impl(sizes, strides, GuardMode::Enter)
    }

    /// Resize to `sizes`, optionally with explicit `strides`
    ///
    /// A no-op when the sizes (and the strides, if given) already match.
    /// Without strides the new layout is row-major and needs `numel`
    /// elements; with strides it needs `1 + sum((size - 1) * stride)`, or
    /// nothing when any size is 0. Storage is grown to `offset + needed`
    /// if it is smaller; it is never shrunk.
    ///
    /// `mode` is `Skip` when the caller has already selected the device.
    pub fn resize_impl(
        &mut self,
        sizes: &[usize],
        strides: Option<&[isize]>,
        mode: GuardMode,
    ) -> Result<()> {
        if let Some(strides) = strides {
            if strides.len() != sizes.len() {
                return Err(Error::invalid_argument(
                    "strides",
                    format!("expected {} strides, got {}", sizes.len(), strides.len()),
                ));
            }
        }

        let geometry = self.geometry();
        if geometry.same_sizes(sizes) && strides.is_none_or(|s| geometry.same_strides(s)) {
            return Ok(());
        }

        let _guard = DeviceGuard::<R>::with_mode(self.device(), mode)?;

        let (geometry, needed) = match strides {
            Some(strides) => {
                let geometry = ShapeVector::from_sizes_strides(sizes, strides)?;
                let extent = geometry.storage_extent();
                (geometry, extent)
            }
            None => {
                let geometry = ShapeVector::contiguous(sizes)?;
                let numel = geometry
                    .checked_numel()
                    .and_then(|n| isize::try_from(n).ok());
                (geometry, numel)
            }
        };
        let needed = needed
            .and_then(|n| {
                isize::try_from(self.offset())
                    .ok()
                    .and_then(|offset| n.checked_add(offset))
            })
            .ok_or_else(|| Error::invalid_argument("sizes", "storage size overflows"))?;

        if needed > 0 {
            let storage = self.bound_storage()?;
            storage.ensure_capacity(needed as usize)?;
        }

        log::trace!(
            "resize {}: {:?} -> {:?} (needs {} elements)",
            self.id(),
            self.geometry(),
            geometry,
            needed
        );
        self.set_geometry(geometry);
        Ok(())
    }

    /// Resize to `template`'s sizes unless they already match
    ///
    /// Matching sizes keep the current strides, so an output that is reused
    /// across calls keeps its (possibly non-contiguous) layout. Otherwise the
    /// new layout is row-major.
    pub fn resize_as(&mut self, template: &Tensor<R>) -> Result<()> {
        self.resize_as_geometry(template.geometry())
    }

    /// [`Tensor::resize_as`] against a bare geometry
    pub fn resize_as_geometry(&mut self, template: &ShapeVector) -> Result<()> {
        if self.ndim() == template.ndim() && self.geometry().same_sizes(&template.sizes()) {
            return Ok(());
        }
        self.resize_impl(&template.sizes(), None, GuardMode::Skip)
    }

    /// Make this handle a view of `src`: same storage, offset, sizes, strides
    pub fn set_(&mut self, src: &Tensor<R>) -> Result<()> {
        if src.id() == self.id() {
            return Ok(());
        }
        let sizes = src.sizes();
        let strides = src.strides();
        self.set_storage_and_geometry(
            src.storage().cloned(),
            src.offset() as isize,
            &sizes,
            Some(&strides),
        )
    }

    /// Become a view of `source` (or stay on self) without dimension `dim`
    /// if its size is 1
    ///
    /// The view copy always happens; a dimension whose size is not 1 is left
    /// in place.
    pub fn squeeze_dim(&mut self, source: Option<&Tensor<R>>, dim: usize) -> Result<()> {
        let src_ndim = source.map_or(self.ndim(), |s| s.ndim());
        if dim >= src_ndim {
            return Err(Error::index_out_of_range(dim, src_ndim));
        }

        if let Some(src) = source {
            self.set_(src)?;
        }

        if self.geometry().dims()[dim].size == 1 {
            self.geometry_mut().remove(dim);
        }
        Ok(())
    }

    /// Become a view of `source` (or stay on self) with a size-1 dimension
    /// inserted at `dim`
    ///
    /// The new dimension's stride is `size * stride` of the dimension that
    /// follows it, or 1 when it is appended last.
    pub fn unsqueeze_dim(&mut self, source: Option<&Tensor<R>>, dim: usize) -> Result<()> {
        let src_ndim = source.map_or(self.ndim(), |s| s.ndim());
        if dim > src_ndim {
            return Err(Error::index_out_of_range(dim, src_ndim + 1));
        }
        if src_ndim + 1 > MAX_DIMS {
            return Err(Error::invalid_argument(
                "dim",
                format!("unsqueeze would exceed {MAX_DIMS} dimensions"),
            ));
        }

        if let Some(src) = source {
            self.set_(src)?;
        }

        self.geometry_mut().insert_unit(dim)
    }

    /// Restore the dimension a non-keepdim reduction dropped
    ///
    /// Reductions size their output with the reduced dimension kept and
    /// squeeze it afterwards. When the caller passed an output that already
    /// has the reduced rank, re-inserting the unit dimension first keeps the
    /// output's strides intact across that resize.
    pub fn preserve_reduce_dim_semantics(
        &mut self,
        input_ndim: usize,
        dim: usize,
        keepdim: bool,
    ) -> Result<()> {
        let out_ndim = self.geometry().legacy_ndim(LegacyDims::All);
        if out_ndim > 0 && !keepdim && out_ndim + 1 == input_ndim {
            self.unsqueeze_dim(None, dim)?;
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "cpu"))]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::runtime::cpu::{CpuDevice, CpuRuntime};
    use crate::tensor::Storage;

    fn tensor(sizes: &[usize], strides: &[isize]) -> Tensor<CpuRuntime> {
        let device = CpuDevice::new();
        let geometry = ShapeVector::from_sizes_strides(sizes, strides).unwrap();
        let len = geometry.storage_extent().unwrap().max(0) as usize;
        let storage = Storage::new(len, DType::F32, &device).unwrap();
        Tensor::from_parts(storage, geometry, 0).unwrap()
    }

    #[test]
    fn test_resize_contiguous_grows_storage() {
        let mut t = tensor(&[2, 2], &[2, 1]);
        t.resize(&[3, 4], None).unwrap();
        assert_eq!(t.sizes().as_slice(), &[3, 4]);
        assert_eq!(t.strides().as_slice(), &[4, 1]);
        assert_eq!(t.storage().unwrap().len(), 12);
    }

    #[test]
    fn test_resize_shrink_keeps_capacity() {
        let mut t = tensor(&[4, 4], &[4, 1]);
        t.resize(&[2], None).unwrap();
        assert_eq!(t.sizes().as_slice(), &[2]);
        assert_eq!(t.storage().unwrap().len(), 16);
    }

    #[test]
    fn test_resize_explicit_strides() {
        let mut t = tensor(&[1], &[1]);
        t.resize(&[2, 3], Some(&[1, 2])).unwrap();
        assert_eq!(t.strides().as_slice(), &[1, 2]);
        assert_eq!(t.storage().unwrap().len(), 6);
    }

    #[test]
    fn test_resize_zero_size_needs_no_capacity() {
        let mut t = tensor(&[1], &[1]);
        t.resize(&[0, 1000], Some(&[1000, 1])).unwrap();
        assert_eq!(t.sizes().as_slice(), &[0, 1000]);
        assert_eq!(t.storage().unwrap().len(), 1);
    }

    #[test]
    fn test_resize_accounts_for_offset() {
        let device = CpuDevice::new();
        let storage = Storage::<CpuRuntime>::new(4, DType::F32, &device).unwrap();
        let mut t = Tensor::from_parts(storage, ShapeVector::contiguous(&[2]).unwrap(), 2).unwrap();
        t.resize(&[5], None).unwrap();
        assert_eq!(t.storage().unwrap().len(), 7);
    }

    #[test]
    fn test_resize_stride_length_mismatch() {
        let mut t = tensor(&[2], &[1]);
        let err = t.resize(&[2, 2], Some(&[1])).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { arg: "strides", .. }));
        assert_eq!(t.sizes().as_slice(), &[2]);
    }

    #[test]
    fn test_resize_unbound_fails_without_mutation() {
        let device = CpuDevice::new();
        let mut t = Tensor::<CpuRuntime>::unbound(DType::F32, &device);
        assert_eq!(t.resize(&[3], None).unwrap_err(), Error::UninitializedStorage);
        assert!(t.geometry().is_scalar());
    }

    #[test]
    fn test_resize_as_keeps_strides_when_sizes_match() {
        let mut out = tensor(&[3, 2], &[1, 3]);
        let template = tensor(&[3, 2], &[2, 1]);
        out.resize_as(&template).unwrap();
        assert_eq!(out.strides().as_slice(), &[1, 3]);

        let other = tensor(&[6], &[1]);
        out.resize_as(&other).unwrap();
        assert_eq!(out.sizes().as_slice(), &[6]);
        assert_eq!(out.strides().as_slice(), &[1]);
    }

    #[test]
    fn test_squeeze_dim() {
        let mut t = tensor(&[1, 4, 1], &[4, 1, 1]);
        t.squeeze_dim(None, 0).unwrap();
        assert_eq!(t.sizes().as_slice(), &[4, 1]);
        assert_eq!(t.strides().as_slice(), &[1, 1]);

        // Size 4 is not squeezed
        t.squeeze_dim(None, 0).unwrap();
        assert_eq!(t.sizes().as_slice(), &[4, 1]);

        let err = t.squeeze_dim(None, 2).unwrap_err();
        assert_eq!(err, Error::index_out_of_range(2, 2));
    }

    #[test]
    fn test_squeeze_from_source_copies_view() {
        let src = tensor(&[2, 1, 3], &[3, 3, 1]);
        let device = CpuDevice::new();
        let mut dst = Tensor::<CpuRuntime>::empty(&[7], DType::F32, &device).unwrap();

        dst.squeeze_dim(Some(&src), 0).unwrap();
        assert_eq!(dst.sizes().as_slice(), &[2, 1, 3]);
        assert!(dst.storage().unwrap().ptr_eq(src.storage().unwrap()));

        dst.squeeze_dim(Some(&src), 1).unwrap();
        assert_eq!(dst.sizes().as_slice(), &[2, 3]);
        assert_eq!(dst.strides().as_slice(), &[3, 1]);
        assert_eq!(src.sizes().as_slice(), &[2, 1, 3]);
    }

    #[test]
    fn test_unsqueeze_dim() {
        let mut t = tensor(&[4], &[1]);
        t.unsqueeze_dim(None, 0).unwrap();
        assert_eq!(t.sizes().as_slice(), &[1, 4]);
        assert_eq!(t.strides().as_slice(), &[4, 1]);

        t.unsqueeze_dim(None, 2).unwrap();
        assert_eq!(t.sizes().as_slice(), &[1, 4, 1]);
        assert_eq!(t.strides().as_slice(), &[4, 1, 1]);

        assert!(matches!(
            t.unsqueeze_dim(None, 4),
            Err(Error::IndexOutOfRange { dim: 4, .. })
        ));
    }

    #[test]
    fn test_unsqueeze_scalar() {
        let mut t = tensor(&[], &[]);
        t.unsqueeze_dim(None, 0).unwrap();
        assert_eq!(t.sizes().as_slice(), &[1]);
        assert_eq!(t.strides().as_slice(), &[1]);
    }

    #[test]
    fn test_preserve_reduce_dim_semantics() {
        // Output already at reduced rank: unit dim is re-inserted
        let mut out = tensor(&[3, 5], &[1, 3]);
        out.preserve_reduce_dim_semantics(3, 1, false).unwrap();
        assert_eq!(out.sizes().as_slice(), &[3, 1, 5]);
        assert_eq!(out.strides().as_slice(), &[1, 15, 3]);

        // keepdim leaves it alone
        let mut kept = tensor(&[3, 5], &[5, 1]);
        kept.preserve_reduce_dim_semantics(3, 1, true).unwrap();
        assert_eq!(kept.sizes().as_slice(), &[3, 5]);

        // Rank that does not match input - 1 is left alone
        let mut other = tensor(&[3, 5], &[5, 1]);
        other.preserve_reduce_dim_semantics(2, 0, false).unwrap();
        assert_eq!(other.sizes().as_slice(), &[3, 5]);

        // Empty outputs count as 0-D
        let mut empty = tensor(&[0, 5], &[5, 1]);
        empty.preserve_reduce_dim_semantics(3, 0, false).unwrap();
        assert_eq!(empty.sizes().as_slice(), &[0, 5]);
    }
}
