//! Geometry queries
//!
//! Pure questions kernels ask before picking an execution strategy: how many
//! elements, which legacy rank, can offsets be computed in 32 bits, is the
//! layout contiguous, can two indices alias the same storage element.

use super::shape::{Dim, STACK_DIMS, ShapeVector};
use super::Tensor;
use crate::error::{Error, Result};
use crate::runtime::{Device, Runtime};
use smallvec::SmallVec;

/// Default exclusive bound for 32-bit index arithmetic (`i32::MAX`)
pub const INDEX_32BIT_LIMIT: usize = i32::MAX as usize;

/// Rank counting conventions
///
/// Older call sites count a scalar as 1-D and an empty tensor as 0-D. The
/// variants keep those conventions explicit instead of baking one in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LegacyDims {
    /// Raw rank
    Plain,
    /// Scalars count as 1-D
    NoScalars,
    /// Empty tensors count as 0-D, scalars as 1-D
    All,
}

impl ShapeVector {
    /// Rank under the given convention
    pub fn legacy_ndim(&self, variant: LegacyDims) -> usize {
        match variant {
            LegacyDims::Plain => self.ndim(),
            LegacyDims::NoScalars => self.ndim().max(1),
            LegacyDims::All if self.has_zero_size() => 0,
            LegacyDims::All => self.ndim().max(1),
        }
    }

    /// Number of elements
    ///
    /// 0 for empty tensors, 1 for scalars, otherwise the product of sizes.
    /// Saturates at `usize::MAX`: broadcast views can describe more elements
    /// than fit in a `usize`. Use [`ShapeVector::checked_numel`] when the
    /// exact count matters.
    pub fn element_count(&self) -> usize {
        if self.legacy_ndim(LegacyDims::All) == 0 {
            return 0;
        }
        self.checked_numel().unwrap_or(usize::MAX)
    }

    /// Size of `dim`, validated against the rank under `variant`
    ///
    /// A scalar reports size 1 for dimension 0.
    pub fn size_at(&self, dim: usize, variant: LegacyDims) -> Result<usize> {
        self.dim_at(dim, variant).map(|d| d.size)
    }

    /// Stride of `dim`, validated against the rank under `variant`
    ///
    /// A scalar reports stride 1 for dimension 0.
    pub fn stride_at(&self, dim: usize, variant: LegacyDims) -> Result<isize> {
        self.dim_at(dim, variant).map(|d| d.stride)
    }

    fn dim_at(&self, dim: usize, variant: LegacyDims) -> Result<Dim> {
        let ndim = self.legacy_ndim(variant);
        if dim >= ndim {
            return Err(Error::index_out_of_range(dim, ndim));
        }
        if self.is_scalar() {
            return Ok(Dim::new(1, 1));
        }
        Ok(self.dims()[dim])
    }

    /// Sizes with a scalar reported as `[1]`
    pub fn sizes_legacy_no_scalars(&self) -> super::shape::Sizes {
        if self.is_scalar() {
            return SmallVec::from_slice(&[1]);
        }
        self.sizes()
    }

    /// Whether kernels may use 32-bit index arithmetic on this view
    ///
    /// False if the element count or the largest offset reachable from the
    /// view's first element is `>= limit`. The largest offset is found by
    /// decomposing the last linear index in mixed radix, innermost dimension
    /// first. The storage offset is not included: kernels address from the
    /// view's data pointer.
    pub fn fits_in_32bit_indexing(&self, limit: usize) -> bool {
        let elements = if self.has_zero_size() {
            0
        } else {
            match self.checked_numel() {
                Some(n) => n,
                None => return false,
            }
        };
        if elements >= limit {
            return false;
        }
        if self.is_scalar() {
            return true;
        }

        // i128: strides are unbounded and the products must not wrap
        let mut offset = 0i128;
        let mut linear = elements as i128 - 1;
        for i in (0..self.legacy_ndim(LegacyDims::All)).rev() {
            let d = self.dims()[i];
            let size = d.size as i128;
            offset += (linear % size) * d.stride as i128;
            linear /= size;
        }

        offset < limit as i128
    }

    /// Row-major contiguity
    ///
    /// Size-1 dimensions may carry any stride; empty shapes are contiguous.
    pub fn is_contiguous(&self) -> bool {
        if self.has_zero_size() {
            return true;
        }

        let mut expected = 1isize;
        for d in self.dims().iter().rev() {
            if d.size == 1 {
                continue;
            }
            if d.stride != expected {
                return false;
            }
            expected *= d.size as isize;
        }
        true
    }

    /// Whether two distinct indices might address the same element
    ///
    /// A sufficient test for "no overlap": `false` is a guarantee, `true`
    /// only means the dimensions could not be shown to nest. Dimensions of
    /// size > 1 are sorted by stride; each must span strictly less than the
    /// next one's stride. A non-positive stride on such a dimension is
    /// reported as overlap outright.
    pub fn may_overlap(&self) -> bool {
        let mut info: SmallVec<[Dim; STACK_DIMS]> = SmallVec::new();
        for i in 0..self.legacy_ndim(LegacyDims::All) {
            let d = if self.is_scalar() {
                Dim::new(1, 1)
            } else {
                self.dims()[i]
            };
            if d.size > 1 {
                if d.stride < 1 {
                    return true;
                }
                info.push(d);
            }
        }

        // Ascending: innermost dimension of the sorted view first
        info.sort_unstable_by_key(|d| d.stride);

        info.windows(2).any(|pair| {
            let span = (pair[0].size as i128 - 1) * pair[0].stride as i128;
            span >= pair[1].stride as i128
        })
    }
}

fn require_non_empty<R: Runtime>(tensors: &[&Tensor<R>]) -> Result<()> {
    if tensors.is_empty() {
        return Err(Error::invalid_argument(
            "tensors",
            "expected at least one tensor",
        ));
    }
    Ok(())
}

/// Whether every tensor is row-major contiguous
pub fn all_contiguous<R: Runtime>(tensors: &[&Tensor<R>]) -> Result<bool> {
    require_non_empty(tensors)?;
    Ok(tensors.iter().all(|t| t.is_contiguous()))
}

/// Whether every tensor lives on the same device as the first
pub fn all_same_device<R: Runtime>(tensors: &[&Tensor<R>]) -> Result<bool> {
    require_non_empty(tensors)?;
    let first = tensors[0].device();
    Ok(tensors[1..].iter().all(|t| t.device().is_same(first)))
}

/// Whether every tensor can use 32-bit index arithmetic under `limit`
pub fn all_32bit_indexable<R: Runtime>(tensors: &[&Tensor<R>], limit: usize) -> Result<bool> {
    require_non_empty(tensors)?;
    Ok(tensors.iter().all(|t| t.can_use_32bit_index_math(limit)))
}
