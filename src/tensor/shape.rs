//! ShapeVector: per-dimension (size, stride) pairs
//!
//! This is the raw geometry of a tensor view. Sizes and strides are kept
//! together so that squeeze/unsqueeze move them as one unit.

use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;

/// Stack allocation threshold for dimensions
/// Most tensors have 4 or fewer dimensions, so we stack-allocate up to 4
pub(crate) const STACK_DIMS: usize = 4;

/// Maximum rank a tensor may have
pub const MAX_DIMS: usize = 25;

/// Sizes of a tensor, one per dimension
pub type Sizes = SmallVec<[usize; STACK_DIMS]>;

/// Strides of a tensor, in ELEMENTS, one per dimension
/// Signed: flipped views and broadcasts produce negative or zero strides
pub type Strides = SmallVec<[isize; STACK_DIMS]>;

/// One dimension of a tensor view
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dim {
    /// Number of indices along this dimension
    pub size: usize,
    /// Storage distance between consecutive indices
    pub stride: isize,
}

impl Dim {
    /// Create a dimension
    #[inline]
    pub const fn new(size: usize, stride: isize) -> Self {
        Self { size, stride }
    }
}

/// Ordered (size, stride) pairs describing a tensor view
///
/// Address of element at indices [i0, i1, ..., in]:
///   offset + i0 * strides[0] + i1 * strides[1] + ... + in * strides[n]
///
/// The rank is bounded by [`MAX_DIMS`]; every constructor and every mutation
/// that grows the rank checks it.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ShapeVector {
    dims: SmallVec<[Dim; STACK_DIMS]>,
}

/// Row-major strides for `sizes`
///
/// Zero sizes are treated as 1 so that the strides of an empty tensor stay
/// meaningful if it is later resized along another dimension.
pub fn contiguous_strides(sizes: &[usize]) -> Strides {
    let mut strides = Strides::with_capacity(sizes.len());
    let mut stride = 1isize;

    // Compute strides from last dimension to first
    for &size in sizes.iter().rev() {
        strides.push(stride);
        stride = stride.saturating_mul(size.max(1) as isize);
    }

    strides.reverse();
    strides
}

fn check_rank(ndim: usize) -> Result<()> {
    if ndim > MAX_DIMS {
        return Err(Error::invalid_argument(
            "sizes",
            format!("rank {ndim} exceeds the maximum of {MAX_DIMS} dimensions"),
        ));
    }
    Ok(())
}

impl ShapeVector {
    /// A 0-dimensional (scalar) shape
    pub fn scalar() -> Self {
        Self {
            dims: SmallVec::new(),
        }
    }

    /// A row-major shape for `sizes`
    ///
    /// # Example
    /// ```
    /// use numr_geometry::tensor::ShapeVector;
    /// let shape = ShapeVector::contiguous(&[2, 3, 4]).unwrap();
    /// assert_eq!(shape.sizes().as_slice(), &[2, 3, 4]);
    /// assert_eq!(shape.strides().as_slice(), &[12, 4, 1]);
    /// ```
    pub fn contiguous(sizes: &[usize]) -> Result<Self> {
        check_rank(sizes.len())?;
        let strides = contiguous_strides(sizes);
        Ok(Self {
            dims: sizes
                .iter()
                .zip(strides.iter())
                .map(|(&size, &stride)| Dim::new(size, stride))
                .collect(),
        })
    }

    /// A shape with explicit strides
    pub fn from_sizes_strides(sizes: &[usize], strides: &[isize]) -> Result<Self> {
        if sizes.len() != strides.len() {
            return Err(Error::invalid_argument(
                "strides",
                format!(
                    "inconsistent size/stride lengths: {} sizes, {} strides",
                    sizes.len(),
                    strides.len()
                ),
            ));
        }
        check_rank(sizes.len())?;
        Ok(Self {
            dims: sizes
                .iter()
                .zip(strides.iter())
                .map(|(&size, &stride)| Dim::new(size, stride))
                .collect(),
        })
    }

    /// Raw number of dimensions
    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Whether this is a 0-dimensional shape
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// The (size, stride) pairs
    #[inline]
    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    /// Sizes, one per dimension
    pub fn sizes(&self) -> Sizes {
        self.dims.iter().map(|d| d.size).collect()
    }

    /// Strides, one per dimension
    pub fn strides(&self) -> Strides {
        self.dims.iter().map(|d| d.stride).collect()
    }

    /// Whether any dimension has size 0
    #[inline]
    pub fn has_zero_size(&self) -> bool {
        self.dims.iter().any(|d| d.size == 0)
    }

    /// Product of the sizes (1 for a scalar), `None` on overflow
    pub fn checked_numel(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |acc, d| acc.checked_mul(d.size))
    }

    /// Whether the sizes equal `sizes` (rank included)
    pub fn same_sizes(&self, sizes: &[usize]) -> bool {
        self.dims.len() == sizes.len() && self.dims.iter().zip(sizes).all(|(d, &s)| d.size == s)
    }

    /// Whether the strides equal `strides` (rank included)
    pub fn same_strides(&self, strides: &[isize]) -> bool {
        self.dims.len() == strides.len()
            && self.dims.iter().zip(strides).all(|(d, &s)| d.stride == s)
    }

    /// Storage elements needed past the view's offset
    ///
    /// `1 + sum((size - 1) * stride)`, or 0 as soon as any size is 0.
    /// Negative strides may make this zero or negative; the caller decides
    /// what that means. `None` on overflow.
    pub fn storage_extent(&self) -> Option<isize> {
        let mut extent = 1isize;
        for d in &self.dims {
            if d.size == 0 {
                return Some(0);
            }
            let span = (isize::try_from(d.size).ok()? - 1).checked_mul(d.stride)?;
            extent = extent.checked_add(span)?;
        }
        Some(extent)
    }

    /// Element offset (relative to the view's offset) of a multi-index
    pub fn offset_of(&self, indices: &[usize]) -> Result<isize> {
        if indices.len() != self.ndim() {
            return Err(Error::invalid_argument(
                "indices",
                format!("expected {} indices, got {}", self.ndim(), indices.len()),
            ));
        }

        let mut linear = 0isize;
        for (dim, (&idx, d)) in indices.iter().zip(self.dims.iter()).enumerate() {
            if idx >= d.size {
                return Err(Error::invalid_argument(
                    "indices",
                    format!(
                        "index {idx} out of bounds for dimension {dim} of size {}",
                        d.size
                    ),
                ));
            }
            linear = isize::try_from(idx)
                .ok()
                .and_then(|idx| idx.checked_mul(d.stride))
                .and_then(|step| linear.checked_add(step))
                .ok_or_else(|| Error::invalid_argument("indices", "element offset overflows"))?;
        }
        Ok(linear)
    }

    /// Remove dimension `dim`, shifting later dimensions left
    pub(crate) fn remove(&mut self, dim: usize) -> Dim {
        self.dims.remove(dim)
    }

    /// Insert a size-1 dimension at `dim`
    ///
    /// Its stride is `size * stride` of the dimension it lands in front of,
    /// or 1 when it becomes the trailing dimension.
    pub(crate) fn insert_unit(&mut self, dim: usize) -> Result<()> {
        check_rank(self.ndim() + 1)?;
        let stride = match self.dims.get(dim) {
            Some(next) => isize::try_from(next.size)
                .ok()
                .and_then(|size| next.stride.checked_mul(size))
                .ok_or_else(|| {
                    Error::invalid_argument(
                        "dim",
                        format!("stride of a unit dimension in front of {next:?} overflows"),
                    )
                })?,
            None => 1,
        };
        self.dims.insert(dim, Dim::new(1, stride));
        Ok(())
    }
}

impl fmt::Debug for ShapeVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ShapeVector {{ sizes: {:?}, strides: {:?} }}",
            self.sizes().as_slice(),
            self.strides().as_slice()
        )
    }
}

impl fmt::Display for ShapeVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.sizes().as_slice())
    }
}
