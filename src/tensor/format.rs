//! Memory formats for 4-D and 5-D activations
//!
//! Binary and pooling kernels keep channels-last inputs channels-last: they
//! ask which format an input is in and allocate outputs with matching strides.

use super::shape::{Strides, contiguous_strides};
use super::{ShapeVector, Storage, Tensor};
use crate::error::{Error, Result};
use crate::runtime::Runtime;

/// Physical dimension order of a tensor
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MemoryFormat {
    /// Row-major, any rank
    #[default]
    Contiguous,
    /// NCHW sizes laid out as NHWC
    ChannelsLast,
    /// NCDHW sizes laid out as NDHWC
    ChannelsLast3d,
}

impl MemoryFormat {
    /// Rank this format applies to, `None` for any rank
    pub const fn rank(self) -> Option<usize> {
        match self {
            Self::Contiguous => None,
            Self::ChannelsLast => Some(4),
            Self::ChannelsLast3d => Some(5),
        }
    }

    /// Strides that lay `sizes` out in this format
    pub fn strides_for(self, sizes: &[usize]) -> Result<Strides> {
        if let Some(rank) = self.rank() {
            if sizes.len() != rank {
                return Err(Error::invalid_argument(
                    "sizes",
                    format!("{self:?} requires rank {rank}, got {}", sizes.len()),
                ));
            }
        }

        let s = |d: usize| sizes[d].max(1) as isize;
        let mut strides = Strides::from_elem(0, sizes.len());
        match self {
            Self::Contiguous => return Ok(contiguous_strides(sizes)),
            Self::ChannelsLast => {
                strides[1] = 1;
                strides[3] = s(1);
                strides[2] = strides[3] * s(3);
                strides[0] = strides[2] * s(2);
            }
            Self::ChannelsLast3d => {
                strides[1] = 1;
                strides[4] = s(1);
                strides[3] = strides[4] * s(4);
                strides[2] = strides[3] * s(3);
                strides[0] = strides[2] * s(2);
            }
        }
        Ok(strides)
    }
}

impl ShapeVector {
    /// Whether the layout matches `format`, ignoring size-1 dimensions
    pub fn is_contiguous_as(&self, format: MemoryFormat) -> bool {
        if format == MemoryFormat::Contiguous {
            return self.is_contiguous();
        }
        let Ok(expected) = format.strides_for(&self.sizes()) else {
            return false;
        };
        if self.has_zero_size() {
            return true;
        }
        self.dims()
            .iter()
            .zip(expected.iter())
            .all(|(d, &stride)| d.size == 1 || d.stride == stride)
    }

    /// Format an output computed from this input should use
    ///
    /// Channels-last only when the layout is channels-last and not also
    /// row-major contiguous.
    pub fn suggest_memory_format(&self) -> MemoryFormat {
        if self.is_contiguous() {
            return MemoryFormat::Contiguous;
        }
        match self.ndim() {
            4 if self.is_contiguous_as(MemoryFormat::ChannelsLast) => MemoryFormat::ChannelsLast,
            5 if self.is_contiguous_as(MemoryFormat::ChannelsLast3d) => {
                MemoryFormat::ChannelsLast3d
            }
            _ => MemoryFormat::Contiguous,
        }
    }
}

impl<R: Runtime> Tensor<R> {
    /// Allocate a tensor with `like`'s sizes, dtype and device in `format`
    pub fn empty_like(like: &Tensor<R>, format: MemoryFormat) -> Result<Self> {
        let sizes = like.sizes();
        let strides = format.strides_for(&sizes)?;
        let geometry = ShapeVector::from_sizes_strides(&sizes, &strides)?;
        let len = geometry.storage_extent().unwrap_or(0).max(0) as usize;
        let storage = Storage::new(len, like.dtype(), like.device())?;
        Self::from_parts(storage, geometry, 0)
    }
}
