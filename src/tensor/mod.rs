//! Tensor handles and their geometry
//!
//! A [`Tensor`] is a view into a reference-counted [`Storage`]: a
//! [`ShapeVector`] of (size, stride) pairs plus an element offset. This
//! module answers questions about that geometry (element counts, legacy
//! dimension views, contiguity, overlap, 32-bit indexability) and mutates it
//! in place (resize, squeeze, unsqueeze, rebinding to another storage).

mod binding;
mod core;
mod format;
mod id;
mod mutate;
mod query;
mod shape;
mod storage;

pub use core::Tensor;
pub use format::MemoryFormat;
pub use id::TensorId;
pub use query::{
    INDEX_32BIT_LIMIT, LegacyDims, all_32bit_indexable, all_contiguous, all_same_device,
};
pub use shape::{Dim, MAX_DIMS, ShapeVector, Sizes, Strides, contiguous_strides};
pub use storage::Storage;
