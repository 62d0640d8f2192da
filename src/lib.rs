//! # numr-geometry
//!
//! **Tensor handles, strided geometry and storage binding for device kernels.**
//!
//! Every kernel in a tensor backend starts by asking the same questions of
//! its operands: how many elements, in which order, are they contiguous, can
//! the view be indexed with 32-bit arithmetic, do any two elements alias.
//! Outputs then get resized, squeezed or pointed at another storage before
//! the kernel writes into them. This crate is that layer.
//!
//! ## Overview
//!
//! - **Geometry**: [`tensor::ShapeVector`] holds (size, stride) pairs with
//!   stack storage for the common low-rank case
//! - **Queries**: element counts, legacy dimension views, contiguity,
//!   overlap detection, 32-bit indexability
//! - **Mutation**: resize with capacity growth, squeeze/unsqueeze,
//!   reduce-dim bookkeeping, storage rebinding
//! - **Backends**: [`runtime::Runtime`] abstracts allocation, copies and
//!   device selection; [`runtime::cpu::CpuRuntime`] is the host backend
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use numr_geometry::prelude::*;
//!
//! let device = CpuDevice::new();
//! let mut t = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[1, 4], &device)?;
//! t.squeeze_dim(None, 0)?;
//! assert_eq!(t.sizes().as_slice(), &[4]);
//! t.resize(&[2, 4], None)?; // grows the storage
//! ```
//!
//! ## Feature Flags
//!
//! - `cpu` (default): CPU backend
//! - `f16`: Half-precision element types (F16, BF16)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod dtype;
pub mod error;
pub mod runtime;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::runtime::{Device, DeviceGuard, GuardMode, MemcpyKind, Runtime};
    pub use crate::tensor::{
        INDEX_32BIT_LIMIT, LegacyDims, MemoryFormat, ShapeVector, Storage, Tensor,
    };

    #[cfg(feature = "cpu")]
    pub use crate::runtime::cpu::{CpuDevice, CpuRuntime};
}
