//! Runtime seam for device memory
//!
//! The geometry core does no compute. It reaches a runtime only to allocate,
//! grow and free storage, and to select the device those allocations land on.
//!
//! # Architecture
//!
//! ```text
//! Runtime (device memory owner)
//! ├── Device (identifies a specific GPU/CPU, supplies index limits)
//! ├── memcpy / memset / fill (with MemcpyKind tags)
//! └── current_device / set_device (driven by DeviceGuard)
//! ```

mod guard;
mod traits;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use guard::{DeviceGuard, GuardMode};
pub use traits::{Device, MemcpyKind, Runtime};
