//! Runtime traits for device memory abstraction

pub mod device;
pub mod runtime;

pub use device::Device;
pub use runtime::{MemcpyKind, Runtime};
