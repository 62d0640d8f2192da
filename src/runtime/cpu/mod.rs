//! CPU runtime implementation
//!
//! The CPU runtime keeps storages on the host heap. It is the reference
//! backend for the geometry core: allocations are real, but every copy kind
//! collapses to a memory move and there is a single device.

mod device;
mod runtime;

pub use device::CpuDevice;
pub use runtime::CpuRuntime;
