//! Trait for device identification

use crate::tensor::INDEX_32BIT_LIMIT;

/// Trait for device identification
pub trait Device: Clone + Send + Sync + 'static {
    /// Unique identifier for this device
    fn id(&self) -> usize;

    /// Check if two devices are the same
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Human-readable name
    fn name(&self) -> String {
        format!("Device({})", self.id())
    }

    /// Exclusive upper bound on element counts and offsets for which kernels
    /// on this device may use 32-bit index arithmetic
    fn max_32bit_index(&self) -> usize {
        INDEX_32BIT_LIMIT
    }
}
