//! Handle identity

use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for handle IDs
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one tensor handle
///
/// Two handles that view the same storage with the same geometry are still
/// distinct handles. Mutators compare IDs to recognise a source argument that
/// is the destination itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TensorId(u64);

impl TensorId {
    /// Allocate a fresh ID
    #[inline]
    pub fn new() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl Default for TensorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tensor({})", self.0)
    }
}
