//! Scoped device selection
//!
//! Mutations that may allocate take a [`GuardMode`] instead of consulting any
//! ambient state. Public entry points pass `Enter`; steps of a larger
//! operation that already selected the device pass `Skip`.

use super::{Device, Runtime};
use crate::error::Result;
use std::marker::PhantomData;

/// Whether a mutation should select the tensor's device itself
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum GuardMode {
    /// Switch to the tensor's device for the duration of the call
    #[default]
    Enter,
    /// The caller already selected the device
    Skip,
}

/// Selects a device for its lifetime and restores the previous one on drop
///
/// Constructing a guard for the device that is already current does nothing,
/// so nested guards never issue redundant switches.
#[must_use = "the previous device is restored when the guard is dropped"]
pub struct DeviceGuard<R: Runtime> {
    previous: Option<R::Device>,
    _runtime: PhantomData<R>,
}

impl<R: Runtime> DeviceGuard<R> {
    /// Make `device` current until the guard is dropped
    pub fn new(device: &R::Device) -> Result<Self> {
        let current = R::current_device();
        if current.is_same(device) {
            return Ok(Self::inactive());
        }

        log::debug!(
            "{}: switching device {} -> {}",
            R::name(),
            current.name(),
            device.name()
        );
        R::set_device(device)?;
        Ok(Self {
            previous: Some(current),
            _runtime: PhantomData,
        })
    }

    /// Honour `mode`: a real guard for `Enter`, an inactive one for `Skip`
    pub fn with_mode(device: &R::Device, mode: GuardMode) -> Result<Self> {
        match mode {
            GuardMode::Enter => Self::new(device),
            GuardMode::Skip => Ok(Self::inactive()),
        }
    }

    /// A guard that does not touch the current device
    pub fn inactive() -> Self {
        Self {
            previous: None,
            _runtime: PhantomData,
        }
    }

    /// Whether dropping this guard will switch devices back
    #[inline]
    pub fn is_active(&self) -> bool {
        self.previous.is_some()
    }
}

impl<R: Runtime> Drop for DeviceGuard<R> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(err) = R::set_device(&previous) {
                log::warn!(
                    "{}: failed to restore device {}: {}",
                    R::name(),
                    previous.name(),
                    err
                );
            }
        }
    }
}
