//! [`ConditionalDevice`] – a hardware slot that may or may not be populated.
//!
//! The robot keeps operating when a device is unplugged or misnamed on the
//! hardware map: every operation on an absent device falls through to a
//! caller-supplied fallback instead of failing.

/// A device that was either found on the hardware map or is absent for the
/// whole run.
#[derive(Debug)]
pub struct ConditionalDevice<T> {
    device: Option<T>,
}

impl<T> ConditionalDevice<T> {
    pub fn present(device: T) -> Self {
        Self {
            device: Some(device),
        }
    }

    pub fn absent() -> Self {
        Self { device: None }
    }

    pub fn is_available(&self) -> bool {
        self.device.is_some()
    }

    /// Run `action` against the device if it is present.
    pub fn run_if_available(&mut self, action: impl FnOnce(&mut T)) {
        if let Some(device) = self.device.as_mut() {
            action(device);
        }
    }

    /// Run `action` if the device is present, otherwise `fallback`.
    pub fn run_if_available_or<R>(
        &mut self,
        action: impl FnOnce(&mut T) -> R,
        fallback: impl FnOnce() -> R,
    ) -> R {
        match self.device.as_mut() {
            Some(device) => action(device),
            None => fallback(),
        }
    }

    /// Read from the device, or return `default` when it is absent.
    pub fn map_or<R>(&self, default: R, read: impl FnOnce(&T) -> R) -> R {
        self.device.as_ref().map_or(default, read)
    }
}

impl<T> Default for ConditionalDevice<T> {
    fn default() -> Self {
        Self::absent()
    }
}

impl<T> From<Option<T>> for ConditionalDevice<T> {
    fn from(device: Option<T>) -> Self {
        Self { device }
    }
}
