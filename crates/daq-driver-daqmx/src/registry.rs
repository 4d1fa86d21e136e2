//! Process-wide collection of devices.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::channel::ChannelId;
use crate::device::Device;

/// A device shared between the registry and the channels that use it.
pub type SharedDevice = Arc<Mutex<Device>>;

/// Insertion-ordered registry of devices. Devices are never removed.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: Vec<(ChannelId, SharedDevice)>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a device, returning the shared handle.
    pub fn register(&mut self, device: Device) -> SharedDevice {
        let id = device.id();
        let shared = Arc::new(Mutex::new(device));
        self.devices.push((id, Arc::clone(&shared)));
        shared
    }

    /// Find a device by id.
    pub fn find_by_id(&self, id: ChannelId) -> Option<SharedDevice> {
        self.devices
            .iter()
            .find(|(device_id, _)| *device_id == id)
            .map(|(_, device)| Arc::clone(device))
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Check if no device is registered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Iterate over devices in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SharedDevice> {
        self.devices.iter().map(|(_, device)| device)
    }
}
