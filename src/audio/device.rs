use crate::error::PlaybackError;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use std::collections::BTreeMap;

/// Enumerates output devices and picks the one sounds play on
pub struct DeviceManager {
    host: Host,
    devices: BTreeMap<String, Device>,
    current_device: Option<Device>,
}

impl DeviceManager {
    pub fn new() -> Result<Self, PlaybackError> {
        let mut manager = DeviceManager {
            host: cpal::default_host(),
            devices: BTreeMap::new(),
            current_device: None,
        };

        manager.refresh_devices()?;
        Ok(manager)
    }

    pub fn refresh_devices(&mut self) -> Result<(), PlaybackError> {
        self.devices.clear();

        let devices = self
            .host
            .output_devices()
            .map_err(|e| PlaybackError::DeviceUnavailable(format!("Failed to enumerate devices: {}", e)))?;

        for device in devices {
            match device.name() {
                Ok(name) => {
                    self.devices.insert(name, device);
                }
                Err(e) => log::debug!("Skipping unnamed output device: {}", e),
            }
        }

        Ok(())
    }

    /// Names of all output devices, sorted
    pub fn list_devices(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    /// Select `device_name`, falling back to the system default when it is
    /// missing or not given
    pub fn select_device_with_fallback(&mut self, device_name: Option<&str>) -> Result<(), PlaybackError> {
        if let Some(name) = device_name {
            if let Some(device) = self.devices.get(name).cloned() {
                self.current_device = Some(device);
                return Ok(());
            }
            log::warn!("Output device '{}' not found, using the default device", name);
        }

        self.select_default_device()
    }

    pub fn select_default_device(&mut self) -> Result<(), PlaybackError> {
        let default_device = self
            .host
            .default_output_device()
            .ok_or_else(|| PlaybackError::DeviceUnavailable("No default output device available".to_string()))?;

        self.current_device = Some(default_device);
        Ok(())
    }

    pub fn current_device_name(&self) -> Option<String> {
        self.current_device.as_ref().and_then(|device| device.name().ok())
    }

    /// Hand over the selected device
    pub fn into_current_device(self) -> Option<Device> {
        self.current_device
    }
}
