//! Desktop media backend: clips decoded with symphonia and played through cpal.

pub mod cursor;
pub mod decoder;
pub mod device;
pub mod output;

pub use cursor::ClipCursor;
pub use decoder::{decode_clip, DecodedClip};
pub use device::DeviceManager;
pub use output::DesktopHandle;

use crate::error::PlaybackError;
use crate::playback::{MediaBackend, MediaHandle, MediaNotifier};
use std::path::PathBuf;

/// Plays local audio files on an output device
pub struct DesktopBackend {
    device: cpal::Device,
}

impl DesktopBackend {
    /// Open the preferred output device, or the default one
    pub fn new(preferred_device: Option<&str>) -> Result<Self, PlaybackError> {
        let mut devices = DeviceManager::new()?;
        devices.select_device_with_fallback(preferred_device)?;

        let device_name = devices.current_device_name();
        let device = devices
            .into_current_device()
            .ok_or_else(|| PlaybackError::DeviceUnavailable("No output device selected".to_string()))?;

        log::info!(
            "Using output device: {}",
            device_name.as_deref().unwrap_or("unknown")
        );
        Ok(Self { device })
    }
}

impl MediaBackend for DesktopBackend {
    fn open(&mut self, url: &str, notifier: MediaNotifier) -> Result<Box<dyn MediaHandle>, PlaybackError> {
        let path = media_path(url)?;
        Ok(Box::new(DesktopHandle::new(path, self.device.clone(), notifier)))
    }
}

/// Resolve a sound URL to a local file
pub fn media_path(url: &str) -> Result<PathBuf, PlaybackError> {
    let url = url.trim();
    let lower = url.to_lowercase();

    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Err(PlaybackError::UnsupportedSource { url: url.to_string() });
    }

    let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
    if path.as_os_str().is_empty() || !path.is_file() {
        return Err(PlaybackError::MediaNotFound {
            path: path.display().to_string(),
        });
    }

    Ok(path)
}
