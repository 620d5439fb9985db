use super::MediaCatalog;
use crate::error::CatalogError;
use crate::models::{Sound, SoundId};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    sounds: Vec<Sound>,
}

#[derive(Serialize)]
struct CatalogFileRef<'a> {
    sounds: &'a [Sound],
}

/// Fields for a sound being added to the board
#[derive(Debug, Clone, Default)]
pub struct NewSound {
    pub title: String,
    pub audio_url: String,
    pub image_url: Option<String>,
    pub is_looping: bool,
    pub owner: Option<String>,
}

/// Partial update of a sound; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct SoundEdit {
    pub title: Option<String>,
    pub audio_url: Option<String>,
    pub image_url: Option<String>,
}

impl SoundEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.audio_url.is_none() && self.image_url.is_none()
    }
}

/// A catalog stored as a TOML file of `[[sounds]]` tables.
///
/// Every mutation is written through to disk before it returns.
pub struct SoundLibrary {
    path: PathBuf,
    sounds: Mutex<Vec<Sound>>,
}

impl SoundLibrary {
    /// Load the catalog at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let path = path.into();

        let sounds = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let file: CatalogFile = toml::from_str(&content)?;
            debug!("Loaded {} sounds from {}", file.sounds.len(), path.display());
            file.sounds
        } else {
            debug!("No catalog at {}, starting empty", path.display());
            Vec::new()
        };

        Ok(Self {
            path,
            sounds: Mutex::new(sounds),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Sound>> {
        self.sounds.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, id: SoundId) -> Result<Sound, CatalogError> {
        self.lock()
            .iter()
            .find(|sound| sound.id == id)
            .cloned()
            .ok_or(CatalogError::SoundNotFound { id: id.0 })
    }

    pub fn add_sound(&self, new_sound: NewSound) -> Result<Sound, CatalogError> {
        let title = validate_title(&new_sound.title)?;
        let audio_url = new_sound.audio_url.trim().to_string();
        if audio_url.is_empty() {
            return Err(CatalogError::InvalidSound("an audio file is required".to_string()));
        }

        let sound = self.mutate(|sounds| {
            let mut id = chrono::Utc::now().timestamp_millis().max(0) as u64;
            while sounds.iter().any(|sound| sound.id.0 == id) {
                id += 1;
            }

            let mut sound = Sound::new(id, title, audio_url).looping(new_sound.is_looping);
            sound.image_url = new_sound.image_url.filter(|url| !url.trim().is_empty());
            sound.owner = new_sound.owner;
            sounds.push(sound.clone());
            Ok(sound)
        })?;

        info!("Added sound '{}' ({})", sound.title, sound.id);
        Ok(sound)
    }

    pub fn update_sound(&self, id: SoundId, edit: SoundEdit) -> Result<Sound, CatalogError> {
        let title = edit.title.as_deref().map(validate_title).transpose()?;

        self.mutate(|sounds| {
            let sound = find_mut(sounds, id)?;
            if let Some(title) = title {
                sound.title = title;
            }
            if let Some(audio_url) = edit.audio_url.filter(|url| !url.trim().is_empty()) {
                sound.audio_url = audio_url;
            }
            if let Some(image_url) = edit.image_url {
                sound.image_url = Some(image_url).filter(|url| !url.trim().is_empty());
            }
            Ok(sound.clone())
        })
    }

    pub fn set_looping(&self, id: SoundId, is_looping: bool) -> Result<Sound, CatalogError> {
        self.mutate(|sounds| {
            let sound = find_mut(sounds, id)?;
            sound.is_looping = is_looping;
            Ok(sound.clone())
        })
    }

    pub fn remove_sound(&self, id: SoundId) -> Result<Sound, CatalogError> {
        let removed = self.mutate(|sounds| {
            let position = sounds
                .iter()
                .position(|sound| sound.id == id)
                .ok_or(CatalogError::SoundNotFound { id: id.0 })?;
            Ok(sounds.remove(position))
        })?;

        info!("Removed sound '{}' ({})", removed.title, removed.id);
        Ok(removed)
    }

    /// Apply `change` to a copy and keep it only once it is on disk
    fn mutate<T>(&self, change: impl FnOnce(&mut Vec<Sound>) -> Result<T, CatalogError>) -> Result<T, CatalogError> {
        let mut sounds = self.lock();
        let mut updated = sounds.clone();
        let result = change(&mut updated)?;
        self.save(&updated)?;
        *sounds = updated;
        Ok(result)
    }

    fn save(&self, sounds: &[Sound]) -> Result<(), CatalogError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(&CatalogFileRef { sounds })?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl MediaCatalog for SoundLibrary {
    fn list_sounds(&self) -> Result<Vec<Sound>, CatalogError> {
        Ok(self.lock().clone())
    }

    fn increment_play_count(&self, id: SoundId) -> Result<(), CatalogError> {
        self.mutate(|sounds| {
            let sound = find_mut(sounds, id)?;
            sound.play_count += 1;
            Ok(())
        })
    }
}

fn find_mut(sounds: &mut [Sound], id: SoundId) -> Result<&mut Sound, CatalogError> {
    sounds
        .iter_mut()
        .find(|sound| sound.id == id)
        .ok_or(CatalogError::SoundNotFound { id: id.0 })
}

fn validate_title(title: &str) -> Result<String, CatalogError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CatalogError::InvalidSound("a title is required".to_string()));
    }
    Ok(title.to_string())
}
