use crate::error::ConfigError;
use crate::models::EngineSettings;
use crate::playback::{clamp_pitch, clamp_speed, EngineTiming};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Soundboard configuration, stored as TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundboardConfig {
    pub volume: f32,
    pub speed: f64,
    pub pitch_semitones: f64,
    pub auto_advance: bool,
    pub shuffle: bool,
    pub fade_tick_ms: u64,
    pub fade_step: f32,
    pub advance_delay_ms: u64,
    pub catalog_path: PathBuf,
    pub preferred_device: Option<String>,
}

impl Default for SoundboardConfig {
    fn default() -> Self {
        let settings = EngineSettings::default();
        let timing = EngineTiming::default();

        Self {
            volume: settings.volume,
            speed: settings.speed,
            pitch_semitones: settings.pitch_semitones,
            auto_advance: settings.auto_advance,
            shuffle: settings.shuffle,
            fade_tick_ms: timing.fade_tick.as_millis() as u64,
            fade_step: timing.fade_step,
            advance_delay_ms: timing.advance_delay.as_millis() as u64,
            catalog_path: config_dir().join("sounds.toml"),
            preferred_device: None,
        }
    }
}

impl SoundboardConfig {
    /// Playback preferences to start the engine with
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            volume: self.volume.clamp(0.0, 1.0),
            speed: clamp_speed(self.speed).unwrap_or(1.0),
            pitch_semitones: clamp_pitch(self.pitch_semitones).unwrap_or(0.0),
            auto_advance: self.auto_advance,
            shuffle: self.shuffle,
        }
    }

    pub fn timing(&self) -> EngineTiming {
        let defaults = EngineTiming::default();
        EngineTiming {
            fade_tick: if self.fade_tick_ms > 0 {
                Duration::from_millis(self.fade_tick_ms)
            } else {
                defaults.fade_tick
            },
            fade_step: if self.fade_step > 0.0 && self.fade_step <= 1.0 {
                self.fade_step
            } else {
                defaults.fade_step
            },
            advance_delay: Duration::from_millis(self.advance_delay_ms),
        }
    }

    /// Copy the live engine preferences back for persisting
    pub fn apply_settings(&mut self, settings: &EngineSettings) {
        self.volume = settings.volume;
        self.speed = settings.speed;
        self.pitch_semitones = settings.pitch_semitones;
        self.auto_advance = settings.auto_advance;
        self.shuffle = settings.shuffle;
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("soundboard")
}

/// Loads and saves the configuration file
pub struct ConfigManager {
    config: SoundboardConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        Ok(Self::with_path(config_path))
    }

    /// Use a specific config file; a missing or unreadable file yields defaults
    pub fn with_path(config_path: PathBuf) -> Self {
        let config = match Self::load_config(&config_path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring config at {}: {}", config_path.display(), e);
                SoundboardConfig::default()
            }
        };

        Self { config, config_path }
    }

    pub fn get_config(&self) -> &SoundboardConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update_config<F>(&mut self, updater: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut SoundboardConfig),
    {
        updater(&mut self.config);
        self.save_config()
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), ConfigError> {
        self.config.volume = volume.clamp(0.0, 1.0);
        self.save_config()
    }

    pub fn set_speed(&mut self, speed: f64) -> Result<(), ConfigError> {
        if let Some(speed) = clamp_speed(speed) {
            self.config.speed = speed;
        }
        self.save_config()
    }

    pub fn set_pitch(&mut self, semitones: f64) -> Result<(), ConfigError> {
        if let Some(semitones) = clamp_pitch(semitones) {
            self.config.pitch_semitones = semitones;
        }
        self.save_config()
    }

    pub fn set_auto_advance(&mut self, enabled: bool) -> Result<(), ConfigError> {
        self.config.auto_advance = enabled;
        self.save_config()
    }

    pub fn set_shuffle(&mut self, enabled: bool) -> Result<(), ConfigError> {
        self.config.shuffle = enabled;
        self.save_config()
    }

    pub fn set_preferred_device(&mut self, device: Option<String>) -> Result<(), ConfigError> {
        self.config.preferred_device = device;
        self.save_config()
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::home_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(".config")
            .join("soundboard");

        std::fs::create_dir_all(&config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<SoundboardConfig, ConfigError> {
        if !path.exists() {
            return Ok(SoundboardConfig::default());
        }

        let config_content = std::fs::read_to_string(path)?;
        let config: SoundboardConfig = toml::from_str(&config_content)?;
        Ok(config)
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config_content = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, config_content)?;

        Ok(())
    }
}
