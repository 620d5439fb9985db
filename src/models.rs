use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a sound in the media catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundId(pub u64);

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SoundId {
    fn from(id: u64) -> Self {
        SoundId(id)
    }
}

/// A clip on the board.
///
/// Field names serialize in the camelCase used by the remote document store,
/// so a dump of that store loads without translation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sound {
    pub id: SoundId,
    pub title: String,
    pub audio_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub play_count: u64,
    #[serde(default)]
    pub is_looping: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Sound {
    pub fn new(id: impl Into<SoundId>, title: impl Into<String>, audio_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            audio_url: audio_url.into(),
            image_url: None,
            play_count: 0,
            is_looping: false,
            owner: None,
        }
    }

    /// Builder-style loop preference
    pub fn looping(mut self, is_looping: bool) -> Self {
        self.is_looping = is_looping;
        self
    }

    /// Title for display, falling back to the id for untitled uploads
    pub fn display_name(&self) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            format!("Sound #{}", self.id)
        } else {
            title.to_string()
        }
    }
}

/// Process-wide playback preferences, read by every new session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Target volume reached by fade-in (0.0 to 1.0)
    pub volume: f32,
    /// Speed multiplier, always > 0
    pub speed: f64,
    /// Pitch offset in semitones
    pub pitch_semitones: f64,
    pub auto_advance: bool,
    pub shuffle: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            volume: 0.8,
            speed: 1.0,
            pitch_semitones: 0.0,
            auto_advance: false,
            shuffle: false,
        }
    }
}

/// Lifecycle of the single playback session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlaybackState {
    /// No session exists
    Idle,
    /// Handle created and fading in, waiting for the media to report start
    Starting,
    /// Media reported start and is audible
    Playing,
    /// Fading out after an explicit stop or supersession
    Ending,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Starting => "Starting",
            PlaybackState::Playing => "Playing",
            PlaybackState::Ending => "Ending",
        }
    }

    /// Whether a session is bound in this state
    pub fn is_active(&self) -> bool {
        !matches!(self, PlaybackState::Idle)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the engine for status displays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub current_sound: Option<Sound>,
    pub looping: bool,
    pub playback_rate: f64,
    pub settings: EngineSettings,
    pub candidates: usize,
}

impl PlayerStatus {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            current_sound: None,
            looping: false,
            playback_rate: 1.0,
            settings: EngineSettings::default(),
            candidates: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, PlaybackState::Idle)
    }
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sound_creation() {
        let sound = Sound::new(1, "Airhorn", "/clips/airhorn.mp3");

        assert_eq!(sound.id, SoundId(1));
        assert_eq!(sound.title, "Airhorn");
        assert_eq!(sound.play_count, 0);
        assert!(!sound.is_looping);
        assert!(sound.looping(true).is_looping);
    }

    #[test]
    fn test_sound_display_name() {
        assert_eq!(Sound::new(5, "  Rimshot ", "a.wav").display_name(), "Rimshot");
        assert_eq!(Sound::new(5, "   ", "a.wav").display_name(), "Sound #5");
    }

    #[test]
    fn test_sound_serializes_with_store_field_names() {
        let mut sound = Sound::new(1700000000000, "Crickets", "https://cdn.example.com/crickets.mp3");
        sound.play_count = 3;
        sound.is_looping = true;

        let json = serde_json::to_string(&sound).unwrap();
        assert!(json.contains("\"audioUrl\""));
        assert!(json.contains("\"playCount\":3"));
        assert!(json.contains("\"isLooping\":true"));
        assert!(json.contains("\"id\":1700000000000"));
        assert!(!json.contains("imageUrl"));
    }

    #[test]
    fn test_sound_missing_optional_fields_default() {
        let json = r#"{"id": 9, "title": "Boing", "audioUrl": "boing.ogg", "imageUrl": "boing.png"}"#;
        let sound: Sound = serde_json::from_str(json).unwrap();

        assert_eq!(sound.id, SoundId(9));
        assert_eq!(sound.image_url.as_deref(), Some("boing.png"));
        assert_eq!(sound.play_count, 0);
        assert!(!sound.is_looping);
        assert!(sound.owner.is_none());
    }

    #[test]
    fn test_engine_settings_default() {
        let settings = EngineSettings::default();
        assert_eq!(settings.volume, 0.8);
        assert_eq!(settings.speed, 1.0);
        assert_eq!(settings.pitch_semitones, 0.0);
        assert!(!settings.auto_advance);
        assert!(!settings.shuffle);
    }

    #[test]
    fn test_playback_state_display() {
        assert_eq!(PlaybackState::Idle.to_string(), "Idle");
        assert_eq!(PlaybackState::Ending.as_str(), "Ending");
        assert!(!PlaybackState::Idle.is_active());
        assert!(PlaybackState::Starting.is_active());
    }

    #[test]
    fn test_player_status_default_is_idle() {
        let status = PlayerStatus::default();
        assert!(status.is_idle());
        assert!(!status.is_playing());
        assert!(status.current_sound.is_none());
    }
}
