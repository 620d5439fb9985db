use thiserror::Error;

/// Main soundboard error type
#[derive(Debug, Error)]
pub enum SoundboardError {
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CLI parse error: {0}")]
    Parse(#[from] crate::cli::ParseError),
}

impl SoundboardError {
    /// Get user-friendly error message with suggested solutions
    pub fn user_message(&self) -> String {
        match self {
            SoundboardError::Playback(err) => err.user_message(),
            SoundboardError::Catalog(err) => err.user_message(),
            SoundboardError::Config(err) => err.user_message(),
            SoundboardError::Io(err) => format!("File system error: {}", err),
            SoundboardError::Parse(err) => format!("Command error: {}", err),
        }
    }

    /// Get suggested recovery actions for the error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            SoundboardError::Playback(err) => err.recovery_suggestions(),
            SoundboardError::Catalog(err) => err.recovery_suggestions(),
            SoundboardError::Config(err) => err.recovery_suggestions(),
            SoundboardError::Io(_) => vec!["Try the operation again".to_string()],
            SoundboardError::Parse(_) => vec!["Type 'help' to see available commands".to_string()],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            SoundboardError::Playback(err) => err.is_recoverable(),
            SoundboardError::Catalog(err) => err.is_recoverable(),
            SoundboardError::Config(err) => err.is_recoverable(),
            SoundboardError::Io(_) => false,
            SoundboardError::Parse(_) => false,
        }
    }

    /// Process exit status for a failed one-shot command (75 is `EX_TEMPFAIL`)
    pub fn exit_code(&self) -> i32 {
        if self.is_recoverable() {
            75
        } else {
            1
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SoundboardError::Playback(PlaybackError::DeviceUnavailable(_)) => ErrorSeverity::Error,
            SoundboardError::Playback(_) => ErrorSeverity::Warning,
            SoundboardError::Catalog(CatalogError::SoundNotFound { .. }) => ErrorSeverity::Info,
            SoundboardError::Catalog(_) => ErrorSeverity::Error,
            SoundboardError::Config(_) => ErrorSeverity::Warning,
            SoundboardError::Io(_) => ErrorSeverity::Error,
            SoundboardError::Parse(_) => ErrorSeverity::Info,
        }
    }
}

/// Error severity levels for logging and user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
            ErrorSeverity::Critical => log::Level::Error,
        }
    }
}

/// Failures to bring a sound to the audible state.
///
/// These never escape the playback engine; they are logged and the engine
/// returns to idle.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Unsupported media source: {url}")]
    UnsupportedSource { url: String },

    #[error("Media not found: {path}")]
    MediaNotFound { path: String },

    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Stream error: {0}")]
    StreamFailed(String),
}

impl PlaybackError {
    pub fn user_message(&self) -> String {
        match self {
            PlaybackError::UnsupportedSource { url } => {
                format!("Cannot play '{}' - only local files are supported", url)
            }
            PlaybackError::MediaNotFound { path } => {
                format!("Audio file '{}' does not exist", path)
            }
            PlaybackError::UnsupportedFormat { format } => {
                format!("Audio format '{}' is not supported", format)
            }
            PlaybackError::DecodeFailed(msg) => {
                format!("Failed to decode audio data: {}", msg)
            }
            PlaybackError::DeviceUnavailable(msg) => {
                format!("No usable audio output device: {}", msg)
            }
            PlaybackError::StreamFailed(msg) => {
                format!("Audio playback interrupted: {}", msg)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PlaybackError::UnsupportedSource { .. } => vec![
                "Download the clip and point the sound at the local file".to_string(),
                "Use 'edit <id> --audio <path>' to change the media reference".to_string(),
            ],
            PlaybackError::MediaNotFound { .. } => vec![
                "Check that the file path is correct".to_string(),
                "Use 'list' to review the media reference of each sound".to_string(),
            ],
            PlaybackError::UnsupportedFormat { .. } => vec![
                "Supported formats: MP3, WAV, FLAC, OGG/Vorbis, AAC/M4A".to_string(),
                "Convert the clip to a supported format".to_string(),
            ],
            PlaybackError::DecodeFailed(_) => vec![
                "Try re-uploading or re-encoding the clip".to_string(),
                "Verify the file is not corrupted".to_string(),
            ],
            PlaybackError::DeviceUnavailable(_) => vec![
                "Use 'devices' to see available audio devices".to_string(),
                "Check that your audio device is connected".to_string(),
            ],
            PlaybackError::StreamFailed(_) => vec![
                "Play the sound again".to_string(),
                "Close other applications holding the audio device".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            PlaybackError::UnsupportedSource { .. } => false,
            PlaybackError::MediaNotFound { .. } => false,
            PlaybackError::UnsupportedFormat { .. } => false,
            PlaybackError::DecodeFailed(_) => false,
            PlaybackError::DeviceUnavailable(_) => true, // Can fall back to default device
            PlaybackError::StreamFailed(_) => true,
        }
    }
}

/// Media catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Sound not found: {id}")]
    SoundNotFound { id: u64 },

    #[error("Invalid sound: {0}")]
    InvalidSound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),
}

impl CatalogError {
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::SoundNotFound { id } => {
                format!("No sound with id {} in the catalog", id)
            }
            CatalogError::InvalidSound(msg) => format!("Sound rejected: {}", msg),
            CatalogError::Io(err) => format!("Cannot access catalog file: {}", err),
            CatalogError::Serialization(_) => "Failed to save the sound catalog".to_string(),
            CatalogError::Deserialization(_) => {
                "Catalog file is corrupted or has invalid format".to_string()
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            CatalogError::SoundNotFound { .. } => vec![
                "Use 'list' to see available sounds and their ids".to_string(),
            ],
            CatalogError::InvalidSound(_) => vec![
                "Give the sound a non-empty title".to_string(),
            ],
            CatalogError::Io(_) => vec![
                "Check file permissions for the catalog file".to_string(),
                "Ensure the disk is not full".to_string(),
            ],
            CatalogError::Serialization(_) => vec![
                "Try the operation again".to_string(),
            ],
            CatalogError::Deserialization(_) => vec![
                "Check the catalog file manually for formatting errors".to_string(),
                "Restore the catalog from a backup".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            CatalogError::SoundNotFound { .. } => false,
            CatalogError::InvalidSound(_) => false,
            CatalogError::Io(_) => true,
            CatalogError::Serialization(_) => true,
            CatalogError::Deserialization(_) => false,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ConfigDirNotFound => {
                "Cannot find or create configuration directory".to_string()
            }
            ConfigError::IoError(err) => {
                format!("Cannot access configuration file: {}", err)
            }
            ConfigError::SerializationError(_) => {
                "Failed to save configuration settings".to_string()
            }
            ConfigError::DeserializationError(_) => {
                "Configuration file is corrupted or has invalid format".to_string()
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::ConfigDirNotFound => vec![
                "Check that you have write permissions to your home directory".to_string(),
                "Try creating the directory manually: ~/.config/soundboard/".to_string(),
            ],
            ConfigError::IoError(_) => vec![
                "Check file permissions for the configuration directory".to_string(),
                "Ensure the disk is not full".to_string(),
            ],
            ConfigError::SerializationError(_) => vec![
                "Configuration will use default values".to_string(),
            ],
            ConfigError::DeserializationError(_) => vec![
                "Delete the configuration file to reset to defaults".to_string(),
                "Check the configuration file format manually".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        true // Defaults are always available
    }
}
