use crate::models::SoundId;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

const DEFAULT_HISTORY: usize = 1000;

/// Playback event kept in the history buffer
#[derive(Debug, Clone)]
pub struct PlaybackEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: PlaybackEventType,
    pub sound: Option<SoundId>,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEventType {
    SessionStarted,
    SessionStopped,
    TrackEnded,
    StartFailed,
    EffectChanged,
    AutoAdvance,
    CatalogWriteFailed,
}

impl PlaybackEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackEventType::SessionStarted => "SESSION_STARTED",
            PlaybackEventType::SessionStopped => "SESSION_STOPPED",
            PlaybackEventType::TrackEnded => "TRACK_ENDED",
            PlaybackEventType::StartFailed => "START_FAILED",
            PlaybackEventType::EffectChanged => "EFFECT_CHANGED",
            PlaybackEventType::AutoAdvance => "AUTO_ADVANCE",
            PlaybackEventType::CatalogWriteFailed => "CATALOG_WRITE_FAILED",
        }
    }
}

/// Records playback events and forwards them to the `log` facade.
///
/// Clones share one history, so the engine and the CLI see the same events.
#[derive(Clone)]
pub struct PlaybackLogger {
    events: Arc<Mutex<VecDeque<PlaybackEvent>>>,
    max_events: usize,
}

impl PlaybackLogger {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY)
    }

    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            max_events: max_events.max(1),
        }
    }

    /// Initialize env_logger; the level comes from `SOUNDBOARD_LOG_LEVEL`
    pub fn init() -> Result<(), Box<dyn std::error::Error>> {
        let log_level = std::env::var("SOUNDBOARD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let mut builder = env_logger::Builder::new();
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] [{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        });
        builder.filter_level(parse_level(&log_level));
        builder.try_init()?;

        info!("Soundboard logging initialized with level: {}", log_level);
        Ok(())
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<PlaybackEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn log_event(&self, event_type: PlaybackEventType, sound: Option<SoundId>, details: String) {
        match event_type {
            PlaybackEventType::SessionStarted
            | PlaybackEventType::SessionStopped
            | PlaybackEventType::TrackEnded
            | PlaybackEventType::AutoAdvance => info!("[{}] {}", event_type.as_str(), details),
            PlaybackEventType::EffectChanged => debug!("[{}] {}", event_type.as_str(), details),
            PlaybackEventType::StartFailed | PlaybackEventType::CatalogWriteFailed => {
                warn!("[{}] {}", event_type.as_str(), details)
            }
        }

        let mut events = self.history();
        events.push_back(PlaybackEvent {
            timestamp: Utc::now(),
            event_type,
            sound,
            details,
        });
        while events.len() > self.max_events {
            events.pop_front();
        }
    }

    /// The last `count` events, oldest first
    pub fn recent_events(&self, count: usize) -> Vec<PlaybackEvent> {
        let events = self.history();
        let skip = events.len().saturating_sub(count);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn events_of_type(&self, event_type: PlaybackEventType) -> Vec<PlaybackEvent> {
        self.history()
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn event_statistics(&self) -> EventStatistics {
        let events = self.history();
        let mut stats = EventStatistics::default();

        for event in events.iter() {
            match event.event_type {
                PlaybackEventType::SessionStarted => stats.sessions_started += 1,
                PlaybackEventType::TrackEnded => stats.tracks_ended += 1,
                PlaybackEventType::StartFailed => stats.start_failures += 1,
                PlaybackEventType::AutoAdvance => stats.auto_advances += 1,
                PlaybackEventType::CatalogWriteFailed => stats.catalog_failures += 1,
                _ => {}
            }
        }

        stats.total_events = events.len();
        stats
    }
}

impl Default for PlaybackLogger {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" => log::LevelFilter::Off,
        _ => log::LevelFilter::Info,
    }
}

/// Counts over the current history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStatistics {
    pub total_events: usize,
    pub sessions_started: usize,
    pub tracks_ended: usize,
    pub start_failures: usize,
    pub auto_advances: usize,
    pub catalog_failures: usize,
}
