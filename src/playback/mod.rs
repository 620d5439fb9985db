//! The playback engine: a single session at a time, faded in and out,
//! shaped by speed and pitch, optionally looping or advancing to the next
//! sound when a clip finishes.
//!
//! The engine never touches an audio device itself. It drives a
//! [`MediaBackend`] that opens one [`MediaHandle`] per session, and reacts to
//! the [`MediaEvent`]s that handle reports back through its [`MediaNotifier`].

pub mod advance;
pub mod effects;
pub mod engine;
pub mod events;
pub mod fade;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use advance::{next_candidate, AdvanceMode};
pub use effects::{clamp_pitch, clamp_speed, playback_rate, MAX_PITCH_SEMITONES, MAX_SPEED, MIN_SPEED};
pub use engine::{EngineTiming, PlaybackEngine};
pub use events::EndOfTrackSlot;
pub use fade::{FadeController, FadeDirection, FadeId, FadeProgress};
pub use session::PlaybackSession;

use crate::error::PlaybackError;
use std::fmt;
use std::sync::Arc;

/// A single playable instance of a clip.
///
/// Handles are created paused. The engine owns each handle for the lifetime
/// of exactly one session and calls [`MediaHandle::pause`] when it lets go.
pub trait MediaHandle: Send {
    /// Begin (or resume) playback. Success or failure is reported
    /// asynchronously through the notifier given to [`MediaBackend::open`].
    fn start(&mut self);

    /// Halt playback. After `pause` the handle must never report again.
    fn pause(&mut self);

    /// Current output volume
    fn volume(&self) -> f32;

    /// Set output volume, clamped to `[0, 1]`
    fn set_volume(&mut self, volume: f32);

    /// Combined speed/pitch multiplier; pitch follows the rate
    fn set_playback_rate(&mut self, rate: f64);

    /// Restart from the beginning at the end instead of reporting `Ended`
    fn set_looping(&mut self, looping: bool);
}

/// Opens playable handles from media URLs
pub trait MediaBackend: Send {
    fn open(&mut self, url: &str, notifier: MediaNotifier) -> Result<Box<dyn MediaHandle>, PlaybackError>;
}

/// Asynchronous notifications from a media handle
#[derive(Debug)]
pub enum MediaEvent {
    /// Playback actually began
    Started,
    /// Playback could not begin, or broke off
    Failed(PlaybackError),
    /// A non-looping clip played to its end
    Ended,
}

pub type MediaEventSink = Arc<dyn Fn(u64, MediaEvent) + Send + Sync>;

/// Reports media events tagged with the generation of the session that owns
/// the handle, so that events from a superseded handle can be told apart.
#[derive(Clone)]
pub struct MediaNotifier {
    generation: u64,
    sink: MediaEventSink,
}

impl MediaNotifier {
    pub fn new(generation: u64, sink: MediaEventSink) -> Self {
        Self { generation, sink }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn started(&self) {
        (self.sink)(self.generation, MediaEvent::Started);
    }

    pub fn failed(&self, error: PlaybackError) {
        (self.sink)(self.generation, MediaEvent::Failed(error));
    }

    pub fn ended(&self) {
        (self.sink)(self.generation, MediaEvent::Ended);
    }
}

impl fmt::Debug for MediaNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaNotifier")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
