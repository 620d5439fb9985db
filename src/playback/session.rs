use super::{MediaBackend, MediaHandle, MediaNotifier};
use crate::error::PlaybackError;
use crate::models::{PlaybackState, Sound};

/// The binding between one sound and the handle playing it.
///
/// A session is opened silent and is consumed by [`PlaybackSession::release`];
/// the engine holds at most one at a time.
pub struct PlaybackSession {
    generation: u64,
    sound: Sound,
    handle: Box<dyn MediaHandle>,
    looping: bool,
    state: PlaybackState,
    play_recorded: bool,
}

impl PlaybackSession {
    /// Create a handle for `sound`, muted and configured but not yet started
    pub fn open(
        generation: u64,
        sound: Sound,
        backend: &mut dyn MediaBackend,
        notifier: MediaNotifier,
        rate: f64,
    ) -> Result<Self, PlaybackError> {
        let mut handle = backend.open(&sound.audio_url, notifier)?;
        handle.set_volume(0.0);
        handle.set_looping(sound.is_looping);
        handle.set_playback_rate(rate);

        Ok(Self {
            generation,
            looping: sound.is_looping,
            sound,
            handle,
            state: PlaybackState::Starting,
            play_recorded: false,
        })
    }

    pub fn begin(&mut self) {
        self.handle.start();
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn sound(&self) -> &Sound {
        &self.sound
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn handle_mut(&mut self) -> &mut dyn MediaHandle {
        self.handle.as_mut()
    }

    /// Record that the media began. Returns true the first time only, which
    /// is when the play should be counted.
    pub fn mark_started(&mut self) -> bool {
        if self.state == PlaybackState::Starting {
            self.state = PlaybackState::Playing;
        }
        !std::mem::replace(&mut self.play_recorded, true)
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.handle.set_playback_rate(rate);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.handle.set_volume(volume);
    }

    pub fn begin_ending(&mut self) {
        self.state = PlaybackState::Ending;
    }

    /// Pause the handle and give the sound back
    pub fn release(mut self) -> Sound {
        self.handle.pause();
        self.sound
    }
}
