//! In-memory media backend and catalog for exercising the engine without an
//! audio device.

use super::{MediaBackend, MediaHandle, MediaNotifier};
use crate::catalog::MediaCatalog;
use crate::error::{CatalogError, PlaybackError};
use crate::models::{Sound, SoundId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// A detached handle that only remembers what it was told
#[derive(Debug, Default)]
pub struct StubHandle {
    pub volume: f32,
    pub rate: f64,
    pub looping: bool,
    pub started: bool,
    pub paused: bool,
    pub volume_writes: Vec<f32>,
}

impl MediaHandle for StubHandle {
    fn start(&mut self) {
        self.started = true;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.volume_writes.push(self.volume);
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }
}

/// Lifecycle calls observed by the fake backend, in order
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Opened(String),
    Started(String),
    Released(String),
}

struct FakeHandleState {
    url: String,
    notifier: MediaNotifier,
    volume: f32,
    volume_writes: Vec<f32>,
    rate: f64,
    looping: bool,
    released: bool,
}

#[derive(Default)]
struct FakeBackendState {
    calls: Vec<BackendCall>,
    handles: Vec<FakeHandleState>,
    failing_starts: HashSet<String>,
    rejected_urls: HashSet<String>,
}

/// Backend handed to the engine; [`FakeProbe`] is the test's view of it
pub struct FakeBackend {
    state: Arc<Mutex<FakeBackendState>>,
}

impl FakeBackend {
    pub fn new() -> (Self, FakeProbe) {
        let state = Arc::new(Mutex::new(FakeBackendState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            FakeProbe { state },
        )
    }
}

impl MediaBackend for FakeBackend {
    fn open(&mut self, url: &str, notifier: MediaNotifier) -> Result<Box<dyn MediaHandle>, PlaybackError> {
        let mut state = self.state.lock().unwrap();
        if state.rejected_urls.contains(url) {
            return Err(PlaybackError::MediaNotFound {
                path: url.to_string(),
            });
        }

        state.calls.push(BackendCall::Opened(url.to_string()));
        state.handles.push(FakeHandleState {
            url: url.to_string(),
            notifier,
            volume: 1.0,
            volume_writes: Vec::new(),
            rate: 1.0,
            looping: false,
            released: false,
        });
        let index = state.handles.len() - 1;

        Ok(Box::new(FakeHandle {
            index,
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeHandle {
    index: usize,
    state: Arc<Mutex<FakeBackendState>>,
}

impl FakeHandle {
    fn with<T>(&self, f: impl FnOnce(&mut FakeHandleState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state.handles[self.index])
    }
}

impl MediaHandle for FakeHandle {
    fn start(&mut self) {
        let (url, notifier, fails) = {
            let mut state = self.state.lock().unwrap();
            let url = state.handles[self.index].url.clone();
            state.calls.push(BackendCall::Started(url.clone()));
            let fails = state.failing_starts.contains(&url);
            (url, state.handles[self.index].notifier.clone(), fails)
        };

        if fails {
            notifier.failed(PlaybackError::UnsupportedFormat { format: url });
        } else {
            notifier.started();
        }
    }

    fn pause(&mut self) {
        let mut state = self.state.lock().unwrap();
        let url = state.handles[self.index].url.clone();
        state.handles[self.index].released = true;
        state.calls.push(BackendCall::Released(url));
    }

    fn volume(&self) -> f32 {
        self.with(|handle| handle.volume)
    }

    fn set_volume(&mut self, volume: f32) {
        self.with(|handle| {
            handle.volume = volume.clamp(0.0, 1.0);
            handle.volume_writes.push(handle.volume);
        });
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.with(|handle| handle.rate = rate);
    }

    fn set_looping(&mut self, looping: bool) {
        self.with(|handle| handle.looping = looping);
    }
}

/// Inspects and drives the handles created by a [`FakeBackend`]
#[derive(Clone)]
pub struct FakeProbe {
    state: Arc<Mutex<FakeBackendState>>,
}

impl FakeProbe {
    fn lock(&self) -> MutexGuard<'_, FakeBackendState> {
        self.state.lock().unwrap()
    }

    fn latest<T>(&self, url: &str, f: impl FnOnce(&FakeHandleState) -> T) -> T {
        let state = self.lock();
        let handle = state
            .handles
            .iter()
            .rev()
            .find(|handle| handle.url == url)
            .unwrap_or_else(|| panic!("no handle was opened for {}", url));
        f(handle)
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn open_count(&self) -> usize {
        self.lock().handles.len()
    }

    /// Handles opened and not yet released
    pub fn live_handles(&self) -> usize {
        self.lock().handles.iter().filter(|handle| !handle.released).count()
    }

    pub fn volume_writes(&self, url: &str) -> Vec<f32> {
        self.latest(url, |handle| handle.volume_writes.clone())
    }

    pub fn volume(&self, url: &str) -> f32 {
        self.latest(url, |handle| handle.volume)
    }

    pub fn rate(&self, url: &str) -> f64 {
        self.latest(url, |handle| handle.rate)
    }

    pub fn looping(&self, url: &str) -> bool {
        self.latest(url, |handle| handle.looping)
    }

    pub fn released(&self, url: &str) -> bool {
        self.latest(url, |handle| handle.released)
    }

    /// Make the next handles for `url` report a start failure
    pub fn fail_start(&self, url: &str) {
        self.lock().failing_starts.insert(url.to_string());
    }

    /// Make opening `url` fail outright
    pub fn reject(&self, url: &str) {
        self.lock().rejected_urls.insert(url.to_string());
    }

    /// Report a natural end from the most recent handle for `url`
    pub fn finish(&self, url: &str) {
        let notifier = self.latest(url, |handle| handle.notifier.clone());
        notifier.ended();
    }
}

/// Catalog kept in memory, recording play-count writes
pub struct MemoryCatalog {
    sounds: Mutex<Vec<Sound>>,
    fail_writes: bool,
}

impl MemoryCatalog {
    pub fn new(sounds: Vec<Sound>) -> Self {
        Self {
            sounds: Mutex::new(sounds),
            fail_writes: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sounds: Mutex::new(Vec::new()),
            fail_writes: true,
        }
    }

    pub fn play_count(&self, id: SoundId) -> u64 {
        self.sounds
            .lock()
            .unwrap()
            .iter()
            .find(|sound| sound.id == id)
            .map_or(0, |sound| sound.play_count)
    }
}

impl MediaCatalog for MemoryCatalog {
    fn list_sounds(&self) -> Result<Vec<Sound>, CatalogError> {
        Ok(self.sounds.lock().unwrap().clone())
    }

    fn increment_play_count(&self, id: SoundId) -> Result<(), CatalogError> {
        if self.fail_writes {
            return Err(CatalogError::SoundNotFound { id: id.0 });
        }

        let mut sounds = self.sounds.lock().unwrap();
        let sound = sounds
            .iter_mut()
            .find(|sound| sound.id == id)
            .ok_or(CatalogError::SoundNotFound { id: id.0 })?;
        sound.play_count += 1;
        Ok(())
    }
}
