use super::advance::{self, AdvanceMode};
use super::effects;
use super::events::{EndOfTrackCallback, EndOfTrackSlot};
use super::fade::{FadeController, FadeDirection, FadeId, FadeProgress, TickSink, FADE_STEP, FADE_TICK};
use super::session::PlaybackSession;
use super::{MediaBackend, MediaEvent, MediaEventSink, MediaNotifier};
use crate::catalog::MediaCatalog;
use crate::error::PlaybackError;
use crate::logging::{PlaybackEventType, PlaybackLogger};
use crate::models::{EngineSettings, PlaybackState, PlayerStatus, Sound, SoundId};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Pause between a sound ending and the next one starting
pub const ADVANCE_DELAY: Duration = Duration::from_millis(500);

/// Timing constants for fades and auto-advance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineTiming {
    pub fade_tick: Duration,
    pub fade_step: f32,
    pub advance_delay: Duration,
}

impl Default for EngineTiming {
    fn default() -> Self {
        Self {
            fade_tick: FADE_TICK,
            fade_step: FADE_STEP,
            advance_delay: ADVANCE_DELAY,
        }
    }
}

enum EngineCommand {
    Play(Sound),
    Stop,
    SetVolume(f32),
    SetSpeed(f64),
    SetPitch(f64),
    SetAutoAdvance(bool),
    SetShuffle(bool),
    SetCandidates(Vec<Sound>),
    RegisterEndOfTrack(EndOfTrackCallback),
    Media { generation: u64, event: MediaEvent },
    FadeTick(FadeId),
    AdvanceDue(u64),
    IsPlaying(SoundId, oneshot::Sender<bool>),
    LoopingSound(oneshot::Sender<Option<Sound>>),
    Status(oneshot::Sender<PlayerStatus>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the playback engine.
///
/// All state lives in a single task that processes commands, media
/// notifications and timer ticks one at a time, in arrival order. Handles are
/// cheap to clone; the task ends once every handle has been dropped or
/// [`PlaybackEngine::shutdown`] is called.
#[derive(Clone)]
pub struct PlaybackEngine {
    commands: UnboundedSender<EngineCommand>,
}

impl PlaybackEngine {
    /// Start the engine with default timing. Must be called from within a
    /// tokio runtime.
    pub fn spawn(backend: Box<dyn MediaBackend>, catalog: Arc<dyn MediaCatalog>, settings: EngineSettings) -> Self {
        Self::spawn_with(backend, catalog, settings, EngineTiming::default(), PlaybackLogger::new())
    }

    pub fn spawn_with(
        backend: Box<dyn MediaBackend>,
        catalog: Arc<dyn MediaCatalog>,
        settings: EngineSettings,
        timing: EngineTiming,
        logger: PlaybackLogger,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let engine_loop = EngineLoop::new(backend, catalog, settings, timing, logger, commands.downgrade());
        tokio::spawn(engine_loop.run(receiver));

        debug!("Playback engine started with {:?}", settings);
        Self { commands }
    }

    fn send(&self, command: EngineCommand) {
        if self.commands.send(command).is_err() {
            debug!("Playback engine has shut down; command dropped");
        }
    }

    async fn query<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> EngineCommand) -> Option<T> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply));
        response.await.ok()
    }

    /// Play `sound`, or stop it if it is the sound already playing
    pub fn play(&self, sound: Sound) {
        self.send(EngineCommand::Play(sound));
    }

    /// Fade out and release the current session. No-op when idle.
    pub fn stop(&self) {
        self.send(EngineCommand::Stop);
    }

    pub fn set_volume(&self, volume: f32) {
        self.send(EngineCommand::SetVolume(volume));
    }

    pub fn set_speed(&self, speed: f64) {
        self.send(EngineCommand::SetSpeed(speed));
    }

    pub fn set_pitch(&self, semitones: f64) {
        self.send(EngineCommand::SetPitch(semitones));
    }

    pub fn set_auto_advance(&self, enabled: bool) {
        self.send(EngineCommand::SetAutoAdvance(enabled));
    }

    pub fn set_shuffle(&self, enabled: bool) {
        self.send(EngineCommand::SetShuffle(enabled));
    }

    /// Replace the ordered list auto-advance chooses from
    pub fn set_candidates(&self, sounds: Vec<Sound>) {
        self.send(EngineCommand::SetCandidates(sounds));
    }

    /// Called once each time a non-looping sound finishes on its own.
    /// Replaces any previously registered callback.
    pub fn register_end_of_track<F>(&self, callback: F)
    where
        F: FnMut(&Sound) + Send + 'static,
    {
        self.send(EngineCommand::RegisterEndOfTrack(Box::new(callback)));
    }

    /// Whether `id` is bound to the current session, including while it fades out
    pub async fn is_playing(&self, id: SoundId) -> bool {
        self.query(|reply| EngineCommand::IsPlaying(id, reply))
            .await
            .unwrap_or(false)
    }

    /// The sound of the current session if that session loops
    pub async fn looping_sound(&self) -> Option<Sound> {
        self.query(EngineCommand::LoopingSound).await.flatten()
    }

    pub async fn status(&self) -> PlayerStatus {
        self.query(EngineCommand::Status).await.unwrap_or_default()
    }

    pub async fn settings(&self) -> EngineSettings {
        self.status().await.settings
    }

    /// Release any session immediately, without fading, and end the engine task
    pub async fn shutdown(&self) {
        self.query(EngineCommand::Shutdown).await;
    }
}

struct PendingAdvance {
    token: u64,
    finished: Sound,
    timer: JoinHandle<()>,
}

struct EngineLoop {
    backend: Box<dyn MediaBackend>,
    catalog: Arc<dyn MediaCatalog>,
    settings: EngineSettings,
    timing: EngineTiming,
    logger: PlaybackLogger,
    commands: WeakUnboundedSender<EngineCommand>,
    session: Option<PlaybackSession>,
    pending: Option<Sound>,
    fades: FadeController,
    end_of_track: EndOfTrackSlot,
    candidates: Vec<Sound>,
    advance: Option<PendingAdvance>,
    next_generation: u64,
    next_advance_token: u64,
}

/// Keep effect settings inside the range a handle can play at
fn sanitize(mut settings: EngineSettings) -> EngineSettings {
    settings.volume = if settings.volume.is_finite() { settings.volume.clamp(0.0, 1.0) } else { 0.0 };
    settings.speed = effects::clamp_speed(settings.speed).unwrap_or(1.0);
    settings.pitch_semitones = effects::clamp_pitch(settings.pitch_semitones).unwrap_or(0.0);
    settings
}

fn post(commands: &WeakUnboundedSender<EngineCommand>, command: EngineCommand) -> bool {
    match commands.upgrade() {
        Some(sender) => sender.send(command).is_ok(),
        None => false,
    }
}

impl EngineLoop {
    fn new(
        backend: Box<dyn MediaBackend>,
        catalog: Arc<dyn MediaCatalog>,
        settings: EngineSettings,
        timing: EngineTiming,
        logger: PlaybackLogger,
        commands: WeakUnboundedSender<EngineCommand>,
    ) -> Self {
        let tick_commands = commands.clone();
        let tick_sink: TickSink = Arc::new(move |id| post(&tick_commands, EngineCommand::FadeTick(id)));

        Self {
            backend,
            catalog,
            settings: sanitize(settings),
            timing,
            logger,
            commands,
            session: None,
            pending: None,
            fades: FadeController::new(timing.fade_tick, timing.fade_step, tick_sink),
            end_of_track: EndOfTrackSlot::new(),
            candidates: Vec::new(),
            advance: None,
            next_generation: 0,
            next_advance_token: 0,
        }
    }

    async fn run(mut self, mut receiver: UnboundedReceiver<EngineCommand>) {
        while let Some(command) = receiver.recv().await {
            if !self.handle(command) {
                break;
            }
        }

        self.teardown();
        debug!("Playback engine stopped");
    }

    fn handle(&mut self, command: EngineCommand) -> bool {
        match command {
            EngineCommand::Play(sound) => self.handle_play(sound),
            EngineCommand::Stop => self.handle_stop(),
            EngineCommand::SetVolume(volume) => self.handle_set_volume(volume),
            EngineCommand::SetSpeed(speed) => self.handle_set_speed(speed),
            EngineCommand::SetPitch(semitones) => self.handle_set_pitch(semitones),
            EngineCommand::SetAutoAdvance(enabled) => {
                self.settings.auto_advance = enabled;
                if !enabled {
                    self.cancel_advance();
                }
            }
            EngineCommand::SetShuffle(enabled) => self.settings.shuffle = enabled,
            EngineCommand::SetCandidates(sounds) => {
                debug!("Auto-advance candidates replaced ({} sounds)", sounds.len());
                self.candidates = sounds;
            }
            EngineCommand::RegisterEndOfTrack(callback) => self.end_of_track.register(callback),
            EngineCommand::Media { generation, event } => self.handle_media(generation, event),
            EngineCommand::FadeTick(id) => self.handle_fade_tick(id),
            EngineCommand::AdvanceDue(token) => self.handle_advance_due(token),
            EngineCommand::IsPlaying(id, reply) => {
                let bound = self.session.as_ref().map_or(false, |session| session.sound().id == id);
                let _ = reply.send(bound);
            }
            EngineCommand::LoopingSound(reply) => {
                let looping = self
                    .session
                    .as_ref()
                    .filter(|session| session.is_looping())
                    .map(|session| session.sound().clone());
                let _ = reply.send(looping);
            }
            EngineCommand::Status(reply) => {
                let _ = reply.send(self.status());
            }
            EngineCommand::Shutdown(reply) => {
                self.teardown();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn status(&self) -> PlayerStatus {
        PlayerStatus {
            state: self.session.as_ref().map_or(PlaybackState::Idle, |session| session.state()),
            current_sound: self.session.as_ref().map(|session| session.sound().clone()),
            looping: self.session.as_ref().map_or(false, |session| session.is_looping()),
            playback_rate: self.current_rate(),
            settings: self.settings,
            candidates: self.candidates.len(),
        }
    }

    fn current_rate(&self) -> f64 {
        effects::playback_rate(self.settings.speed, self.settings.pitch_semitones)
    }

    fn media_sink(&self) -> MediaEventSink {
        let commands = self.commands.clone();
        Arc::new(move |generation, event| {
            post(&commands, EngineCommand::Media { generation, event });
        })
    }

    fn handle_play(&mut self, sound: Sound) {
        self.cancel_advance();

        let (bound_id, state) = match self.session.as_ref() {
            Some(session) => (Some(session.sound().id), session.state()),
            None => (None, PlaybackState::Idle),
        };

        match bound_id {
            Some(id) if id == sound.id => {
                debug!("'{}' is already playing; treating play as stop", sound.display_name());
                self.handle_stop();
            }
            Some(_) => {
                debug!("Queueing '{}' behind the current session", sound.display_name());
                self.pending = Some(sound);
                if state != PlaybackState::Ending {
                    self.begin_fade_out();
                }
            }
            None => self.open_session(sound),
        }
    }

    fn handle_stop(&mut self) {
        self.cancel_advance();
        self.pending = None;

        match self.session.as_ref().map(|session| session.state()) {
            None => debug!("Stop requested while idle"),
            Some(PlaybackState::Ending) => debug!("Stop requested while already fading out"),
            Some(_) => self.begin_fade_out(),
        }
    }

    fn begin_fade_out(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.begin_ending();
            self.fades.fade_out(session.generation());
        }
    }

    fn open_session(&mut self, sound: Sound) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let notifier = MediaNotifier::new(generation, self.media_sink());
        let mut rate = self.current_rate();
        if !effects::is_usable_rate(rate) {
            warn!("Rate {} cannot be played; starting at normal speed", rate);
            rate = 1.0;
        }

        match PlaybackSession::open(generation, sound.clone(), self.backend.as_mut(), notifier, rate) {
            Ok(mut session) => {
                session.begin();
                self.fades.fade_in(generation, self.settings.volume);
                self.logger.log_event(
                    PlaybackEventType::SessionStarted,
                    Some(sound.id),
                    format!(
                        "Starting '{}' (rate {:.3}{})",
                        sound.display_name(),
                        rate,
                        if session.is_looping() { ", looping" } else { "" }
                    ),
                );
                self.session = Some(session);
            }
            Err(error) => self.report_failure(&sound, &error),
        }
    }

    fn report_failure(&self, sound: &Sound, error: &PlaybackError) {
        self.logger.log_event(
            PlaybackEventType::StartFailed,
            Some(sound.id),
            format!("Could not play '{}': {}", sound.display_name(), error),
        );
    }

    fn handle_media(&mut self, generation: u64, event: MediaEvent) {
        let current = self.session.as_ref().map(|session| session.generation());
        if current != Some(generation) {
            debug!("Dropping {:?} from superseded session {}", event, generation);
            return;
        }

        match event {
            MediaEvent::Started => self.on_media_started(),
            MediaEvent::Failed(error) => self.on_media_failed(error),
            MediaEvent::Ended => self.on_natural_end(),
        }
    }

    fn on_media_started(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if session.mark_started() {
            let id = session.sound().id;
            info!("Now playing '{}'", session.sound().display_name());
            self.record_play(id);
        }
    }

    fn on_media_failed(&mut self, error: PlaybackError) {
        let Some(session) = self.session.take() else {
            return;
        };

        self.fades.cancel();
        let sound = session.release();
        self.report_failure(&sound, &error);
        self.start_pending();
    }

    fn on_natural_end(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        if session.is_looping() {
            debug!("Looping session reported an end; ignoring");
            self.session = Some(session);
            return;
        }

        self.fades.cancel();

        if session.state() == PlaybackState::Ending {
            // A fade-out was already under way; it simply completes now
            self.finish_stop(session);
            return;
        }

        let sound = session.release();
        self.logger.log_event(
            PlaybackEventType::TrackEnded,
            Some(sound.id),
            format!("'{}' finished", sound.display_name()),
        );
        self.end_of_track.fire(&sound);

        if self.settings.auto_advance {
            self.schedule_advance(sound);
        }
    }

    fn handle_fade_tick(&mut self, id: FadeId) {
        let Some(session) = self.session.as_mut() else {
            debug!("Fade tick with no session; ignoring");
            return;
        };

        let generation = session.generation();
        match self.fades.on_tick(id, generation, session.handle_mut()) {
            FadeProgress::Completed(FadeDirection::Out) => {
                if let Some(session) = self.session.take() {
                    self.finish_stop(session);
                }
            }
            FadeProgress::Completed(FadeDirection::In) => {
                debug!("Session {} reached volume {:.2}", generation, self.settings.volume);
            }
            FadeProgress::Stepped(_) => {}
            FadeProgress::Stale => debug!("Dropping stale fade tick"),
        }
    }

    /// Release a session whose fade-out is over, then start whatever was
    /// waiting behind it
    fn finish_stop(&mut self, mut session: PlaybackSession) {
        session.set_volume(0.0);
        let sound = session.release();
        self.logger.log_event(
            PlaybackEventType::SessionStopped,
            Some(sound.id),
            format!("Stopped '{}'", sound.display_name()),
        );
        self.start_pending();
    }

    fn start_pending(&mut self) {
        if let Some(next) = self.pending.take() {
            self.open_session(next);
        }
    }

    fn record_play(&self, id: SoundId) {
        let catalog = Arc::clone(&self.catalog);
        let logger = self.logger.clone();

        // Catalog writes touch the filesystem
        tokio::task::spawn_blocking(move || {
            if let Err(error) = catalog.increment_play_count(id) {
                logger.log_event(
                    PlaybackEventType::CatalogWriteFailed,
                    Some(id),
                    format!("Failed to record play for sound {}: {}", id, error),
                );
            }
        });
    }

    fn handle_set_volume(&mut self, volume: f32) {
        let volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
        self.settings.volume = volume;

        let Some(session) = self.session.as_mut() else {
            return;
        };

        match self.fades.direction() {
            Some(FadeDirection::In) => {
                self.fades.retarget(volume);
            }
            Some(FadeDirection::Out) => {}
            None => {
                if session.state() != PlaybackState::Ending {
                    session.set_volume(volume);
                }
            }
        }
    }

    fn handle_set_speed(&mut self, speed: f64) {
        let Some(clamped) = effects::clamp_speed(speed) else {
            warn!("Ignoring invalid speed {}", speed);
            return;
        };
        if clamped != speed {
            debug!("Speed {} clamped to {}", speed, clamped);
        }
        self.settings.speed = clamped;
        self.apply_rate(format!("Speed set to {:.2}x", clamped));
    }

    fn handle_set_pitch(&mut self, semitones: f64) {
        let Some(clamped) = effects::clamp_pitch(semitones) else {
            warn!("Ignoring invalid pitch {}", semitones);
            return;
        };
        if clamped != semitones {
            debug!("Pitch {} clamped to {}", semitones, clamped);
        }
        self.settings.pitch_semitones = clamped;
        self.apply_rate(format!("Pitch set to {:+} semitones", clamped));
    }

    fn apply_rate(&mut self, details: String) {
        let rate = self.current_rate();
        if !effects::is_usable_rate(rate) {
            warn!("Not applying unusable rate {}", rate);
            return;
        }

        let sound = self.session.as_mut().map(|session| {
            session.set_rate(rate);
            session.sound().id
        });
        self.logger.log_event(
            PlaybackEventType::EffectChanged,
            sound,
            format!("{} (rate {:.3})", details, rate),
        );
    }

    fn schedule_advance(&mut self, finished: Sound) {
        self.cancel_advance();

        self.next_advance_token += 1;
        let token = self.next_advance_token;
        let commands = self.commands.clone();
        let delay = self.timing.advance_delay;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            post(&commands, EngineCommand::AdvanceDue(token));
        });

        self.advance = Some(PendingAdvance { token, finished, timer });
    }

    fn cancel_advance(&mut self) {
        if let Some(pending) = self.advance.take() {
            pending.timer.abort();
            debug!("Cancelled pending auto-advance after '{}'", pending.finished.display_name());
        }
    }

    fn handle_advance_due(&mut self, token: u64) {
        let pending = match self.advance.take() {
            Some(pending) if pending.token == token => pending,
            other => {
                self.advance = other;
                debug!("Dropping stale auto-advance {}", token);
                return;
            }
        };

        if !self.settings.auto_advance {
            return;
        }

        let mode = AdvanceMode::from_shuffle(self.settings.shuffle);
        let next = {
            let mut rng = rand::thread_rng();
            advance::next_candidate(Some(pending.finished.id), &self.candidates, mode, &mut rng).cloned()
        };

        match next {
            Some(next) => {
                self.logger.log_event(
                    PlaybackEventType::AutoAdvance,
                    Some(next.id),
                    format!(
                        "Advancing from '{}' to '{}'",
                        pending.finished.display_name(),
                        next.display_name()
                    ),
                );
                self.handle_play(next);
            }
            None => debug!("No candidates to advance to"),
        }
    }

    fn teardown(&mut self) {
        self.cancel_advance();
        self.fades.cancel();
        self.pending = None;

        if let Some(session) = self.session.take() {
            let sound = session.release();
            self.logger.log_event(
                PlaybackEventType::SessionStopped,
                Some(sound.id),
                format!("Released '{}' on shutdown", sound.display_name()),
            );
        }
    }
}
