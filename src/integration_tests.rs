//! Engine scenarios driven end to end through the public handle, with an
//! in-memory backend standing in for the audio device.

use crate::logging::{PlaybackEventType, PlaybackLogger};
use crate::models::{EngineSettings, PlaybackState, Sound, SoundId};
use crate::playback::testing::{BackendCall, FakeBackend, FakeProbe, MemoryCatalog};
use crate::playback::{EngineTiming, PlaybackEngine};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const EPSILON: f32 = 1e-4;

struct Rig {
    engine: PlaybackEngine,
    probe: FakeProbe,
    catalog: Arc<MemoryCatalog>,
    logger: PlaybackLogger,
}

fn rig(sounds: Vec<Sound>) -> Rig {
    rig_with_catalog(sounds.clone(), Arc::new(MemoryCatalog::new(sounds)))
}

fn rig_with_catalog(candidates: Vec<Sound>, catalog: Arc<MemoryCatalog>) -> Rig {
    let (backend, probe) = FakeBackend::new();
    let logger = PlaybackLogger::new();
    let engine = PlaybackEngine::spawn_with(
        Box::new(backend),
        catalog.clone(),
        EngineSettings::default(),
        EngineTiming::default(),
        logger.clone(),
    );
    engine.set_candidates(candidates);

    Rig {
        engine,
        probe,
        catalog,
        logger,
    }
}

fn airhorn() -> Sound {
    Sound::new(1, "Airhorn", "airhorn.mp3")
}

fn rain() -> Sound {
    Sound::new(2, "Rain", "rain.ogg")
}

fn gong() -> Sound {
    Sound::new(3, "Gong", "gong.wav")
}

/// Let queued notifications and spawned writes run
async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

/// Long enough for a full fade in or out at the default cadence
async fn after_fade() {
    sleep(Duration::from_secs(1)).await;
}

fn counter() -> (Arc<AtomicUsize>, impl FnMut(&Sound) + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    (count, move |_: &Sound| {
        seen.fetch_add(1, Ordering::SeqCst);
    })
}

#[tokio::test(start_paused = true)]
async fn test_switching_sounds_releases_before_opening() {
    let rig = rig(vec![airhorn(), rain()]);

    rig.engine.play(airhorn());
    after_fade().await;
    rig.engine.play(rain());
    settle().await;

    // The old session is still fading out; nothing new is open yet
    assert_eq!(rig.engine.status().await.state, PlaybackState::Ending);
    assert_eq!(rig.probe.open_count(), 1);

    after_fade().await;

    assert_eq!(
        rig.probe.calls(),
        vec![
            BackendCall::Opened("airhorn.mp3".to_string()),
            BackendCall::Started("airhorn.mp3".to_string()),
            BackendCall::Released("airhorn.mp3".to_string()),
            BackendCall::Opened("rain.ogg".to_string()),
            BackendCall::Started("rain.ogg".to_string()),
        ]
    );
    assert_eq!(rig.probe.live_handles(), 1);
    assert!(rig.engine.is_playing(rain().id).await);
    assert!(!rig.engine.is_playing(airhorn().id).await);
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_idle_does_nothing() {
    let rig = rig(vec![airhorn()]);

    rig.engine.stop();
    settle().await;

    assert!(rig.engine.status().await.is_idle());
    assert_eq!(rig.probe.open_count(), 0);
    assert!(rig.logger.events_of_type(PlaybackEventType::SessionStopped).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_playing_the_current_sound_stops_it() {
    let rig = rig(vec![airhorn()]);

    rig.engine.play(airhorn());
    after_fade().await;
    assert_eq!(rig.engine.status().await.state, PlaybackState::Playing);

    rig.engine.play(airhorn());
    settle().await;
    assert_eq!(rig.engine.status().await.state, PlaybackState::Ending);
    assert!(rig.engine.is_playing(airhorn().id).await);

    after_fade().await;
    assert!(rig.engine.status().await.is_idle());
    assert_eq!(rig.probe.open_count(), 1);
    assert!(rig.probe.released("airhorn.mp3"));
    assert_eq!(rig.probe.volume("airhorn.mp3"), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_rate_combines_speed_and_pitch() {
    let rig = rig(vec![airhorn()]);

    rig.engine.set_speed(2.0);
    rig.engine.set_pitch(-12.0);
    rig.engine.play(airhorn());
    settle().await;

    assert!((rig.probe.rate("airhorn.mp3") - 1.0).abs() < 1e-9);
    assert!((rig.engine.status().await.playback_rate - 1.0).abs() < 1e-9);

    // Changes apply to the live session
    rig.engine.set_pitch(0.0);
    settle().await;
    assert!((rig.probe.rate("airhorn.mp3") - 2.0).abs() < 1e-9);

    rig.engine.set_speed(-3.0);
    settle().await;
    assert!((rig.probe.rate("airhorn.mp3") - 2.0).abs() < 1e-9);
    assert_eq!(rig.engine.settings().await.speed, 2.0);
}

#[tokio::test(start_paused = true)]
async fn test_extreme_effects_keep_the_handle_moving() {
    let rig = rig(vec![airhorn()]);

    rig.engine.play(airhorn());
    settle().await;
    rig.engine.set_pitch(-20000.0);
    settle().await;

    let rate = rig.probe.rate("airhorn.mp3");
    assert!(rate > 0.0);
    assert!((rate - 0.25).abs() < 1e-9);
    let status = rig.engine.status().await;
    assert_eq!(status.settings.pitch_semitones, -24.0);
    assert!((status.playback_rate - 0.25).abs() < 1e-9);

    rig.engine.set_speed(1e9);
    settle().await;
    assert_eq!(rig.engine.settings().await.speed, 4.0);
    assert!((rig.probe.rate("airhorn.mp3") - 1.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_fades_stay_within_bounds() {
    let rig = rig(vec![airhorn()]);

    rig.engine.set_volume(0.5);
    rig.engine.play(airhorn());
    after_fade().await;

    let writes = rig.probe.volume_writes("airhorn.mp3");
    assert_eq!(writes.first().copied(), Some(0.0));
    assert!(writes.iter().all(|&volume| volume <= 0.5 + EPSILON));
    assert!(writes.windows(2).all(|pair| pair[1] >= pair[0]));
    assert!((rig.probe.volume("airhorn.mp3") - 0.5).abs() < EPSILON);

    rig.engine.stop();
    after_fade().await;

    let writes = rig.probe.volume_writes("airhorn.mp3");
    assert_eq!(writes.last().copied(), Some(0.0));
    assert!(writes.iter().all(|&volume| (0.0..=0.5 + EPSILON).contains(&volume)));
    assert!(rig.probe.released("airhorn.mp3"));
}

#[tokio::test(start_paused = true)]
async fn test_volume_change_during_fade_in_retargets() {
    let rig = rig(vec![airhorn()]);

    rig.engine.play(airhorn());
    sleep(Duration::from_millis(200)).await;
    rig.engine.set_volume(0.3);
    after_fade().await;

    let writes = rig.probe.volume_writes("airhorn.mp3");
    assert!(writes.iter().all(|&volume| volume <= 0.3 + EPSILON));
    assert!((rig.probe.volume("airhorn.mp3") - 0.3).abs() < EPSILON);

    // Without a fade running the handle follows directly
    rig.engine.set_volume(0.6);
    settle().await;
    assert!((rig.probe.volume("airhorn.mp3") - 0.6).abs() < EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_looping_sound_ignores_natural_end() {
    let bell = Sound::new(7, "Bell", "bell.wav").looping(true);
    let rig = rig(vec![bell.clone()]);
    let (fired, callback) = counter();
    rig.engine.register_end_of_track(callback);

    rig.engine.play(bell.clone());
    settle().await;
    assert!(rig.probe.looping("bell.wav"));
    assert_eq!(rig.engine.looping_sound().await.map(|sound| sound.id), Some(bell.id));

    rig.probe.finish("bell.wav");
    after_fade().await;

    let status = rig.engine.status().await;
    assert_eq!(status.state, PlaybackState::Playing);
    assert!(status.looping);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(rig.logger.events_of_type(PlaybackEventType::TrackEnded).is_empty());

    rig.engine.stop();
    after_fade().await;
    assert!(rig.engine.looping_sound().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_loop_flag_is_fixed_when_playback_starts() {
    let rig = rig(vec![airhorn()]);
    let (fired, callback) = counter();
    rig.engine.register_end_of_track(callback);

    rig.engine.play(airhorn());
    settle().await;

    // The board now marks the same sound as looping; the live session keeps its flag
    rig.engine.set_candidates(vec![airhorn().looping(true)]);
    settle().await;
    assert!(rig.engine.looping_sound().await.is_none());
    assert!(!rig.probe.looping("airhorn.mp3"));

    rig.probe.finish("airhorn.mp3");
    settle().await;

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(rig.engine.status().await.is_idle());
    assert!(rig.probe.released("airhorn.mp3"));
}

#[tokio::test(start_paused = true)]
async fn test_natural_end_counts_once_and_fires_callback() {
    let rig = rig(vec![airhorn()]);
    let (fired, callback) = counter();
    rig.engine.register_end_of_track(callback);

    rig.engine.play(airhorn());
    settle().await;
    assert_eq!(rig.catalog.play_count(SoundId(1)), 1);

    rig.probe.finish("airhorn.mp3");
    settle().await;

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(rig.catalog.play_count(SoundId(1)), 1);
    assert!(rig.engine.status().await.is_idle());
    assert!(rig.probe.released("airhorn.mp3"));
    assert_eq!(rig.logger.events_of_type(PlaybackEventType::TrackEnded).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_registering_a_callback_replaces_the_previous_one() {
    let rig = rig(vec![airhorn()]);
    let (first, first_callback) = counter();
    let (second, second_callback) = counter();
    rig.engine.register_end_of_track(first_callback);
    rig.engine.register_end_of_track(second_callback);

    rig.engine.play(airhorn());
    settle().await;
    rig.probe.finish("airhorn.mp3");
    settle().await;

    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_auto_advance_waits_before_starting_next() {
    let rig = rig(vec![airhorn(), rain()]);
    rig.engine.set_auto_advance(true);

    rig.engine.play(airhorn());
    settle().await;
    rig.probe.finish("airhorn.mp3");

    sleep(Duration::from_millis(499)).await;
    assert_eq!(rig.probe.open_count(), 1);
    assert!(rig.engine.status().await.is_idle());

    sleep(Duration::from_millis(2)).await;
    assert!(rig.engine.is_playing(rain().id).await);
    assert_eq!(rig.probe.open_count(), 2);
    assert_eq!(rig.logger.events_of_type(PlaybackEventType::AutoAdvance).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shuffle_with_one_candidate_replays_it() {
    let rig = rig(vec![airhorn()]);
    rig.engine.set_auto_advance(true);
    rig.engine.set_shuffle(true);

    rig.engine.play(airhorn());
    settle().await;
    rig.probe.finish("airhorn.mp3");

    sleep(Duration::from_millis(499)).await;
    assert!(rig.engine.status().await.is_idle());

    sleep(Duration::from_millis(2)).await;
    assert!(rig.engine.is_playing(airhorn().id).await);
    assert_eq!(rig.probe.open_count(), 2);
    assert_eq!(
        rig.probe.calls().iter().filter(|call| **call == BackendCall::Opened("airhorn.mp3".to_string())).count(),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn test_explicit_play_cancels_pending_advance() {
    let rig = rig(vec![airhorn(), rain(), gong()]);
    rig.engine.set_auto_advance(true);

    rig.engine.play(airhorn());
    settle().await;
    rig.probe.finish("airhorn.mp3");
    sleep(Duration::from_millis(100)).await;

    rig.engine.play(gong());
    after_fade().await;

    assert!(rig.engine.is_playing(gong().id).await);
    assert_eq!(rig.probe.open_count(), 2);
    assert!(!rig.probe.calls().contains(&BackendCall::Opened("rain.ogg".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_disabling_auto_advance_cancels_pending_advance() {
    let rig = rig(vec![airhorn(), rain()]);
    rig.engine.set_auto_advance(true);

    rig.engine.play(airhorn());
    settle().await;
    rig.probe.finish("airhorn.mp3");
    settle().await;
    rig.engine.set_auto_advance(false);
    after_fade().await;

    assert_eq!(rig.probe.open_count(), 1);
    assert!(rig.engine.status().await.is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_start_failure_returns_to_idle_without_counting() {
    let rig = rig(vec![airhorn()]);
    rig.probe.fail_start("airhorn.mp3");

    rig.engine.play(airhorn());
    settle().await;

    assert!(rig.engine.status().await.is_idle());
    assert!(rig.probe.released("airhorn.mp3"));
    assert_eq!(rig.catalog.play_count(SoundId(1)), 0);
    assert_eq!(rig.logger.events_of_type(PlaybackEventType::StartFailed).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failure_to_open_returns_to_idle() {
    let rig = rig(vec![airhorn(), rain()]);
    rig.probe.reject("airhorn.mp3");

    rig.engine.play(airhorn());
    settle().await;

    assert!(rig.engine.status().await.is_idle());
    assert_eq!(rig.probe.open_count(), 0);
    assert_eq!(rig.logger.events_of_type(PlaybackEventType::StartFailed).len(), 1);

    // The engine keeps working afterwards
    rig.engine.play(rain());
    settle().await;
    assert_eq!(rig.engine.status().await.state, PlaybackState::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_natural_end_while_fading_out_starts_pending() {
    let rig = rig(vec![airhorn(), rain()]);
    let (fired, callback) = counter();
    rig.engine.register_end_of_track(callback);

    rig.engine.play(airhorn());
    after_fade().await;
    rig.engine.play(rain());
    settle().await;

    rig.probe.finish("airhorn.mp3");
    settle().await;

    assert!(rig.engine.is_playing(rain().id).await);
    assert!(rig.probe.released("airhorn.mp3"));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(rig.logger.events_of_type(PlaybackEventType::TrackEnded).is_empty());
    assert_eq!(rig.logger.events_of_type(PlaybackEventType::SessionStopped).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_events_from_superseded_session_are_ignored() {
    let rig = rig(vec![airhorn(), rain()]);

    rig.engine.play(airhorn());
    after_fade().await;
    rig.engine.play(rain());
    after_fade().await;

    rig.probe.finish("airhorn.mp3");
    settle().await;

    assert_eq!(rig.engine.status().await.state, PlaybackState::Playing);
    assert!(rig.engine.is_playing(rain().id).await);
}

#[tokio::test(start_paused = true)]
async fn test_play_count_write_failure_is_logged() {
    let rig = rig_with_catalog(vec![airhorn()], Arc::new(MemoryCatalog::failing()));

    rig.engine.play(airhorn());
    settle().await;

    assert_eq!(rig.engine.status().await.state, PlaybackState::Playing);
    assert_eq!(
        rig.logger.events_of_type(PlaybackEventType::CatalogWriteFailed).len(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_without_fading() {
    let rig = rig(vec![airhorn()]);

    rig.engine.play(airhorn());
    after_fade().await;
    rig.engine.shutdown().await;

    assert!(rig.probe.released("airhorn.mp3"));
    assert!(rig.engine.status().await.is_idle());
}
