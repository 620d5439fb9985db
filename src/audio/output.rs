use super::cursor::ClipCursor;
use super::decoder::{self, DecodedClip};
use crate::error::PlaybackError;
use crate::playback::{MediaHandle, MediaNotifier};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use log::{debug, error};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Values shared between a handle and its output callback
#[derive(Debug)]
struct SharedControls {
    volume: AtomicU32,
    rate: AtomicU64,
    looping: AtomicBool,
    stop: AtomicBool,
    finished: AtomicBool,
}

impl SharedControls {
    fn new() -> Self {
        Self {
            volume: AtomicU32::new(1.0f32.to_bits()),
            rate: AtomicU64::new(1.0f64.to_bits()),
            looping: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        }
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    fn rate(&self) -> f64 {
        f64::from_bits(self.rate.load(Ordering::Relaxed))
    }

    fn looping(&self) -> bool {
        self.looping.load(Ordering::Relaxed)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// One clip playing on a cpal output device.
///
/// Decoding and the output stream live on a dedicated thread started by
/// [`MediaHandle::start`]; the handle itself only flips shared atomics.
pub struct DesktopHandle {
    path: PathBuf,
    device: cpal::Device,
    controls: Arc<SharedControls>,
    notifier: MediaNotifier,
    worker: Option<thread::JoinHandle<()>>,
}

impl DesktopHandle {
    pub fn new(path: PathBuf, device: cpal::Device, notifier: MediaNotifier) -> Self {
        Self {
            path,
            device,
            controls: Arc::new(SharedControls::new()),
            notifier,
            worker: None,
        }
    }
}

impl MediaHandle for DesktopHandle {
    fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }

        let path = self.path.clone();
        let device = self.device.clone();
        let controls = Arc::clone(&self.controls);
        let notifier = self.notifier.clone();

        let spawned = thread::Builder::new()
            .name("soundboard-output".to_string())
            .spawn(move || run_output(path, device, controls, notifier));

        match spawned {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => self
                .notifier
                .failed(PlaybackError::StreamFailed(format!("Failed to create output thread: {}", e))),
        }
    }

    fn pause(&mut self) {
        self.controls.stop.store(true, Ordering::Relaxed);
    }

    fn volume(&self) -> f32 {
        self.controls.volume()
    }

    fn set_volume(&mut self, volume: f32) {
        self.controls
            .volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.controls.rate.store(rate.to_bits(), Ordering::Relaxed);
    }

    fn set_looping(&mut self, looping: bool) {
        self.controls.looping.store(looping, Ordering::Relaxed);
    }
}

impl Drop for DesktopHandle {
    fn drop(&mut self) {
        self.controls.stop.store(true, Ordering::Relaxed);
    }
}

fn run_output(path: PathBuf, device: cpal::Device, controls: Arc<SharedControls>, notifier: MediaNotifier) {
    raise_thread_priority();

    let clip = match decoder::decode_clip(&path) {
        Ok(clip) => {
            debug!(
                "Decoded {} ({:.2}s, {} ch, {} Hz)",
                path.display(),
                clip.duration_secs(),
                clip.channels(),
                clip.sample_rate()
            );
            Arc::new(clip)
        }
        Err(e) => {
            notifier.failed(e);
            return;
        }
    };

    let stream = match build_stream(&device, clip, Arc::clone(&controls)) {
        Ok(stream) => stream,
        Err(e) => {
            notifier.failed(e);
            return;
        }
    };

    if let Err(e) = stream.play() {
        notifier.failed(PlaybackError::StreamFailed(format!("Failed to start output stream: {}", e)));
        return;
    }

    if controls.stopped() {
        let _ = stream.pause();
        return;
    }
    notifier.started();
    debug!("Output started for {}", path.display());

    loop {
        if controls.stopped() {
            break;
        }
        if controls.finished.load(Ordering::Relaxed) {
            notifier.ended();
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    let _ = stream.pause();
    debug!("Output finished for {}", path.display());
}

#[cfg(target_os = "macos")]
fn raise_thread_priority() {
    unsafe {
        let thread = libc::pthread_self();
        let mut policy: libc::c_int = 0;
        let mut param: libc::sched_param = std::mem::zeroed();

        if libc::pthread_getschedparam(thread, &mut policy, &mut param) == 0 {
            param.sched_priority = 63;
            let _ = libc::pthread_setschedparam(thread, libc::SCHED_FIFO, &param);
        }
    }
}

#[cfg(not(target_os = "macos"))]
fn raise_thread_priority() {}

fn build_stream(
    device: &cpal::Device,
    clip: Arc<DecodedClip>,
    controls: Arc<SharedControls>,
) -> Result<Stream, PlaybackError> {
    let supported = device
        .default_output_config()
        .map_err(|e| PlaybackError::DeviceUnavailable(format!("Failed to get default config: {}", e)))?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    match sample_format {
        SampleFormat::F32 => build_typed_stream::<f32>(device, &config, clip, controls),
        SampleFormat::I16 => build_typed_stream::<i16>(device, &config, clip, controls),
        SampleFormat::U16 => build_typed_stream::<u16>(device, &config, clip, controls),
        other => Err(PlaybackError::StreamFailed(format!(
            "Unsupported sample format: {:?}",
            other
        ))),
    }
}

fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    clip: Arc<DecodedClip>,
    controls: Arc<SharedControls>,
) -> Result<Stream, PlaybackError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    T: cpal::FromSample<f32>,
{
    let mut cursor = ClipCursor::new(clip, config.channels as usize, config.sample_rate.0);
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                let finished = cursor.render(&mut scratch, controls.rate(), controls.looping(), controls.volume());

                for (sample, value) in data.iter_mut().zip(scratch.iter()) {
                    *sample = cpal::Sample::from_sample(*value);
                }

                if finished {
                    controls.finished.store(true, Ordering::Relaxed);
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| PlaybackError::StreamFailed(format!("Failed to build output stream: {}", e)))
}
