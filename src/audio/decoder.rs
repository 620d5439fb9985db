use crate::error::PlaybackError;
use log::{debug, warn};
use std::fs::File;
use std::io;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// A fully decoded clip as interleaved f32 samples
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedClip {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl DecodedClip {
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }

    /// Sample of `frame` as heard on output channel `channel` of `out_channels`.
    ///
    /// Multichannel clips are averaged down to mono outputs; otherwise extra
    /// output channels repeat the last source channel.
    pub fn sample(&self, frame: usize, channel: usize, out_channels: usize) -> f32 {
        let base = frame * self.channels;
        if base + self.channels > self.samples.len() {
            return 0.0;
        }

        if out_channels == 1 && self.channels > 1 {
            let sum: f32 = self.samples[base..base + self.channels].iter().sum();
            sum / self.channels as f32
        } else {
            self.samples[base + channel.min(self.channels - 1)]
        }
    }
}

/// Decode the whole file at `path` into memory
pub fn decode_clip(path: &Path) -> Result<DecodedClip, PlaybackError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PlaybackError::MediaNotFound {
            path: path.display().to_string(),
        },
        _ => PlaybackError::DecodeFailed(format!("Failed to open {}: {}", path.display(), e)),
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("unknown")
        .to_lowercase();

    let mut hint = Hint::new();
    hint.with_extension(&extension);

    let source = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = symphonia::default::get_probe()
        .format(&hint, source, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| PlaybackError::UnsupportedFormat {
            format: format!("{} ({})", extension, e),
        })?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PlaybackError::UnsupportedFormat {
            format: format!("{} (no audio track)", extension),
        })?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut sample_rate = codec_params.sample_rate.unwrap_or(44_100);
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| PlaybackError::UnsupportedFormat {
            format: format!("{} ({})", extension, e),
        })?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(PlaybackError::DecodeFailed(format!("Failed to read packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("Skipping undecodable packet in {}: {}", path.display(), msg);
            }
            Err(e) => return Err(PlaybackError::DecodeFailed(e.to_string())),
        }
    }

    if samples.is_empty() {
        return Err(PlaybackError::DecodeFailed(format!(
            "{} contains no audio",
            path.display()
        )));
    }

    let clip = DecodedClip::new(samples, channels, sample_rate);
    debug!(
        "Decoded {} ({} frames, {} ch, {} Hz)",
        path.display(),
        clip.frames(),
        clip.channels(),
        clip.sample_rate()
    );
    Ok(clip)
}
