/*!
Variable-rate reader over a decoded clip.

The cursor walks the clip at `rate * clip_rate / output_rate` source frames per
output frame, interpolating linearly between neighbouring frames. Raising the
rate therefore raises both tempo and pitch. When looping, the read position
wraps to the start instead of finishing.
*/

use super::decoder::DecodedClip;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ClipCursor {
    clip: Arc<DecodedClip>,
    out_channels: usize,
    out_rate: u32,
    position: f64,
    finished: bool,
}

impl ClipCursor {
    pub fn new(clip: Arc<DecodedClip>, out_channels: usize, out_rate: u32) -> Self {
        Self {
            clip,
            out_channels: out_channels.max(1),
            out_rate,
            position: 0.0,
            finished: false,
        }
    }

    /// Current read position in source frames
    pub fn position(&self) -> f64 {
        self.position
    }

    fn step(&self, rate: f64) -> f64 {
        if self.out_rate == 0 || !rate.is_finite() {
            return 0.0;
        }
        rate.max(0.0) * self.clip.sample_rate() as f64 / self.out_rate as f64
    }

    /// Fill `out` with interleaved output frames. Returns true once a
    /// non-looping clip has been played to the end; the remainder of `out` is
    /// silence from then on.
    pub fn render(&mut self, out: &mut [f32], rate: f64, looping: bool, volume: f32) -> bool {
        let frames = self.clip.frames();
        if frames == 0 {
            out.fill(0.0);
            self.finished = true;
            return true;
        }

        let total = frames as f64;
        let step = self.step(rate);
        let channels = self.out_channels;

        for frame in out.chunks_mut(channels) {
            if self.position >= total {
                if looping {
                    self.position %= total;
                    self.finished = false;
                } else {
                    self.finished = true;
                }
            }

            if self.finished {
                frame.fill(0.0);
                continue;
            }

            let index = self.position as usize;
            let fraction = (self.position - index as f64) as f32;
            let next = if index + 1 < frames {
                Some(index + 1)
            } else if looping {
                Some(0)
            } else {
                None
            };

            for (channel, sample) in frame.iter_mut().enumerate() {
                let current = self.clip.sample(index, channel, channels);
                let following = next.map_or(current, |next| self.clip.sample(next, channel, channels));
                *sample = (current + (following - current) * fraction) * volume;
            }

            self.position += step;
        }

        if !looping && self.position >= total {
            self.finished = true;
        }
        self.finished
    }
}
