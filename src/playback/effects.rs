/// Semitones in one octave; +12 doubles the rate
pub const SEMITONES_PER_OCTAVE: f64 = 12.0;

pub const MIN_SPEED: f64 = 0.25;
pub const MAX_SPEED: f64 = 4.0;

/// Two octaves either way
pub const MAX_PITCH_SEMITONES: f64 = 24.0;

/// Bring a speed multiplier into the supported range. `None` for values
/// that cannot be a speed at all.
pub fn clamp_speed(speed: f64) -> Option<f64> {
    if speed.is_finite() && speed > 0.0 {
        Some(speed.clamp(MIN_SPEED, MAX_SPEED))
    } else {
        None
    }
}

pub fn clamp_pitch(semitones: f64) -> Option<f64> {
    if semitones.is_finite() {
        Some(semitones.clamp(-MAX_PITCH_SEMITONES, MAX_PITCH_SEMITONES))
    } else {
        None
    }
}

/// Whether a handle can be driven at `rate`
pub fn is_usable_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// Combined playback rate for a speed multiplier and a pitch offset.
///
/// Pitch is realized by changing the rate, so shifting pitch also changes
/// tempo.
pub fn playback_rate(speed: f64, pitch_semitones: f64) -> f64 {
    speed * 2f64.powf(pitch_semitones / SEMITONES_PER_OCTAVE)
}
