use crate::models::{Sound, SoundId};
use rand::seq::SliceRandom;
use rand::Rng;

/// How the next sound is chosen when auto-advance fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceMode {
    /// The candidate after the one that finished, wrapping to the first
    Sequential,
    /// Any candidate, uniformly; the finished sound may come up again
    Shuffle,
}

impl AdvanceMode {
    pub fn from_shuffle(shuffle: bool) -> Self {
        if shuffle {
            AdvanceMode::Shuffle
        } else {
            AdvanceMode::Sequential
        }
    }
}

/// Pick the sound to play after `current` from the ordered candidate list
pub fn next_candidate<'a, R>(
    current: Option<SoundId>,
    candidates: &'a [Sound],
    mode: AdvanceMode,
    rng: &mut R,
) -> Option<&'a Sound>
where
    R: Rng + ?Sized,
{
    if candidates.is_empty() {
        return None;
    }

    match mode {
        AdvanceMode::Sequential => {
            let next = current
                .and_then(|id| candidates.iter().position(|sound| sound.id == id))
                .map_or(0, |position| position + 1);
            candidates.get(next % candidates.len())
        }
        AdvanceMode::Shuffle => candidates.choose(rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn board() -> Vec<Sound> {
        vec![
            Sound::new(1, "Airhorn", "airhorn.mp3"),
            Sound::new(2, "Rimshot", "rimshot.mp3"),
            Sound::new(3, "Crickets", "crickets.mp3"),
        ]
    }

    #[test]
    fn test_sequential_moves_to_next() {
        let sounds = board();
        let mut rng = StdRng::seed_from_u64(1);

        let next = next_candidate(Some(SoundId(1)), &sounds, AdvanceMode::Sequential, &mut rng);
        assert_eq!(next.map(|s| s.id), Some(SoundId(2)));
    }

    #[test]
    fn test_sequential_wraps_after_last() {
        let sounds = board();
        let mut rng = StdRng::seed_from_u64(1);

        let next = next_candidate(Some(SoundId(3)), &sounds, AdvanceMode::Sequential, &mut rng);
        assert_eq!(next.map(|s| s.id), Some(SoundId(1)));
    }

    #[test]
    fn test_sequential_unknown_current_starts_at_first() {
        let sounds = board();
        let mut rng = StdRng::seed_from_u64(1);

        let next = next_candidate(Some(SoundId(99)), &sounds, AdvanceMode::Sequential, &mut rng);
        assert_eq!(next.map(|s| s.id), Some(SoundId(1)));

        let next = next_candidate(None, &sounds, AdvanceMode::Sequential, &mut rng);
        assert_eq!(next.map(|s| s.id), Some(SoundId(1)));
    }

    #[test]
    fn test_empty_candidates_yield_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(next_candidate(Some(SoundId(1)), &[], AdvanceMode::Sequential, &mut rng).is_none());
        assert!(next_candidate(Some(SoundId(1)), &[], AdvanceMode::Shuffle, &mut rng).is_none());
    }

    #[test]
    fn test_shuffle_picks_from_candidates() {
        let sounds = board();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let next = next_candidate(Some(SoundId(2)), &sounds, AdvanceMode::Shuffle, &mut rng);
            assert!(next.is_some());
        }
    }

    #[test]
    fn test_shuffle_may_repeat_current() {
        let sounds = vec![Sound::new(7, "Only", "only.mp3")];
        let mut rng = StdRng::seed_from_u64(3);

        let next = next_candidate(Some(SoundId(7)), &sounds, AdvanceMode::Shuffle, &mut rng);
        assert_eq!(next.map(|s| s.id), Some(SoundId(7)));
    }

    #[test]
    fn test_mode_from_shuffle_flag() {
        assert_eq!(AdvanceMode::from_shuffle(true), AdvanceMode::Shuffle);
        assert_eq!(AdvanceMode::from_shuffle(false), AdvanceMode::Sequential);
    }
}
