use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// How the playhead moves between columns, one move per scheduler tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPattern {
    #[default]
    Forward,
    Backward,
    Bounce,
    Random,
}

impl PlaybackPattern {
    pub const ALL: [PlaybackPattern; 4] = [
        PlaybackPattern::Forward,
        PlaybackPattern::Backward,
        PlaybackPattern::Bounce,
        PlaybackPattern::Random,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PlaybackPattern::Forward => "forward",
            PlaybackPattern::Backward => "backward",
            PlaybackPattern::Bounce => "bounce",
            PlaybackPattern::Random => "random",
        }
    }

    pub fn next(self) -> Self {
        match self {
            PlaybackPattern::Forward => PlaybackPattern::Backward,
            PlaybackPattern::Backward => PlaybackPattern::Bounce,
            PlaybackPattern::Bounce => PlaybackPattern::Random,
            PlaybackPattern::Random => PlaybackPattern::Forward,
        }
    }
}

impl fmt::Display for PlaybackPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PlaybackPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlaybackPattern::ALL
            .into_iter()
            .find(|p| p.label() == s)
            .ok_or_else(|| format!("unknown playback pattern: {s}"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transport {
    Stopped,
    Playing,
}

/// Playhead position and direction. Only the engine mutates this; the UI
/// reads it through the engine's getters.
#[derive(Debug)]
pub struct PlaybackState {
    current_step: usize,
    reverse: bool, // only meaningful for Bounce
    transport: Transport,
    pattern: PlaybackPattern,
    size: usize,
    rng: StdRng,
}

impl PlaybackState {
    pub fn new(size: usize) -> Self {
        Self::with_rng(size, StdRng::from_entropy())
    }

    pub fn with_seed(size: usize, seed: u64) -> Self {
        Self::with_rng(size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(size: usize, rng: StdRng) -> Self {
        Self {
            current_step: 0,
            reverse: false,
            transport: Transport::Stopped,
            pattern: PlaybackPattern::default(),
            size: size.max(1),
            rng,
        }
    }

    pub fn start(&mut self) {
        self.transport = Transport::Playing;
        self.current_step = 0;
        self.reverse = false;
    }

    pub fn stop(&mut self) {
        self.transport = Transport::Stopped;
    }

    pub fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn pattern(&self) -> PlaybackPattern {
        self.pattern
    }

    // the caller decides whether a switch restarts playback
    pub fn set_pattern(&mut self, pattern: PlaybackPattern) {
        self.pattern = pattern;
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn resize(&mut self, size: usize) {
        self.size = size.max(1);
        self.current_step = 0;
        self.reverse = false;
    }

    /// Moves the playhead one step according to the selected pattern and
    /// returns the new column.
    pub fn advance(&mut self) -> usize {
        let n = self.size;
        let step = self.current_step;
        self.current_step = match self.pattern {
            PlaybackPattern::Forward => (step + 1) % n,
            PlaybackPattern::Backward => (step + n - 1) % n,
            PlaybackPattern::Bounce => self.bounce(step),
            PlaybackPattern::Random => self.rng.gen_range(0..n),
        };
        self.current_step
    }

    // reflects one step inside the boundary: 0 -> 1 and N-1 -> N-2
    fn bounce(&mut self, step: usize) -> usize {
        let last = self.size - 1;
        if last == 0 {
            return 0;
        }
        if self.reverse {
            if step == 0 {
                self.reverse = false;
                return 1;
            }
            step - 1
        } else {
            if step >= last {
                self.reverse = true;
                return last - 1;
            }
            step + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(state: &mut PlaybackState, ticks: usize) -> Vec<usize> {
        let mut out = vec![state.current_step()];
        for _ in 0..ticks {
            out.push(state.advance());
        }
        out
    }

    #[test]
    fn forward_and_backward_cover_every_column_once_per_period() {
        for pattern in [PlaybackPattern::Forward, PlaybackPattern::Backward] {
            let mut s = PlaybackState::with_seed(16, 1);
            s.set_pattern(pattern);
            s.start();
            let seq = run(&mut s, 32);
            let mut first: Vec<usize> = seq[..16].to_vec();
            first.sort_unstable();
            assert_eq!(first, (0..16).collect::<Vec<_>>(), "{pattern}");
            assert_eq!(seq[..16], seq[16..32], "{pattern} not periodic");
        }
    }

    #[test]
    fn backward_wraps_from_zero_to_last() {
        let mut s = PlaybackState::with_seed(8, 1);
        s.set_pattern(PlaybackPattern::Backward);
        s.start();
        assert_eq!(run(&mut s, 3), vec![0, 7, 6, 5]);
    }

    #[test]
    fn bounce_reflects_one_step_inside_the_edges() {
        let mut s = PlaybackState::with_seed(5, 1);
        s.set_pattern(PlaybackPattern::Bounce);
        s.start();
        let seq = run(&mut s, 12);
        assert_eq!(seq, vec![0, 1, 2, 3, 4, 3, 2, 1, 0, 1, 2, 3, 4]);
        for w in seq.windows(2) {
            assert_ne!(w[0], w[1]);
        }
    }

    #[test]
    fn bounce_on_a_single_column_stays_put() {
        let mut s = PlaybackState::with_seed(1, 1);
        s.set_pattern(PlaybackPattern::Bounce);
        s.start();
        assert_eq!(run(&mut s, 3), vec![0, 0, 0, 0]);
    }

    #[test]
    fn random_stays_in_range_and_is_seeded() {
        let mut a = PlaybackState::with_seed(10, 42);
        let mut b = PlaybackState::with_seed(10, 42);
        a.set_pattern(PlaybackPattern::Random);
        b.set_pattern(PlaybackPattern::Random);
        let sa = run(&mut a, 200);
        let sb = run(&mut b, 200);
        assert_eq!(sa, sb);
        assert!(sa.iter().all(|&s| s < 10));
    }

    #[test]
    fn start_resets_step_and_direction() {
        let mut s = PlaybackState::with_seed(4, 1);
        s.set_pattern(PlaybackPattern::Bounce);
        s.start();
        run(&mut s, 4); // now descending from 2
        s.stop();
        assert!(!s.is_playing());
        s.start();
        assert_eq!(s.current_step(), 0);
        assert_eq!(s.advance(), 1);
    }

    #[test]
    fn pattern_names_round_trip_through_from_str() {
        assert_eq!("bounce".parse::<PlaybackPattern>().unwrap(), PlaybackPattern::Bounce);
        assert!("sideways".parse::<PlaybackPattern>().is_err());
    }
}
