//! XO-CHIP audio patterns and their PCM rendering.
//!
//! The interpreter never touches an audio device. It hands patterns, playback rates and
//! durations to a [`Sound`] sink; [`Synth`] turns those into sample buffers for whatever
//! device the host owns.
use std::sync::{Mutex, MutexGuard, PoisonError};

use bitvec::prelude::*;
use log::trace;

/// Rate used until a program picks its own pitch
pub const DEFAULT_PATTERN_RATE: u32 = 4000;

/// Bits in a single pattern period
pub const PATTERN_BITS: usize = 128;

/// Timer ticks per second
const TICKS_PER_SECOND: u64 = 60;

/// A 128-bit one-bit waveform, `low` holding the first 64 bits, most significant bit first
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SoundPattern {
    pub low: u64,
    pub high: u64,
}

impl SoundPattern {
    pub const fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }

    /// Build a pattern out of 16 bytes as laid out in memory
    pub fn from_bytes(bytes: &[u8; 16]) -> Self {
        let mut low = [0u8; 8];
        let mut high = [0u8; 8];
        low.copy_from_slice(&bytes[..8]);
        high.copy_from_slice(&bytes[8..]);
        Self::new(u64::from_be_bytes(low), u64::from_be_bytes(high))
    }

    /// Amplitude of bit `idx` of the period, `+0.5` when set and `-0.5` otherwise
    pub fn bit(&self, idx: usize) -> f32 {
        let words = [self.low, self.high];
        if words.view_bits::<Msb0>()[idx % PATTERN_BITS] {
            0.5
        } else {
            -0.5
        }
    }

    /// Render one full period of the pattern played at `rate` bits per second
    ///
    /// Produces `128 * sample_rate / rate` samples; sample `n` plays bit
    /// `n * rate / sample_rate` of the pattern.
    pub fn render(&self, rate: u32, sample_rate: u32) -> Vec<f32> {
        if rate == 0 || sample_rate == 0 {
            return Vec::new();
        }
        let (rate, sample_rate) = (rate as u64, sample_rate as u64);
        let len = PATTERN_BITS as u64 * sample_rate / rate;
        (0..len)
            .map(|n| self.bit(((n * rate / sample_rate) % PATTERN_BITS as u64) as usize))
            .collect()
    }
}

impl Default for SoundPattern {
    fn default() -> Self {
        Self::new(0xFF00_FF00_FF00_FF00, 0xFF00_FF00_FF00_FF00)
    }
}

/// Number of samples covering `ticks` 60Hz ticks
pub fn ticks_to_samples(ticks: u8, sample_rate: u32) -> usize {
    (ticks as u64 * sample_rate as u64 / TICKS_PER_SECOND) as usize
}

/// Pattern playback rate selected by a pitch register value, 64 being 4000Hz
pub fn pitch_to_rate(pitch: u8) -> u32 {
    let octaves = (pitch as f64 - 64.0) / 48.0;
    (DEFAULT_PATTERN_RATE as f64 * 2f64.powf(octaves)) as u32
}

/// Audio sink of a running machine
pub trait Sound: Send + Sync {
    fn set_pattern(&self, pattern: SoundPattern);
    fn set_pattern_rate(&self, rate: u32);
    /// Sound the current pattern for `ticks` 60Hz ticks, replacing whatever is playing
    fn play(&self, ticks: u8);
}

/// Sink that discards everything
#[derive(Debug, Default, Copy, Clone)]
pub struct Mute;

impl Sound for Mute {
    fn set_pattern(&self, _: SoundPattern) {}
    fn set_pattern_rate(&self, _: u32) {}
    fn play(&self, _: u8) {}
}

#[derive(Debug)]
struct Voice {
    pattern: SoundPattern,
    rate: u32,
    pending: Option<Vec<f32>>,
}

/// Sink rendering each `play` request into a PCM buffer
#[derive(Debug)]
pub struct Synth {
    sample_rate: u32,
    voice: Mutex<Voice>,
}

impl Synth {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            voice: Mutex::new(Voice {
                pattern: SoundPattern::default(),
                rate: DEFAULT_PATTERN_RATE,
                pending: None,
            }),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn pattern(&self) -> SoundPattern {
        self.voice().pattern
    }

    pub fn pattern_rate(&self) -> u32 {
        self.voice().rate
    }

    /// Take the buffer of the most recent `play`, if it was not taken yet
    pub fn take_pending(&self) -> Option<Vec<f32>> {
        self.voice().pending.take()
    }

    fn voice(&self) -> MutexGuard<'_, Voice> {
        self.voice.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sound for Synth {
    fn set_pattern(&self, pattern: SoundPattern) {
        self.voice().pattern = pattern;
    }

    fn set_pattern_rate(&self, rate: u32) {
        self.voice().rate = rate;
    }

    fn play(&self, ticks: u8) {
        let mut voice = self.voice();
        let samples = ticks_to_samples(ticks, self.sample_rate);
        let period = voice.pattern.render(voice.rate, self.sample_rate);
        trace!("Playing {} samples at {}Hz", samples, voice.rate);
        voice.pending = Some(period.iter().copied().cycle().take(samples).collect());
    }
}
