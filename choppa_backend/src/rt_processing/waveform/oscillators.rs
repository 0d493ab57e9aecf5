use choppa_core::{SAMPLE_RATE, Sound, Waveform};

use super::noise::SampleAndHoldNoise;
use super::tables::{frac, normalize_phase, phase_increment, poly_blep, sin_turns};

/// Narrowest and widest pulse the duty-cycle control can reach.
const MIN_DUTY: f32 = 0.5;
const MAX_DUTY: f32 = 0.99;

/// Vibrato rates are authored in hundredths of a hertz.
const VIBRATO_RATE_SCALE: f64 = 100.0;

/// Per-channel oscillator.
///
/// Phases are kept in turns and never wrapped, so a channel's phase is a
/// running count of cycles. `f64` keeps that exact enough for tracks that
/// loop for hours.
#[derive(Debug, Clone)]
pub struct Oscillator {
    phase: f64,
    vibrato_phase: f64,
    noise: SampleAndHoldNoise,
}

impl Oscillator {
    pub fn new(noise_seed: u32) -> Self {
        Self {
            phase: 0.0,
            vibrato_phase: 0.0,
            noise: SampleAndHoldNoise::new(noise_seed),
        }
    }

    /// Phase in turns.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn vibrato_phase(&self) -> f64 {
        self.vibrato_phase
    }

    /// Start from phase zero for a freshly allocated sound.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.vibrato_phase = 0.0;
        self.noise.reset();
    }

    /// Pitch at sample `t`: the linear sweep plus the vibrato offset.
    /// Advances the vibrato LFO.
    #[inline]
    pub fn instantaneous_frequency(&mut self, sound: &Sound, t: u32) -> f32 {
        let mut frequency = sound.frequency + sound.sweep * progress(sound, t);

        if sound.vibrato.is_active() {
            frequency += sin_turns(frac(self.vibrato_phase) as f32) * sound.vibrato.frequency_range;
            self.vibrato_phase +=
                sound.vibrato.rate as f64 / (SAMPLE_RATE as f64 * VIBRATO_RATE_SCALE);
        }

        frequency
    }

    /// Advance one sample and emit the raw waveform in [-1, 1].
    #[inline]
    pub fn next_sample(&mut self, sound: &Sound, t: u32) -> f32 {
        let frequency = self.instantaneous_frequency(sound, t);
        let dt = phase_increment(frequency, SAMPLE_RATE as f32);
        self.phase += dt as f64;

        let p = frac(self.phase) as f32;
        match sound.waveform {
            Waveform::Sine => sin_turns(p),
            Waveform::Triangle => triangle(p),
            Waveform::Saw => 2.0 * p - 1.0 - poly_blep(p, dt),
            Waveform::Pulse => pulse(p, dt, duty_threshold(sound, t)),
            Waveform::Noise => self.noise.sample(self.phase),
            Waveform::Silence | Waveform::Preparing | Waveform::None => 0.0,
        }
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(1)
    }
}

#[inline]
fn progress(sound: &Sound, t: u32) -> f32 {
    if sound.duration == 0 {
        0.0
    } else {
        t as f32 / sound.duration as f32
    }
}

#[inline]
fn triangle(p: f32) -> f32 {
    if p < 0.25 {
        4.0 * p
    } else if p < 0.75 {
        2.0 - 4.0 * p
    } else {
        4.0 * p - 4.0
    }
}

/// Fraction of the cycle spent high for a pulse at sample `t`.
#[inline]
pub fn duty_threshold(sound: &Sound, t: u32) -> f32 {
    let control = sound.square_duty_cycle + sound.square_duty_cycle_sweep * progress(sound, t);
    MIN_DUTY + (MAX_DUTY - MIN_DUTY) * control.clamp(0.0, 1.0)
}

/// Band-limited pulse: rising edge at phase 0, falling edge at `duty`.
#[inline]
fn pulse(p: f32, dt: f32, duty: f32) -> f32 {
    let naive = if p < duty { 1.0 } else { -1.0 };
    naive + poly_blep(p, dt) - poly_blep(normalize_phase(p - duty), dt)
}
