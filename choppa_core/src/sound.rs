//! Sound descriptors.
//!
//! A [`Sound`] is an immutable template. Channels copy it by value, so
//! chaining and looping are expressed by the `next` link pointing at
//! another descriptor in a [`SoundBank`](crate::bank::SoundBank).

use std::fmt;

/// Engine sample rate in Hz. Every duration and ADSR segment is counted
/// in samples at this rate.
pub const SAMPLE_RATE: u32 = 48_000;

/// Converts authoring-time seconds to a sample count.
#[inline]
pub fn seconds_to_samples(seconds: f32) -> u32 {
    (seconds.max(0.0) * SAMPLE_RATE as f32).round() as u32
}

/// Index of a sound descriptor inside a bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(u32);

impl SoundId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a music track inside a bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(u32);

impl TrackId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track #{}", self.0)
    }
}

/// What a channel emits.
///
/// `Silence` still advances time. `Preparing` reserves a channel without
/// advancing it. `None` marks a free channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    Sine,
    Triangle,
    Saw,
    Pulse,
    Noise,
    Silence,
    Preparing,
    #[default]
    None,
}

/// Amplitude envelope in the sample domain.
///
/// `peak` and `sustain` are levels, `attack`, `decay` and `release` are
/// segment lengths in samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub peak: f32,
    pub attack: u32,
    pub decay: u32,
    pub sustain: f32,
    pub release: u32,
}

impl Adsr {
    pub const fn new(peak: f32, attack: u32, decay: u32, sustain: f32, release: u32) -> Self {
        Self {
            peak,
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// A flat envelope with no ramps. Only useful for silence and tests.
    pub const fn flat(level: f32) -> Self {
        Self::new(level, 0, 0, level, 0)
    }

    /// Total length of the three timed segments.
    pub fn segments_len(&self) -> u64 {
        self.attack as u64 + self.decay as u64 + self.release as u64
    }

    /// Rescales the segment lengths so they fit inside `duration`.
    ///
    /// When attack + decay + release exceeds `duration` the three lengths
    /// are scaled proportionally and always sum to exactly `duration`.
    /// Levels are left untouched.
    pub fn fitted(&self, duration: u32) -> Adsr {
        let total = self.segments_len();
        if total <= duration as u64 {
            return *self;
        }

        let scale = |segment: u32| (segment as u64 * duration as u64 / total) as u32;
        let attack = scale(self.attack);
        let decay = scale(self.decay);
        // Remainder goes to release so rounding never leaves a gap.
        let release = duration - attack - decay;

        Adsr {
            attack,
            decay,
            release,
            ..*self
        }
    }

    /// Scales both levels by `volume`.
    pub fn scaled(&self, volume: f32) -> Adsr {
        Adsr {
            peak: self.peak * volume,
            sustain: self.sustain * volume,
            ..*self
        }
    }
}

impl Default for Adsr {
    fn default() -> Self {
        AdsrSeconds::default().to_samples()
    }
}

/// Amplitude envelope as authored, with times in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrSeconds {
    pub peak: f32,
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl AdsrSeconds {
    pub const fn new(peak: f32, attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            peak,
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Short pluck: fast attack, decays to half level.
    pub const fn pluck() -> Self {
        Self::new(1.0, 0.005, 0.08, 0.5, 0.05)
    }

    pub fn to_samples(&self) -> Adsr {
        Adsr {
            peak: self.peak,
            attack: seconds_to_samples(self.attack),
            decay: seconds_to_samples(self.decay),
            sustain: self.sustain,
            release: seconds_to_samples(self.release),
        }
    }
}

impl Default for AdsrSeconds {
    fn default() -> Self {
        Self::new(1.0, 0.005, 0.0, 1.0, 0.01)
    }
}

/// Secondary low-frequency oscillator added to the pitch.
///
/// `rate` is in hundredths of a hertz.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vibrato {
    pub frequency_range: f32,
    pub rate: f32,
}

impl Vibrato {
    pub const fn new(frequency_range: f32, rate: f32) -> Self {
        Self {
            frequency_range,
            rate,
        }
    }

    pub fn is_active(&self) -> bool {
        self.rate != 0.0
    }
}

/// Immutable sound template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sound {
    pub waveform: Waveform,
    /// Length in samples.
    pub duration: u32,
    /// Base pitch in Hz.
    pub frequency: f32,
    /// Pitch delta reached at the end of `duration`. May drive the
    /// frequency negative.
    pub sweep: f32,
    pub vibrato: Vibrato,
    /// Pulse width control in [0, 1], mapped onto a 50-99% duty cycle.
    pub square_duty_cycle: f32,
    pub square_duty_cycle_sweep: f32,
    pub adsr: Adsr,
    pub next: Option<SoundId>,
}

impl Sound {
    /// The descriptor held by a free channel.
    pub const NONE: Sound = Sound {
        waveform: Waveform::None,
        duration: 0,
        frequency: 0.0,
        sweep: 0.0,
        vibrato: Vibrato::new(0.0, 0.0),
        square_duty_cycle: 0.0,
        square_duty_cycle_sweep: 0.0,
        adsr: Adsr::flat(0.0),
        next: None,
    };

    /// Duration used by reserved channels; they never expire on their own.
    pub const PREPARING_DURATION: u32 = u32::MAX;

    pub fn new(waveform: Waveform, frequency: f32, duration: u32) -> Self {
        Self {
            waveform,
            duration,
            frequency,
            adsr: Adsr::default(),
            ..Self::NONE
        }
    }

    pub fn from_seconds(waveform: Waveform, frequency: f32, seconds: f32) -> Self {
        Self::new(waveform, frequency, seconds_to_samples(seconds))
    }

    /// A rest that keeps a channel busy for `duration` samples.
    pub fn silence(duration: u32) -> Self {
        Self {
            waveform: Waveform::Silence,
            duration,
            ..Self::NONE
        }
    }

    pub fn preparing() -> Self {
        Self {
            waveform: Waveform::Preparing,
            duration: Self::PREPARING_DURATION,
            ..Self::NONE
        }
    }

    pub fn with_adsr(mut self, adsr: Adsr) -> Self {
        self.adsr = adsr;
        self
    }

    pub fn with_adsr_seconds(self, adsr: AdsrSeconds) -> Self {
        self.with_adsr(adsr.to_samples())
    }

    pub fn with_sweep(mut self, sweep: f32) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn with_vibrato(mut self, vibrato: Vibrato) -> Self {
        self.vibrato = vibrato;
        self
    }

    pub fn with_duty_cycle(mut self, duty_cycle: f32, sweep: f32) -> Self {
        self.square_duty_cycle = duty_cycle;
        self.square_duty_cycle_sweep = sweep;
        self
    }

    pub fn with_next(mut self, next: SoundId) -> Self {
        self.next = Some(next);
        self
    }

    /// Scales the envelope levels. Volumes outside [0, 1] are clamped.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.adsr = self.adsr.scaled(volume.clamp(0.0, 1.0));
        self
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.waveform == Waveform::None
    }

    #[inline]
    pub fn is_preparing(&self) -> bool {
        self.waveform == Waveform::Preparing
    }

    pub fn duration_seconds(&self) -> f32 {
        self.duration as f32 / SAMPLE_RATE as f32
    }
}

impl Default for Sound {
    fn default() -> Self {
        Self::NONE
    }
}
