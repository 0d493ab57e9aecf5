use choppa_core::Adsr;

/// ADSR envelope states. Only ever advance forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnvelopeState {
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Sample-accurate ADSR envelope bound to a sound of known duration.
///
/// The release is anchored to the end of the sound: the level reaches
/// exactly zero at `t == duration`. Segments that don't fit inside the
/// duration are rescaled (see [`Adsr::fitted`]) so every sound starts and
/// ends silent.
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    adsr: Adsr,
    duration: u32,
    state: EnvelopeState,
}

impl AdsrEnvelope {
    pub fn new(adsr: Adsr, duration: u32) -> Self {
        Self {
            adsr: adsr.fitted(duration),
            duration,
            state: EnvelopeState::Attack,
        }
    }

    /// Restart for a new sound.
    pub fn trigger(&mut self, adsr: Adsr, duration: u32) {
        *self = Self::new(adsr, duration);
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// The envelope after duration fitting.
    pub fn adsr(&self) -> &Adsr {
        &self.adsr
    }

    /// Envelope level at sample `t` of the sound.
    ///
    /// `t` is expected to be non-decreasing between calls; the state
    /// machine never moves backwards.
    #[inline]
    pub fn level(&mut self, t: u32) -> f32 {
        let adsr = &self.adsr;
        loop {
            match self.state {
                EnvelopeState::Attack => {
                    if t < adsr.attack {
                        return t as f32 / adsr.attack as f32 * adsr.peak;
                    }
                    self.state = EnvelopeState::Decay;
                }

                EnvelopeState::Decay => {
                    let elapsed = t.saturating_sub(adsr.attack);
                    if elapsed < adsr.decay {
                        let progress = elapsed as f32 / adsr.decay as f32;
                        return adsr.peak + (adsr.sustain - adsr.peak) * progress;
                    }
                    self.state = EnvelopeState::Sustain;
                }

                EnvelopeState::Sustain => {
                    if self.duration.saturating_sub(t) > adsr.release {
                        return adsr.sustain;
                    }
                    self.state = EnvelopeState::Release;
                }

                EnvelopeState::Release => {
                    if adsr.release == 0 {
                        return 0.0;
                    }
                    let remaining = self.duration.saturating_sub(t);
                    return adsr.sustain * remaining as f32 / adsr.release as f32;
                }
            }
        }
    }
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new(Adsr::flat(0.0), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(adsr: Adsr, duration: u32) -> Vec<f32> {
        let mut envelope = AdsrEnvelope::new(adsr, duration);
        (0..=duration).map(|t| envelope.level(t)).collect()
    }

    #[test]
    fn test_boundaries() {
        let adsr = Adsr::new(0.9, 100, 200, 0.5, 300);
        let levels = run(adsr, 1000);

        assert_eq!(levels[0], 0.0);
        assert!((levels[100] - 0.9).abs() < 1e-6);
        assert!((levels[300] - 0.5).abs() < 1e-6);
        assert!((levels[600] - 0.5).abs() < 1e-6);
        assert!((levels[700] - 0.5).abs() < 1e-6);
        assert_eq!(levels[1000], 0.0);
    }

    #[test]
    fn test_states_only_advance() {
        let mut envelope = AdsrEnvelope::new(Adsr::new(1.0, 10, 10, 0.5, 10), 100);
        let mut previous = envelope.state();
        for t in 0..=100 {
            envelope.level(t);
            assert!(envelope.state() >= previous);
            previous = envelope.state();
        }
        assert_eq!(envelope.state(), EnvelopeState::Release);
    }

    #[test]
    fn test_release_is_linear_to_zero() {
        let levels = run(Adsr::new(1.0, 0, 0, 0.8, 400), 1000);
        assert!((levels[600] - 0.8).abs() < 1e-6);
        assert!((levels[800] - 0.4).abs() < 1e-6);
        assert_eq!(levels[1000], 0.0);
    }

    #[test]
    fn test_short_sound_is_fitted() {
        // 4800 samples of ramps squeezed into 480
        let adsr = Adsr::new(1.0, 2400, 1200, 0.6, 1200);
        let envelope = AdsrEnvelope::new(adsr, 480);
        let fitted = envelope.adsr();
        assert_eq!(fitted.segments_len(), 480);
        assert_eq!(fitted.sustain, 0.6);

        let levels = run(adsr, 480);
        assert_eq!(levels[0], 0.0);
        assert_eq!(levels[480], 0.0);
        assert!((levels[fitted.attack as usize] - 1.0).abs() < 1e-6);
        assert!(levels.iter().all(|l| *l <= 1.0 + 1e-6 && *l >= 0.0));
    }

    #[test]
    fn test_zero_duration() {
        let mut envelope = AdsrEnvelope::new(Adsr::new(1.0, 10, 10, 1.0, 10), 0);
        assert_eq!(envelope.level(0), 0.0);
    }

    #[test]
    fn test_no_discontinuities() {
        let levels = run(Adsr::new(1.0, 240, 480, 0.4, 960), 4800);
        for pair in levels.windows(2) {
            assert!((pair[1] - pair[0]).abs() < 0.01);
        }
    }
}
