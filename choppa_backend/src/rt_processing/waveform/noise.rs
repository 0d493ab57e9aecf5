/// Fast pseudo-random number generator for audio applications
/// Uses a linear congruential generator (LCG) for deterministic, fast noise
#[derive(Debug, Clone)]
pub struct FastRng {
    state: u32,
}

impl FastRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed }, // Avoid zero seed
        }
    }

    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    #[inline]
    fn next_f32(&mut self) -> f32 {
        (self.next_u32() as f32) * (1.0 / 4294967296.0) // [0.0, 1.0)
    }

    /// Uniform value in [-1.0, 1.0].
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        ((self.next_f32() - 0.5) * 2.0).clamp(-1.0, 1.0)
    }
}

/// Crossings of the noise clock per oscillator cycle.
pub const NOISE_STEPS_PER_CYCLE: f64 = 3.0;

/// Sample-and-hold noise clocked by an oscillator phase.
///
/// A new random level is drawn whenever `phase * 3` crosses an integer,
/// and held until the next crossing. Pitch therefore shapes the noise
/// colour the way it does on classic sound chips.
#[derive(Debug, Clone)]
pub struct SampleAndHoldNoise {
    rng: FastRng,
    held: f32,
    step: Option<i64>,
}

impl SampleAndHoldNoise {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: FastRng::new(seed),
            held: 0.0,
            step: None,
        }
    }

    /// Forget the held level so the next sample draws a fresh one.
    pub fn reset(&mut self) {
        self.step = None;
    }

    #[inline]
    pub fn sample(&mut self, phase: f64) -> f32 {
        let step = (phase * NOISE_STEPS_PER_CYCLE).floor() as i64;
        if self.step != Some(step) {
            self.step = Some(step);
            self.held = self.rng.next_bipolar();
        }
        self.held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_range_and_determinism() {
        let mut a = FastRng::new(42);
        let mut b = FastRng::new(42);
        for _ in 0..1000 {
            let x = a.next_bipolar();
            assert!((-1.0..=1.0).contains(&x));
            assert_eq!(x, b.next_bipolar());
        }
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let mut rng = FastRng::new(0);
        let first = rng.next_bipolar();
        assert_ne!(first, rng.next_bipolar());
    }

    #[test]
    fn test_holds_between_crossings() {
        let mut noise = SampleAndHoldNoise::new(7);
        let first = noise.sample(0.0);
        assert_eq!(noise.sample(0.1), first);
        assert_eq!(noise.sample(0.33), first);

        let second = noise.sample(0.34);
        assert_eq!(noise.sample(0.6), second);
        assert_ne!(first, second);
    }

    #[test]
    fn test_negative_phase_steps() {
        let mut noise = SampleAndHoldNoise::new(7);
        let a = noise.sample(-0.1);
        assert_eq!(noise.sample(-0.2), a);
        assert_ne!(noise.sample(-0.4), a);
    }
}
