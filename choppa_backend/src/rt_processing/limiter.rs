//! Look-ahead peak limiter over a pair of period buffers.
//!
//! One buffer is generated while the other, generated on the previous
//! call, is normalized and handed out. Knowing the peak of the buffer
//! that follows lets the gain ramp start early enough that no sample ever
//! exceeds unity and the gain never jumps between buffers.

use wide::f32x8;

/// Peaks never report below unity so quiet buffers are not amplified.
const MIN_PEAK: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct Limiter {
    buffers: [Vec<f32>; 2],
    peaks: [f32; 2],
    /// Index of the buffer handed out by the current cycle.
    playing: usize,
    level: f32,
}

impl Limiter {
    /// Both buffers start silent, so the first period handed out is silence.
    pub fn new(period_size: usize) -> Self {
        Self {
            buffers: [vec![0.0; period_size], vec![0.0; period_size]],
            peaks: [MIN_PEAK; 2],
            playing: 1,
            level: MIN_PEAK,
        }
    }

    pub fn period_size(&self) -> usize {
        self.buffers[0].len()
    }

    /// Gain divisor reached at the end of the last handed-out buffer.
    pub fn level(&self) -> f32 {
        self.level
    }

    #[inline]
    fn generating(&self) -> usize {
        self.playing ^ 1
    }

    /// Swap roles and return the stale buffer for generation.
    ///
    /// The buffer generated on the previous cycle becomes the one to play.
    pub fn begin_cycle(&mut self) -> &mut [f32] {
        self.playing ^= 1;
        let generating = self.generating();
        &mut self.buffers[generating]
    }

    /// Normalize the buffer about to be played against the peak of the one
    /// just generated, and return it.
    pub fn finish_cycle(&mut self) -> &[f32] {
        let generating = self.generating();
        let playing = self.playing;

        self.peaks[generating] = peak(&self.buffers[generating]).max(MIN_PEAK);
        let target = self.peaks[playing].max(self.peaks[generating]);

        apply_ramp(&mut self.buffers[playing], self.level, target);
        self.level = target;

        &self.buffers[playing]
    }
}

/// Divide each sample by a gain moving linearly from `from` to `to`.
fn apply_ramp(buffer: &mut [f32], from: f32, to: f32) {
    let period = buffer.len().max(1) as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let gain = from + (to - from) * (i as f32 / period);
        *sample /= gain;
    }
}

/// Largest absolute sample value.
pub fn peak(samples: &[f32]) -> f32 {
    let mut chunks = samples.chunks_exact(8);
    let mut acc = f32x8::splat(0.0);
    for chunk in &mut chunks {
        let mut lanes = [0.0f32; 8];
        lanes.copy_from_slice(chunk);
        acc = acc.max(f32x8::from(lanes).abs());
    }

    let simd_peak = acc.to_array().into_iter().fold(0.0f32, f32::max);
    chunks
        .remainder()
        .iter()
        .fold(simd_peak, |peak, s| peak.max(s.abs()))
}
