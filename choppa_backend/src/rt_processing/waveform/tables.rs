use std::f32::consts::PI;
use std::sync::OnceLock;

// Power of 2 for fast masking
const SINE_TABLE_SIZE: usize = 8192;
const SINE_TABLE_MASK: usize = SINE_TABLE_SIZE - 1;

static SINE_TABLE: OnceLock<Vec<f32>> = OnceLock::new();

/// Initialize the lookup tables. Call before the audio thread starts so
/// the first callback doesn't pay for it.
pub fn init_tables() {
    let _ = get_sine_table();
}

/// One full sine cycle over `SINE_TABLE_SIZE` entries.
pub fn get_sine_table() -> &'static [f32] {
    SINE_TABLE.get_or_init(|| {
        (0..SINE_TABLE_SIZE)
            .map(|i| (2.0 * PI * i as f32 / SINE_TABLE_SIZE as f32).sin())
            .collect()
    })
}

/// Sine of an angle measured in turns (1.0 = full cycle).
#[inline]
pub fn sin_turns(turns: f32) -> f32 {
    interpolated_lookup(get_sine_table(), normalize_phase(turns))
}

/// Linear-interpolated table lookup. Phase should be normalized to [0.0, 1.0).
#[inline]
pub fn interpolated_lookup(table: &[f32], phase: f32) -> f32 {
    let scaled_phase = phase * SINE_TABLE_SIZE as f32;
    let index = scaled_phase as usize & SINE_TABLE_MASK;
    let frac = scaled_phase - (scaled_phase as usize as f32);

    let sample1 = table[index];
    let sample2 = table[(index + 1) & SINE_TABLE_MASK];

    sample1 + frac * (sample2 - sample1)
}

/// Normalize phase to [0.0, 1.0).
#[inline]
pub fn normalize_phase(phase: f32) -> f32 {
    phase - phase.floor()
}

/// Fractional part of a long-running phase accumulator, always in [0, 1).
#[inline]
pub fn frac(phase: f64) -> f64 {
    phase - phase.floor()
}

/// Phase increment in turns per sample.
#[inline]
pub fn phase_increment(frequency: f32, sample_rate: f32) -> f32 {
    frequency / sample_rate
}

/// PolyBLEP residual for a unit step at phase 0.
///
/// `t` is the phase in [0, 1), `dt` the per-sample increment. Returns a
/// correction that is non-zero only within one sample of the wrap. Falling
/// discontinuities subtract it, rising ones add it.
#[inline]
pub fn poly_blep(t: f32, dt: f32) -> f32 {
    let dt = dt.abs();
    if dt <= 0.0 || dt >= 0.5 {
        return 0.0;
    }

    if t < dt {
        let x = t / dt;
        x + x - x * x - 1.0
    } else if t > 1.0 - dt {
        let x = (t - 1.0) / dt;
        x * x + x + x + 1.0
    } else {
        0.0
    }
}
