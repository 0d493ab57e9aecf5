use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use choppa_core::SAMPLE_RATE;
use quanta::{Clock, Instant as QuantaInstant};

/// Point-in-time copy of the refill statistics. Built off the audio thread.
#[derive(Debug, Clone)]
pub struct PerformanceSnapshot {
    /// Samples handed to the device since creation or the last reset.
    pub samples_rendered: u64,
    /// Periods pulled from the engine.
    pub refill_count: u64,
    /// Periods replaced by silence because the engine was busy.
    pub silent_refills: u64,
    pub min_refill_nanos: Option<u64>,
    pub max_refill_nanos: Option<u64>,
    /// Exponential moving average of the refill time.
    pub ema_refill_nanos: f64,
    /// Wall time one period represents.
    pub period_nanos: f64,
    /// `ema_refill_nanos` as a share of `period_nanos`.
    pub load_percent: f64,
    pub timestamp: Instant,
}

/// Realtime-safe refill timing.
///
/// The audio thread only touches atomics, through [`PerformanceMonitor::scoped_refill`]
/// and the counters. [`PerformanceMonitor::snapshot`] is for the control thread.
pub struct PerformanceMonitor {
    clock: Clock,
    period_size: usize,

    samples_rendered: AtomicU64,
    refill_count: AtomicU64,
    silent_refills: AtomicU64,

    min_refill_nanos: AtomicU64,
    max_refill_nanos: AtomicU64,
    /// f64 bits.
    ema_refill_bits: AtomicU64,
    ema_alpha: f64,
}

impl PerformanceMonitor {
    /// `ema_alpha` is clamped into (0, 1]; around 0.1 smooths well.
    pub fn new(period_size: usize, ema_alpha: f64) -> Self {
        Self {
            clock: Clock::new(),
            period_size,
            samples_rendered: AtomicU64::new(0),
            refill_count: AtomicU64::new(0),
            silent_refills: AtomicU64::new(0),
            min_refill_nanos: AtomicU64::new(u64::MAX),
            max_refill_nanos: AtomicU64::new(0),
            ema_refill_bits: AtomicU64::new(0),
            ema_alpha: ema_alpha.clamp(f64::EPSILON, 1.0),
        }
    }

    #[inline(always)]
    pub fn add_samples_rendered(&self, n: u64) {
        self.samples_rendered.fetch_add(n, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn increment_silent_refills(&self) {
        self.silent_refills.fetch_add(1, Ordering::Relaxed);
    }

    /// Updates min, max and the moving average.
    #[inline(always)]
    pub fn record_refill_nanos(&self, nanos: u64) {
        self.min_refill_nanos.fetch_min(nanos, Ordering::Relaxed);
        self.max_refill_nanos.fetch_max(nanos, Ordering::Relaxed);

        let alpha = self.ema_alpha;
        let mut old_bits = self.ema_refill_bits.load(Ordering::Relaxed);
        loop {
            let old = f64::from_bits(old_bits);
            let new = alpha * nanos as f64 + (1.0 - alpha) * old;
            match self.ema_refill_bits.compare_exchange_weak(
                old_bits,
                new.to_bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(found) => old_bits = found,
            }
        }
    }

    pub fn record_refill(&self, elapsed: Duration) {
        self.record_refill_nanos(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX));
    }

    /// Counts a refill and records its duration when the guard drops.
    #[inline(always)]
    pub fn scoped_refill(&self) -> RefillGuard<'_> {
        self.refill_count.fetch_add(1, Ordering::Relaxed);
        RefillGuard {
            monitor: self,
            start: self.clock.now(),
        }
    }

    /// Not realtime safe. `reset_peaks` restarts min, max and the average.
    pub fn snapshot(&self, reset_peaks: bool) -> PerformanceSnapshot {
        let min_raw = self.min_refill_nanos.load(Ordering::Relaxed);
        let max_raw = self.max_refill_nanos.load(Ordering::Relaxed);
        let ema = f64::from_bits(self.ema_refill_bits.load(Ordering::Relaxed));
        let period_nanos = self.period_size as f64 / SAMPLE_RATE as f64 * 1_000_000_000.0;
        let load_percent = if period_nanos > 0.0 {
            ema / period_nanos * 100.0
        } else {
            0.0
        };

        if reset_peaks {
            self.min_refill_nanos.store(u64::MAX, Ordering::Relaxed);
            self.max_refill_nanos.store(0, Ordering::Relaxed);
            self.ema_refill_bits.store(0, Ordering::Relaxed);
        }

        PerformanceSnapshot {
            samples_rendered: self.samples_rendered.load(Ordering::Relaxed),
            refill_count: self.refill_count.load(Ordering::Relaxed),
            silent_refills: self.silent_refills.load(Ordering::Relaxed),
            min_refill_nanos: (min_raw != u64::MAX).then_some(min_raw),
            max_refill_nanos: (max_raw != 0).then_some(max_raw),
            ema_refill_nanos: ema,
            period_nanos,
            load_percent,
            timestamp: Instant::now(),
        }
    }

    pub fn reset_all(&self) {
        self.samples_rendered.store(0, Ordering::Relaxed);
        self.refill_count.store(0, Ordering::Relaxed);
        self.silent_refills.store(0, Ordering::Relaxed);
        self.min_refill_nanos.store(u64::MAX, Ordering::Relaxed);
        self.max_refill_nanos.store(0, Ordering::Relaxed);
        self.ema_refill_bits.store(0, Ordering::Relaxed);
    }
}

/// Records the elapsed time of one refill on drop.
pub struct RefillGuard<'a> {
    monitor: &'a PerformanceMonitor,
    start: QuantaInstant,
}

impl Drop for RefillGuard<'_> {
    fn drop(&mut self) {
        let elapsed = self.monitor.clock.now().saturating_duration_since(self.start);
        self.monitor.record_refill(elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_min_max_and_average() {
        let monitor = PerformanceMonitor::new(256, 0.5);
        monitor.record_refill_nanos(1_000);
        monitor.record_refill_nanos(3_000);

        let snapshot = monitor.snapshot(false);
        assert_eq!(snapshot.min_refill_nanos, Some(1_000));
        assert_eq!(snapshot.max_refill_nanos, Some(3_000));
        // 0.5 * 3000 + 0.5 * (0.5 * 1000)
        assert!((snapshot.ema_refill_nanos - 1_750.0).abs() < 1e-9);
        assert!((snapshot.period_nanos - 256.0 / 48_000.0 * 1e9).abs() < 1e-3);
    }

    #[test]
    fn test_scoped_refill_counts() {
        let monitor = PerformanceMonitor::new(256, 0.1);
        {
            let _guard = monitor.scoped_refill();
        }
        monitor.increment_silent_refills();
        monitor.add_samples_rendered(512);

        let snapshot = monitor.snapshot(true);
        assert_eq!(snapshot.refill_count, 1);
        assert_eq!(snapshot.silent_refills, 1);
        assert_eq!(snapshot.samples_rendered, 512);
        assert!(snapshot.min_refill_nanos.is_some());

        let after = monitor.snapshot(false);
        assert_eq!(after.min_refill_nanos, None);
        assert_eq!(after.refill_count, 1);
    }

    #[test]
    fn test_reset_all() {
        let monitor = PerformanceMonitor::new(128, 0.1);
        monitor.add_samples_rendered(10);
        monitor.record_refill_nanos(5);
        monitor.reset_all();
        let snapshot = monitor.snapshot(false);
        assert_eq!(snapshot.samples_rendered, 0);
        assert_eq!(snapshot.max_refill_nanos, None);
        assert_eq!(snapshot.ema_refill_nanos, 0.0);
    }
}
