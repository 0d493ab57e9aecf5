//! Realtime entry point for device callbacks.
//!
//! The engine lives behind a `spin::Mutex` so the control thread can
//! inspect it. The audio thread only ever `try_lock`s; when the lock is
//! held it plays a period of silence instead of waiting.
//!
//! Device callbacks rarely ask for exactly one period, so the slot keeps
//! the current period and a read cursor across calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dasp::sample::FromSample;
use spin::Mutex;

use super::engine::AudioEngine;
use super::performance::PerformanceMonitor;

pub struct EngineSlot {
    engine: Arc<Mutex<AudioEngine>>,
    monitor: Arc<PerformanceMonitor>,
    /// Frames written to the device.
    sample_clock: Arc<AtomicU64>,
    pending: Vec<f32>,
    cursor: usize,
    period_size: usize,
}

impl EngineSlot {
    /// The engine's period size is fixed from here on.
    pub fn new(engine: AudioEngine, monitor: Arc<PerformanceMonitor>) -> Self {
        let period_size = engine.period_size();
        Self {
            engine: Arc::new(Mutex::new(engine)),
            monitor,
            sample_clock: Arc::new(AtomicU64::new(0)),
            pending: Vec::with_capacity(period_size),
            cursor: 0,
            period_size,
        }
    }

    /// Shared handle for inspection from other threads. Holding the lock
    /// silences the output.
    pub fn engine_handle(&self) -> Arc<Mutex<AudioEngine>> {
        Arc::clone(&self.engine)
    }

    /// Spins until the engine is free.
    pub fn with_engine<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut AudioEngine) -> R,
    {
        let mut guard = self.engine.lock();
        f(&mut guard)
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    /// Shared frame counter, readable after the slot moves into a stream.
    pub fn sample_clock(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.sample_clock)
    }

    pub fn frame_count(&self) -> u64 {
        self.sample_clock.load(Ordering::Relaxed)
    }

    /// Fill an interleaved device buffer, writing the same sample to every
    /// channel of a frame.
    ///
    /// Returns `false` if any period had to be replaced by silence. Does
    /// not allocate.
    pub fn render<T>(&mut self, output: &mut [T], channels: usize) -> bool
    where
        T: Copy + FromSample<f32>,
    {
        let channels = channels.max(1);
        let mut complete = true;

        for frame in output.chunks_mut(channels) {
            if self.cursor >= self.pending.len() {
                complete &= self.refill();
            }
            let sample = self.pending.get(self.cursor).copied().unwrap_or(0.0);
            self.cursor += 1;
            frame.fill(T::from_sample_(sample));
        }

        let frames = output.len().div_ceil(channels) as u64;
        self.sample_clock.fetch_add(frames, Ordering::Relaxed);
        self.monitor.add_samples_rendered(frames);
        complete
    }

    fn refill(&mut self) -> bool {
        let _timing = self.monitor.scoped_refill();
        self.cursor = 0;
        self.pending.clear();

        match self.engine.try_lock() {
            Some(mut engine) => {
                let buffer = engine.next_playable_buffer();
                let len = buffer.len().min(self.period_size);
                self.pending.extend_from_slice(&buffer[..len]);
                true
            }
            None => {
                self.monitor.increment_silent_refills();
                self.pending.resize(self.period_size, 0.0);
                false
            }
        }
    }
}
