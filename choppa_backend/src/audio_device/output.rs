//! Drives an [`AudioEngine`] from a cpal output stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use choppa_core::SAMPLE_RATE;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample, StreamConfig};
use dasp::sample::FromSample;
use thiserror::Error;
use tracing::{error, info, warn};

use super::enumeration::{self, EnumError, OutputDeviceInfo};
use super::negotiation::{self, NegotiatedConfig, NegotiationError, StreamRequest};
use crate::rt_processing::callback::EngineSlot;
use crate::rt_processing::engine::AudioEngine;
use crate::rt_processing::performance::{PerformanceMonitor, PerformanceSnapshot};

/// Smoothing of the refill-time average.
const MONITOR_EMA_ALPHA: f64 = 0.1;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error(transparent)]
    Device(#[from] EnumError),
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
    #[error("unsupported sample format {0:?}")]
    UnsupportedFormat(SampleFormat),
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("failed to pause output stream: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),
}

pub type OutputResult<T> = Result<T, OutputError>;

/// A running output stream. Dropping it stops playback.
pub struct AudioOutput {
    stream: cpal::Stream,
    device: OutputDeviceInfo,
    config: NegotiatedConfig,
    engine: Arc<spin::Mutex<AudioEngine>>,
    monitor: Arc<PerformanceMonitor>,
    sample_clock: Arc<AtomicU64>,
}

impl AudioOutput {
    /// Open the default output device, or the one matching `device_name`.
    pub fn open(engine: AudioEngine, device_name: Option<&str>) -> OutputResult<Self> {
        let (device, info) = match device_name {
            Some(name) => enumeration::find_output_device(name)?,
            None => enumeration::default_output_device()?,
        };
        Self::open_device(engine, &device, info)
    }

    /// Negotiate with `device`, resize the engine's period to match and
    /// start the stream.
    pub fn open_device(
        mut engine: AudioEngine,
        device: &cpal::Device,
        info: OutputDeviceInfo,
    ) -> OutputResult<Self> {
        let request = StreamRequest::new(u32::try_from(engine.period_size()).unwrap_or(u32::MAX));
        let config = negotiation::negotiate(&info, &request)?;
        if !config.period_matched {
            warn!(
                requested = engine.period_size(),
                negotiated = config.period_size,
                "device does not support requested period size"
            );
        }
        engine.set_period_size(config.period_size as usize);

        let monitor = Arc::new(PerformanceMonitor::new(engine.period_size(), MONITOR_EMA_ALPHA));
        let slot = EngineSlot::new(engine, Arc::clone(&monitor));
        let handle = slot.engine_handle();
        let sample_clock = slot.sample_clock();

        let stream = match config.sample_format {
            SampleFormat::F32 => build_stream::<f32>(device, &config.stream_config, slot)?,
            SampleFormat::F64 => build_stream::<f64>(device, &config.stream_config, slot)?,
            SampleFormat::I8 => build_stream::<i8>(device, &config.stream_config, slot)?,
            SampleFormat::I16 => build_stream::<i16>(device, &config.stream_config, slot)?,
            SampleFormat::I32 => build_stream::<i32>(device, &config.stream_config, slot)?,
            SampleFormat::U8 => build_stream::<u8>(device, &config.stream_config, slot)?,
            SampleFormat::U16 => build_stream::<u16>(device, &config.stream_config, slot)?,
            other => return Err(OutputError::UnsupportedFormat(other)),
        };
        stream.play()?;

        info!(device = %info, config = %config, "audio output started");

        Ok(Self {
            stream,
            device: info,
            config,
            engine: handle,
            monitor,
            sample_clock,
        })
    }

    pub fn device(&self) -> &OutputDeviceInfo {
        &self.device
    }

    pub fn config(&self) -> &NegotiatedConfig {
        &self.config
    }

    /// Inspect the engine. The device hears silence while `f` runs.
    pub fn with_engine<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AudioEngine) -> R,
    {
        let guard = self.engine.lock();
        f(&guard)
    }

    pub fn performance(&self, reset_peaks: bool) -> PerformanceSnapshot {
        self.monitor.snapshot(reset_peaks)
    }

    /// Audio delivered to the device so far.
    pub fn playback_time(&self) -> Duration {
        Duration::from_secs_f64(self.sample_clock.load(Ordering::Relaxed) as f64 / SAMPLE_RATE as f64)
    }

    pub fn pause(&self) -> OutputResult<()> {
        self.stream.pause()?;
        Ok(())
    }

    pub fn resume(&self) -> OutputResult<()> {
        self.stream.play()?;
        Ok(())
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut slot: EngineSlot,
) -> OutputResult<cpal::Stream>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let channels = config.channels as usize;
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            slot.render(data, channels);
        },
        |err| error!(%err, "audio output stream error"),
        None,
    )?;
    Ok(stream)
}
