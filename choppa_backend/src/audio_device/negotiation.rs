//! Picks a stream configuration the device accepts and the engine can feed.
//!
//! The engine renders mono at a fixed 48 kHz, so the sample rate is not
//! negotiable. Channel count and sample format follow the device; the
//! period size is clamped into the device's buffer range.

use std::fmt;

use choppa_core::SAMPLE_RATE;
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig};
use thiserror::Error;

use crate::audio_device::enumeration::OutputDeviceInfo;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NegotiationError {
    #[error("sample rate {requested} Hz not supported, device offers {available:?}")]
    SampleRateNotSupported {
        requested: u32,
        available: Vec<(u32, u32)>,
    },
    #[error("channel count {requested} not supported, device offers {available:?}")]
    ChannelsNotSupported { requested: u16, available: Vec<u16> },
    #[error("no usable sample format among {0:?}")]
    NoUsableFormat(Vec<SampleFormat>),
}

pub type NegotiationResult<T> = Result<T, NegotiationError>;

/// Formats the output stage can convert to, best first.
pub const SUPPORTED_FORMATS: [SampleFormat; 7] = [
    SampleFormat::F32,
    SampleFormat::I16,
    SampleFormat::I32,
    SampleFormat::U16,
    SampleFormat::F64,
    SampleFormat::I8,
    SampleFormat::U8,
];

#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    /// Device default when `None`.
    pub channels: Option<u16>,
    /// Frames per period wanted by the engine.
    pub period_size: u32,
    /// Ask the device for exactly `period_size` frames per callback.
    pub fixed_period: bool,
}

impl StreamRequest {
    pub fn new(period_size: u32) -> Self {
        Self {
            channels: None,
            period_size,
            fixed_period: true,
        }
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_fixed_period(mut self, fixed: bool) -> Self {
        self.fixed_period = fixed;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NegotiatedConfig {
    pub channels: u16,
    pub sample_format: SampleFormat,
    /// Period size the engine should render.
    pub period_size: u32,
    pub stream_config: StreamConfig,
    pub period_matched: bool,
}

impl NegotiatedConfig {
    pub fn latency_ms(&self) -> f32 {
        self.period_size as f32 / SAMPLE_RATE as f32 * 1000.0
    }
}

impl fmt::Display for NegotiatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}ch @ {}Hz, period {} ({:.1} ms), {:?}",
            self.channels,
            SAMPLE_RATE,
            self.period_size,
            self.latency_ms(),
            self.sample_format
        )
    }
}

pub fn negotiate(
    device: &OutputDeviceInfo,
    request: &StreamRequest,
) -> NegotiationResult<NegotiatedConfig> {
    if !device.supports_sample_rate(SAMPLE_RATE) {
        return Err(NegotiationError::SampleRateNotSupported {
            requested: SAMPLE_RATE,
            available: device.sample_rate_ranges.clone(),
        });
    }

    let channels = negotiate_channels(device, request)?;
    let sample_format = negotiate_sample_format(device)?;
    let period_size = negotiate_period_size(device, request.period_size.max(1));
    let buffer_size = if request.fixed_period {
        BufferSize::Fixed(period_size)
    } else {
        BufferSize::Default
    };

    Ok(NegotiatedConfig {
        channels,
        sample_format,
        period_size,
        stream_config: StreamConfig {
            channels,
            sample_rate: SampleRate(SAMPLE_RATE),
            buffer_size,
        },
        period_matched: period_size == request.period_size,
    })
}

fn negotiate_channels(device: &OutputDeviceInfo, request: &StreamRequest) -> NegotiationResult<u16> {
    match request.channels {
        None => Ok(device.default_channels.max(1)),
        Some(requested) if device.supported_channels.contains(&requested) => Ok(requested),
        Some(requested) => Err(NegotiationError::ChannelsNotSupported {
            requested,
            available: device.supported_channels.clone(),
        }),
    }
}

fn negotiate_sample_format(device: &OutputDeviceInfo) -> NegotiationResult<SampleFormat> {
    let usable = |format: &SampleFormat| SUPPORTED_FORMATS.contains(format);

    if usable(&device.default_sample_format) {
        return Ok(device.default_sample_format);
    }
    SUPPORTED_FORMATS
        .iter()
        .find(|format| device.supported_sample_formats.contains(format))
        .copied()
        .ok_or_else(|| NegotiationError::NoUsableFormat(device.supported_sample_formats.clone()))
}

fn negotiate_period_size(device: &OutputDeviceInfo, requested: u32) -> u32 {
    match device.buffer_size_range {
        Some((min, max)) if min <= max => requested.clamp(min.max(1), max.max(1)),
        _ => requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> OutputDeviceInfo {
        OutputDeviceInfo {
            name: "Test Output".to_string(),
            host_id: cpal::default_host().id(),
            is_default: true,
            sample_rate_ranges: vec![(44_100, 48_000)],
            default_sample_rate: 48_000,
            supported_channels: vec![1, 2],
            default_channels: 2,
            supported_sample_formats: vec![SampleFormat::F32, SampleFormat::I16],
            default_sample_format: SampleFormat::F32,
            buffer_size_range: Some((64, 1024)),
        }
    }

    #[test]
    fn test_defaults() {
        let config = negotiate(&device(), &StreamRequest::new(256)).unwrap();
        assert_eq!(config.channels, 2);
        assert_eq!(config.sample_format, SampleFormat::F32);
        assert_eq!(config.period_size, 256);
        assert!(config.period_matched);
        assert_eq!(config.stream_config.sample_rate, SampleRate(48_000));
        assert_eq!(config.stream_config.buffer_size, BufferSize::Fixed(256));
    }

    #[test]
    fn test_period_clamped_to_device_range() {
        let config = negotiate(&device(), &StreamRequest::new(16)).unwrap();
        assert_eq!(config.period_size, 64);
        assert!(!config.period_matched);

        let config = negotiate(&device(), &StreamRequest::new(4096).with_fixed_period(false)).unwrap();
        assert_eq!(config.period_size, 1024);
        assert_eq!(config.stream_config.buffer_size, BufferSize::Default);
    }

    #[test]
    fn test_rejects_wrong_sample_rate() {
        let mut device = device();
        device.sample_rate_ranges = vec![(44_100, 44_100)];
        let err = negotiate(&device, &StreamRequest::new(256)).unwrap_err();
        assert!(matches!(err, NegotiationError::SampleRateNotSupported { requested: 48_000, .. }));
    }

    #[test]
    fn test_channels() {
        let config = negotiate(&device(), &StreamRequest::new(256).with_channels(1)).unwrap();
        assert_eq!(config.channels, 1);

        let err = negotiate(&device(), &StreamRequest::new(256).with_channels(6)).unwrap_err();
        assert!(matches!(err, NegotiationError::ChannelsNotSupported { requested: 6, .. }));
    }

    #[test]
    fn test_format_fallback() {
        let mut device = device();
        device.default_sample_format = SampleFormat::U32;
        device.supported_sample_formats = vec![SampleFormat::U32, SampleFormat::I16];
        let config = negotiate(&device, &StreamRequest::new(256)).unwrap();
        assert_eq!(config.sample_format, SampleFormat::I16);

        device.supported_sample_formats = vec![SampleFormat::U32];
        assert!(matches!(
            negotiate(&device, &StreamRequest::new(256)),
            Err(NegotiationError::NoUsableFormat(_))
        ));
    }

    #[test]
    fn test_unknown_buffer_range_keeps_request() {
        let mut device = device();
        device.buffer_size_range = None;
        let config = negotiate(&device, &StreamRequest::new(240)).unwrap();
        assert_eq!(config.period_size, 240);
    }
}
