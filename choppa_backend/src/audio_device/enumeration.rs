use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{SampleFormat, SupportedBufferSize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EnumError {
    #[error("no audio output devices found")]
    NoDevicesFound,
    #[error("output device not found: {0}")]
    DeviceNotFound(String),
    #[error("device query failed: {0}")]
    QueryFailed(String),
}

pub type EnumResult<T> = Result<T, EnumError>;

/// Capabilities of one output device, reduced to what the engine needs.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDeviceInfo {
    pub name: String,
    pub host_id: cpal::HostId,
    pub is_default: bool,

    /// Inclusive sample-rate ranges, one per supported configuration.
    pub sample_rate_ranges: Vec<(u32, u32)>,
    pub default_sample_rate: u32,

    pub supported_channels: Vec<u16>,
    pub default_channels: u16,

    pub supported_sample_formats: Vec<SampleFormat>,
    pub default_sample_format: SampleFormat,

    /// Period sizes the device accepts, if it reports them.
    pub buffer_size_range: Option<(u32, u32)>,
}

impl OutputDeviceInfo {
    pub fn supports_sample_rate(&self, rate: u32) -> bool {
        self.sample_rate_ranges
            .iter()
            .any(|&(min, max)| (min..=max).contains(&rate))
    }
}

impl fmt::Display for OutputDeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}ch @ {}Hz {:?}{}",
            self.name,
            self.host_id.name(),
            self.default_channels,
            self.default_sample_rate,
            self.default_sample_format,
            if self.is_default { " (default)" } else { "" }
        )
    }
}

/// Output devices of every available host.
pub fn list_output_devices() -> EnumResult<Vec<OutputDeviceInfo>> {
    let mut devices = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(host) => host,
            Err(err) => {
                debug!(host = host_id.name(), %err, "host unavailable");
                continue;
            }
        };

        let default_name = host.default_output_device().and_then(|d| d.name().ok());
        let Ok(outputs) = host.output_devices() else {
            continue;
        };

        for device in outputs {
            let is_default = match (&default_name, device.name()) {
                (Some(default), Ok(name)) => *default == name,
                _ => false,
            };
            match query_output_device(&device, host_id, is_default) {
                Ok(info) => devices.push(info),
                Err(err) => debug!(%err, "skipping output device"),
            }
        }
    }

    if devices.is_empty() {
        return Err(EnumError::NoDevicesFound);
    }
    Ok(devices)
}

/// The default host's default output device.
pub fn default_output_device() -> EnumResult<(cpal::Device, OutputDeviceInfo)> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(EnumError::NoDevicesFound)?;
    let info = query_output_device(&device, host.id(), true)?;
    Ok((device, info))
}

/// Find an output device on the default host by name. Exact matches win
/// over case-insensitive partial ones.
pub fn find_output_device(name: &str) -> EnumResult<(cpal::Device, OutputDeviceInfo)> {
    let host = cpal::default_host();
    let devices: Vec<cpal::Device> = host
        .output_devices()
        .map_err(|e| EnumError::QueryFailed(e.to_string()))?
        .collect();

    let wanted = name.to_lowercase();
    let names: Vec<String> = devices
        .iter()
        .map(|d| d.name().unwrap_or_default().to_lowercase())
        .collect();
    let index = names
        .iter()
        .position(|n| *n == wanted)
        .or_else(|| names.iter().position(|n| n.contains(&wanted)))
        .ok_or_else(|| EnumError::DeviceNotFound(name.to_string()))?;

    let device = devices
        .into_iter()
        .nth(index)
        .ok_or_else(|| EnumError::DeviceNotFound(name.to_string()))?;
    let info = query_output_device(&device, host.id(), false)?;
    Ok((device, info))
}

fn query_output_device(
    device: &cpal::Device,
    host_id: cpal::HostId,
    is_default: bool,
) -> EnumResult<OutputDeviceInfo> {
    let name = device
        .name()
        .map_err(|e| EnumError::QueryFailed(format!("device name: {e}")))?;
    let default_config = device
        .default_output_config()
        .map_err(|e| EnumError::QueryFailed(format!("default config of {name}: {e}")))?;
    let configs = device
        .supported_output_configs()
        .map_err(|e| EnumError::QueryFailed(format!("supported configs of {name}: {e}")))?;

    let mut sample_rate_ranges = Vec::new();
    let mut supported_channels = Vec::new();
    let mut supported_sample_formats = Vec::new();
    let mut buffer_size_range: Option<(u32, u32)> = None;

    for range in configs {
        sample_rate_ranges.push((range.min_sample_rate().0, range.max_sample_rate().0));
        if !supported_channels.contains(&range.channels()) {
            supported_channels.push(range.channels());
        }
        if !supported_sample_formats.contains(&range.sample_format()) {
            supported_sample_formats.push(range.sample_format());
        }
        if let SupportedBufferSize::Range { min, max } = *range.buffer_size() {
            buffer_size_range = Some(match buffer_size_range {
                Some((lo, hi)) => (lo.min(min), hi.max(max)),
                None => (min, max),
            });
        }
    }
    supported_channels.sort_unstable();

    Ok(OutputDeviceInfo {
        name,
        host_id,
        is_default,
        sample_rate_ranges,
        default_sample_rate: default_config.sample_rate().0,
        supported_channels,
        default_channels: default_config.channels(),
        supported_sample_formats,
        default_sample_format: default_config.sample_format(),
        buffer_size_range,
    })
}
