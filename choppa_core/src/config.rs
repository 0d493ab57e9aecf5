//! Engine configuration.
//!
//! Built in code with the `with_*` methods, or loaded from JSON where
//! every missing field falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Channels reserved for music, claimed wholesale by each new track.
    pub music_channels: usize,
    /// Channels available to sound effects.
    pub fx_channels: usize,
    /// Samples per backend period. Negotiated with the device when an
    /// output is opened; this is the fallback.
    pub period_size: usize,
    /// Fixed attenuation applied to every oscillator before the envelope.
    pub headroom: f32,
    /// Seed for the noise generators.
    pub noise_seed: u32,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_music_channels(mut self, channels: usize) -> Self {
        self.music_channels = channels;
        self
    }

    pub fn with_fx_channels(mut self, channels: usize) -> Self {
        self.fx_channels = channels;
        self
    }

    pub fn with_period_size(mut self, period_size: usize) -> Self {
        self.period_size = period_size;
        self
    }

    pub fn with_headroom(mut self, headroom: f32) -> Self {
        self.headroom = headroom;
        self
    }

    pub fn with_noise_seed(mut self, seed: u32) -> Self {
        self.noise_seed = seed;
        self
    }

    pub fn total_channels(&self) -> usize {
        self.music_channels + self.fx_channels
    }

    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.fx_channels == 0 {
            return Err(CoreError::InvalidConfig("fx_channels must be at least 1".into()));
        }
        if self.period_size == 0 {
            return Err(CoreError::InvalidConfig("period_size must be at least 1".into()));
        }
        if !(self.headroom > 0.0 && self.headroom <= 1.0) {
            return Err(CoreError::InvalidConfig(format!(
                "headroom {} outside (0, 1]",
                self.headroom
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            music_channels: 8,
            fx_channels: 16,
            period_size: 256,
            headroom: 0.8,
            noise_seed: 0x5EED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.fx_channels, 16);
        assert_eq!(config.total_channels(), 24);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "fx_channels": 4, "period_size": 240 }"#).unwrap();
        assert_eq!(config.fx_channels, 4);
        assert_eq!(config.period_size, 240);
        assert_eq!(config.music_channels, 8);
        assert_eq!(config.headroom, 0.8);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig::new().with_music_channels(2).with_headroom(0.5);
        let json = config.to_json_string().unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "fx_channels": 0 }"#),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(EngineConfig::new().with_headroom(1.5).validate().is_err());
        assert!(EngineConfig::new().with_period_size(0).validate().is_err());
        assert!(matches!(
            EngineConfig::from_json_str("{ nope"),
            Err(CoreError::ConfigParse(_))
        ));
    }
}
