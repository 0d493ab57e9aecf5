//! Data model for the chiptune engine: sound descriptors, the sound
//! bank they live in, and engine configuration.

pub mod bank;
pub mod config;
pub mod error;
pub mod sound;

pub use bank::{SoundBank, SoundBankBuilder, Track};
pub use config::EngineConfig;
pub use error::{CoreError, CoreResult};
pub use sound::{
    Adsr, AdsrSeconds, SAMPLE_RATE, Sound, SoundId, TrackId, Vibrato, Waveform, seconds_to_samples,
};
