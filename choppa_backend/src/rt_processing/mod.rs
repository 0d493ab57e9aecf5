pub mod callback;
pub mod channel;
pub mod command;
pub mod engine;
pub mod limiter;
pub mod mixer;
pub mod performance;
pub mod waveform;
