//! Per-channel signal generation.

pub mod envelopes;
pub mod noise;
pub mod oscillators;
pub mod tables;
