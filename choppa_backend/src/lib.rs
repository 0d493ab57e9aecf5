//! Real-time chiptune synthesis: the engine that turns sound chains and
//! effect requests into a limited PCM stream, the handle that controls it,
//! and the cpal plumbing that plays it.

pub mod audio_device;
pub mod control;
pub mod rt_processing;

pub use audio_device::output::{AudioOutput, OutputError};
pub use control::{FxParams, SoundControl};
pub use rt_processing::command::{COMMAND_QUEUE_CAPACITY, Command, QueueFull};
pub use rt_processing::engine::AudioEngine;
pub use rt_processing::performance::{PerformanceMonitor, PerformanceSnapshot};
