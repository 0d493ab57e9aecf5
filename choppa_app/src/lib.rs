//! Demo player for the chiptune engine.

pub mod demo;
