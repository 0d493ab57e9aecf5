//! Control requests from the game thread to the audio thread.
//!
//! The queue is bounded and lock-free. Pushing never blocks; a full queue
//! rejects the command and counts it instead of overwriting pending work.

use std::sync::atomic::{AtomicU64, Ordering};

use choppa_core::{Sound, SoundId, TrackId};
use crossbeam::queue::ArrayQueue;
use thiserror::Error;

/// Maximum number of commands waiting for the audio thread.
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Free every effect channel, reserved ones included.
    FxStop,
    /// Start an ad-hoc effect.
    FxPlay(Sound),
    /// Start an effect from the bank; its chain is followed by id.
    FxPlayId(SoundId),
    /// Reserve a channel for a sound that starts on `FxPlayPrepared`.
    FxPrepare(Sound),
    /// Reserve a channel for a bank sound; its chain is followed by id.
    FxPrepareId(SoundId),
    /// Start every reserved channel on the same sample.
    FxPlayPrepared,
    FxVolumeSet(f32),
    /// Replace the music. `None` silences the music channels.
    MusicNew(Option<TrackId>),
    MusicPause,
    MusicResume,
    MusicVolumeSet(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("command queue full ({COMMAND_QUEUE_CAPACITY} pending), dropped {command:?}")]
pub struct QueueFull {
    pub command: Command,
}

/// Bounded queue of [`Command`]s.
#[derive(Debug)]
pub struct CommandQueue {
    queue: ArrayQueue<Command>,
    dropped: AtomicU64,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            queue: ArrayQueue::new(COMMAND_QUEUE_CAPACITY),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue without blocking.
    pub fn push(&self, command: Command) -> Result<(), QueueFull> {
        self.queue.push(command).map_err(|command| {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            QueueFull { command }
        })
    }

    pub fn pop(&self) -> Option<Command> {
        self.queue.pop()
    }

    /// Executes the commands that were pending when the call started, in
    /// order. Commands pushed meanwhile wait for the next drain.
    pub fn drain(&self, mut execute: impl FnMut(Command)) -> usize {
        let pending = self.queue.len();
        let mut executed = 0;
        while executed < pending {
            let Some(command) = self.queue.pop() else {
                break;
            };
            execute(command);
            executed += 1;
        }
        executed
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Commands rejected because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fifo_order() {
        let queue = CommandQueue::new();
        queue.push(Command::FxStop).unwrap();
        queue.push(Command::FxVolumeSet(0.5)).unwrap();
        queue.push(Command::MusicPause).unwrap();

        let mut seen = Vec::new();
        assert_eq!(queue.drain(|c| seen.push(c)), 3);
        assert_eq!(
            seen,
            vec![Command::FxStop, Command::FxVolumeSet(0.5), Command::MusicPause]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_is_detected() {
        let queue = CommandQueue::new();
        assert_eq!(queue.capacity(), 256);
        for _ in 0..COMMAND_QUEUE_CAPACITY {
            queue.push(Command::FxPlayPrepared).unwrap();
        }

        let err = queue.push(Command::MusicResume).unwrap_err();
        assert_eq!(err.command, Command::MusicResume);
        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.len(), COMMAND_QUEUE_CAPACITY);

        // Pending work was not corrupted.
        let mut count = 0;
        queue.drain(|c| {
            assert_eq!(c, Command::FxPlayPrepared);
            count += 1;
        });
        assert_eq!(count, COMMAND_QUEUE_CAPACITY);
        queue.push(Command::MusicResume).unwrap();
    }

    #[test]
    fn test_cross_thread_delivery() {
        let queue = Arc::new(CommandQueue::new());
        let producer = Arc::clone(&queue);

        let handle = std::thread::spawn(move || {
            for i in 0..1000 {
                while producer.push(Command::FxVolumeSet(i as f32)).is_err() {
                    std::thread::yield_now();
                }
            }
        });

        let mut received = Vec::new();
        while received.len() < 1000 {
            queue.drain(|c| received.push(c));
        }
        handle.join().unwrap();

        for (i, command) in received.iter().enumerate() {
            assert_eq!(*command, Command::FxVolumeSet(i as f32));
        }
    }
}
