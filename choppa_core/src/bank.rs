//! Arena of sound descriptors and music tracks.
//!
//! Chains are index links (`Sound::next`) into the arena, so a loop is
//! just a link back to an earlier entry.

use crate::error::{CoreError, CoreResult};
use crate::sound::{Sound, SoundId, TrackId};

/// A music track: one chain head per music channel, in channel order.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    heads: Vec<SoundId>,
}

impl Track {
    pub fn heads(&self) -> &[SoundId] {
        &self.heads
    }

    pub fn channel_count(&self) -> usize {
        self.heads.len()
    }
}

/// Read-only table of sounds and tracks shared with the audio thread.
#[derive(Debug, Clone, Default)]
pub struct SoundBank {
    sounds: Vec<Sound>,
    tracks: Vec<Track>,
}

impl SoundBank {
    pub fn builder() -> SoundBankBuilder {
        SoundBankBuilder::default()
    }

    /// An empty bank; ad-hoc effects still work, music does not.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn sound(&self, id: SoundId) -> Option<&Sound> {
        self.sounds.get(id.index())
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Resolves where a channel goes after finishing `current`.
    ///
    /// A missing link or a link back to the same descriptor ends the
    /// chain. `current_id` is `None` for sounds submitted by value; those
    /// are matched against the bank entry they link to, so a copy of a
    /// self-linked entry still terminates.
    pub fn successor(&self, current: &Sound, current_id: Option<SoundId>) -> Option<SoundId> {
        let next = current.next?;
        match current_id {
            Some(id) if id == next => None,
            Some(_) => Some(next),
            None if self.sound(next) == Some(current) => None,
            None => Some(next),
        }
    }

    /// Total samples a chain plays before terminating, or `None` if it
    /// loops forever.
    pub fn chain_duration(&self, head: SoundId) -> Option<u64> {
        let mut visited = vec![false; self.sounds.len()];
        let mut total = 0u64;
        let mut current = Some(head);

        while let Some(id) = current {
            let seen = visited.get_mut(id.index())?;
            if *seen {
                return None;
            }
            *seen = true;

            let sound = self.sound(id)?;
            total += sound.duration as u64;
            current = self.successor(sound, Some(id));
        }

        Some(total)
    }
}

/// Incrementally assembles a [`SoundBank`].
#[derive(Debug, Default)]
pub struct SoundBankBuilder {
    sounds: Vec<Sound>,
    tracks: Vec<Track>,
}

impl SoundBankBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next pushed sound will receive.
    pub fn next_id(&self) -> SoundId {
        SoundId::new(self.sounds.len() as u32)
    }

    /// Adds a single descriptor as-is, keeping its `next` link.
    pub fn push(&mut self, sound: Sound) -> SoundId {
        let id = self.next_id();
        self.sounds.push(sound);
        id
    }

    /// Adds `sounds` linked head to tail. The tail terminates.
    pub fn push_chain(&mut self, sounds: &[Sound]) -> Option<SoundId> {
        self.push_linked(sounds, None)
    }

    /// Adds `sounds` linked head to tail, with the tail jumping back to
    /// `sounds[loop_start]`.
    pub fn push_loop(&mut self, sounds: &[Sound], loop_start: usize) -> Option<SoundId> {
        let loop_start = loop_start.min(sounds.len().saturating_sub(1));
        self.push_linked(sounds, Some(loop_start))
    }

    fn push_linked(&mut self, sounds: &[Sound], loop_start: Option<usize>) -> Option<SoundId> {
        let head = self.next_id();
        let last = sounds.len().checked_sub(1)?;

        for (i, sound) in sounds.iter().enumerate() {
            let next = if i < last {
                Some(SoundId::new(head.raw() + i as u32 + 1))
            } else {
                loop_start.map(|start| SoundId::new(head.raw() + start as u32))
            };
            self.sounds.push(Sound { next, ..*sound });
        }

        Some(head)
    }

    /// Registers a track whose channel `i` starts at `heads[i]`.
    pub fn track(&mut self, heads: &[SoundId]) -> TrackId {
        let id = TrackId::new(self.tracks.len() as u32);
        self.tracks.push(Track {
            heads: heads.to_vec(),
        });
        id
    }

    /// Validates every link and freezes the bank.
    pub fn build(self) -> CoreResult<SoundBank> {
        let count = self.sounds.len();

        for (i, sound) in self.sounds.iter().enumerate() {
            if let Some(next) = sound.next {
                if next.index() >= count {
                    return Err(CoreError::DanglingLink {
                        from: i as u32,
                        to: next.raw(),
                    });
                }
            }
        }

        for (t, track) in self.tracks.iter().enumerate() {
            if track.heads.is_empty() {
                return Err(CoreError::EmptyTrack(t as u32));
            }
            for (channel, head) in track.heads.iter().enumerate() {
                if head.index() >= count {
                    return Err(CoreError::DanglingTrackHead {
                        track: t as u32,
                        channel,
                        head: head.raw(),
                    });
                }
            }
        }

        Ok(SoundBank {
            sounds: self.sounds,
            tracks: self.tracks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::Waveform;

    fn note(frequency: f32, duration: u32) -> Sound {
        Sound::new(Waveform::Pulse, frequency, duration)
    }

    #[test]
    fn test_chain_links_sequentially() {
        let mut builder = SoundBank::builder();
        let head = builder
            .push_chain(&[note(220.0, 100), note(330.0, 200), note(440.0, 300)])
            .unwrap();
        let bank = builder.build().unwrap();

        assert_eq!(bank.len(), 3);
        assert_eq!(bank.sound(head).unwrap().next, Some(SoundId::new(1)));
        assert_eq!(bank.sound(SoundId::new(2)).unwrap().next, None);
        assert_eq!(bank.chain_duration(head), Some(600));
    }

    #[test]
    fn test_loop_links_back() {
        let mut builder = SoundBank::builder();
        builder.push(note(110.0, 10));
        let head = builder
            .push_loop(&[note(220.0, 100), note(330.0, 200), note(440.0, 300)], 1)
            .unwrap();
        let bank = builder.build().unwrap();

        assert_eq!(head, SoundId::new(1));
        assert_eq!(bank.sound(SoundId::new(3)).unwrap().next, Some(SoundId::new(2)));
        assert_eq!(bank.chain_duration(head), None);
    }

    #[test]
    fn test_self_link_terminates() {
        let mut builder = SoundBank::builder();
        let id = builder.next_id();
        builder.push(note(220.0, 50).with_next(id));
        let bank = builder.build().unwrap();

        let stored = *bank.sound(id).unwrap();
        assert_eq!(bank.successor(&stored, Some(id)), None);
        // A by-value copy of the entry terminates as well.
        assert_eq!(bank.successor(&stored, None), None);
        assert_eq!(bank.chain_duration(id), Some(50));
    }

    #[test]
    fn test_by_value_sound_follows_link_to_other_entry() {
        let mut builder = SoundBank::builder();
        let tail_id = builder.next_id();
        builder.push(note(330.0, 40).with_next(tail_id));
        let bank = builder.build().unwrap();

        let lead_in = note(220.0, 20).with_next(tail_id);
        assert_eq!(bank.successor(&lead_in, None), Some(tail_id));
        assert_eq!(bank.successor(&note(220.0, 20), None), None);
    }

    #[test]
    fn test_empty_chain_is_none() {
        let mut builder = SoundBank::builder();
        assert!(builder.push_chain(&[]).is_none());
    }

    #[test]
    fn test_dangling_link_rejected() {
        let mut builder = SoundBank::builder();
        builder.push(note(220.0, 50).with_next(SoundId::new(9)));
        let err = builder.build().unwrap_err();
        assert!(matches!(err, CoreError::DanglingLink { from: 0, to: 9 }));
    }

    #[test]
    fn test_track_validation() {
        let mut builder = SoundBank::builder();
        builder.track(&[SoundId::new(0)]);
        assert!(matches!(
            builder.build(),
            Err(CoreError::DanglingTrackHead { track: 0, channel: 0, head: 0 })
        ));

        let mut builder = SoundBank::builder();
        builder.track(&[]);
        assert!(matches!(builder.build(), Err(CoreError::EmptyTrack(0))));
    }
}
