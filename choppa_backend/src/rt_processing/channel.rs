//! Playback slots.
//!
//! The pool is split into two index ranges: music channels first, then
//! effect channels. A channel whose sound has no waveform is free; one
//! holding a preparing sound is reserved and silent until the prepared
//! group is released.

use std::ops::Range;

use choppa_core::{EngineConfig, Sound, SoundBank, SoundId, TrackId};
use tracing::{debug, trace, warn};

use super::waveform::envelopes::{AdsrEnvelope, EnvelopeState};
use super::waveform::oscillators::Oscillator;

/// One playback slot.
#[derive(Debug, Clone)]
pub struct Channel {
    sound: Sound,
    sound_id: Option<SoundId>,
    t: u32,
    oscillator: Oscillator,
    envelope: AdsrEnvelope,
    prepared: Option<(Sound, Option<SoundId>)>,
}

impl Channel {
    pub fn new(noise_seed: u32) -> Self {
        Self {
            sound: Sound::NONE,
            sound_id: None,
            t: 0,
            oscillator: Oscillator::new(noise_seed),
            envelope: AdsrEnvelope::default(),
            prepared: None,
        }
    }

    pub fn sound(&self) -> &Sound {
        &self.sound
    }

    /// Bank entry being played, if the sound came from the bank.
    pub fn sound_id(&self) -> Option<SoundId> {
        self.sound_id
    }

    /// Samples elapsed within the current sound.
    pub fn t(&self) -> u32 {
        self.t
    }

    /// Oscillator phase in turns.
    pub fn phase(&self) -> f64 {
        self.oscillator.phase()
    }

    pub fn vibrato_phase(&self) -> f64 {
        self.oscillator.vibrato_phase()
    }

    pub fn envelope_state(&self) -> EnvelopeState {
        self.envelope.state()
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.sound.is_free()
    }

    #[inline]
    pub fn is_preparing(&self) -> bool {
        self.sound.is_preparing()
    }

    /// Allocate the channel to a new sound, starting from phase zero.
    pub fn start(&mut self, sound: Sound, sound_id: Option<SoundId>) {
        self.oscillator.reset();
        self.load(sound, sound_id);
        self.prepared = None;
    }

    /// Reserve the channel, holding `sound` until [`Channel::release_prepared`].
    pub fn prepare(&mut self, sound: Sound, sound_id: Option<SoundId>) {
        self.start(Sound::preparing(), None);
        self.prepared = Some((sound, sound_id));
    }

    /// Swap a reserved channel over to its held sound. No-op otherwise.
    pub fn release_prepared(&mut self) {
        if !self.is_preparing() {
            return;
        }
        match self.prepared.take() {
            Some((sound, sound_id)) => self.start(sound, sound_id),
            None => self.free(),
        }
    }

    pub fn free(&mut self) {
        self.sound = Sound::NONE;
        self.sound_id = None;
        self.t = 0;
        self.prepared = None;
    }

    /// Set a sound without touching the oscillator phase.
    fn load(&mut self, sound: Sound, sound_id: Option<SoundId>) {
        self.sound = sound;
        self.sound_id = sound_id;
        self.t = 0;
        self.envelope.trigger(sound.adsr, sound.duration);
    }

    /// Render one sample and advance time, following the chain when the
    /// current sound runs out.
    #[inline]
    pub fn tick(&mut self, bank: &SoundBank, headroom: f32) -> f32 {
        if self.is_free() || self.is_preparing() {
            return 0.0;
        }
        if self.t >= self.sound.duration {
            self.advance(bank);
            if self.is_free() {
                return 0.0;
            }
        }

        let raw = self.oscillator.next_sample(&self.sound, self.t);
        let level = self.envelope.level(self.t);

        self.t += 1;
        if self.t >= self.sound.duration {
            self.advance(bank);
        }

        raw * headroom * level
    }

    /// Move to the next sound in the chain, or free the channel.
    ///
    /// Phase carries over so consecutive notes join without a jump.
    /// Zero-length links are skipped; a cycle made only of them frees
    /// the channel.
    fn advance(&mut self, bank: &SoundBank) {
        for _ in 0..=bank.len() {
            let Some(next) = bank.successor(&self.sound, self.sound_id) else {
                self.free();
                return;
            };
            let Some(sound) = bank.sound(next).copied() else {
                trace!(%next, "dangling chain link, freeing channel");
                self.free();
                return;
            };

            self.load(sound, Some(next));
            if sound.duration > 0 {
                return;
            }
        }
        self.free();
    }
}

/// Fixed set of channels, music range first.
#[derive(Debug, Clone)]
pub struct ChannelPool {
    channels: Vec<Channel>,
    music_count: usize,
    prepared_ready: bool,
}

impl ChannelPool {
    pub fn new(config: &EngineConfig) -> Self {
        let channels = (0..config.total_channels())
            .map(|i| Channel::new(config.noise_seed.wrapping_add((i as u32).wrapping_mul(0x9E37_79B9))))
            .collect();

        Self {
            channels,
            music_count: config.music_channels,
            prepared_ready: false,
        }
    }

    pub fn music_range(&self) -> Range<usize> {
        0..self.music_count
    }

    pub fn fx_range(&self) -> Range<usize> {
        self.music_count..self.channels.len()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub(crate) fn music_channels_mut(&mut self) -> &mut [Channel] {
        let range = self.music_range();
        &mut self.channels[range]
    }

    pub(crate) fn fx_channels_mut(&mut self) -> &mut [Channel] {
        let range = self.fx_range();
        &mut self.channels[range]
    }

    /// First free effect channel, in index order.
    pub fn select_fx_channel(&self) -> Option<usize> {
        self.fx_range().find(|&i| self.channels[i].is_free())
    }

    /// Start an effect on a free channel. Dropped silently when none is free.
    pub fn play_fx(&mut self, sound: Sound, sound_id: Option<SoundId>) -> Option<usize> {
        let Some(index) = self.select_fx_channel() else {
            trace!("no free fx channel, dropping sound");
            return None;
        };
        self.channels[index].start(sound, sound_id);
        Some(index)
    }

    /// Reserve a free effect channel for `sound`. Dropped silently when
    /// none is free.
    pub fn prepare_fx(&mut self, sound: Sound, sound_id: Option<SoundId>) -> Option<usize> {
        let Some(index) = self.select_fx_channel() else {
            trace!("no free fx channel, dropping prepared sound");
            return None;
        };
        self.channels[index].prepare(sound, sound_id);
        Some(index)
    }

    /// Release every reserved channel at the start of the next generation pass.
    pub fn mark_prepared_ready(&mut self) {
        self.prepared_ready = true;
    }

    pub fn prepared_ready(&self) -> bool {
        self.prepared_ready
    }

    /// Start all reserved channels together if a release is pending.
    pub fn release_prepared(&mut self) {
        if !std::mem::take(&mut self.prepared_ready) {
            return;
        }
        let mut released = 0;
        for channel in self.fx_channels_mut() {
            if channel.is_preparing() {
                channel.release_prepared();
                released += 1;
            }
        }
        debug!(released, "released prepared sounds");
    }

    pub fn stop_fx(&mut self) {
        for channel in self.fx_channels_mut() {
            channel.free();
        }
        self.prepared_ready = false;
    }

    /// Claim the music channels for `track`. `None` silences music.
    ///
    /// Every music channel is freed first; a free channel renders exactly
    /// like a silence sound but costs nothing to skip. Channels beyond the
    /// track's heads stay free, and tracks with more channels than the
    /// pool has are truncated.
    pub fn load_track(&mut self, bank: &SoundBank, track: Option<TrackId>) {
        for channel in self.music_channels_mut() {
            channel.free();
        }

        let Some(track_id) = track else {
            return;
        };
        let Some(track) = bank.track(track_id) else {
            warn!(%track_id, "unknown track, music silenced");
            return;
        };

        if track.channel_count() > self.music_count {
            warn!(
                %track_id,
                track_channels = track.channel_count(),
                music_channels = self.music_count,
                "track has more channels than available, truncating"
            );
        }

        for (channel, &head) in self.music_channels_mut().iter_mut().zip(track.heads()) {
            match bank.sound(head) {
                Some(sound) => channel.start(*sound, Some(head)),
                None => warn!(%track_id, %head, "track head missing from bank"),
            }
        }
    }

    pub fn active_fx_count(&self) -> usize {
        self.channels[self.fx_range()].iter().filter(|c| !c.is_free()).count()
    }

    pub fn active_music_count(&self) -> usize {
        self.channels[self.music_range()].iter().filter(|c| !c.is_free()).count()
    }
}
