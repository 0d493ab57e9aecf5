//! The audio engine and its per-period refill.
//!
//! Each call to [`AudioEngine::next_playable_buffer`]:
//! 1. executes the commands queued before the call,
//! 2. swaps the roles of the two period buffers,
//! 3. starts any prepared effect group on the first sample,
//! 4. generates one period into the stale buffer,
//! 5. normalizes and returns the buffer generated on the previous call.

use std::sync::Arc;

use choppa_core::{CoreResult, EngineConfig, SoundBank};
use tracing::{debug, info, warn};

use super::channel::{Channel, ChannelPool};
use super::command::Command;
use super::limiter::Limiter;
use super::mixer::Mixer;
use super::waveform::tables::init_tables;
use crate::control::{SharedState, SoundControl};

/// Owns every piece of audio-thread state.
pub struct AudioEngine {
    config: EngineConfig,
    bank: Arc<SoundBank>,
    shared: Arc<SharedState>,
    pool: ChannelPool,
    mixer: Mixer,
    limiter: Limiter,
}

impl AudioEngine {
    /// Build an engine over `bank` and the handle that controls it.
    pub fn new(config: EngineConfig, bank: Arc<SoundBank>) -> CoreResult<(Self, SoundControl)> {
        config.validate()?;
        init_tables();

        let shared = Arc::new(SharedState::new());
        let control = SoundControl::new(Arc::clone(&shared));

        info!(
            music_channels = config.music_channels,
            fx_channels = config.fx_channels,
            period_size = config.period_size,
            sounds = bank.len(),
            tracks = bank.track_count(),
            "audio engine created"
        );

        let engine = Self {
            pool: ChannelPool::new(&config),
            mixer: Mixer::new(config.headroom),
            limiter: Limiter::new(config.period_size),
            config,
            bank,
            shared,
        };
        Ok((engine, control))
    }

    /// Another handle onto the same command queue.
    pub fn control(&self) -> SoundControl {
        SoundControl::new(Arc::clone(&self.shared))
    }

    /// Reallocate the period buffers. Call before playback starts; the
    /// limiter restarts from silence.
    pub fn set_period_size(&mut self, period_size: usize) {
        if period_size == 0 {
            warn!("ignoring zero period size");
            return;
        }
        if period_size != self.config.period_size {
            debug!(from = self.config.period_size, to = period_size, "period size changed");
            self.config.period_size = period_size;
            self.limiter = Limiter::new(period_size);
        }
    }

    /// Execute everything queued before this call. Returns how many ran.
    pub fn drain_commands(&mut self) -> usize {
        let Self {
            shared,
            pool,
            mixer,
            bank,
            ..
        } = self;
        shared
            .queue
            .drain(|command| apply_command(pool, mixer, &**bank, command))
    }

    /// Produce the next normalized period for the device.
    ///
    /// The very first period is silence: output lags generation by one
    /// period so the limiter can see one buffer ahead.
    pub fn next_playable_buffer(&mut self) -> &[f32] {
        self.drain_commands();

        let buffer = self.limiter.begin_cycle();
        self.pool.release_prepared();
        self.mixer.render(&mut self.pool, &self.bank, buffer);
        self.limiter.finish_cycle()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bank(&self) -> &Arc<SoundBank> {
        &self.bank
    }

    pub fn period_size(&self) -> usize {
        self.limiter.period_size()
    }

    pub fn pool(&self) -> &ChannelPool {
        &self.pool
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.pool.channel(index)
    }

    pub fn active_fx_channels(&self) -> usize {
        self.pool.active_fx_count()
    }

    pub fn active_music_channels(&self) -> usize {
        self.pool.active_music_count()
    }

    /// Limiter gain divisor at the end of the last period.
    pub fn compressor_level(&self) -> f32 {
        self.limiter.level()
    }

    pub fn music_paused(&self) -> bool {
        self.mixer.music_paused()
    }

    /// Volume currently applied to the mix.
    pub fn fx_volume(&self) -> f32 {
        self.mixer.fx_volume()
    }

    pub fn music_volume(&self) -> f32 {
        self.mixer.music_volume()
    }
}

fn apply_command(pool: &mut ChannelPool, mixer: &mut Mixer, bank: &SoundBank, command: Command) {
    debug!(?command, "executing audio command");
    match command {
        Command::FxStop => pool.stop_fx(),
        Command::FxPlay(sound) => {
            pool.play_fx(sound, None);
        }
        Command::FxPlayId(id) => match bank.sound(id) {
            Some(sound) => {
                pool.play_fx(*sound, Some(id));
            }
            None => warn!(%id, "unknown sound id, effect dropped"),
        },
        Command::FxPrepare(sound) => {
            pool.prepare_fx(sound, None);
        }
        Command::FxPrepareId(id) => match bank.sound(id) {
            Some(sound) => {
                pool.prepare_fx(*sound, Some(id));
            }
            None => warn!(%id, "unknown sound id, prepared effect dropped"),
        },
        Command::FxPlayPrepared => pool.mark_prepared_ready(),
        Command::FxVolumeSet(volume) => mixer.set_fx_volume(volume),
        Command::MusicNew(track) => pool.load_track(bank, track),
        Command::MusicPause => mixer.pause_music(),
        Command::MusicResume => mixer.resume_music(),
        Command::MusicVolumeSet(volume) => mixer.set_music_volume(volume),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use choppa_core::{CoreError, Sound, SoundId, Waveform};

    fn engine(bank: SoundBank) -> (AudioEngine, SoundControl) {
        let config = EngineConfig::new().with_period_size(64);
        AudioEngine::new(config, Arc::new(bank)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig::new().with_fx_channels(0);
        let result = AudioEngine::new(config, Arc::new(SoundBank::empty()));
        assert!(matches!(result, Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_commands_apply_before_generation() {
        let (mut engine, control) = engine(SoundBank::empty());
        control.fx_play_sound(Sound::new(Waveform::Sine, 440.0, 1000));
        assert_eq!(engine.active_fx_channels(), 0);

        engine.next_playable_buffer();
        assert_eq!(engine.active_fx_channels(), 1);
        assert_eq!(engine.channel(8).unwrap().t(), 64);
    }

    #[test]
    fn test_first_buffer_is_silent() {
        let (mut engine, control) = engine(SoundBank::empty());
        control.fx_play_sound(Sound::new(Waveform::Saw, 440.0, 10_000));
        assert!(engine.next_playable_buffer().iter().all(|s| *s == 0.0));
        assert!(engine.next_playable_buffer().iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_play_by_id_and_unknown_id() {
        let mut builder = SoundBank::builder();
        let id = builder.push(Sound::new(Waveform::Triangle, 330.0, 500));
        let (mut engine, control) = engine(builder.build().unwrap());

        control.fx_play_id(id);
        control.fx_play_id(SoundId::new(99));
        engine.next_playable_buffer();

        assert_eq!(engine.active_fx_channels(), 1);
        assert_eq!(engine.channel(8).unwrap().sound_id(), Some(id));
    }

    #[test]
    fn test_prepare_by_id_and_unknown_id() {
        let mut builder = SoundBank::builder();
        let id = builder.push(Sound::new(Waveform::Saw, 220.0, 500));
        let (mut engine, control) = engine(builder.build().unwrap());

        control.fx_prepare_id(SoundId::new(42));
        control.fx_play_group_ids(&[id]);
        engine.next_playable_buffer();

        assert_eq!(engine.active_fx_channels(), 1);
        assert_eq!(engine.channel(8).unwrap().sound_id(), Some(id));
        assert_eq!(engine.channel(8).unwrap().t(), 64);
    }

    #[test]
    fn test_volume_reaches_mixer_in_queue_order() {
        let (mut engine, control) = engine(SoundBank::empty());
        control.fx_set_volume(0.25);
        control.music_set_volume(2.0);
        assert_eq!(engine.fx_volume(), 1.0);

        assert_eq!(engine.drain_commands(), 2);
        assert_eq!(engine.fx_volume(), 0.25);
        assert_eq!(engine.music_volume(), 1.0);
    }

    #[test]
    fn test_set_period_size() {
        let (mut engine, _control) = engine(SoundBank::empty());
        engine.set_period_size(240);
        assert_eq!(engine.period_size(), 240);
        assert_eq!(engine.next_playable_buffer().len(), 240);
        engine.set_period_size(0);
        assert_eq!(engine.period_size(), 240);
    }

    #[test]
    fn test_extra_control_handles_share_queue() {
        let (mut engine, control) = engine(SoundBank::empty());
        let other = engine.control();
        other.fx_set_volume(0.5);
        assert_eq!(control.fx_volume(), 0.5);
        engine.drain_commands();
        assert_eq!(engine.fx_volume(), 0.5);
    }
}
