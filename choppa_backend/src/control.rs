//! Game-side handle to the audio engine.
//!
//! Every call enqueues a [`Command`] and returns immediately. Nothing here
//! reports failure to the caller: a full queue is logged and counted, and
//! effects that find no free channel are dropped by the engine.

use std::sync::Arc;

use choppa_core::{AdsrSeconds, Sound, SoundId, TrackId, Vibrato, Waveform};
use crossbeam::atomic::AtomicCell;
use tracing::error;

use crate::rt_processing::command::{Command, CommandQueue, QueueFull};
use crate::rt_processing::mixer::clamp_volume;

/// State shared by every [`SoundControl`] clone and the engine.
#[derive(Debug)]
pub(crate) struct SharedState {
    pub(crate) queue: CommandQueue,
    fx_volume: AtomicCell<f32>,
    music_volume: AtomicCell<f32>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            queue: CommandQueue::new(),
            fx_volume: AtomicCell::new(1.0),
            music_volume: AtomicCell::new(1.0),
        }
    }
}

/// Parameters of an ad-hoc effect, with times in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FxParams {
    pub waveform: Waveform,
    pub frequency: f32,
    /// Seconds.
    pub duration: f32,
    /// Scales the envelope peak and sustain. Clamped to [0, 1].
    pub volume: f32,
    pub adsr: AdsrSeconds,
    pub sweep: f32,
    pub vibrato: Vibrato,
    pub duty_cycle: f32,
    pub duty_cycle_sweep: f32,
    /// Bank sound to continue with once this one ends.
    pub next: Option<SoundId>,
}

impl FxParams {
    pub fn new(waveform: Waveform, frequency: f32, duration: f32) -> Self {
        Self {
            waveform,
            frequency,
            duration,
            volume: 1.0,
            adsr: AdsrSeconds::default(),
            sweep: 0.0,
            vibrato: Vibrato::default(),
            duty_cycle: 0.0,
            duty_cycle_sweep: 0.0,
            next: None,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_adsr(mut self, adsr: AdsrSeconds) -> Self {
        self.adsr = adsr;
        self
    }

    pub fn with_sweep(mut self, sweep: f32) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn with_vibrato(mut self, vibrato: Vibrato) -> Self {
        self.vibrato = vibrato;
        self
    }

    pub fn with_duty_cycle(mut self, duty_cycle: f32, sweep: f32) -> Self {
        self.duty_cycle = duty_cycle;
        self.duty_cycle_sweep = sweep;
        self
    }

    pub fn with_next(mut self, next: SoundId) -> Self {
        self.next = Some(next);
        self
    }

    pub fn to_sound(&self) -> Sound {
        let sound = Sound::from_seconds(self.waveform, self.frequency, self.duration)
            .with_adsr_seconds(self.adsr)
            .with_sweep(self.sweep)
            .with_vibrato(self.vibrato)
            .with_duty_cycle(self.duty_cycle, self.duty_cycle_sweep)
            .with_volume(self.volume);

        match self.next {
            Some(next) => sound.with_next(next),
            None => sound,
        }
    }
}

/// Cloneable producer handle. `Send + Sync`; cheap to clone.
#[derive(Debug, Clone)]
pub struct SoundControl {
    shared: Arc<SharedState>,
}

impl SoundControl {
    pub(crate) fn new(shared: Arc<SharedState>) -> Self {
        Self { shared }
    }

    /// Enqueue a raw command, reporting a full queue.
    pub fn submit(&self, command: Command) -> Result<(), QueueFull> {
        self.shared.queue.push(command)
    }

    fn send(&self, command: Command) {
        if let Err(err) = self.submit(command) {
            error!(%err, dropped = self.dropped_commands(), "audio command lost");
        }
    }

    pub fn fx_play(&self, params: FxParams) {
        self.send(Command::FxPlay(params.to_sound()));
    }

    pub fn fx_play_sound(&self, sound: Sound) {
        self.send(Command::FxPlay(sound));
    }

    pub fn fx_play_id(&self, id: SoundId) {
        self.send(Command::FxPlayId(id));
    }

    pub fn fx_prepare(&self, sound: Sound) {
        self.send(Command::FxPrepare(sound));
    }

    pub fn fx_prepare_id(&self, id: SoundId) {
        self.send(Command::FxPrepareId(id));
    }

    pub fn fx_play_prepared(&self) {
        self.send(Command::FxPlayPrepared);
    }

    /// Prepare every sound and trigger them together.
    pub fn fx_play_group(&self, sounds: &[Sound]) {
        for sound in sounds {
            self.fx_prepare(*sound);
        }
        self.fx_play_prepared();
    }

    /// [`SoundControl::fx_play_group`] for bank sounds.
    pub fn fx_play_group_ids(&self, ids: &[SoundId]) {
        for &id in ids {
            self.fx_prepare_id(id);
        }
        self.fx_play_prepared();
    }

    pub fn fx_stop(&self) {
        self.send(Command::FxStop);
    }

    /// Clamped to [0, 1]. The getter sees the new value right away; the
    /// mix changes when the engine drains the command.
    pub fn fx_set_volume(&self, volume: f32) {
        let volume = clamp_volume(volume);
        self.shared.fx_volume.store(volume);
        self.send(Command::FxVolumeSet(volume));
    }

    pub fn fx_volume(&self) -> f32 {
        self.shared.fx_volume.load()
    }

    /// Replace the music with `track` and unpause.
    pub fn music_play(&self, track: TrackId) {
        self.send(Command::MusicNew(Some(track)));
        self.send(Command::MusicResume);
    }

    /// Pause the music where it is.
    pub fn music_stop(&self) {
        self.send(Command::MusicPause);
    }

    pub fn music_resume(&self) {
        self.send(Command::MusicResume);
    }

    /// Clamped to [0, 1].
    pub fn music_set_volume(&self, volume: f32) {
        let volume = clamp_volume(volume);
        self.shared.music_volume.store(volume);
        self.send(Command::MusicVolumeSet(volume));
    }

    pub fn music_volume(&self) -> f32 {
        self.shared.music_volume.load()
    }

    /// Stop every effect and silence the music.
    pub fn stop_all(&self) {
        self.send(Command::FxStop);
        self.send(Command::MusicNew(None));
    }

    /// Commands waiting for the audio thread.
    pub fn pending_commands(&self) -> usize {
        self.shared.queue.len()
    }

    /// Commands lost to a full queue since start.
    pub fn dropped_commands(&self) -> u64 {
        self.shared.queue.dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rt_processing::command::COMMAND_QUEUE_CAPACITY;

    fn control() -> SoundControl {
        SoundControl::new(Arc::new(SharedState::new()))
    }

    fn drain(control: &SoundControl) -> Vec<Command> {
        let mut out = Vec::new();
        control.shared.queue.drain(|c| out.push(c));
        out
    }

    #[test]
    fn test_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<SoundControl>();
    }

    #[test]
    fn test_fx_params_to_sound() {
        let sound = FxParams::new(Waveform::Pulse, 220.0, 0.5)
            .with_volume(0.5)
            .with_adsr(AdsrSeconds::new(1.0, 0.01, 0.02, 0.8, 0.1))
            .with_sweep(-110.0)
            .with_duty_cycle(0.25, 0.5)
            .with_next(SoundId::new(3))
            .to_sound();

        assert_eq!(sound.waveform, Waveform::Pulse);
        assert_eq!(sound.duration, 24_000);
        assert_eq!(sound.sweep, -110.0);
        assert_eq!(sound.adsr.peak, 0.5);
        assert!((sound.adsr.sustain - 0.4).abs() < 1e-6);
        assert_eq!(sound.adsr.attack, 480);
        assert_eq!(sound.square_duty_cycle, 0.25);
        assert_eq!(sound.next, Some(SoundId::new(3)));
    }

    #[test]
    fn test_volume_setters_clamp_and_publish() {
        let control = control();
        control.fx_set_volume(1.5);
        control.music_set_volume(-1.0);
        assert_eq!(control.fx_volume(), 1.0);
        assert_eq!(control.music_volume(), 0.0);
        assert_eq!(
            drain(&control),
            vec![Command::FxVolumeSet(1.0), Command::MusicVolumeSet(0.0)]
        );
    }

    #[test]
    fn test_group_prepares_then_triggers() {
        let control = control();
        let a = Sound::new(Waveform::Sine, 440.0, 100);
        let b = Sound::new(Waveform::Sine, 550.0, 100);
        control.fx_play_group(&[a, b]);
        assert_eq!(
            drain(&control),
            vec![Command::FxPrepare(a), Command::FxPrepare(b), Command::FxPlayPrepared]
        );
    }

    #[test]
    fn test_group_by_id() {
        let control = control();
        control.fx_play_group_ids(&[SoundId::new(4), SoundId::new(1)]);
        assert_eq!(
            drain(&control),
            vec![
                Command::FxPrepareId(SoundId::new(4)),
                Command::FxPrepareId(SoundId::new(1)),
                Command::FxPlayPrepared,
            ]
        );
    }

    #[test]
    fn test_music_and_stop_all_commands() {
        let control = control();
        control.music_play(TrackId::new(2));
        control.music_stop();
        control.stop_all();
        assert_eq!(
            drain(&control),
            vec![
                Command::MusicNew(Some(TrackId::new(2))),
                Command::MusicResume,
                Command::MusicPause,
                Command::FxStop,
                Command::MusicNew(None),
            ]
        );
    }

    #[test]
    fn test_overflow_is_absorbed_and_counted() {
        let control = control();
        for _ in 0..COMMAND_QUEUE_CAPACITY + 3 {
            control.fx_stop();
        }
        assert_eq!(control.pending_commands(), COMMAND_QUEUE_CAPACITY);
        assert_eq!(control.dropped_commands(), 3);
        assert!(control.submit(Command::FxStop).is_err());
    }
}
