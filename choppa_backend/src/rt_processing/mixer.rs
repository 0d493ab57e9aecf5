use choppa_core::SoundBank;

use super::channel::ChannelPool;

/// Sums the channel pool into the music and effect buses.
///
/// While music is paused its channels are not ticked at all, so a paused
/// track keeps its position.
#[derive(Debug, Clone)]
pub struct Mixer {
    music_volume: f32,
    fx_volume: f32,
    music_paused: bool,
    headroom: f32,
}

impl Mixer {
    pub fn new(headroom: f32) -> Self {
        Self {
            music_volume: 1.0,
            fx_volume: 1.0,
            music_paused: false,
            headroom,
        }
    }

    pub fn music_volume(&self) -> f32 {
        self.music_volume
    }

    pub fn fx_volume(&self) -> f32 {
        self.fx_volume
    }

    /// Clamped to [0, 1].
    pub fn set_music_volume(&mut self, volume: f32) {
        self.music_volume = clamp_volume(volume);
    }

    /// Clamped to [0, 1].
    pub fn set_fx_volume(&mut self, volume: f32) {
        self.fx_volume = clamp_volume(volume);
    }

    pub fn music_paused(&self) -> bool {
        self.music_paused
    }

    pub fn pause_music(&mut self) {
        self.music_paused = true;
    }

    pub fn resume_music(&mut self) {
        self.music_paused = false;
    }

    pub fn headroom(&self) -> f32 {
        self.headroom
    }

    /// Tick every channel once and return the mixed sample.
    #[inline]
    pub fn mix_sample(&self, pool: &mut ChannelPool, bank: &SoundBank) -> f32 {
        let mut value_music = 0.0;
        if !self.music_paused {
            for channel in pool.music_channels_mut() {
                value_music += channel.tick(bank, self.headroom);
            }
        }

        let mut value_fx = 0.0;
        for channel in pool.fx_channels_mut() {
            value_fx += channel.tick(bank, self.headroom);
        }

        value_music * self.music_volume + value_fx * self.fx_volume
    }

    /// Fill `out` with consecutive mixed samples.
    pub fn render(&self, pool: &mut ChannelPool, bank: &SoundBank, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.mix_sample(pool, bank);
        }
    }
}

/// NaN maps to silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use choppa_core::{Adsr, EngineConfig, Sound, Waveform};

    fn loud(duration: u32) -> Sound {
        Sound::new(Waveform::Pulse, 100.0, duration).with_adsr(Adsr::flat(1.0))
    }

    #[test]
    fn test_volume_clamping() {
        let mut mixer = Mixer::new(0.8);
        mixer.set_fx_volume(1.5);
        assert_eq!(mixer.fx_volume(), 1.0);
        mixer.set_music_volume(-0.2);
        assert_eq!(mixer.music_volume(), 0.0);
        mixer.set_music_volume(f32::NAN);
        assert_eq!(mixer.music_volume(), 0.0);
    }

    #[test]
    fn test_buses_scale_independently() {
        let mut builder = SoundBank::builder();
        let head = builder.push(loud(1000));
        let track = builder.track(&[head]);
        let bank = builder.build().unwrap();

        let config = EngineConfig::new().with_music_channels(1).with_fx_channels(1);
        let mut pool = ChannelPool::new(&config);
        pool.load_track(&bank, Some(track));

        let mut mixer = Mixer::new(1.0);
        mixer.set_music_volume(0.0);
        let mut out = vec![0.0; 64];
        mixer.render(&mut pool, &bank, &mut out);
        assert!(out.iter().all(|s| *s == 0.0));
        // Music still advanced.
        assert_eq!(pool.channel(0).unwrap().t(), 64);

        mixer.set_music_volume(0.5);
        mixer.render(&mut pool, &bank, &mut out);
        assert!(out.iter().all(|s| s.abs() <= 0.5 + 1e-3));
        assert!(out.iter().any(|s| s.abs() > 0.4));
    }

    #[test]
    fn test_paused_music_is_not_ticked() {
        let mut builder = SoundBank::builder();
        let head = builder.push(loud(1000));
        let track = builder.track(&[head]);
        let bank = builder.build().unwrap();

        let config = EngineConfig::new().with_music_channels(1).with_fx_channels(1);
        let mut pool = ChannelPool::new(&config);
        pool.load_track(&bank, Some(track));
        pool.play_fx(loud(1000), None);

        let mut mixer = Mixer::new(0.8);
        let mut out = vec![0.0; 10];
        mixer.render(&mut pool, &bank, &mut out);
        mixer.pause_music();
        mixer.render(&mut pool, &bank, &mut out);

        let music = pool.channel(0).unwrap();
        let fx = pool.channel(1).unwrap();
        assert_eq!(music.t(), 10);
        assert_eq!(fx.t(), 20);
    }
}
