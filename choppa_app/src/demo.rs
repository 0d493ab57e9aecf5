//! Built-in demo content: a looping two-voice theme and a few effects.

use choppa_core::{
    AdsrSeconds, CoreResult, Sound, SoundBank, SoundId, TrackId, Vibrato, Waveform,
    seconds_to_samples,
};

/// Seconds per beat at 140 BPM.
const BEAT: f32 = 60.0 / 140.0;

pub struct DemoContent {
    pub bank: SoundBank,
    pub theme: TrackId,
    /// Rising zap that ends in a burst of noise.
    pub zap: SoundId,
    /// Triad played as a prepared group.
    pub chord: Vec<Sound>,
}

/// Equal-tempered pitch of a MIDI note number.
pub fn midi_to_hz(note: u8) -> f32 {
    440.0 * 2f32.powf((note as f32 - 69.0) / 12.0)
}

fn note(waveform: Waveform, midi: u8, beats: f32, adsr: AdsrSeconds) -> Sound {
    Sound::new(waveform, midi_to_hz(midi), seconds_to_samples(beats * BEAT)).with_adsr_seconds(adsr)
}

pub fn build() -> CoreResult<DemoContent> {
    let mut builder = SoundBank::builder();

    let bass_env = AdsrSeconds::new(0.9, 0.005, 0.1, 0.6, 0.03);
    let bass: Vec<Sound> = [45u8, 45, 52, 45, 48, 48, 43, 50]
        .iter()
        .map(|&m| note(Waveform::Pulse, m, 1.0, bass_env).with_duty_cycle(0.0, 0.3))
        .collect();
    let bass_head = builder
        .push_loop(&bass, 0)
        .unwrap_or_else(|| builder.next_id());

    // Lead plays a pickup once, then loops the phrase.
    let lead_env = AdsrSeconds::new(0.7, 0.01, 0.05, 0.5, 0.08);
    let vibrato = Vibrato::new(4.0, 550.0);
    let mut lead = vec![Sound::silence(seconds_to_samples(2.0 * BEAT))];
    lead.extend(
        [(69u8, 0.5), (72, 0.5), (76, 1.0), (74, 1.0), (72, 0.5), (71, 0.5), (69, 2.0), (0, 2.0)]
            .iter()
            .map(|&(m, beats)| {
                if m == 0 {
                    Sound::silence(seconds_to_samples(beats * BEAT))
                } else {
                    note(Waveform::Triangle, m, beats, lead_env).with_vibrato(vibrato)
                }
            }),
    );
    let lead_head = builder
        .push_loop(&lead, 1)
        .unwrap_or_else(|| builder.next_id());

    let theme = builder.track(&[bass_head, lead_head]);

    let zap = builder
        .push_chain(&[
            Sound::from_seconds(Waveform::Saw, 220.0, 0.12)
                .with_sweep(880.0)
                .with_adsr_seconds(AdsrSeconds::pluck()),
            Sound::from_seconds(Waveform::Noise, 3000.0, 0.2)
                .with_sweep(-2500.0)
                .with_adsr_seconds(AdsrSeconds::new(0.6, 0.0, 0.05, 0.3, 0.1)),
        ])
        .unwrap_or_else(|| builder.next_id());

    let chord = [60u8, 64, 67]
        .iter()
        .map(|&m| {
            Sound::from_seconds(Waveform::Pulse, midi_to_hz(m), 0.6)
                .with_duty_cycle(0.5, -0.5)
                .with_adsr_seconds(AdsrSeconds::pluck())
                .with_volume(0.6)
        })
        .collect();

    Ok(DemoContent {
        bank: builder.build()?,
        theme,
        zap,
        chord,
    })
}
