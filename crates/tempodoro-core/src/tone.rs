//! Tone capability.
//!
//! Engines never synthesize sound themselves. They hand a [`Tone`] (or a
//! short sequence of them) to whatever [`ToneEmitter`] the controller was
//! built with. The emitter is free to beep, play a sine wave, record the
//! request, or drop it.

use serde::{Deserialize, Serialize};

/// A single tone request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency_hz: f32,
    /// Linear gain, 0.0 ..= 1.0.
    pub gain: f32,
    pub duration_ms: u64,
    /// Delay before this tone starts, relative to the previous one in a cue.
    #[serde(default)]
    pub delay_ms: u64,
}

impl Tone {
    pub const fn new(frequency_hz: f32, gain: f32, duration_ms: u64) -> Self {
        Self {
            frequency_hz,
            gain,
            duration_ms,
            delay_ms: 0,
        }
    }

    pub const fn after(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Scale the gain by a volume percentage (0-100).
    pub fn with_volume(mut self, volume_pct: u32) -> Self {
        self.gain *= volume_pct.min(100) as f32 / 100.0;
        self
    }
}

/// Metronome click on the downbeat.
pub const ACCENT_CLICK: Tone = Tone::new(1000.0, 0.3, 50);
/// Metronome click on every other beat.
pub const BEAT_CLICK: Tone = Tone::new(800.0, 0.2, 50);

/// Two-note chime played when a Pomodoro phase ends.
pub const PHASE_CHIME: [Tone; 2] = [
    Tone::new(800.0, 0.3, 200),
    Tone::new(1000.0, 0.3, 200).after(200),
];

/// Pick the click for a beat index.
pub fn click_for(beat: u32) -> Tone {
    if beat == 0 {
        ACCENT_CLICK
    } else {
        BEAT_CLICK
    }
}

/// Sink for tone requests.
pub trait ToneEmitter {
    fn emit(&mut self, tone: Tone);

    /// Emit a sequence of tones. Each tone's `delay_ms` is relative to the
    /// start of the previous one.
    fn emit_cue(&mut self, cue: &[Tone]) {
        for tone in cue {
            self.emit(*tone);
        }
    }
}

/// Drops every tone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentEmitter;

impl ToneEmitter for SilentEmitter {
    fn emit(&mut self, _tone: Tone) {}
}

/// Keeps every tone it is asked to emit.
#[derive(Debug, Default, Clone)]
pub struct RecordingEmitter {
    pub tones: Vec<Tone>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<Tone> {
        std::mem::take(&mut self.tones)
    }
}

impl ToneEmitter for RecordingEmitter {
    fn emit(&mut self, tone: Tone) {
        self.tones.push(tone);
    }
}

impl<T: ToneEmitter + ?Sized> ToneEmitter for Box<T> {
    fn emit(&mut self, tone: Tone) {
        (**self).emit(tone);
    }

    fn emit_cue(&mut self, cue: &[Tone]) {
        (**self).emit_cue(cue);
    }
}

#[cfg(feature = "audio")]
pub use audio::AudioEmitter;

#[cfg(feature = "audio")]
mod audio {
    //! Sine tones through the default output device.

    use std::time::Duration;

    use rodio::source::{SineWave, Source};
    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::{Tone, ToneEmitter};
    use crate::error::{CoreError, Result};

    /// Plays tones on the system's default audio output.
    ///
    /// The output stream must outlive every sink, so it is kept here even
    /// though nothing reads it.
    pub struct AudioEmitter {
        _stream: OutputStream,
        handle: OutputStreamHandle,
    }

    impl AudioEmitter {
        pub fn open() -> Result<Self> {
            let (stream, handle) =
                OutputStream::try_default().map_err(|e| CoreError::Audio(e.to_string()))?;
            Ok(Self {
                _stream: stream,
                handle,
            })
        }

        fn play(&self, tone: Tone, lead_in: Duration) {
            let sink = match Sink::try_new(&self.handle) {
                Ok(sink) => sink,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot open audio sink; dropping tone");
                    return;
                }
            };
            let wave = SineWave::new(tone.frequency_hz)
                .take_duration(Duration::from_millis(tone.duration_ms))
                .amplify(tone.gain)
                .delay(lead_in);
            sink.append(wave);
            sink.detach();
        }
    }

    impl ToneEmitter for AudioEmitter {
        fn emit(&mut self, tone: Tone) {
            self.play(tone, Duration::from_millis(tone.delay_ms));
        }

        fn emit_cue(&mut self, cue: &[Tone]) {
            let mut offset = 0;
            for tone in cue {
                offset += tone.delay_ms;
                self.play(*tone, Duration::from_millis(offset));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downbeat_is_higher_and_louder() {
        let accent = click_for(0);
        let beat = click_for(2);
        assert!(accent.frequency_hz > beat.frequency_hz);
        assert!(accent.gain > beat.gain);
    }

    #[test]
    fn chime_plays_second_note_after_the_first() {
        assert_eq!(PHASE_CHIME[0].delay_ms, 0);
        assert_eq!(PHASE_CHIME[1].delay_ms, PHASE_CHIME[0].duration_ms);
    }

    #[test]
    fn volume_scales_gain() {
        let half = ACCENT_CLICK.with_volume(50);
        assert!((half.gain - 0.15).abs() < 1e-6);
        let capped = ACCENT_CLICK.with_volume(250);
        assert!((capped.gain - ACCENT_CLICK.gain).abs() < 1e-6);
    }

    #[test]
    fn recording_emitter_keeps_cues_in_order() {
        let mut rec = RecordingEmitter::new();
        rec.emit_cue(&PHASE_CHIME);
        let tones = rec.take();
        assert_eq!(tones.len(), 2);
        assert_eq!(tones[1].frequency_hz, 1000.0);
        assert!(rec.tones.is_empty());
    }
}
