//! Deterministic frequency-band fallback engine
//!
//! Separates by frequency banding only: vocals are everything above
//! 1.2 kHz, bass everything below 150 Hz, drums the high-passed
//! remainder with a limiter to tame transients, "other" the untouched
//! source. Crude next to a learned separator, but it never needs a
//! network and never fails on decodable input.

use super::{StemEngine, StemPayload};
use crate::audio::FfmpegDecoder;
use crate::db::stems::StemKind;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;

/// Vocals band edge (high-pass)
const VOCAL_HP_HZ: f64 = 1200.0;

/// Drums band edge (high-pass)
const DRUM_HP_HZ: f64 = 150.0;

/// Bass band edge (low-pass)
const BASS_LP_HZ: f64 = 150.0;

/// Limiter ceiling applied to the drums band
const DRUM_LIMIT: f32 = 0.9;

/// Biquad filter (RBJ cookbook, Q = 0.707)
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    fn lowpass(cutoff_hz: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * std::f64::consts::PI * cutoff_hz / sample_rate;
        let alpha = w0.sin() / (2.0 * std::f64::consts::FRAC_1_SQRT_2);
        let cos_w0 = w0.cos();
        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 - cos_w0) / 2.0) / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: ((1.0 - cos_w0) / 2.0) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn highpass(cutoff_hz: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * std::f64::consts::PI * cutoff_hz / sample_rate;
        let alpha = w0.sin() / (2.0 * std::f64::consts::FRAC_1_SQRT_2);
        let cos_w0 = w0.cos();
        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 + cos_w0) / 2.0) / a0,
            b1: (-(1.0 + cos_w0)) / a0,
            b2: ((1.0 + cos_w0) / 2.0) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let x0 = f64::from(input);
        let y0 = self.b0 * x0 + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x0;
        self.y2 = self.y1;
        self.y1 = y0;
        y0 as f32
    }

    fn run(mut self, samples: &[f32]) -> Vec<f32> {
        samples.iter().map(|&s| self.process(s)).collect()
    }
}

/// Encode mono f32 samples as 16-bit WAV bytes
fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::Stem(format!("wav encode: {e}")))?;
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            writer
                .write_sample(value)
                .map_err(|e| Error::Stem(format!("wav encode: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| Error::Stem(format!("wav encode: {e}")))?;
    }
    Ok(cursor.into_inner())
}

/// Frequency-band fallback engine
pub struct BandFilterEngine {
    decoder: FfmpegDecoder,
}

impl BandFilterEngine {
    pub fn new(decoder: FfmpegDecoder) -> Self {
        Self { decoder }
    }
}

#[async_trait]
impl StemEngine for BandFilterEngine {
    fn name(&self) -> &'static str {
        "band_filter"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn separate(
        &self,
        bytes: &[u8],
        mime: &str,
        _name: &str,
    ) -> Result<HashMap<StemKind, StemPayload>> {
        let pcm = self
            .decoder
            .decode_bytes(bytes, mime)
            .await
            .map_err(|e| Error::Stem(format!("decode for banding: {e}")))?;
        let rate = f64::from(pcm.sample_rate);

        let vocals = Biquad::highpass(VOCAL_HP_HZ, rate).run(&pcm.samples);
        let bass = Biquad::lowpass(BASS_LP_HZ, rate).run(&pcm.samples);
        let mut drums = Biquad::highpass(DRUM_HP_HZ, rate).run(&pcm.samples);
        for sample in drums.iter_mut() {
            *sample = sample.clamp(-DRUM_LIMIT, DRUM_LIMIT);
        }

        let mut stems = HashMap::new();
        for (kind, samples) in [
            (StemKind::Vocals, &vocals),
            (StemKind::Drums, &drums),
            (StemKind::Bass, &bass),
            (StemKind::Other, &pcm.samples),
        ] {
            stems.insert(
                kind,
                StemPayload {
                    bytes: encode_wav(samples, pcm.sample_rate)?,
                    mime: "audio/wav".to_string(),
                },
            );
        }
        Ok(stems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: u32, seconds: f64) -> Vec<f32> {
        let n = (seconds * f64::from(sample_rate)) as usize;
        (0..n)
            .map(|i| {
                let t = i as f64 / f64::from(sample_rate);
                (2.0 * std::f64::consts::PI * freq * t).sin() as f32 * 0.8
            })
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_lowpass_keeps_bass_rejects_treble() {
        let low = sine(60.0, 44100, 0.5);
        let high = sine(5000.0, 44100, 0.5);
        let low_out = Biquad::lowpass(150.0, 44100.0).run(&low);
        let high_out = Biquad::lowpass(150.0, 44100.0).run(&high);
        assert!(rms(&low_out) > 0.4);
        assert!(rms(&high_out) < 0.05);
    }

    #[test]
    fn test_highpass_keeps_treble_rejects_bass() {
        let low = sine(60.0, 44100, 0.5);
        let high = sine(5000.0, 44100, 0.5);
        let low_out = Biquad::highpass(1200.0, 44100.0).run(&low);
        let high_out = Biquad::highpass(1200.0, 44100.0).run(&high);
        assert!(rms(&low_out) < 0.05);
        assert!(rms(&high_out) > 0.4);
    }

    #[test]
    fn test_encode_wav_shape() {
        let samples = sine(440.0, 44100, 0.1);
        let bytes = encode_wav(&samples, 44100).unwrap();
        // RIFF header plus 16-bit payload
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert!(bytes.len() > samples.len());
    }

    #[test]
    fn test_limiter_bounds_drums() {
        let mut samples = sine(3000.0, 44100, 0.1);
        for s in samples.iter_mut() {
            *s *= 2.0;
        }
        let mut drums = Biquad::highpass(150.0, 44100.0).run(&samples);
        for s in drums.iter_mut() {
            *s = s.clamp(-DRUM_LIMIT, DRUM_LIMIT);
        }
        assert!(drums.iter().all(|s| s.abs() <= DRUM_LIMIT));
    }
}
