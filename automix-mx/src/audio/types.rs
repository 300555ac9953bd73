//! PCM buffer types

/// Decoded PCM audio
///
/// Analysis buffers are mono at the working rate; the renderer never
/// sees these (it re-decodes originals inside the filter graph to keep
/// stereo).
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    /// Interleaved samples (mono: one per frame)
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmBuffer {
    /// Duration implied by the sample count
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate) / f64::from(self.channels)
    }
}
