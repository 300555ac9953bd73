//! Track analysis pipeline
//!
//! From mono PCM to a full analysis record: energy envelope, tempo and
//! beat grid, musical key, phrase segmentation, drop detection,
//! structure labeling, and the reduced waveform. The pipeline is a pure
//! function of its input modulo logging, so re-analysis of identical
//! bytes reproduces identical vector outputs.
//!
//! # Stage order
//!
//! Order is significant; each stage consumes outputs of prior stages:
//!
//! 1. PCM (decoded upstream)
//! 2. Duration (container metadata preferred, else sample count)
//! 3. Energy + onset envelopes
//! 4. BPM (autocorrelation over the onset envelope)
//! 5. Beat grid
//! 6. Key (YIN fundamentals → pitch-class histogram → K-S profiles)
//! 7. Camelot mapping
//! 8. Phrases (smoothed envelope, hysteresis thresholds)
//! 9. Drops (coarsely smoothed envelope, surge peaks)
//! 10. Structure labels
//! 11. Waveform-lite

pub mod envelope;
pub mod key;
pub mod phrase;
pub mod structure;
pub mod tempo;
pub mod waveform;

pub use phrase::Phrase;
pub use structure::Section;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Analysis algorithm version persisted with every result
///
/// Bump when any stage changes behavior, so stale records can be found
/// and re-analyzed.
pub const ANALYSIS_VERSION: &str = "mx-3";

/// Full result of the analysis pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Estimated tempo in [70, 180], or `None` for too-short input
    pub bpm: Option<f64>,
    pub bpm_confidence: f64,
    /// Conventional key name, e.g. "A minor"
    pub key_signature: Option<String>,
    /// Camelot wheel position, e.g. "8A"
    pub camelot_key: Option<String>,
    pub key_confidence: f64,
    pub duration_seconds: f64,
    /// Monotonic beat times, seconds, 3 decimals, ≤512 entries
    pub beat_grid: Vec<f64>,
    pub phrases: Vec<Phrase>,
    pub structure: Vec<Section>,
    /// At most 3 drop times, seconds
    pub drop_moments: Vec<f64>,
    /// ≤256 magnitude bins in [0, 1]
    pub waveform_lite: Vec<f64>,
    pub analysis_version: String,
}

/// Track analyzer
///
/// Holds only the working sample rate; all state is per-call.
pub struct Analyzer {
    sample_rate: u32,
}

impl Analyzer {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Run the full pipeline over mono PCM
    ///
    /// `container_duration` is preferred over the sample count when the
    /// container reported one.
    pub fn analyze(&self, samples: &[f32], container_duration: Option<f64>) -> AnalysisResult {
        let duration = container_duration
            .filter(|d| *d > 0.0)
            .unwrap_or_else(|| samples.len() as f64 / f64::from(self.sample_rate));

        let energy = envelope::energy_envelope(samples);
        let onset = envelope::onset_envelope(&energy);

        let tempo_estimate = tempo::estimate_bpm(&onset, self.sample_rate);
        let (bpm, bpm_confidence) = match tempo_estimate {
            Some(e) => (Some(e.bpm), e.confidence),
            None => (None, 0.0),
        };

        let beat_grid = bpm.map(|b| tempo::beat_grid(b, duration)).unwrap_or_default();

        let key_estimate = key::estimate_key(samples, self.sample_rate);
        let (key_signature, camelot_key, key_confidence) = match &key_estimate {
            Some(k) => (
                Some(k.signature.clone()),
                Some(k.camelot.to_string()),
                k.confidence,
            ),
            None => (None, None, 0.0),
        };

        let phrase_env = envelope::smooth(&energy, envelope::PHRASE_SMOOTHING);
        let phrases = phrase::detect_phrases(&phrase_env, self.sample_rate);

        let drop_env = envelope::smooth(&energy, envelope::DROP_SMOOTHING);
        let drop_moments = structure::detect_drops(&drop_env, self.sample_rate);

        let structure = structure::label_structure(&phrases, &drop_moments, duration);
        let waveform_lite = waveform::waveform_lite(samples);

        debug!(
            duration,
            bpm = ?bpm,
            camelot = ?camelot_key,
            phrases = phrases.len(),
            sections = structure.len(),
            drops = drop_moments.len(),
            "analysis pipeline complete"
        );

        AnalysisResult {
            bpm,
            bpm_confidence,
            key_signature,
            camelot_key,
            key_confidence,
            duration_seconds: duration,
            beat_grid,
            phrases,
            structure,
            drop_moments,
            waveform_lite,
            analysis_version: ANALYSIS_VERSION.to_string(),
        }
    }
}
