//! Mix renderer
//!
//! Executes a plan: per-track tempo adjustment, phrase-aligned trimming,
//! per-transition effects, multi-track overlap mixing, loudness
//! normalization and limiting - all expressed as one transcoder filter
//! graph over the original (stereo) sources. A failed main graph falls
//! back to a simplified per-segment graph; only both failing marks the
//! mashup failed.

pub mod effects;
pub mod filters;
pub mod playback;
pub mod renderer;

pub use playback::{build_playback_plan, PlaybackEntry, RenderTrack};
pub use renderer::{RenderOutput, Renderer};

use crate::plan::request::MixRequest;
use automix_common::LoudnessMode;

/// Resolved render options for one mashup
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub target_duration_seconds: f64,
    pub loudness: LoudnessMode,
    /// Integrated loudness target (LUFS) for EBU mode
    pub target_loudness: f64,
    pub enable_multiband_compression: bool,
    pub enable_sidechain_ducking: bool,
    pub enable_dynamic_eq: bool,
    pub enable_filter_sweep: bool,
    pub tempo_ramp_seconds: f64,
    pub output_bitrate: String,
}

impl RenderConfig {
    /// Resolve options from the stored mix request
    pub fn from_request(request: &MixRequest, output_bitrate: &str) -> Self {
        Self {
            target_duration_seconds: request.target_duration_seconds as f64,
            loudness: request.loudness_normalization.unwrap_or_default(),
            target_loudness: request.target_loudness.unwrap_or(-14.0),
            enable_multiband_compression: request.enable_multiband_compression.unwrap_or(false),
            enable_sidechain_ducking: request.enable_sidechain_ducking.unwrap_or(false),
            enable_dynamic_eq: request.enable_dynamic_eq.unwrap_or(false),
            enable_filter_sweep: request.enable_filter_sweep.unwrap_or(false),
            tempo_ramp_seconds: request.tempo_ramp_seconds.unwrap_or(0.0),
            output_bitrate: output_bitrate.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_request() {
        let request = MixRequest {
            target_duration_seconds: 300,
            ..Default::default()
        };
        let config = RenderConfig::from_request(&request, "192k");
        assert_eq!(config.target_duration_seconds, 300.0);
        assert_eq!(config.loudness, LoudnessMode::EbuR128);
        assert_eq!(config.target_loudness, -14.0);
        assert!(!config.enable_multiband_compression);
        assert_eq!(config.tempo_ramp_seconds, 0.0);
        assert_eq!(config.output_bitrate, "192k");
    }
}
