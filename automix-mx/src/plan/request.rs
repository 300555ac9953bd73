//! Mix-creation request and validation
//!
//! All bounded/enumerated checks from the request surface live here, so
//! a request that validates is safe for the planner and renderer without
//! further range checking.

use crate::error::{Error, Result};
use automix_common::{EnergyMode, EventType, LoudnessMode, TransitionStyle};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Most tracks accepted in one mix
pub const MAX_TRACKS: usize = 20;

/// Mix-creation request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MixRequest {
    pub track_ids: Vec<Uuid>,
    pub target_duration_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_style: Option<TransitionStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fade_duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_mode: Option<EnergyMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_order: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefer_stems: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_multiband_compression: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_sidechain_ducking: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_dynamic_eq: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loudness_normalization: Option<LoudnessMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_loudness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_filter_sweep: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo_ramp_seconds: Option<f64>,
}

impl MixRequest {
    /// Validate all bounded fields
    ///
    /// Enumerated fields are already closed by deserialization; only
    /// numeric ranges and cardinalities are checked here.
    pub fn validate(&self) -> Result<()> {
        if self.track_ids.len() < 2 {
            return Err(Error::Validation(format!(
                "at least 2 tracks required, got {}",
                self.track_ids.len()
            )));
        }
        if self.track_ids.len() > MAX_TRACKS {
            return Err(Error::Validation(format!(
                "at most {MAX_TRACKS} tracks supported, got {}",
                self.track_ids.len()
            )));
        }
        {
            let mut seen = std::collections::HashSet::new();
            for id in &self.track_ids {
                if !seen.insert(id) {
                    return Err(Error::Validation(format!("duplicate track id {id}")));
                }
            }
        }
        if !(30..=3600).contains(&self.target_duration_seconds) {
            return Err(Error::Validation(format!(
                "targetDurationSeconds must be in [30, 3600], got {}",
                self.target_duration_seconds
            )));
        }
        if let Some(bpm) = self.target_bpm {
            if !(60.0..=200.0).contains(&bpm) {
                return Err(Error::Validation(format!(
                    "targetBpm must be in [60, 200], got {bpm}"
                )));
            }
        }
        if let Some(fade) = self.fade_duration_seconds {
            if !(0.0..=20.0).contains(&fade) {
                return Err(Error::Validation(format!(
                    "fadeDurationSeconds must be in [0, 20], got {fade}"
                )));
            }
        }
        if let Some(name) = &self.name {
            if name.len() > 255 {
                return Err(Error::Validation(format!(
                    "name must be at most 255 bytes, got {}",
                    name.len()
                )));
            }
        }
        if let Some(loudness) = self.target_loudness {
            if !(-70.0..=-5.0).contains(&loudness) {
                return Err(Error::Validation(format!(
                    "targetLoudness must be in [-70, -5], got {loudness}"
                )));
            }
        }
        if let Some(ramp) = self.tempo_ramp_seconds {
            if !(0.0..=10.0).contains(&ramp) {
                return Err(Error::Validation(format!(
                    "tempoRampSeconds must be in [0, 10], got {ramp}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> MixRequest {
        MixRequest {
            track_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            target_duration_seconds: 300,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_too_few_tracks() {
        let mut req = valid();
        req.track_ids.truncate(1);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_duplicate_tracks_rejected() {
        let mut req = valid();
        req.track_ids.push(req.track_ids[0]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_duration_bounds() {
        let mut req = valid();
        req.target_duration_seconds = 29;
        assert!(req.validate().is_err());
        req.target_duration_seconds = 3601;
        assert!(req.validate().is_err());
        req.target_duration_seconds = 30;
        assert!(req.validate().is_ok());
        req.target_duration_seconds = 3600;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_bpm_fade_loudness_ramp_bounds() {
        let mut req = valid();
        req.target_bpm = Some(59.0);
        assert!(req.validate().is_err());
        req.target_bpm = Some(200.0);
        assert!(req.validate().is_ok());

        req.fade_duration_seconds = Some(20.5);
        assert!(req.validate().is_err());
        req.fade_duration_seconds = Some(0.0);
        assert!(req.validate().is_ok());

        req.target_loudness = Some(-4.0);
        assert!(req.validate().is_err());
        req.target_loudness = Some(-14.0);
        assert!(req.validate().is_ok());

        req.tempo_ramp_seconds = Some(11.0);
        assert!(req.validate().is_err());
        req.tempo_ramp_seconds = Some(10.0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_long_name_rejected() {
        let mut req = valid();
        req.name = Some("x".repeat(256));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_unknown_enum_value_fails_deserialization() {
        let json = r#"{"trackIds":["00000000-0000-0000-0000-000000000000","00000000-0000-0000-0000-000000000001"],"targetDurationSeconds":300,"transitionStyle":"warp_drive"}"#;
        assert!(serde_json::from_str::<MixRequest>(json).is_err());
    }

    #[test]
    fn test_camel_case_wire_shape() {
        let req = valid();
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("trackIds"));
        assert!(json.contains("targetDurationSeconds"));
    }
}
