//! Auto-DJ planner
//!
//! From a set of analyzed tracks and a mix request, computes a
//! deterministic plan: ordering, a common target BPM, per-transition
//! mix-in/mix-out points, overlap durations, crossfade curves,
//! vocal-collision detection, and a quality score. The planner is pure:
//! identical inputs produce byte-identical plans.

pub mod align;
pub mod cues;
pub mod mix_point;
pub mod planner;
pub mod presets;
pub mod quality;
pub mod request;

pub use cues::CuePoints;
pub use planner::{plan, PlanOutcome, PlannerDefaults};
pub use request::MixRequest;

use crate::analysis::{Phrase, Section};
use automix_common::{
    CamelotKey, CollisionSeverity, CrossfadeCurve, MixInStrategy, SectionLabel, SuggestedType,
    TransitionStyle,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Planner view of an analyzed track
///
/// Built from the catalog record; the planner never touches the catalog
/// itself.
#[derive(Debug, Clone)]
pub struct PlannerTrack {
    pub id: Uuid,
    pub bpm: Option<f64>,
    pub duration_seconds: f64,
    pub beat_grid: Vec<f64>,
    pub phrases: Vec<Phrase>,
    pub structure: Vec<Section>,
    pub drop_moments: Vec<f64>,
    pub cue_points: Option<CuePoints>,
    pub camelot_key: Option<CamelotKey>,
    pub genre: Option<String>,
}

impl PlannerTrack {
    /// Structural section label at a time, if any section covers it
    pub fn section_at(&self, t: f64) -> Option<SectionLabel> {
        self.structure
            .iter()
            .find(|s| t >= s.start && t < s.end)
            .map(|s| s.label)
    }

    /// First section with the given label
    pub fn section(&self, label: SectionLabel) -> Option<&Section> {
        self.structure.iter().find(|s| s.label == label)
    }
}

/// Where the crossfade sits in both tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixPoint {
    /// Crossfade start in the outgoing track (source-track seconds)
    pub out_start: f64,
    /// Crossfade landing point in the incoming track (source-track seconds)
    pub in_start: f64,
    /// Overlap length, an integral number of target-tempo bars
    pub overlap_seconds: f64,
    pub phrase_aligned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_section: Option<SectionLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_section: Option<SectionLabel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Chosen mix-in strategy with the reasoning that picked it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixInSelection {
    pub point: f64,
    pub strategy: MixInStrategy,
    pub reason: String,
}

/// Overlapping vocal sections at a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocalCollision {
    pub severity: CollisionSeverity,
    pub overlap_seconds: f64,
}

/// One planned transition between adjacent tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTransition {
    pub from_id: Uuid,
    pub to_id: Uuid,
    pub style: TransitionStyle,
    /// Crossfade length in seconds
    pub fade_duration: f64,
    /// Beat-grid alignment nudge applied to the incoming track
    pub beat_offset_seconds: f64,
    /// Fade-out curve of the outgoing track
    pub curve1: CrossfadeCurve,
    /// Fade-in curve of the incoming track
    pub curve2: CrossfadeCurve,
    pub mix_point: MixPoint,
    pub mix_in_selection: MixInSelection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocal_collision: Option<VocalCollision>,
    /// |from.bpm − to.bpm|
    pub bpm_diff: f64,
    pub suggested_type: SuggestedType,
}

/// Plan quality summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    /// Mean of per-transition scores, clamped to [0, 100]
    pub score: f64,
    pub transition_scores: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// A complete mix plan, consumed read-only by the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub order: Vec<Uuid>,
    pub target_bpm: f64,
    pub transitions: Vec<PlannedTransition>,
    pub quality: QualityReport,
}

/// Tempo ratio for a track toward the target BPM, clamped to [0.75, 1.33]
///
/// A track with no BPM plays untouched.
pub fn tempo_ratio(target_bpm: f64, track_bpm: Option<f64>) -> f64 {
    match track_bpm {
        Some(bpm) if bpm > 0.0 => (target_bpm / bpm).clamp(0.75, 1.33),
        _ => 1.0,
    }
}
