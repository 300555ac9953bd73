//! Cue point derivation
//!
//! Cue points are derived from structure: where a crossfade should land
//! in a track (`mix_in`), where the track should hand off (`mix_out`),
//! and the drop/breakdown moments a drop-style transition can target.
//! All times snap to the track's own 8-bar phrase grid.
//!
//! Stored cue sets heal on read: a `mix_in` under 4 seconds on a track
//! longer than a minute is a legacy artifact of an earlier detector and
//! is recomputed wholesale.

use super::PlannerTrack;
use automix_common::music_time::{bar_seconds, snap_to_phrase};
use automix_common::SectionLabel;
use serde::{Deserialize, Serialize};

/// Derived cue points for one track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuePoints {
    /// Where an incoming crossfade should land, seconds
    pub mix_in: f64,
    /// Where the outgoing crossfade should start, seconds
    pub mix_out: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<f64>,
    pub confidence: f64,
}

/// Stale stored cue set: `mix_in` under 4 s on a track over 60 s
pub fn is_stale(cues: &CuePoints, duration_seconds: f64) -> bool {
    cues.mix_in < 4.0 && duration_seconds > 60.0
}

/// Derive cue points from a track's structure
pub fn derive_cue_points(track: &PlannerTrack) -> CuePoints {
    let bpm = track.bpm.unwrap_or(120.0);
    let duration = track.duration_seconds;
    let bar = bar_seconds(bpm);
    let snap = |t: f64| snap_to_phrase(t, bpm).clamp(0.0, duration);

    let intro = track.section(SectionLabel::Intro);
    let verse = track.section(SectionLabel::Verse);
    let buildup = track.section(SectionLabel::Buildup);
    let drop_section = track.section(SectionLabel::Drop);
    let breakdown = track.section(SectionLabel::Breakdown);
    let outro = track.section(SectionLabel::Outro);

    let mix_in = intro
        .map(|s| snap(s.end))
        .filter(|&t| t > 0.0)
        .or_else(|| verse.map(|s| snap(s.start)).filter(|&t| t > 0.0))
        .or_else(|| buildup.map(|s| snap(s.start)).filter(|&t| t > 0.0))
        .unwrap_or_else(|| (16.0 * bar).min(duration * 0.1));

    let drop = drop_section
        .map(|s| s.start)
        .or_else(|| track.drop_moments.first().copied());

    let mix_out = outro
        .map(|s| snap(s.start))
        .unwrap_or_else(|| (duration - 32.0 * bar).max(0.0));

    let mut confidence: f64 = 0.5;
    if intro.is_some() {
        confidence += 0.15;
    }
    if outro.is_some() {
        confidence += 0.15;
    }
    if drop.is_some() {
        confidence += 0.1;
    }

    CuePoints {
        mix_in: mix_in.clamp(0.0, duration),
        mix_out: mix_out.clamp(0.0, duration),
        drop,
        breakdown: breakdown.map(|s| s.start),
        confidence: confidence.min(1.0),
    }
}

/// Cue points for a track, reusing a stored set unless missing or stale
///
/// Returns the cue set and whether it was freshly computed (and so
/// should be persisted back to the catalog).
pub fn resolve_cue_points(track: &PlannerTrack) -> (CuePoints, bool) {
    match &track.cue_points {
        Some(stored) if !is_stale(stored, track.duration_seconds) => (*stored, false),
        _ => (derive_cue_points(track), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Section;
    use uuid::Uuid;

    fn track_with_structure(bpm: f64, duration: f64, structure: Vec<Section>) -> PlannerTrack {
        PlannerTrack {
            id: Uuid::nil(),
            bpm: Some(bpm),
            duration_seconds: duration,
            beat_grid: vec![],
            phrases: vec![],
            structure,
            drop_moments: vec![],
            cue_points: None,
            camelot_key: None,
            genre: None,
        }
    }

    fn section(label: SectionLabel, start: f64, end: f64) -> Section {
        Section {
            label,
            start,
            end,
            confidence: 0.6,
        }
    }

    #[test]
    fn test_mix_in_from_intro_end() {
        // 120 BPM: phrase grid is 16 s; intro ends at 16 exactly
        let track = track_with_structure(
            120.0,
            180.0,
            vec![
                section(SectionLabel::Intro, 0.0, 16.0),
                section(SectionLabel::Verse, 16.0, 96.0),
                section(SectionLabel::Outro, 160.0, 180.0),
            ],
        );
        let cues = derive_cue_points(&track);
        assert_eq!(cues.mix_in, 16.0);
        assert_eq!(cues.mix_out, 160.0);
        assert!(cues.drop.is_none());
    }

    #[test]
    fn test_mix_in_falls_back_to_verse() {
        let track = track_with_structure(
            120.0,
            180.0,
            vec![section(SectionLabel::Verse, 30.0, 96.0)],
        );
        let cues = derive_cue_points(&track);
        // snap(30) on the 16 s grid = 32
        assert_eq!(cues.mix_in, 32.0);
    }

    #[test]
    fn test_mix_in_final_fallback() {
        let track = track_with_structure(120.0, 300.0, vec![]);
        let cues = derive_cue_points(&track);
        // min(16 bar, duration × 0.1) = min(32, 30) = 30
        assert_eq!(cues.mix_in, 30.0);
    }

    #[test]
    fn test_mix_out_without_outro() {
        let track = track_with_structure(120.0, 180.0, vec![]);
        let cues = derive_cue_points(&track);
        // duration − 32 bar = 180 − 64 = 116
        assert_eq!(cues.mix_out, 116.0);
    }

    #[test]
    fn test_drop_from_structure_then_moments() {
        let mut track = track_with_structure(
            120.0,
            180.0,
            vec![section(SectionLabel::Drop, 64.0, 72.0)],
        );
        assert_eq!(derive_cue_points(&track).drop, Some(64.0));

        track.structure.clear();
        track.drop_moments = vec![70.5, 130.0];
        assert_eq!(derive_cue_points(&track).drop, Some(70.5));
    }

    #[test]
    fn test_staleness_rule() {
        let fresh = CuePoints {
            mix_in: 16.0,
            mix_out: 160.0,
            drop: None,
            breakdown: None,
            confidence: 0.8,
        };
        let stale = CuePoints { mix_in: 2.0, ..fresh };
        assert!(!is_stale(&fresh, 180.0));
        assert!(is_stale(&stale, 180.0));
        // Short tracks are exempt
        assert!(!is_stale(&stale, 45.0));
    }

    #[test]
    fn test_resolve_reuses_fresh_stored_set() {
        let stored = CuePoints {
            mix_in: 16.0,
            mix_out: 160.0,
            drop: Some(64.0),
            breakdown: None,
            confidence: 0.9,
        };
        let mut track = track_with_structure(120.0, 180.0, vec![]);
        track.cue_points = Some(stored);
        let (cues, healed) = resolve_cue_points(&track);
        assert_eq!(cues, stored);
        assert!(!healed);
    }

    #[test]
    fn test_resolve_heals_stale_set() {
        let stored = CuePoints {
            mix_in: 1.0,
            mix_out: 160.0,
            drop: None,
            breakdown: None,
            confidence: 0.9,
        };
        let mut track = track_with_structure(
            120.0,
            180.0,
            vec![section(SectionLabel::Intro, 0.0, 16.0)],
        );
        track.cue_points = Some(stored);
        let (cues, healed) = resolve_cue_points(&track);
        assert!(healed);
        assert_eq!(cues.mix_in, 16.0);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let track = track_with_structure(
            124.0,
            240.0,
            vec![
                section(SectionLabel::Intro, 0.0, 15.0),
                section(SectionLabel::Verse, 15.0, 90.0),
            ],
        );
        assert_eq!(derive_cue_points(&track), derive_cue_points(&track));
    }
}
