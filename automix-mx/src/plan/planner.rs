//! The planning algorithm
//!
//! Deterministic: identical tracks and request produce identical plans.
//! The planner never fails on malformed tracks; missing analysis fields
//! absorb into safe defaults, and fewer than two tracks yields an empty
//! transition list.

use super::align::{beat_offset, AlignMode};
use super::cues::{resolve_cue_points, CuePoints};
use super::mix_point::{
    build_mix_point, detect_vocal_collision, select_mix_in, validate_mix_point,
};
use super::presets::crossfade_preset;
use super::quality::score_plan;
use super::request::MixRequest;
use super::{tempo_ratio, Plan, PlannedTransition, PlannerTrack};
use automix_common::{
    CollisionSeverity, EnergyMode, EnergyPhase, EventType, SuggestedType, TransitionStyle,
};
use tracing::debug;
use uuid::Uuid;

/// Longest crossfade the planner will schedule
const MAX_FADE_SECONDS: f64 = 8.0;

/// Deployment defaults consumed by the planner
#[derive(Debug, Clone)]
pub struct PlannerDefaults {
    /// Target BPM when no input track has one
    pub target_bpm_default: f64,
}

impl Default for PlannerDefaults {
    fn default() -> Self {
        Self {
            target_bpm_default: 120.0,
        }
    }
}

/// A computed plan plus the cue sets that were recomputed on the way
///
/// The caller persists healed cue sets back to the catalog; the planner
/// itself stays side-effect free.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: Plan,
    pub healed_cues: Vec<(Uuid, CuePoints)>,
}

/// Median of the known input BPMs
fn median_bpm(tracks: &[PlannerTrack]) -> Option<f64> {
    let mut bpms: Vec<f64> = tracks.iter().filter_map(|t| t.bpm).collect();
    if bpms.is_empty() {
        return None;
    }
    bpms.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = bpms.len() / 2;
    Some(if bpms.len() % 2 == 1 {
        bpms[mid]
    } else {
        (bpms[mid - 1] + bpms[mid]) / 2.0
    })
}

/// Track ordering per the requested energy shape
fn order_tracks(tracks: &[PlannerTrack], request: &MixRequest, target_bpm: f64) -> Vec<usize> {
    let n = tracks.len();
    let mut indices: Vec<usize> = (0..n).collect();

    if request.keep_order.unwrap_or(false) {
        return indices;
    }

    let bpm_of = |i: usize| tracks[i].bpm.unwrap_or(target_bpm);

    match request.energy_mode {
        Some(EnergyMode::Build) => {
            indices.sort_by(|&a, &b| {
                bpm_of(a)
                    .partial_cmp(&bpm_of(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(&b))
            });
            indices
        }
        Some(EnergyMode::Wave) => {
            let mut by_bpm = indices.clone();
            by_bpm.sort_by(|&a, &b| {
                bpm_of(a)
                    .partial_cmp(&bpm_of(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(&b))
            });
            let split = (by_bpm.len() + 1) / 2;
            let low = &by_bpm[..split];
            let high: Vec<usize> = by_bpm[split..].iter().rev().copied().collect();
            let mut woven = Vec::with_capacity(n);
            for k in 0..split.max(high.len()) {
                if let Some(&i) = low.get(k) {
                    woven.push(i);
                }
                if let Some(&i) = high.get(k) {
                    woven.push(i);
                }
            }
            woven
        }
        _ => {
            indices.sort_by(|&a, &b| {
                let da = (bpm_of(a) - target_bpm).abs();
                let db = (bpm_of(b) - target_bpm).abs();
                da.partial_cmp(&db)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(&b))
            });
            indices
        }
    }
}

/// Energy phase of transition `i` of `total`
fn energy_phase(mode: Option<EnergyMode>, i: usize, total: usize) -> EnergyPhase {
    match mode {
        Some(EnergyMode::Steady) => EnergyPhase::Build,
        Some(EnergyMode::Wave) => match i % 3 {
            0 => EnergyPhase::Build,
            1 => EnergyPhase::Peak,
            _ => EnergyPhase::Cooldown,
        },
        _ => {
            let progress = if total > 1 {
                i as f64 / (total - 1) as f64
            } else {
                0.0
            };
            if progress < 0.25 {
                EnergyPhase::Warmup
            } else if progress < 0.6 {
                EnergyPhase::Build
            } else if progress < 0.9 {
                EnergyPhase::Peak
            } else {
                EnergyPhase::Cooldown
            }
        }
    }
}

/// Event-adjusted preset fade, capped at [`MAX_FADE_SECONDS`]
fn preset_fade_seconds(style: TransitionStyle, request: &MixRequest) -> f64 {
    let event = request.event_type.unwrap_or(EventType::Default);
    let base = request
        .fade_duration_seconds
        .unwrap_or_else(|| crossfade_preset(style).duration);
    (base + event.fade_adjust_seconds()).clamp(0.0, MAX_FADE_SECONDS)
}

/// Compute a plan for the given tracks
///
/// `tracks` must be in `request.track_ids` order; the planner reorders
/// per the energy mode unless `keep_order` is set.
pub fn plan(
    tracks: &[PlannerTrack],
    request: &MixRequest,
    defaults: &PlannerDefaults,
) -> PlanOutcome {
    let target_bpm = request
        .target_bpm
        .or_else(|| median_bpm(tracks))
        .unwrap_or(defaults.target_bpm_default);

    let order = order_tracks(tracks, request, target_bpm);
    let ordered_ids: Vec<Uuid> = order.iter().map(|&i| tracks[i].id).collect();

    if tracks.len() < 2 {
        let quality = score_plan(&[], &|_| None);
        return PlanOutcome {
            plan: Plan {
                order: ordered_ids,
                target_bpm,
                transitions: Vec::new(),
                quality,
            },
            healed_cues: Vec::new(),
        };
    }

    let style = request.transition_style.unwrap_or_default();
    let transition_count = order.len() - 1;

    // Resolve cue points once per track, remembering which were healed
    let mut cues: Vec<CuePoints> = Vec::with_capacity(tracks.len());
    let mut healed_cues = Vec::new();
    for track in tracks {
        let (cue_set, healed) = resolve_cue_points(track);
        if healed {
            healed_cues.push((track.id, cue_set));
        }
        cues.push(cue_set);
    }

    let mut transitions = Vec::with_capacity(transition_count);
    for i in 0..transition_count {
        let from = &tracks[order[i]];
        let to = &tracks[order[i + 1]];
        let from_cues = &cues[order[i]];
        let to_cues = &cues[order[i + 1]];

        let preset = crossfade_preset(style);
        let fade = preset_fade_seconds(style, request);
        let phase = energy_phase(request.energy_mode, i, transition_count);

        let selection = select_mix_in(to, to_cues, style, phase, fade, target_bpm);

        let ratio_from = tempo_ratio(target_bpm, from.bpm);
        let ratio_to = tempo_ratio(target_bpm, to.bpm);

        let offset = beat_offset(
            &from.beat_grid,
            &to.beat_grid,
            ratio_from,
            ratio_to,
            target_bpm,
            AlignMode::Downbeat,
        );

        let mut mix_point = build_mix_point(
            from, from_cues, to, &selection, fade, target_bpm, ratio_from, ratio_to,
        );
        validate_mix_point(&mut mix_point, from, to, selection.strategy);

        let vocal_collision = detect_vocal_collision(&mix_point, from, to, target_bpm);

        let bpm_diff = match (from.bpm, to.bpm) {
            (Some(a), Some(b)) => (a - b).abs(),
            _ => 0.0,
        };

        let suggested_type = if vocal_collision
            .as_ref()
            .map(|c| c.severity == CollisionSeverity::Major)
            .unwrap_or(false)
        {
            SuggestedType::InstrumentalBridge
        } else if bpm_diff > 8.0 {
            SuggestedType::TempoRamp
        } else {
            SuggestedType::Standard
        };

        transitions.push(PlannedTransition {
            from_id: from.id,
            to_id: to.id,
            style,
            fade_duration: fade,
            beat_offset_seconds: offset,
            curve1: preset.curve1,
            curve2: preset.curve2,
            mix_point,
            mix_in_selection: selection,
            vocal_collision,
            bpm_diff,
            suggested_type,
        });
    }

    let mut quality = score_plan(&transitions, &|id| {
        tracks.iter().find(|t| t.id == id).cloned()
    });

    // Harmonic-key advisory: a far wheel jump is worth flagging even
    // though it does not affect the score
    for i in 0..transition_count {
        let from = &tracks[order[i]];
        let to = &tracks[order[i + 1]];
        if let (Some(key_a), Some(key_b)) = (&from.camelot_key, &to.camelot_key) {
            if !key_a.is_harmonic_neighbor(key_b) && key_a.wheel_distance(key_b) >= 3 {
                quality
                    .suggestions
                    .push(format!("key jump {key_a} → {key_b} is outside the wheel neighborhood"));
            }
        }
    }

    debug!(
        tracks = tracks.len(),
        target_bpm,
        transitions = transitions.len(),
        quality = quality.score,
        healed = healed_cues.len(),
        "plan computed"
    );

    PlanOutcome {
        plan: Plan {
            order: ordered_ids,
            target_bpm,
            transitions,
            quality,
        },
        healed_cues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id_byte: u8, bpm: Option<f64>) -> PlannerTrack {
        PlannerTrack {
            id: Uuid::from_bytes([id_byte; 16]),
            bpm,
            duration_seconds: 200.0,
            beat_grid: vec![],
            phrases: vec![],
            structure: vec![],
            drop_moments: vec![],
            cue_points: None,
            camelot_key: None,
            genre: None,
        }
    }

    fn request(ids: &[PlannerTrack]) -> MixRequest {
        MixRequest {
            track_ids: ids.iter().map(|t| t.id).collect(),
            target_duration_seconds: 300,
            ..Default::default()
        }
    }

    #[test]
    fn test_median_bpm_even_count() {
        let tracks = vec![track(1, Some(120.0)), track(2, Some(124.0))];
        assert_eq!(median_bpm(&tracks), Some(122.0));
    }

    #[test]
    fn test_median_bpm_skips_nulls() {
        let tracks = vec![track(1, None), track(2, Some(130.0)), track(3, Some(120.0))];
        assert_eq!(median_bpm(&tracks), Some(125.0));
    }

    #[test]
    fn test_default_target_when_all_null() {
        let tracks = vec![track(1, None), track(2, None)];
        let outcome = plan(&tracks, &request(&tracks), &PlannerDefaults::default());
        assert_eq!(outcome.plan.target_bpm, 120.0);
        // Null-BPM tracks play untouched
        assert_eq!(tempo_ratio(outcome.plan.target_bpm, None), 1.0);
        assert_eq!(outcome.plan.transitions.len(), 1);
    }

    #[test]
    fn test_keep_order_preserved() {
        let tracks = vec![track(3, Some(140.0)), track(1, Some(100.0)), track(2, Some(120.0))];
        let mut req = request(&tracks);
        req.keep_order = Some(true);
        let outcome = plan(&tracks, &req, &PlannerDefaults::default());
        assert_eq!(
            outcome.plan.order,
            tracks.iter().map(|t| t.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_build_mode_sorts_ascending_bpm() {
        let tracks = vec![track(1, Some(140.0)), track(2, Some(100.0)), track(3, Some(120.0))];
        let mut req = request(&tracks);
        req.energy_mode = Some(EnergyMode::Build);
        let outcome = plan(&tracks, &req, &PlannerDefaults::default());
        assert_eq!(
            outcome.plan.order,
            vec![tracks[1].id, tracks[2].id, tracks[0].id]
        );
    }

    #[test]
    fn test_wave_mode_interleaves() {
        let tracks = vec![
            track(1, Some(100.0)),
            track(2, Some(110.0)),
            track(3, Some(120.0)),
            track(4, Some(130.0)),
        ];
        let mut req = request(&tracks);
        req.energy_mode = Some(EnergyMode::Wave);
        let outcome = plan(&tracks, &req, &PlannerDefaults::default());
        // low = [100, 110], high reversed = [130, 120]
        assert_eq!(
            outcome.plan.order,
            vec![tracks[0].id, tracks[3].id, tracks[1].id, tracks[2].id]
        );
    }

    #[test]
    fn test_default_order_by_target_distance() {
        let tracks = vec![track(1, Some(180.0)), track(2, Some(121.0)), track(3, Some(119.0))];
        let mut req = request(&tracks);
        req.target_bpm = Some(120.0);
        let outcome = plan(&tracks, &req, &PlannerDefaults::default());
        // 121 and 119 tie at distance 1; stable order keeps input order
        assert_eq!(
            outcome.plan.order,
            vec![tracks[1].id, tracks[2].id, tracks[0].id]
        );
    }

    #[test]
    fn test_single_track_empty_transitions() {
        let tracks = vec![track(1, Some(120.0))];
        let outcome = plan(&tracks, &request(&tracks), &PlannerDefaults::default());
        assert!(outcome.plan.transitions.is_empty());
        assert_eq!(outcome.plan.quality.score, 100.0);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let tracks = vec![track(1, Some(124.0)), track(2, Some(118.0)), track(3, None)];
        let req = request(&tracks);
        let a = plan(&tracks, &req, &PlannerDefaults::default());
        let b = plan(&tracks, &req, &PlannerDefaults::default());
        assert_eq!(a.plan, b.plan);
        assert_eq!(
            serde_json::to_string(&a.plan).unwrap(),
            serde_json::to_string(&b.plan).unwrap()
        );
    }

    #[test]
    fn test_overlap_bar_multiple_invariant() {
        let tracks = vec![track(1, Some(120.0)), track(2, Some(124.0)), track(3, Some(128.0))];
        let outcome = plan(&tracks, &request(&tracks), &PlannerDefaults::default());
        let bar = 240.0 / outcome.plan.target_bpm;
        for transition in &outcome.plan.transitions {
            let bars = transition.mix_point.overlap_seconds / bar;
            assert!((bars - bars.round()).abs() * bar < 0.001);
            assert!((2.0..=16.0).contains(&bars.round()));
        }
    }

    #[test]
    fn test_event_type_adjusts_fade() {
        let tracks = vec![track(1, Some(120.0)), track(2, Some(120.0))];
        let mut req = request(&tracks);
        req.transition_style = Some(TransitionStyle::Smooth);
        req.event_type = Some(EventType::Club);
        let outcome = plan(&tracks, &req, &PlannerDefaults::default());
        // smooth preset 8.0 − 0.5, under the 8 s cap
        assert_eq!(outcome.plan.transitions[0].fade_duration, 7.5);

        req.event_type = Some(EventType::Wedding);
        let outcome = plan(&tracks, &req, &PlannerDefaults::default());
        // 8.0 + 1.5 capped at 8
        assert_eq!(outcome.plan.transitions[0].fade_duration, 8.0);
    }

    #[test]
    fn test_tempo_gap_suggests_ramp() {
        let tracks = vec![track(1, Some(110.0)), track(2, Some(130.0))];
        let mut req = request(&tracks);
        req.keep_order = Some(true);
        let outcome = plan(&tracks, &req, &PlannerDefaults::default());
        let transition = &outcome.plan.transitions[0];
        assert_eq!(transition.bpm_diff, 20.0);
        assert_eq!(transition.suggested_type, SuggestedType::TempoRamp);
    }
}
