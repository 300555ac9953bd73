//! Mix-in selection, mix-point construction and validation
//!
//! Selection picks where the incoming track should enter based on the
//! requested style, the set's energy phase, and what the structure
//! offers. Construction quantizes the overlap to whole target-tempo
//! bars. Validation relocates points that land in sections a DJ would
//! never cut on (a drop, a chorus), recording warnings instead of
//! failing.

use super::cues::CuePoints;
use super::presets::{is_mix_in_forbidden, is_mix_out_allowed, is_mix_out_forbidden};
use super::{MixInSelection, MixPoint, PlannerTrack, VocalCollision};
use automix_common::music_time::{bar_seconds, is_phrase_aligned, snap_to_phrase};
use automix_common::{CollisionSeverity, EnergyPhase, MixInStrategy, SectionLabel, TransitionStyle};

/// Pick the mix-in strategy and point for the incoming track
pub fn select_mix_in(
    to: &PlannerTrack,
    cues: &CuePoints,
    style: TransitionStyle,
    phase: EnergyPhase,
    preset_fade: f64,
    target_bpm: f64,
) -> MixInSelection {
    let bar = bar_seconds(target_bpm);
    let to_bpm = to.bpm.unwrap_or(120.0);
    let snap = |t: f64| snap_to_phrase(t, to_bpm).clamp(0.0, to.duration_seconds);

    if style == TransitionStyle::Drop {
        if let Some(drop) = cues.drop {
            return MixInSelection {
                point: drop,
                strategy: MixInStrategy::Drop,
                reason: "drop transition lands on the detected drop".into(),
            };
        }
    }

    if phase == EnergyPhase::Peak {
        if let Some(buildup) = to.section(SectionLabel::Buildup) {
            return MixInSelection {
                point: snap(buildup.start),
                strategy: MixInStrategy::Buildup,
                reason: "peak phase enters through the buildup".into(),
            };
        }
        if let Some(drop) = cues.drop {
            return MixInSelection {
                point: drop,
                strategy: MixInStrategy::Drop,
                reason: "peak phase with no buildup enters at the drop".into(),
            };
        }
    }

    if preset_fade < 8.0 * bar {
        return MixInSelection {
            point: cues.mix_in,
            strategy: MixInStrategy::PostIntro,
            reason: "short fade enters after the intro".into(),
        };
    }
    if preset_fade >= 16.0 * bar {
        return MixInSelection {
            point: 0.0,
            strategy: MixInStrategy::Intro,
            reason: "long fade can carry the full intro".into(),
        };
    }
    if let Some(verse) = to.section(SectionLabel::Verse) {
        return MixInSelection {
            point: snap(verse.start),
            strategy: MixInStrategy::Verse,
            reason: "medium fade enters at the first verse".into(),
        };
    }
    MixInSelection {
        point: cues.mix_in,
        strategy: MixInStrategy::PostIntro,
        reason: "no better structure; entering after the intro".into(),
    }
}

/// Build the mix point for one transition
///
/// `out_start` comes from the outgoing track's cue set; `in_start` is
/// the phrase-snapped selection point. Overlap is `[2, 16]` whole bars
/// at the target tempo, with drop transitions allowed to go as tight as
/// 2 bars.
#[allow(clippy::too_many_arguments)]
pub fn build_mix_point(
    from: &PlannerTrack,
    from_cues: &CuePoints,
    to: &PlannerTrack,
    selection: &MixInSelection,
    preset_fade: f64,
    target_bpm: f64,
    ratio_from: f64,
    ratio_to: f64,
) -> MixPoint {
    let bar = bar_seconds(target_bpm);
    let to_bpm = to.bpm.unwrap_or(120.0);

    let out_bound = from.duration_seconds.min(from.duration_seconds / ratio_from);
    let in_bound = to.duration_seconds.min(to.duration_seconds / ratio_to);

    let out_start = from_cues.mix_out.clamp(0.0, out_bound);
    let in_start = snap_to_phrase(selection.point, to_bpm).clamp(0.0, in_bound);

    let min_bars = if selection.strategy == MixInStrategy::Drop {
        2.0
    } else {
        4.0
    };
    let overlap_hint = preset_fade.max(1.0);
    let overlap_bars = (overlap_hint / bar).round().max(min_bars).min(16.0);
    let overlap_seconds = overlap_bars * bar;

    let phrase_aligned = is_phrase_aligned(in_start, to_bpm);

    MixPoint {
        out_start,
        in_start,
        overlap_seconds,
        phrase_aligned,
        out_section: from.section_at(out_start),
        in_section: to.section_at(in_start),
        warnings: Vec::new(),
    }
}

/// Relocate mix points that violate the structure rules
///
/// A forbidden mix-out advances to the next allowed segment (or falls
/// back to eight bars before the last labeled moment); a forbidden
/// mix-in (outside drop strategy) pushes forward by four bars. Warnings
/// record every move; validation never fails a plan.
pub fn validate_mix_point(
    point: &mut MixPoint,
    from: &PlannerTrack,
    to: &PlannerTrack,
    strategy: MixInStrategy,
) {
    let from_bpm = from.bpm.unwrap_or(120.0);
    let to_bpm = to.bpm.unwrap_or(120.0);
    let from_bar = bar_seconds(from_bpm);

    if let Some(label) = from.section_at(point.out_start) {
        if is_mix_out_forbidden(label) {
            let old = point.out_start;
            let relocated = from
                .structure
                .iter()
                .find(|s| s.start > old && is_mix_out_allowed(s.label))
                .map(|s| s.start)
                .unwrap_or_else(|| {
                    let last_end = from.structure.last().map(|s| s.end).unwrap_or(old);
                    last_end - 8.0 * from_bar
                });
            let snapped = snap_to_phrase(relocated, from_bpm).clamp(0.0, from.duration_seconds);
            point.out_start = snapped;
            point.out_section = from.section_at(snapped);
            point.warnings.push(format!(
                "mix-out moved out of {} from {:.1}s to {:.1}s",
                label.as_str(),
                old,
                snapped
            ));
            if (snapped - old).abs() > from_bar / 2.0 {
                point.phrase_aligned = false;
            }
        }
    }

    if strategy != MixInStrategy::Drop {
        if let Some(label) = to.section_at(point.in_start) {
            if is_mix_in_forbidden(label) {
                let old = point.in_start;
                let pushed = old + 4.0 * bar_seconds(to_bpm);
                let snapped = snap_to_phrase(pushed, to_bpm).clamp(0.0, to.duration_seconds);
                point.in_start = snapped;
                point.in_section = to.section_at(snapped);
                point.warnings.push(format!(
                    "mix-in pushed out of {} from {:.1}s to {:.1}s",
                    label.as_str(),
                    old,
                    snapped
                ));
            }
        }
    }
}

/// Detect overlapping vocal sections at a transition
pub fn detect_vocal_collision(
    point: &MixPoint,
    from: &PlannerTrack,
    to: &PlannerTrack,
    target_bpm: f64,
) -> Option<VocalCollision> {
    if point.overlap_seconds <= 0.0 {
        return None;
    }
    let out_vocal = from
        .section_at(point.out_start)
        .map(|l| l.carries_vocals())
        .unwrap_or(false);
    let in_vocal = to
        .section_at(point.in_start)
        .map(|l| l.carries_vocals())
        .unwrap_or(false);
    if !(out_vocal && in_vocal) {
        return None;
    }
    let severity = if point.overlap_seconds > 8.0 * bar_seconds(target_bpm) {
        CollisionSeverity::Major
    } else {
        CollisionSeverity::Minor
    };
    Some(VocalCollision {
        severity,
        overlap_seconds: point.overlap_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Section;
    use automix_common::TransitionStyle;
    use uuid::Uuid;

    fn section(label: SectionLabel, start: f64, end: f64) -> Section {
        Section {
            label,
            start,
            end,
            confidence: 0.6,
        }
    }

    fn track(bpm: f64, duration: f64, structure: Vec<Section>) -> PlannerTrack {
        PlannerTrack {
            id: Uuid::new_v4(),
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

    fn cues(mix_in: f64, mix_out: f64, drop: Option<f64>) -> CuePoints {
        CuePoints {
            mix_in,
            mix_out,
            drop,
            breakdown: None,
            confidence: 0.8,
        }
    }

    #[test]
    fn test_drop_style_targets_drop() {
        let to = track(120.0, 200.0, vec![]);
        let selection = select_mix_in(
            &to,
            &cues(16.0, 160.0, Some(64.0)),
            TransitionStyle::Drop,
            EnergyPhase::Build,
            4.0,
            120.0,
        );
        assert_eq!(selection.strategy, MixInStrategy::Drop);
        assert_eq!(selection.point, 64.0);
    }

    #[test]
    fn test_peak_phase_prefers_buildup() {
        let to = track(
            120.0,
            200.0,
            vec![section(SectionLabel::Buildup, 48.0, 64.0)],
        );
        let selection = select_mix_in(
            &to,
            &cues(16.0, 160.0, Some(64.0)),
            TransitionStyle::Smooth,
            EnergyPhase::Peak,
            8.0,
            120.0,
        );
        assert_eq!(selection.strategy, MixInStrategy::Buildup);
        assert_eq!(selection.point, 48.0);
    }

    #[test]
    fn test_short_fade_enters_post_intro() {
        let to = track(120.0, 200.0, vec![]);
        // 8 bars at 120 BPM is 16 s; an 8 s fade is short
        let selection = select_mix_in(
            &to,
            &cues(16.0, 160.0, None),
            TransitionStyle::Smooth,
            EnergyPhase::Build,
            8.0,
            120.0,
        );
        assert_eq!(selection.strategy, MixInStrategy::PostIntro);
        assert_eq!(selection.point, 16.0);
    }

    #[test]
    fn test_overlap_is_whole_bars_in_range() {
        let from = track(
            120.0,
            180.0,
            vec![section(SectionLabel::Outro, 160.0, 180.0)],
        );
        let to = track(124.0, 200.0, vec![]);
        let selection = MixInSelection {
            point: 15.48,
            strategy: MixInStrategy::PostIntro,
            reason: String::new(),
        };
        let point = build_mix_point(
            &from,
            &cues(16.0, 160.0, None),
            &to,
            &selection,
            8.0,
            122.0,
            1.0,
            122.0 / 124.0,
        );
        let bar = bar_seconds(122.0);
        let bars = point.overlap_seconds / bar;
        assert!((bars - bars.round()).abs() < 1e-6);
        assert!((2.0..=16.0).contains(&bars.round()));
    }

    #[test]
    fn test_drop_strategy_allows_two_bars() {
        let from = track(120.0, 180.0, vec![]);
        let to = track(120.0, 200.0, vec![]);
        let selection = MixInSelection {
            point: 64.0,
            strategy: MixInStrategy::Drop,
            reason: String::new(),
        };
        let point = build_mix_point(
            &from,
            &cues(16.0, 116.0, Some(64.0)),
            &to,
            &selection,
            2.0,
            120.0,
            1.0,
            1.0,
        );
        let bar = bar_seconds(120.0);
        assert!(point.overlap_seconds <= 4.0 * bar + 1e-9);
        assert!(point.overlap_seconds >= 2.0 * bar - 1e-9);
    }

    #[test]
    fn test_forbidden_mix_out_advances_to_outro() {
        // Mix-out lands inside a drop; a later outro exists
        let from = track(
            120.0,
            240.0,
            vec![
                section(SectionLabel::Drop, 120.0, 136.0),
                section(SectionLabel::Outro, 208.0, 240.0),
            ],
        );
        let to = track(120.0, 200.0, vec![]);
        let mut point = MixPoint {
            out_start: 128.0,
            in_start: 16.0,
            overlap_seconds: 16.0,
            phrase_aligned: true,
            out_section: Some(SectionLabel::Drop),
            in_section: None,
            warnings: vec![],
        };
        validate_mix_point(&mut point, &from, &to, MixInStrategy::PostIntro);
        assert_eq!(point.out_start, 208.0);
        assert_eq!(point.out_section, Some(SectionLabel::Outro));
        assert_eq!(point.warnings.len(), 1);
        // Moved far past half a bar
        assert!(!point.phrase_aligned);
    }

    #[test]
    fn test_forbidden_mix_in_pushed_forward() {
        let to = track(
            120.0,
            240.0,
            vec![
                section(SectionLabel::Chorus, 16.0, 48.0),
                section(SectionLabel::Verse, 48.0, 96.0),
            ],
        );
        let from = track(120.0, 180.0, vec![]);
        let mut point = MixPoint {
            out_start: 100.0,
            in_start: 16.0,
            overlap_seconds: 16.0,
            phrase_aligned: true,
            out_section: None,
            in_section: Some(SectionLabel::Chorus),
            warnings: vec![],
        };
        validate_mix_point(&mut point, &from, &to, MixInStrategy::PostIntro);
        // 16 + 4 bars (8 s) = 24, snapped to the 16 s phrase grid = 32
        assert_eq!(point.in_start, 32.0);
        assert_eq!(point.in_section, Some(SectionLabel::Verse));
        assert_eq!(point.warnings.len(), 1);
    }

    #[test]
    fn test_drop_strategy_skips_mix_in_validation() {
        let to = track(120.0, 240.0, vec![section(SectionLabel::Drop, 60.0, 70.0)]);
        let from = track(120.0, 180.0, vec![]);
        let mut point = MixPoint {
            out_start: 100.0,
            in_start: 64.0,
            overlap_seconds: 8.0,
            phrase_aligned: true,
            out_section: None,
            in_section: Some(SectionLabel::Drop),
            warnings: vec![],
        };
        validate_mix_point(&mut point, &from, &to, MixInStrategy::Drop);
        assert_eq!(point.in_start, 64.0);
        assert!(point.warnings.is_empty());
    }

    #[test]
    fn test_vocal_collision_severity() {
        let from = track(120.0, 240.0, vec![section(SectionLabel::Chorus, 90.0, 130.0)]);
        let to = track(120.0, 240.0, vec![section(SectionLabel::Chorus, 10.0, 50.0)]);
        let bar = bar_seconds(120.0);

        let mut point = MixPoint {
            out_start: 100.0,
            in_start: 16.0,
            overlap_seconds: 10.0 * bar,
            phrase_aligned: true,
            out_section: Some(SectionLabel::Chorus),
            in_section: Some(SectionLabel::Chorus),
            warnings: vec![],
        };
        let collision = detect_vocal_collision(&point, &from, &to, 120.0).unwrap();
        assert_eq!(collision.severity, CollisionSeverity::Major);

        point.overlap_seconds = 4.0 * bar;
        let collision = detect_vocal_collision(&point, &from, &to, 120.0).unwrap();
        assert_eq!(collision.severity, CollisionSeverity::Minor);
    }

    #[test]
    fn test_no_collision_without_vocals() {
        let from = track(120.0, 240.0, vec![section(SectionLabel::Outro, 90.0, 130.0)]);
        let to = track(120.0, 240.0, vec![section(SectionLabel::Intro, 0.0, 20.0)]);
        let point = MixPoint {
            out_start: 100.0,
            in_start: 8.0,
            overlap_seconds: 16.0,
            phrase_aligned: true,
            out_section: Some(SectionLabel::Outro),
            in_section: Some(SectionLabel::Intro),
            warnings: vec![],
        };
        assert!(detect_vocal_collision(&point, &from, &to, 120.0).is_none());
    }
}
