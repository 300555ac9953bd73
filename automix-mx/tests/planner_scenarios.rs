//! End-to-end planner scenarios
//!
//! Exercises the full planning path over realistic track fixtures:
//! ordering, target tempo, cue derivation, mix-point validation, vocal
//! collisions and quality scoring.

use automix_common::music_time::bar_seconds;
use automix_common::{
    CollisionSeverity, EnergyMode, MixInStrategy, SectionLabel, SuggestedType, TransitionStyle,
};
use automix_mx::analysis::Section;
use automix_mx::plan::cues::CuePoints;
use automix_mx::plan::request::MixRequest;
use automix_mx::plan::{plan, PlannerDefaults, PlannerTrack};
use uuid::Uuid;

fn section(label: SectionLabel, start: f64, end: f64) -> Section {
    Section {
        label,
        start,
        end,
        confidence: 0.6,
    }
}

fn beat_grid(bpm: f64, duration: f64) -> Vec<f64> {
    let period = 60.0 / bpm;
    let mut grid = Vec::new();
    let mut k = 0;
    loop {
        let t = k as f64 * period;
        if t > duration || grid.len() >= 512 {
            break;
        }
        grid.push((t * 1000.0).round() / 1000.0);
        k += 1;
    }
    grid
}

fn track(id_byte: u8, bpm: f64, duration: f64, structure: Vec<Section>) -> PlannerTrack {
    PlannerTrack {
        id: Uuid::from_bytes([id_byte; 16]),
        bpm: Some(bpm),
        duration_seconds: duration,
        beat_grid: beat_grid(bpm, duration),
        phrases: vec![],
        structure,
        drop_moments: vec![],
        cue_points: None,
        camelot_key: Some("8A".parse().unwrap()),
        genre: None,
    }
}

fn request(tracks: &[PlannerTrack]) -> MixRequest {
    MixRequest {
        track_ids: tracks.iter().map(|t| t.id).collect(),
        target_duration_seconds: 300,
        ..Default::default()
    }
}

/// Scenario: two-track smooth mix at neighboring tempos
#[test]
fn two_track_smooth_mix() {
    let x = track(
        1,
        120.0,
        180.0,
        vec![
            section(SectionLabel::Intro, 0.0, 16.0),
            section(SectionLabel::Verse, 16.0, 96.0),
            section(SectionLabel::Chorus, 96.0, 160.0),
            section(SectionLabel::Outro, 160.0, 180.0),
        ],
    );
    let y = track(
        2,
        124.0,
        200.0,
        vec![
            section(SectionLabel::Intro, 0.0, 20.0),
            section(SectionLabel::Verse, 20.0, 100.0),
            section(SectionLabel::Drop, 100.0, 108.0),
            section(SectionLabel::Outro, 180.0, 200.0),
        ],
    );
    let tracks = vec![x.clone(), y.clone()];
    let mut req = request(&tracks);
    req.transition_style = Some(TransitionStyle::Smooth);
    req.energy_mode = Some(EnergyMode::Steady);

    let outcome = plan(&tracks, &req, &PlannerDefaults::default());
    let mix = &outcome.plan;

    // Median of {120, 124}
    assert_eq!(mix.target_bpm, 122.0);
    assert_eq!(mix.order, vec![x.id, y.id]);
    assert_eq!(mix.transitions.len(), 1);

    let transition = &mix.transitions[0];
    assert_eq!(transition.style, TransitionStyle::Smooth);
    assert!(transition.vocal_collision.is_none());

    let bar = bar_seconds(mix.target_bpm);
    let overlap = transition.mix_point.overlap_seconds;
    assert!(
        overlap >= 4.0 * bar - 1e-6 && overlap <= 8.0 * bar + 1e-6,
        "overlap {overlap} outside [4, 8] bars ({bar}s each)"
    );
    assert!(transition.mix_point.phrase_aligned);

    // Outgoing crossfade starts in the outro, as stored structure says
    assert_eq!(transition.mix_point.out_section, Some(SectionLabel::Outro));
    assert!(mix.quality.score >= 80.0, "quality {}", mix.quality.score);
}

/// Scenario: keep-order request with a drop-style mix-in
#[test]
fn keep_order_with_drop_mix_in() {
    let a = track(1, 120.0, 200.0, vec![section(SectionLabel::Outro, 170.0, 200.0)]);
    let b = track(2, 120.0, 200.0, vec![section(SectionLabel::Outro, 170.0, 200.0)]);
    let mut c = track(3, 120.0, 200.0, vec![section(SectionLabel::Drop, 64.0, 72.0)]);
    c.drop_moments = vec![64.0];

    let tracks = vec![a.clone(), b.clone(), c.clone()];
    let mut req = request(&tracks);
    req.target_duration_seconds = 240;
    req.keep_order = Some(true);
    req.transition_style = Some(TransitionStyle::Drop);

    let outcome = plan(&tracks, &req, &PlannerDefaults::default());
    let mix = &outcome.plan;

    assert_eq!(mix.order, vec![a.id, b.id, c.id]);

    let into_c = &mix.transitions[1];
    assert_eq!(into_c.to_id, c.id);
    assert_eq!(into_c.mix_in_selection.strategy, MixInStrategy::Drop);
    assert!(
        (into_c.mix_in_selection.point - 64.0).abs() < 1.0,
        "drop point {}",
        into_c.mix_in_selection.point
    );

    let bar = bar_seconds(mix.target_bpm);
    assert!(into_c.mix_point.overlap_seconds <= 4.0 * bar + 1e-6);
}

/// Scenario: vocal collision forces the instrumental-bridge suggestion
/// and a markedly lower quality score
#[test]
fn vocal_collision_downgrade() {
    use automix_mx::plan::mix_point::detect_vocal_collision;
    use automix_mx::plan::quality::score_transition;
    use automix_mx::plan::{MixInSelection, MixPoint, PlannedTransition};
    use automix_common::CrossfadeCurve;

    let from = track(1, 120.0, 240.0, vec![section(SectionLabel::Chorus, 0.0, 240.0)]);
    let to = track(2, 120.0, 240.0, vec![section(SectionLabel::Chorus, 0.0, 240.0)]);
    let bar = bar_seconds(120.0);

    let mix_point = MixPoint {
        out_start: 100.0,
        in_start: 32.0,
        overlap_seconds: 10.0 * bar,
        phrase_aligned: false,
        out_section: Some(SectionLabel::Chorus),
        in_section: Some(SectionLabel::Chorus),
        warnings: vec![],
    };
    let collision = detect_vocal_collision(&mix_point, &from, &to, 120.0).unwrap();
    assert_eq!(collision.severity, CollisionSeverity::Major);

    let transition = PlannedTransition {
        from_id: from.id,
        to_id: to.id,
        style: TransitionStyle::Smooth,
        fade_duration: 8.0,
        beat_offset_seconds: 0.0,
        curve1: CrossfadeCurve::Qsin,
        curve2: CrossfadeCurve::Qsin,
        mix_point,
        mix_in_selection: MixInSelection {
            point: 32.0,
            strategy: MixInStrategy::PostIntro,
            reason: String::new(),
        },
        vocal_collision: Some(collision),
        bpm_diff: 0.0,
        suggested_type: SuggestedType::InstrumentalBridge,
    };

    let (score, _) = score_transition(&transition, &from, &to);
    assert!(score <= 75.0, "score {score}");
}

/// Scenario: missing BPM falls back to the default target and identity
/// tempo ratio
#[test]
fn missing_bpm_uses_fallback() {
    let mut a = track(1, 120.0, 200.0, vec![]);
    a.bpm = None;
    a.beat_grid.clear();
    let mut b = track(2, 120.0, 200.0, vec![]);
    b.bpm = None;
    b.beat_grid.clear();

    let tracks = vec![a, b];
    let req = request(&tracks);
    let outcome = plan(&tracks, &req, &PlannerDefaults::default());

    assert_eq!(outcome.plan.target_bpm, 120.0);
    assert_eq!(outcome.plan.transitions.len(), 1);
    assert_eq!(
        automix_mx::plan::tempo_ratio(outcome.plan.target_bpm, None),
        1.0
    );
    // Plan remains well-formed: bounded mix points, bar-multiple overlap
    let transition = &outcome.plan.transitions[0];
    assert!(transition.mix_point.out_start >= 0.0);
    assert!(transition.mix_point.in_start >= 0.0);
}

/// Scenario: a stored mix-out inside a drop relocates to the outro,
/// with a warning and lost phrase alignment
#[test]
fn forbidden_mix_out_advances() {
    let mut from = track(
        1,
        120.0,
        240.0,
        vec![
            section(SectionLabel::Verse, 16.0, 120.0),
            section(SectionLabel::Drop, 120.0, 136.0),
            section(SectionLabel::Outro, 208.0, 240.0),
        ],
    );
    // Stored, non-stale cue set pointing the mix-out into the drop
    from.cue_points = Some(CuePoints {
        mix_in: 16.0,
        mix_out: 128.0,
        drop: Some(120.0),
        breakdown: None,
        confidence: 0.9,
    });
    let to = track(2, 120.0, 240.0, vec![section(SectionLabel::Intro, 0.0, 16.0)]);

    let tracks = vec![from.clone(), to.clone()];
    let mut req = request(&tracks);
    req.keep_order = Some(true);

    let outcome = plan(&tracks, &req, &PlannerDefaults::default());
    let transition = &outcome.plan.transitions[0];

    assert_eq!(transition.mix_point.out_start, 208.0);
    assert_eq!(transition.mix_point.out_section, Some(SectionLabel::Outro));
    assert!(!transition.mix_point.warnings.is_empty());
    assert!(!transition.mix_point.phrase_aligned);
    // The fresh stored cue set was not healed
    assert!(outcome.healed_cues.iter().all(|(id, _)| *id != from.id));
}

/// Plans are byte-for-byte deterministic
#[test]
fn plan_determinism() {
    let tracks = vec![
        track(1, 126.0, 210.0, vec![section(SectionLabel::Intro, 0.0, 15.0)]),
        track(2, 121.0, 190.0, vec![section(SectionLabel::Outro, 170.0, 190.0)]),
        track(3, 131.0, 240.0, vec![section(SectionLabel::Drop, 60.0, 70.0)]),
    ];
    let req = request(&tracks);
    let a = plan(&tracks, &req, &PlannerDefaults::default());
    let b = plan(&tracks, &req, &PlannerDefaults::default());
    assert_eq!(
        serde_json::to_vec(&a.plan).unwrap(),
        serde_json::to_vec(&b.plan).unwrap()
    );
}

/// Mix points stay inside both tracks' adjusted durations and overlaps
/// stay bar-multiples, across a spread of tempos
#[test]
fn mix_point_bounds_and_overlap_invariants() {
    let tempos = [70.0, 95.0, 120.0, 150.0, 180.0];
    for (i, &bpm_a) in tempos.iter().enumerate() {
        for &bpm_b in &tempos[i..] {
            let a = track(10, bpm_a, 200.0, vec![]);
            let b = track(11, bpm_b, 220.0, vec![]);
            let tracks = vec![a.clone(), b.clone()];
            let req = request(&tracks);
            let outcome = plan(&tracks, &req, &PlannerDefaults::default());
            let mix = &outcome.plan;

            for transition in &mix.transitions {
                let from = tracks.iter().find(|t| t.id == transition.from_id).unwrap();
                let to = tracks.iter().find(|t| t.id == transition.to_id).unwrap();
                let ratio_from =
                    automix_mx::plan::tempo_ratio(mix.target_bpm, from.bpm);
                let ratio_to = automix_mx::plan::tempo_ratio(mix.target_bpm, to.bpm);
                assert!((0.75..=1.33).contains(&ratio_from));
                assert!((0.75..=1.33).contains(&ratio_to));

                let point = &transition.mix_point;
                assert!(point.out_start >= 0.0);
                assert!(point.out_start <= from.duration_seconds / ratio_from + 1e-6);
                assert!(point.in_start >= 0.0);
                assert!(point.in_start <= to.duration_seconds / ratio_to + 1e-6);

                let bar = bar_seconds(mix.target_bpm);
                let bars = point.overlap_seconds / bar;
                assert!(
                    (bars - bars.round()).abs() * bar < 0.001,
                    "overlap {} not a bar multiple at {} BPM",
                    point.overlap_seconds,
                    mix.target_bpm
                );
                assert!((2.0..=16.0).contains(&bars.round()));
            }
        }
    }
}

/// After validation no mix-out sits in a forbidden section when an
/// allowed one exists later in the track
#[test]
fn structure_rule_compliance() {
    let from = track(
        1,
        120.0,
        240.0,
        vec![
            section(SectionLabel::Buildup, 96.0, 112.0),
            section(SectionLabel::Chorus, 112.0, 176.0),
            section(SectionLabel::Outro, 224.0, 240.0),
        ],
    );
    let to = track(2, 120.0, 240.0, vec![section(SectionLabel::Intro, 0.0, 16.0)]);
    let tracks = vec![from.clone(), to];
    let mut req = request(&tracks);
    req.keep_order = Some(true);

    let outcome = plan(&tracks, &req, &PlannerDefaults::default());
    let point = &outcome.plan.transitions[0].mix_point;
    if let Some(label) = point.out_section {
        assert!(
            !matches!(
                label,
                SectionLabel::Drop | SectionLabel::Chorus | SectionLabel::Buildup
            ),
            "mix-out still in forbidden section {label:?}"
        );
    }
}

/// Newly derived cue points surface for persistence exactly once per
/// track without a stored set
#[test]
fn healed_cues_reported() {
    let a = track(1, 120.0, 200.0, vec![section(SectionLabel::Intro, 0.0, 16.0)]);
    let mut b = track(2, 120.0, 200.0, vec![]);
    b.cue_points = Some(CuePoints {
        mix_in: 16.0,
        mix_out: 160.0,
        drop: None,
        breakdown: None,
        confidence: 0.9,
    });
    let tracks = vec![a.clone(), b];
    let req = request(&tracks);
    let outcome = plan(&tracks, &req, &PlannerDefaults::default());

    let healed_ids: Vec<Uuid> = outcome.healed_cues.iter().map(|(id, _)| *id).collect();
    assert_eq!(healed_ids, vec![a.id]);
}
