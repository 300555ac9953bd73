//! Plan quality scoring
//!
//! Every transition starts at 100 and loses points for tempo stretch,
//! vocal collisions, missed phrase alignment, and distant genres; a
//! phrase-aligned transition earns a small bonus. The overall score is
//! the mean. Each deduction also produces a suggestion the caller can
//! surface.

use super::presets::genre_distance;
use super::{PlannedTransition, PlannerTrack, QualityReport};
use automix_common::CollisionSeverity;

/// BPM difference beyond which tempo stretch becomes audible
const BPM_DIFF_LIMIT: f64 = 8.0;

/// Score one transition; returns the score and its suggestions
pub fn score_transition(
    transition: &PlannedTransition,
    from: &PlannerTrack,
    to: &PlannerTrack,
) -> (f64, Vec<String>) {
    let mut score: f64 = 100.0;
    let mut suggestions = Vec::new();

    if transition.bpm_diff > BPM_DIFF_LIMIT {
        score -= 15.0;
        suggestions.push(format!(
            "tempo gap of {:.0} BPM between tracks; consider a tempo ramp",
            transition.bpm_diff
        ));
    }

    match transition.vocal_collision.as_ref().map(|c| c.severity) {
        Some(CollisionSeverity::Major) => {
            score -= 25.0;
            suggestions.push(
                "vocals collide across the whole overlap; use an instrumental bridge".into(),
            );
        }
        Some(CollisionSeverity::Minor) => {
            score -= 10.0;
            suggestions.push("brief vocal overlap; a shorter fade would avoid it".into());
        }
        None => {}
    }

    if transition.mix_point.phrase_aligned {
        score += 3.0;
    } else {
        score -= 5.0;
        suggestions.push("transition is off the phrase grid".into());
    }

    if let (Some(genre_a), Some(genre_b)) = (from.genre.as_deref(), to.genre.as_deref()) {
        if let Some(distance) = genre_distance(genre_a, genre_b) {
            if distance >= 3 {
                score -= 10.0;
                suggestions.push(format!(
                    "genres {genre_a} and {genre_b} sit far apart; expect a style jump"
                ));
            }
        }
    }

    (score.clamp(0.0, 100.0), suggestions)
}

/// Score a whole plan
pub fn score_plan(
    transitions: &[PlannedTransition],
    tracks_by_id: &dyn Fn(uuid::Uuid) -> Option<PlannerTrack>,
) -> QualityReport {
    let mut transition_scores = Vec::with_capacity(transitions.len());
    let mut suggestions = Vec::new();

    for transition in transitions {
        let (from, to) = match (
            tracks_by_id(transition.from_id),
            tracks_by_id(transition.to_id),
        ) {
            (Some(f), Some(t)) => (f, t),
            _ => continue,
        };
        let (score, mut transition_suggestions) = score_transition(transition, &from, &to);
        transition_scores.push(score);
        suggestions.append(&mut transition_suggestions);
    }

    let score = if transition_scores.is_empty() {
        100.0
    } else {
        transition_scores.iter().sum::<f64>() / transition_scores.len() as f64
    };

    QualityReport {
        score: score.clamp(0.0, 100.0),
        transition_scores,
        suggestions,
    }
}
