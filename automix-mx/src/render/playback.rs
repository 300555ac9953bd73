//! Per-track playback plan
//!
//! Before any filter graph is built, every track gets a schedule: where
//! it starts in its own (tempo-adjusted) timeline, where it starts on
//! the output timeline, where its fades sit, and where it is trimmed so
//! the whole mix covers the target duration under the crossfades.

use crate::plan::{tempo_ratio, Plan};
use uuid::Uuid;

/// Renderer view of a track: identity, source length, tempo
#[derive(Debug, Clone)]
pub struct RenderTrack {
    pub id: Uuid,
    pub storage_key: String,
    pub mime: String,
    pub duration_seconds: f64,
    pub bpm: Option<f64>,
}

/// Schedule for one track inside the output mix
///
/// All times are seconds. `start_offset`/`trim_end` are in the track's
/// tempo-adjusted timeline; `start_time` is on the output timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackEntry {
    pub track_id: Uuid,
    pub tempo_ratio: f64,
    pub adjusted_duration: f64,
    pub start_offset: f64,
    pub fade_in_duration: f64,
    pub start_time: f64,
    pub fade_out_start: Option<f64>,
    pub fade_out_duration: f64,
    pub trim_end: f64,
}

impl PlaybackEntry {
    /// Seconds of this track that actually reach the output
    pub fn playable(&self) -> f64 {
        (self.trim_end - self.start_offset).max(0.0)
    }
}

/// Build the playback schedule for a plan
///
/// `tracks` must be in plan order. Each track is trimmed toward the
/// per-track playable target `(target + (N−1)·F̄)/N` and the last track
/// absorbs whatever duration remains.
pub fn build_playback_plan(
    plan: &Plan,
    tracks: &[RenderTrack],
    target_duration_seconds: f64,
) -> Vec<PlaybackEntry> {
    let n = tracks.len();
    if n == 0 {
        return Vec::new();
    }

    let mean_fade = if plan.transitions.is_empty() {
        0.0
    } else {
        plan.transitions.iter().map(|t| t.fade_duration).sum::<f64>()
            / plan.transitions.len() as f64
    };
    let per_track_target = (target_duration_seconds + (n as f64 - 1.0) * mean_fade) / n as f64;

    let mut entries: Vec<PlaybackEntry> = Vec::with_capacity(n);
    for (i, track) in tracks.iter().enumerate() {
        let ratio = tempo_ratio(plan.target_bpm, track.bpm);
        let adjusted_duration = track.duration_seconds / ratio;

        let start_offset = if i > 0 {
            (plan.transitions[i - 1].mix_in_selection.point / ratio)
                .clamp(0.0, (adjusted_duration - 1.0).max(0.0))
        } else {
            0.0
        };
        let fade_in_duration = if i > 0 {
            plan.transitions[i - 1].fade_duration
        } else {
            0.0
        };
        let next_fade = if i < n - 1 {
            plan.transitions[i].fade_duration
        } else {
            0.0
        };

        let mut trim_end = adjusted_duration.min(start_offset + per_track_target);
        // A fade-out must fit between start and trim
        if trim_end < start_offset + next_fade {
            trim_end = adjusted_duration.min(start_offset + next_fade);
        }

        let start_time = if i == 0 {
            0.0
        } else {
            let prev = &entries[i - 1];
            prev.start_time + (prev.playable() - fade_in_duration).max(0.0)
        };

        let (fade_out_start, fade_out_duration) = if i < n - 1 {
            (
                Some((trim_end - next_fade).max(start_offset)),
                next_fade,
            )
        } else {
            (None, 0.0)
        };

        entries.push(PlaybackEntry {
            track_id: track.id,
            tempo_ratio: ratio,
            adjusted_duration,
            start_offset,
            fade_in_duration,
            start_time,
            fade_out_start,
            fade_out_duration,
            trim_end,
        });
    }

    // Extend the last track to consume the remaining duration
    if let Some(last) = entries.last_mut() {
        let end_time = last.start_time + last.playable();
        let remaining = target_duration_seconds - end_time;
        if remaining > 0.0 {
            last.trim_end = last.adjusted_duration.min(last.trim_end + remaining);
        }
    }

    entries
}

/// Output length implied by a playback plan
pub fn planned_duration(entries: &[PlaybackEntry]) -> f64 {
    entries
        .last()
        .map(|e| e.start_time + e.playable())
        .unwrap_or(0.0)
}
