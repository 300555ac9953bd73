//! Beat-grid alignment between adjacent tracks
//!
//! After tempo adjustment both grids tick at the target BPM; the
//! residual disagreement is a constant phase offset. The offset
//! minimizing Σ|gap| over matched beats is the negated median of the
//! signed nearest-beat gaps, clamped to ±half a bar so a transition
//! never shifts by more than half a measure.

use automix_common::music_time::bar_seconds;

/// Which beats participate in alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    /// Every 4th beat (bar starts) - robust for four-on-the-floor
    Downbeat,
    /// All beats
    Nearest,
}

/// Signed gap from `t` to the nearest entry of `grid`
fn nearest_gap(t: f64, grid: &[f64]) -> Option<f64> {
    if grid.is_empty() {
        return None;
    }
    let idx = grid.partition_point(|&g| g < t);
    let mut best: Option<f64> = None;
    for candidate in [idx.checked_sub(1), Some(idx)].into_iter().flatten() {
        if let Some(&g) = grid.get(candidate) {
            let gap = t - g;
            if best.map(|b: f64| gap.abs() < b.abs()).unwrap_or(true) {
                best = Some(gap);
            }
        }
    }
    best
}

/// Compute the beat offset to apply to the incoming track
///
/// Grids are given in source-track seconds; `ratio_from` / `ratio_to`
/// are the tempo ratios applied by the renderer, so matching happens in
/// adjusted (output-time) coordinates. Returns 0 when either grid is
/// empty.
pub fn beat_offset(
    grid_from: &[f64],
    grid_to: &[f64],
    ratio_from: f64,
    ratio_to: f64,
    target_bpm: f64,
    mode: AlignMode,
) -> f64 {
    if grid_from.is_empty() || grid_to.is_empty() {
        return 0.0;
    }
    let adjusted_from: Vec<f64> = grid_from.iter().map(|t| t / ratio_from).collect();
    let adjusted_to: Vec<f64> = grid_to.iter().map(|t| t / ratio_to).collect();

    let step = match mode {
        AlignMode::Downbeat => 4,
        AlignMode::Nearest => 1,
    };

    let mut gaps: Vec<f64> = adjusted_from
        .iter()
        .step_by(step)
        .filter_map(|&t| nearest_gap(t, &adjusted_to))
        .collect();
    if gaps.is_empty() {
        return 0.0;
    }

    // Σ|gap + offset| is minimized at offset = −median(gaps)
    gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if gaps.len() % 2 == 1 {
        gaps[gaps.len() / 2]
    } else {
        (gaps[gaps.len() / 2 - 1] + gaps[gaps.len() / 2]) / 2.0
    };

    let half_bar = bar_seconds(target_bpm) / 2.0;
    (-median).clamp(-half_bar, half_bar)
}
