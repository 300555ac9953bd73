//! Tempo estimation and beat grid construction
//!
//! BPM comes from the normalized autocorrelation of the onset envelope:
//! a periodic onset train correlates with itself at lags that are whole
//! multiples of the beat period. The search covers lags corresponding to
//! 70–180 BPM and picks the lag maximizing Pearson correlation.

use super::envelope;

/// Lowest reportable tempo
pub const BPM_MIN: f64 = 70.0;

/// Highest reportable tempo
pub const BPM_MAX: f64 = 180.0;

/// Beat grid entry cap
pub const BEAT_GRID_MAX: usize = 512;

/// Tempo estimate with detector confidence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEstimate {
    pub bpm: f64,
    /// `(corr + 1) / 2` of the winning lag, clamped to [0, 1]
    pub confidence: f64,
}

/// Pearson correlation of two equal-length slices
///
/// Returns 0 when either side has no variance.
fn pearson(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let mean_a = a.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let mean_b = b.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..a.len() {
        let da = f64::from(a[i]) - mean_a;
        let db = f64::from(b[i]) - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= f64::EPSILON || var_b <= f64::EPSILON {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Estimate tempo from an onset envelope
///
/// Returns `None` when the envelope is too short to correlate
/// (fewer than 4 frames, or no full lag window fits).
pub fn estimate_bpm(onset: &[f32], sample_rate: u32) -> Option<TempoEstimate> {
    if onset.len() < 4 {
        return None;
    }
    let frame_rate = envelope::frame_rate(sample_rate);
    let lag_min = (60.0 / BPM_MAX * frame_rate).round() as usize;
    let lag_max = (60.0 / BPM_MIN * frame_rate).round() as usize;
    if onset.len() <= lag_max {
        // Not enough material for the slowest candidate; shrink the range
        // rather than reporting nothing for short clips.
        if onset.len() <= lag_min + 2 {
            return None;
        }
    }
    let lag_hi = lag_max.min(onset.len() - 2);

    let mut best_lag = 0usize;
    let mut best_corr = f64::MIN;
    for lag in lag_min..=lag_hi {
        let head = &onset[..onset.len() - lag];
        let tail = &onset[lag..];
        let corr = pearson(head, tail);
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }
    if best_lag == 0 {
        return None;
    }

    let bpm = 60.0 * frame_rate / best_lag as f64;
    let confidence = ((best_corr + 1.0) / 2.0).clamp(0.0, 1.0);
    Some(TempoEstimate { bpm, confidence })
}

/// Regular beat grid `t_k = k × 60/bpm`, truncated at `duration`
///
/// Entries are rounded to 3 decimals and capped at [`BEAT_GRID_MAX`].
pub fn beat_grid(bpm: f64, duration: f64) -> Vec<f64> {
    if bpm <= 0.0 || duration <= 0.0 {
        return Vec::new();
    }
    let period = 60.0 / bpm;
    let mut grid = Vec::new();
    let mut k = 0usize;
    loop {
        let t = k as f64 * period;
        if t > duration || grid.len() >= BEAT_GRID_MAX {
            break;
        }
        grid.push((t * 1000.0).round() / 1000.0);
        k += 1;
    }
    grid
}
