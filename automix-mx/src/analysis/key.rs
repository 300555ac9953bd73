//! Musical key estimation
//!
//! A monophonic fundamental detector (YIN-style cumulative mean
//! normalized difference) runs over 2048-sample frames; valid per-frame
//! fundamentals accumulate into a 12-bin pitch-class histogram, which is
//! correlated against all 24 rotated Krumhansl-Schmuckler profiles. The
//! winning rotation gives root and mode; the margin over the runner-up
//! gives confidence.

use automix_common::camelot::{CamelotKey, KeyMode};

/// Frame size for fundamental detection
const KEY_FRAME_SIZE: usize = 2048;

/// Hop between fundamental detection frames
const KEY_HOP_SIZE: usize = 1024;

/// CMNDF acceptance threshold
const YIN_THRESHOLD: f32 = 0.15;

/// Lowest fundamental considered voiced
const F0_MIN_HZ: f64 = 80.0;

/// Highest fundamental considered voiced
const F0_MAX_HZ: f64 = 1000.0;

/// Krumhansl-Schmuckler major profile (C root)
const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Schmuckler minor profile (C root)
const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Result of key estimation
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEstimate {
    /// Root pitch class, C=0
    pub root: usize,
    pub mode: KeyMode,
    pub camelot: CamelotKey,
    /// Conventional name, e.g. "A minor"
    pub signature: String,
    /// Margin of the winning profile over the runner-up, in [0, 1]
    pub confidence: f64,
}

/// YIN-style fundamental for one frame; `None` when unvoiced
///
/// Computes the difference function d(τ), normalizes it cumulatively,
/// and accepts the first τ dipping under the threshold (falling back to
/// the global minimum when nothing does but the minimum is decisive).
pub fn detect_f0(frame: &[f32], sample_rate: u32) -> Option<f64> {
    if frame.len() < KEY_FRAME_SIZE / 2 {
        return None;
    }
    let sr = f64::from(sample_rate);
    let tau_min = ((sr / F0_MAX_HZ).floor() as usize).max(2);
    let tau_max = ((sr / F0_MIN_HZ).ceil() as usize).min(frame.len() / 2);
    if tau_min >= tau_max {
        return None;
    }

    // Difference function
    let mut diff = vec![0.0f32; tau_max + 1];
    for tau in tau_min..=tau_max {
        let mut sum = 0.0f32;
        for i in 0..(frame.len() - tau) {
            let d = frame[i] - frame[i + tau];
            sum += d * d;
        }
        diff[tau] = sum;
    }

    // Cumulative mean normalized difference
    let mut cmndf = vec![1.0f32; tau_max + 1];
    let mut running = 0.0f32;
    for tau in tau_min..=tau_max {
        running += diff[tau];
        if running > 0.0 {
            cmndf[tau] = diff[tau] * (tau - tau_min + 1) as f32 / running;
        }
    }

    // First dip under threshold, extended to its local minimum
    let mut best_tau = None;
    for tau in tau_min..=tau_max {
        if cmndf[tau] < YIN_THRESHOLD {
            let mut t = tau;
            while t + 1 <= tau_max && cmndf[t + 1] < cmndf[t] {
                t += 1;
            }
            best_tau = Some(t);
            break;
        }
    }
    let tau = match best_tau {
        Some(t) => t,
        None => {
            // Fall back to the global minimum if it is decisive
            let (t, v) = (tau_min..=tau_max)
                .map(|t| (t, cmndf[t]))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;
            if v > 0.3 {
                return None;
            }
            t
        }
    };

    let f0 = sr / tau as f64;
    if (F0_MIN_HZ..=F0_MAX_HZ).contains(&f0) {
        Some(f0)
    } else {
        None
    }
}

/// Pitch class (C=0) of a fundamental frequency
pub fn pitch_class(f0: f64) -> usize {
    // A4 = 440 Hz is pitch class 9
    let semitones_from_a4 = 12.0 * (f0 / 440.0).log2();
    let pc = (semitones_from_a4.round() as i64 + 9).rem_euclid(12);
    pc as usize
}

/// Accumulate a pitch-class histogram over all voiced frames
pub fn pitch_class_histogram(samples: &[f32], sample_rate: u32) -> [f64; 12] {
    let mut histogram = [0.0f64; 12];
    let mut start = 0;
    while start + KEY_FRAME_SIZE <= samples.len() {
        let frame = &samples[start..start + KEY_FRAME_SIZE];
        if let Some(f0) = detect_f0(frame, sample_rate) {
            histogram[pitch_class(f0)] += 1.0;
        }
        start += KEY_HOP_SIZE;
    }
    histogram
}

fn correlate(histogram: &[f64; 12], profile: &[f64; 12], root: usize) -> f64 {
    // Pearson correlation of histogram against the profile rotated to `root`
    let n = 12.0;
    let mean_h: f64 = histogram.iter().sum::<f64>() / n;
    let mean_p: f64 = profile.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_h = 0.0;
    let mut var_p = 0.0;
    for i in 0..12 {
        let dh = histogram[(root + i) % 12] - mean_h;
        let dp = profile[i] - mean_p;
        cov += dh * dp;
        var_h += dh * dh;
        var_p += dp * dp;
    }
    if var_h <= f64::EPSILON || var_p <= f64::EPSILON {
        return 0.0;
    }
    cov / (var_h.sqrt() * var_p.sqrt())
}

/// Pick the best (root, mode) for a pitch-class histogram
///
/// Returns `None` for an empty histogram (no voiced frames).
pub fn best_key_from_histogram(histogram: &[f64; 12]) -> Option<KeyEstimate> {
    if histogram.iter().all(|&v| v == 0.0) {
        return None;
    }
    let mut scores: Vec<(usize, KeyMode, f64)> = Vec::with_capacity(24);
    for root in 0..12 {
        scores.push((root, KeyMode::Major, correlate(histogram, &MAJOR_PROFILE, root)));
        scores.push((root, KeyMode::Minor, correlate(histogram, &MINOR_PROFILE, root)));
    }
    scores.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    let (root, mode, top) = scores[0];
    let second = scores[1].2;
    if top <= 0.0 {
        return None;
    }
    let confidence = ((top - second.max(0.0)) / top).clamp(0.0, 1.0);

    let camelot = CamelotKey::from_pitch_class(root, mode)?;
    let signature = CamelotKey::signature_name(root, mode)?;
    Some(KeyEstimate {
        root,
        mode,
        camelot,
        signature,
        confidence,
    })
}

/// Full key estimation over a PCM buffer
pub fn estimate_key(samples: &[f32], sample_rate: u32) -> Option<KeyEstimate> {
    let histogram = pitch_class_histogram(samples, sample_rate);
    best_key_from_histogram(&histogram)
}
