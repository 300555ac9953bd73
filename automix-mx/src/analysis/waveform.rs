//! Reduced waveform for UI display
//!
//! 256 magnitude bins, each the mean absolute sample value over its
//! window, rounded to 6 decimals. Deterministic for identical input.

/// Number of output bins
pub const WAVEFORM_BINS: usize = 256;

/// Compute the reduced waveform
pub fn waveform_lite(samples: &[f32]) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }
    let bin_size = (samples.len() / WAVEFORM_BINS).max(1);
    let mut bins = Vec::with_capacity(WAVEFORM_BINS);
    for b in 0..WAVEFORM_BINS {
        let lo = b * bin_size;
        if lo >= samples.len() {
            break;
        }
        let hi = (lo + bin_size).min(samples.len());
        let mean = samples[lo..hi]
            .iter()
            .map(|s| f64::from(s.abs()))
            .sum::<f64>()
            / (hi - lo) as f64;
        bins.push((mean * 1e6).round() / 1e6);
    }
    bins
}
