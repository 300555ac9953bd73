//! Short-time energy and onset envelopes
//!
//! Every downstream analysis stage (tempo, phrases, drops) consumes one
//! of the envelopes computed here. Frame/hop sizes are fixed; smoothing
//! windows differ per consumer and are pinned as constants.

/// Analysis frame size in samples
pub const FRAME_SIZE: usize = 1024;

/// Hop between consecutive frames in samples
pub const HOP_SIZE: usize = 512;

/// Moving-average window for phrase detection
pub const PHRASE_SMOOTHING: usize = 4;

/// Moving-average window for drop detection
pub const DROP_SMOOTHING: usize = 10;

/// Per-frame short-time energy: `E[i] = Σ x²/FRAME_SIZE` over frame i
///
/// Frames start every `HOP_SIZE` samples; a trailing partial frame is
/// still averaged over the samples it has.
pub fn energy_envelope(samples: &[f32]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mut envelope = Vec::with_capacity(samples.len() / HOP_SIZE + 1);
    let mut start = 0;
    while start < samples.len() {
        let end = (start + FRAME_SIZE).min(samples.len());
        let frame = &samples[start..end];
        let energy: f32 = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
        envelope.push(energy);
        start += HOP_SIZE;
    }
    envelope
}

/// Half-wave rectified first difference of the energy envelope
///
/// `O[i] = max(0, E[i] - E[i-1])`; the first frame has no predecessor
/// and contributes zero.
pub fn onset_envelope(energy: &[f32]) -> Vec<f32> {
    let mut onset = vec![0.0; energy.len()];
    for i in 1..energy.len() {
        onset[i] = (energy[i] - energy[i - 1]).max(0.0);
    }
    onset
}

/// Centered moving average with the given window width
///
/// Edges average over whatever neighbors exist, so output length equals
/// input length.
pub fn smooth(envelope: &[f32], window: usize) -> Vec<f32> {
    if window <= 1 || envelope.is_empty() {
        return envelope.to_vec();
    }
    let half = window / 2;
    let mut out = Vec::with_capacity(envelope.len());
    for i in 0..envelope.len() {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(envelope.len());
        let sum: f32 = envelope[lo..hi].iter().sum();
        out.push(sum / (hi - lo) as f32);
    }
    out
}

/// Seconds corresponding to envelope frame index `i`
pub fn frame_time(index: usize, sample_rate: u32) -> f64 {
    index as f64 * HOP_SIZE as f64 / f64::from(sample_rate)
}

/// Envelope frames per second at the given sample rate
pub fn frame_rate(sample_rate: u32) -> f64 {
    f64::from(sample_rate) / HOP_SIZE as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_envelope_of_silence_is_zero() {
        let samples = vec![0.0f32; HOP_SIZE * 8];
        let env = energy_envelope(&samples);
        assert!(!env.is_empty());
        assert!(env.iter().all(|&e| e == 0.0));
    }

    #[test]
    fn test_energy_envelope_tracks_amplitude() {
        // Quiet half then loud half
        let mut samples = vec![0.1f32; HOP_SIZE * 8];
        samples.extend(vec![0.8f32; HOP_SIZE * 8]);
        let env = energy_envelope(&samples);
        let mid = env.len() / 2;
        assert!(env[1] < env[mid + 2]);
        // DC signal of amplitude a has energy a²
        assert!((env[1] - 0.01).abs() < 1e-4);
    }

    #[test]
    fn test_onset_envelope_rectifies() {
        let energy = vec![0.0, 0.5, 0.2, 0.9];
        let onset = onset_envelope(&energy);
        assert_eq!(onset[0], 0.0);
        assert!((onset[1] - 0.5).abs() < 1e-6);
        assert_eq!(onset[2], 0.0); // falling edge rectified away
        assert!((onset[3] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_smooth_preserves_length_and_mean() {
        let env: Vec<f32> = (0..100).map(|i| (i % 7) as f32).collect();
        let smoothed = smooth(&env, PHRASE_SMOOTHING);
        assert_eq!(smoothed.len(), env.len());
        let mean_a: f32 = env.iter().sum::<f32>() / env.len() as f32;
        let mean_b: f32 = smoothed.iter().sum::<f32>() / smoothed.len() as f32;
        assert!((mean_a - mean_b).abs() < 0.2);
    }

    #[test]
    fn test_smooth_window_one_is_identity() {
        let env = vec![1.0, 2.0, 3.0];
        assert_eq!(smooth(&env, 1), env);
    }

    #[test]
    fn test_frame_time() {
        assert_eq!(frame_time(0, 44100), 0.0);
        let t = frame_time(86, 44100);
        assert!((t - 0.998).abs() < 0.01); // ~1 second at 44.1k/512
    }
}
