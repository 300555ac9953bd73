//! Phrase detection from the smoothed energy envelope
//!
//! A phrase is a span where the track sustains energy above its own
//! baseline. Hysteresis thresholds (enter high, exit low) keep brief
//! dips from splitting one musical phrase into fragments.

use super::envelope;
use serde::{Deserialize, Serialize};

/// Enter-phrase threshold as a multiple of the envelope mean
const ENTER_FACTOR: f32 = 1.15;

/// Exit-phrase threshold as a multiple of the envelope mean
const EXIT_FACTOR: f32 = 0.75;

/// A sustained-energy span
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    /// Span start in seconds
    pub start: f64,
    /// Span end in seconds
    pub end: f64,
    /// Mean envelope energy across the span
    pub energy: f64,
}

/// Detect phrases on a smoothed energy envelope
///
/// Output spans are disjoint and sorted by start; a span still active at
/// the end of the envelope closes at the final frame.
pub fn detect_phrases(smoothed: &[f32], sample_rate: u32) -> Vec<Phrase> {
    if smoothed.is_empty() {
        return Vec::new();
    }
    let mean: f32 = smoothed.iter().sum::<f32>() / smoothed.len() as f32;
    if mean <= 0.0 {
        return Vec::new();
    }
    let enter = ENTER_FACTOR * mean;
    let exit = EXIT_FACTOR * mean;

    let mut phrases = Vec::new();
    let mut active_start: Option<usize> = None;
    let mut acc = 0.0f64;

    for (i, &v) in smoothed.iter().enumerate() {
        match active_start {
            None => {
                if v > enter {
                    active_start = Some(i);
                    acc = f64::from(v);
                }
            }
            Some(start) => {
                if v < exit {
                    let len = i - start;
                    phrases.push(Phrase {
                        start: envelope::frame_time(start, sample_rate),
                        end: envelope::frame_time(i, sample_rate),
                        energy: acc / len as f64,
                    });
                    active_start = None;
                } else {
                    acc += f64::from(v);
                }
            }
        }
    }
    if let Some(start) = active_start {
        let len = smoothed.len() - start;
        phrases.push(Phrase {
            start: envelope::frame_time(start, sample_rate),
            end: envelope::frame_time(smoothed.len() - 1, sample_rate),
            energy: acc / len as f64,
        });
    }
    phrases
}
