//! Drop detection and rule-based structure labeling
//!
//! Drops are sharp energy surges on a coarsely smoothed envelope.
//! Structure labels are assigned by simple rules over the detected
//! phrases: first phrase is the intro, later phrases alternate
//! verse/chorus, drops get their own section, and a quiet tail becomes
//! the outro.

use super::envelope;
use super::phrase::Phrase;
use automix_common::SectionLabel;
use serde::{Deserialize, Serialize};

/// Peak-over-previous factor for drop candidates
const DROP_RISE_FACTOR: f32 = 1.1;

/// Peak-over-mean factor for drop candidates
const DROP_MEAN_FACTOR: f32 = 1.4;

/// Most drops reported per track
pub const MAX_DROPS: usize = 3;

/// Tail gap after the last labeled segment that earns an outro
const OUTRO_GAP_SECONDS: f64 = 4.0;

/// A labeled structural section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub label: SectionLabel,
    /// Section start in seconds
    pub start: f64,
    /// Section end in seconds
    pub end: f64,
    /// Labeler confidence in [0, 1]
    pub confidence: f64,
}

/// Detect drop moments on a coarsely smoothed envelope
///
/// A frame is a candidate when it is a local peak, rises at least 10%
/// over its predecessor, and sits at least 40% above the envelope mean.
/// The strongest candidates win; output is sorted by time.
pub fn detect_drops(smoothed: &[f32], sample_rate: u32) -> Vec<f64> {
    if smoothed.len() < 3 {
        return Vec::new();
    }
    let mean: f32 = smoothed.iter().sum::<f32>() / smoothed.len() as f32;
    if mean <= 0.0 {
        return Vec::new();
    }

    let mut candidates: Vec<(usize, f32)> = Vec::new();
    for i in 1..smoothed.len() - 1 {
        let prev = smoothed[i - 1];
        let curr = smoothed[i];
        let next = smoothed[i + 1];
        if curr >= next && prev > 0.0 && curr > DROP_RISE_FACTOR * prev && curr >= DROP_MEAN_FACTOR * mean
        {
            candidates.push((i, curr));
        }
    }

    // Strongest surges first, then back to chronological order
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(MAX_DROPS);
    candidates.sort_by_key(|(i, _)| *i);

    candidates
        .into_iter()
        .map(|(i, _)| {
            let t = envelope::frame_time(i, sample_rate);
            (t * 1000.0).round() / 1000.0
        })
        .collect()
}

/// Rule-based structure labeling over phrases and drops
///
/// Output is sorted by start with overlaps resolved in favor of the
/// earlier section, so `section[i].end <= section[i+1].start` holds.
pub fn label_structure(phrases: &[Phrase], drops: &[f64], duration: f64) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();

    if phrases.is_empty() {
        sections.push(Section {
            label: SectionLabel::Intro,
            start: 0.0,
            end: duration.min(15.0),
            confidence: 0.4,
        });
        if duration > 15.0 {
            sections.push(Section {
                label: SectionLabel::Body,
                start: 15.0,
                end: duration,
                confidence: 0.4,
            });
        }
    } else {
        for (i, phrase) in phrases.iter().enumerate() {
            let label = if i == 0 {
                SectionLabel::Intro
            } else if i % 2 == 1 {
                SectionLabel::Verse
            } else {
                SectionLabel::Chorus
            };
            sections.push(Section {
                label,
                start: phrase.start.clamp(0.0, duration),
                end: phrase.end.clamp(0.0, duration),
                confidence: if i == 0 { 0.7 } else { 0.5 },
            });
        }
    }

    for &drop in drops {
        sections.push(Section {
            label: SectionLabel::Drop,
            start: (drop - 1.0).max(0.0),
            end: (drop + 6.0).min(duration),
            confidence: 0.8,
        });
    }

    sections.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Resolve overlaps: the earlier section keeps its start, the later
    // one pushes the earlier end back to its own start
    let mut merged: Vec<Section> = Vec::with_capacity(sections.len());
    for section in sections {
        if let Some(last) = merged.last_mut() {
            if section.start < last.end {
                last.end = section.start.max(last.start);
            }
        }
        if section.end > section.start {
            merged.push(section);
        }
    }
    merged.retain(|s| s.end > s.start);

    // Quiet tail becomes the outro
    let last_end = merged.last().map(|s| s.end).unwrap_or(0.0);
    if duration - last_end > OUTRO_GAP_SECONDS {
        merged.push(Section {
            label: SectionLabel::Outro,
            start: last_end,
            end: duration,
            confidence: 0.6,
        });
    }

    merged
}
