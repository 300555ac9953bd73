//! Musical time arithmetic
//!
//! All mix timing decisions are made in seconds but quantized to musical
//! units derived from a BPM: a *bar* is one 4/4 measure (`240 / bpm`
//! seconds), a *phrase* is eight bars. Mix points snap to the phrase
//! grid so transitions land where a listener expects a boundary.

/// Beats per bar (4/4 assumed throughout)
pub const BEATS_PER_BAR: f64 = 4.0;

/// Bars per phrase (common EDM convention)
pub const BARS_PER_PHRASE: f64 = 8.0;

/// Duration of one bar in seconds at the given BPM
///
/// Falls back to 120 BPM for non-positive inputs so callers never divide
/// by zero on tracks with missing analysis.
pub fn bar_seconds(bpm: f64) -> f64 {
    let bpm = if bpm > 0.0 { bpm } else { 120.0 };
    60.0 / bpm * BEATS_PER_BAR
}

/// Duration of one phrase (8 bars) in seconds at the given BPM
pub fn phrase_seconds(bpm: f64) -> f64 {
    bar_seconds(bpm) * BARS_PER_PHRASE
}

/// Snap a time to the nearest multiple of `unit` seconds
pub fn snap_to_unit(t: f64, unit: f64) -> f64 {
    if unit <= 0.0 {
        return t;
    }
    (t / unit).round() * unit
}

/// Snap a time to the nearest phrase boundary (8-bar grid)
pub fn snap_to_phrase(t: f64, bpm: f64) -> f64 {
    snap_to_unit(t, phrase_seconds(bpm))
}

/// Snap a time to the nearest whole-bar multiple
pub fn snap_to_bar(t: f64, bpm: f64) -> f64 {
    snap_to_unit(t, bar_seconds(bpm))
}

/// Whether `t` sits within half a bar of its phrase-snapped position
pub fn is_phrase_aligned(t: f64, bpm: f64) -> bool {
    (snap_to_phrase(t, bpm) - t).abs() < bar_seconds(bpm) / 2.0
}
