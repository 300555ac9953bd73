//! Planner constants: crossfade presets, structure rules, genre table
//!
//! The preset table pairs every transition style with a default fade
//! length and a fade-out/fade-in curve pair. Structure rules encode
//! which sections a crossfade may start or land in. The genre table is
//! deliberately partial; an absent pair means "unknown, no penalty".

use automix_common::{CrossfadeCurve, SectionLabel, TransitionStyle};

/// Default fade and curve pair for one transition style
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossfadePreset {
    /// Default crossfade length in seconds
    pub duration: f64,
    /// Fade-out curve of the outgoing track
    pub curve1: CrossfadeCurve,
    /// Fade-in curve of the incoming track
    pub curve2: CrossfadeCurve,
}

/// Preset lookup for a transition style
pub fn crossfade_preset(style: TransitionStyle) -> CrossfadePreset {
    use CrossfadeCurve::*;
    use TransitionStyle::*;
    let (duration, curve1, curve2) = match style {
        Smooth => (8.0, Qsin, Qsin),
        Drop => (4.0, Exp, Sqr),
        Energy => (6.0, Qsin, Qsin),
        Cut => (0.5, Nofade, Nofade),
        FilterSweep => (10.0, Hsin, Hsin),
        EchoReverb => (8.0, Log, Exp),
        Backspin => (3.0, Par, Tri),
        TapeStop => (3.0, Cub, Tri),
        StutterEdit => (4.0, Sqr, Sqr),
        ThreeBandSwap => (8.0, Qsin, Qsin),
        BassDrop => (6.0, Exp, Exp),
        SnareRoll => (4.0, Tri, Exp),
        NoiseRiser => (8.0, Hsin, Qsin),
        VocalHandoff => (6.0, Log, Log),
        BassSwap => (8.0, Qsin, Qsin),
        ReverbWash => (10.0, Log, Hsin),
        EchoOut => (6.0, Log, Tri),
    };
    CrossfadePreset {
        duration,
        curve1,
        curve2,
    }
}

/// Sections a crossfade may start in (outgoing track)
pub const MIX_OUT_ALLOWED: [SectionLabel; 3] = [
    SectionLabel::Outro,
    SectionLabel::Breakdown,
    SectionLabel::Verse,
];

/// Sections a crossfade must not start in
pub const MIX_OUT_FORBIDDEN: [SectionLabel; 3] = [
    SectionLabel::Drop,
    SectionLabel::Chorus,
    SectionLabel::Buildup,
];

/// Sections a crossfade may land in (incoming track)
pub const MIX_IN_ALLOWED: [SectionLabel; 3] = [
    SectionLabel::Intro,
    SectionLabel::Buildup,
    SectionLabel::Verse,
];

/// Sections a crossfade must not land in
pub const MIX_IN_FORBIDDEN: [SectionLabel; 2] = [SectionLabel::Drop, SectionLabel::Chorus];

pub fn is_mix_out_forbidden(label: SectionLabel) -> bool {
    MIX_OUT_FORBIDDEN.contains(&label)
}

pub fn is_mix_out_allowed(label: SectionLabel) -> bool {
    MIX_OUT_ALLOWED.contains(&label)
}

pub fn is_mix_in_forbidden(label: SectionLabel) -> bool {
    MIX_IN_FORBIDDEN.contains(&label)
}

/// Wheel distance between two genres, if both are known
///
/// Distances: 0 same family, 1 adjacent, larger = farther apart. The
/// table is partial by design; unknown pairs return `None` and score no
/// penalty.
pub fn genre_distance(a: &str, b: &str) -> Option<u32> {
    let a = a.trim().to_lowercase().replace([' ', '-'], "_");
    let b = b.trim().to_lowercase().replace([' ', '-'], "_");
    if a.is_empty() || b.is_empty() {
        return None;
    }
    if a == b {
        return known_genre(&a).then_some(0);
    }
    let (x, y) = if a < b { (a, b) } else { (b, a) };
    let distance = match (x.as_str(), y.as_str()) {
        ("house", "techno") => 1,
        ("house", "trance") => 2,
        ("techno", "trance") => 1,
        ("edm", "house") | ("edm", "techno") | ("edm", "trance") => 1,
        ("house", "pop") | ("edm", "pop") => 2,
        ("dance", "house") | ("dance", "pop") | ("dance", "edm") => 1,
        ("hip_hop", "rnb") => 1,
        ("hip_hop", "pop") => 2,
        ("pop", "rnb") => 2,
        ("pop", "rock") => 2,
        ("indie", "pop") | ("indie", "rock") => 1,
        ("drum_and_bass", "techno") => 2,
        ("drum_and_bass", "house") => 3,
        ("hip_hop", "techno") => 3,
        ("hip_hop", "rock") => 4,
        ("country", "pop") => 3,
        ("country", "techno") | ("country", "house") => 5,
        ("latin", "pop") => 2,
        ("latin", "reggaeton") => 1,
        ("hip_hop", "reggaeton") => 2,
        _ => return None,
    };
    Some(distance)
}

fn known_genre(g: &str) -> bool {
    matches!(
        g,
        "house"
            | "techno"
            | "trance"
            | "edm"
            | "dance"
            | "pop"
            | "rock"
            | "indie"
            | "hip_hop"
            | "rnb"
            | "drum_and_bass"
            | "country"
            | "latin"
            | "reggaeton"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_style_has_a_preset() {
        for style in TransitionStyle::all() {
            let preset = crossfade_preset(*style);
            assert!(preset.duration > 0.0, "{:?}", style);
        }
    }

    #[test]
    fn test_cut_is_nofade() {
        let preset = crossfade_preset(TransitionStyle::Cut);
        assert_eq!(preset.curve1, CrossfadeCurve::Nofade);
        assert_eq!(preset.curve2, CrossfadeCurve::Nofade);
        assert!(preset.duration <= 1.0);
    }

    #[test]
    fn test_structure_rules_disjoint() {
        for label in MIX_OUT_ALLOWED {
            assert!(!is_mix_out_forbidden(label));
        }
        for label in MIX_IN_ALLOWED {
            assert!(!is_mix_in_forbidden(label));
        }
    }

    #[test]
    fn test_genre_distance_symmetric() {
        assert_eq!(genre_distance("house", "techno"), Some(1));
        assert_eq!(genre_distance("techno", "house"), Some(1));
        assert_eq!(genre_distance("Hip Hop", "rock"), Some(4));
    }

    #[test]
    fn test_genre_same_is_zero() {
        assert_eq!(genre_distance("house", "HOUSE"), Some(0));
    }

    #[test]
    fn test_unknown_genre_pair_is_none() {
        assert_eq!(genre_distance("house", "polka"), None);
        assert_eq!(genre_distance("", "house"), None);
        assert_eq!(genre_distance("zydeco", "zydeco"), None);
    }
}
