//! Closed enumerations for mix requests and plans
//!
//! These identifiers are normative across versions: serialized forms are
//! stable, UI menus are built from the `all()` listings, and new variants
//! append only. Dispatch is by tag everywhere; none of these carry
//! behavior beyond their identity.

use serde::{Deserialize, Serialize};

/// Transition style between two adjacent tracks in a mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStyle {
    Smooth,
    Drop,
    Energy,
    Cut,
    FilterSweep,
    EchoReverb,
    Backspin,
    TapeStop,
    StutterEdit,
    ThreeBandSwap,
    BassDrop,
    SnareRoll,
    NoiseRiser,
    VocalHandoff,
    BassSwap,
    ReverbWash,
    EchoOut,
}

impl TransitionStyle {
    /// Stable identifier used on the wire and in the catalog endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionStyle::Smooth => "smooth",
            TransitionStyle::Drop => "drop",
            TransitionStyle::Energy => "energy",
            TransitionStyle::Cut => "cut",
            TransitionStyle::FilterSweep => "filter_sweep",
            TransitionStyle::EchoReverb => "echo_reverb",
            TransitionStyle::Backspin => "backspin",
            TransitionStyle::TapeStop => "tape_stop",
            TransitionStyle::StutterEdit => "stutter_edit",
            TransitionStyle::ThreeBandSwap => "three_band_swap",
            TransitionStyle::BassDrop => "bass_drop",
            TransitionStyle::SnareRoll => "snare_roll",
            TransitionStyle::NoiseRiser => "noise_riser",
            TransitionStyle::VocalHandoff => "vocal_handoff",
            TransitionStyle::BassSwap => "bass_swap",
            TransitionStyle::ReverbWash => "reverb_wash",
            TransitionStyle::EchoOut => "echo_out",
        }
    }

    /// Parse a stable identifier (exact match)
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|v| v.as_str() == s)
    }

    /// All styles, in catalog order (append-only)
    pub fn all() -> &'static [TransitionStyle] {
        &[
            TransitionStyle::Smooth,
            TransitionStyle::Drop,
            TransitionStyle::Energy,
            TransitionStyle::Cut,
            TransitionStyle::FilterSweep,
            TransitionStyle::EchoReverb,
            TransitionStyle::Backspin,
            TransitionStyle::TapeStop,
            TransitionStyle::StutterEdit,
            TransitionStyle::ThreeBandSwap,
            TransitionStyle::BassDrop,
            TransitionStyle::SnareRoll,
            TransitionStyle::NoiseRiser,
            TransitionStyle::VocalHandoff,
            TransitionStyle::BassSwap,
            TransitionStyle::ReverbWash,
            TransitionStyle::EchoOut,
        ]
    }
}

impl Default for TransitionStyle {
    fn default() -> Self {
        TransitionStyle::Smooth
    }
}

impl std::fmt::Display for TransitionStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Energy progression across the whole mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyMode {
    Steady,
    Build,
    Wave,
}

impl EnergyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyMode::Steady => "steady",
            EnergyMode::Build => "build",
            EnergyMode::Wave => "wave",
        }
    }

    pub fn all() -> &'static [EnergyMode] {
        &[EnergyMode::Steady, EnergyMode::Build, EnergyMode::Wave]
    }
}

impl Default for EnergyMode {
    fn default() -> Self {
        EnergyMode::Steady
    }
}

/// Occasion the mix is produced for; nudges fade durations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Wedding,
    Birthday,
    Sweet16,
    Club,
    Default,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Wedding => "wedding",
            EventType::Birthday => "birthday",
            EventType::Sweet16 => "sweet16",
            EventType::Club => "club",
            EventType::Default => "default",
        }
    }

    pub fn all() -> &'static [EventType] {
        &[
            EventType::Wedding,
            EventType::Birthday,
            EventType::Sweet16,
            EventType::Club,
            EventType::Default,
        ]
    }

    /// Seconds added to (or removed from) the preset fade for this occasion
    pub fn fade_adjust_seconds(&self) -> f64 {
        match self {
            EventType::Wedding | EventType::Birthday => 1.5,
            EventType::Club => -0.5,
            EventType::Sweet16 | EventType::Default => 0.0,
        }
    }
}

impl Default for EventType {
    fn default() -> Self {
        EventType::Default
    }
}

/// Where in the incoming track the mix-in lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixInStrategy {
    Drop,
    Buildup,
    Intro,
    PostIntro,
    Verse,
}

impl MixInStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MixInStrategy::Drop => "drop",
            MixInStrategy::Buildup => "buildup",
            MixInStrategy::Intro => "intro",
            MixInStrategy::PostIntro => "post_intro",
            MixInStrategy::Verse => "verse",
        }
    }
}

/// Energy phase of the set at a given transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyPhase {
    Warmup,
    Build,
    Peak,
    Cooldown,
}

/// Loudness normalization applied after the final mixdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoudnessMode {
    EbuR128,
    Peak,
    None,
}

impl LoudnessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoudnessMode::EbuR128 => "ebu_r128",
            LoudnessMode::Peak => "peak",
            LoudnessMode::None => "none",
        }
    }

    pub fn all() -> &'static [LoudnessMode] {
        &[LoudnessMode::EbuR128, LoudnessMode::Peak, LoudnessMode::None]
    }
}

impl Default for LoudnessMode {
    fn default() -> Self {
        LoudnessMode::EbuR128
    }
}

/// Structural section label produced by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionLabel {
    Intro,
    Verse,
    Chorus,
    Buildup,
    Bridge,
    Hook,
    Breakdown,
    Drop,
    Outro,
    Body,
}

impl SectionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionLabel::Intro => "intro",
            SectionLabel::Verse => "verse",
            SectionLabel::Chorus => "chorus",
            SectionLabel::Buildup => "buildup",
            SectionLabel::Bridge => "bridge",
            SectionLabel::Hook => "hook",
            SectionLabel::Breakdown => "breakdown",
            SectionLabel::Drop => "drop",
            SectionLabel::Outro => "outro",
            SectionLabel::Body => "body",
        }
    }

    /// Sections that typically carry a lead vocal
    pub fn carries_vocals(&self) -> bool {
        matches!(
            self,
            SectionLabel::Verse
                | SectionLabel::Chorus
                | SectionLabel::Buildup
                | SectionLabel::Bridge
                | SectionLabel::Hook
        )
    }
}

/// Transition treatment the planner suggests after inspecting a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedType {
    Standard,
    TempoRamp,
    InstrumentalBridge,
}

/// How badly two vocal sections overlap at a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionSeverity {
    Minor,
    Major,
}
