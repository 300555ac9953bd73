//! Crossfade curve vocabulary
//!
//! The renderer hands curve names straight to the transcoder's fade
//! filters, so the canonical identifiers here are the transcoder's curve
//! vocabulary. `gain_in`/`gain_out` provide a host-side evaluation of
//! each shape for tests and quality heuristics; they are not used in the
//! render path itself.

use serde::{Deserialize, Serialize};

/// Crossfade curve shapes
///
/// Each shape trades off how early the incoming track becomes audible
/// against how abruptly the outgoing track disappears:
/// - `Tri`: linear, predictable
/// - `Exp`: very late rise, good under long overlaps
/// - `Log`: early rise, good for low-energy material
/// - `Qsin`/`Hsin`: sine segments, the usual equal-power choices
/// - `Par`/`Cub`: polynomial eases
/// - `Lis`: logistic S-curve
/// - `Sqr`: square-root, aggressive early rise
/// - `Nofade`: hard switch (used by cut-style transitions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossfadeCurve {
    Tri,
    Exp,
    Log,
    Qsin,
    Hsin,
    Par,
    Cub,
    Lis,
    Sqr,
    Nofade,
}

impl CrossfadeCurve {
    /// Canonical identifier as understood by the transcoder's fade filters
    pub fn as_str(&self) -> &'static str {
        match self {
            CrossfadeCurve::Tri => "tri",
            CrossfadeCurve::Exp => "exp",
            CrossfadeCurve::Log => "log",
            CrossfadeCurve::Qsin => "qsin",
            CrossfadeCurve::Hsin => "hsin",
            CrossfadeCurve::Par => "par",
            CrossfadeCurve::Cub => "cub",
            CrossfadeCurve::Lis => "lis",
            CrossfadeCurve::Sqr => "sqr",
            CrossfadeCurve::Nofade => "nofade",
        }
    }

    /// Parse a curve identifier (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tri" => Some(CrossfadeCurve::Tri),
            "exp" => Some(CrossfadeCurve::Exp),
            "log" => Some(CrossfadeCurve::Log),
            "qsin" => Some(CrossfadeCurve::Qsin),
            "hsin" => Some(CrossfadeCurve::Hsin),
            "par" => Some(CrossfadeCurve::Par),
            "cub" => Some(CrossfadeCurve::Cub),
            "lis" => Some(CrossfadeCurve::Lis),
            "sqr" => Some(CrossfadeCurve::Sqr),
            "nofade" => Some(CrossfadeCurve::Nofade),
            _ => None,
        }
    }

    /// Fade-in gain at normalized position t ∈ [0, 1]
    pub fn gain_in(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);
        match self {
            CrossfadeCurve::Tri => t,
            CrossfadeCurve::Exp => ((5.0 * t).exp() - 1.0) / (5.0f32.exp() - 1.0),
            CrossfadeCurve::Log => (1.0 + 9.0 * t).log10(),
            CrossfadeCurve::Qsin => (t * std::f32::consts::FRAC_PI_2).sin(),
            CrossfadeCurve::Hsin => 0.5 * (1.0 - (std::f32::consts::PI * t).cos()),
            CrossfadeCurve::Par => 1.0 - (1.0 - t) * (1.0 - t),
            CrossfadeCurve::Cub => t * t * t,
            CrossfadeCurve::Lis => {
                let raw = 1.0 / (1.0 + (-8.0 * (t - 0.5)).exp());
                let lo = 1.0 / (1.0 + 4.0f32.exp());
                let hi = 1.0 / (1.0 + (-4.0f32).exp());
                (raw - lo) / (hi - lo)
            }
            CrossfadeCurve::Sqr => t.sqrt(),
            CrossfadeCurve::Nofade => 1.0,
        }
    }

    /// Fade-out gain at normalized position t ∈ [0, 1]
    ///
    /// Fade-out is the mirror of fade-in, so a symmetric curve pair sums
    /// to roughly unity through the overlap.
    pub fn gain_out(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);
        match self {
            CrossfadeCurve::Nofade => 1.0,
            _ => self.gain_in(1.0 - t),
        }
    }

    /// All curve variants, in catalog order
    pub fn all() -> &'static [CrossfadeCurve] {
        &[
            CrossfadeCurve::Tri,
            CrossfadeCurve::Exp,
            CrossfadeCurve::Log,
            CrossfadeCurve::Qsin,
            CrossfadeCurve::Hsin,
            CrossfadeCurve::Par,
            CrossfadeCurve::Cub,
            CrossfadeCurve::Lis,
            CrossfadeCurve::Sqr,
            CrossfadeCurve::Nofade,
        ]
    }
}

impl Default for CrossfadeCurve {
    fn default() -> Self {
        CrossfadeCurve::Tri
    }
}

impl std::fmt::Display for CrossfadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
