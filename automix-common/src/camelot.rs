//! Camelot wheel key encoding
//!
//! Encodes a musical key (root pitch class + mode) as a position on the
//! Camelot wheel: `NA` for minor keys, `NB` for major keys, `N ∈ 1..=12`.
//! Adjacent wheel numbers are a fifth apart, so harmonically compatible
//! keys are wheel neighbors (same number, or ±1 in the same mode).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key mode (Camelot letter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyMode {
    /// Minor keys occupy the inner (A) ring
    Minor,
    /// Major keys occupy the outer (B) ring
    Major,
}

/// Camelot wheel position for major keys, indexed by root pitch class (C=0)
///
/// C=8B, C#=3B, D=10B, D#=5B, E=12B, F=7B, F#=2B, G=9B, G#=4B, A=11B, A#=6B, B=1B
const MAJOR_WHEEL: [u8; 12] = [8, 3, 10, 5, 12, 7, 2, 9, 4, 11, 6, 1];

/// Camelot wheel position for minor keys, indexed by root pitch class (C=0)
///
/// Cm=5A, C#m=12A, Dm=7A, D#m=2A, Em=9A, Fm=4A, F#m=11A, Gm=6A, G#m=1A, Am=8A, A#m=3A, Bm=10A
const MINOR_WHEEL: [u8; 12] = [5, 12, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10];

/// Note names used for key signature display
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A position on the Camelot wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CamelotKey {
    /// Wheel number, 1..=12
    pub number: u8,
    /// Wheel ring (A=minor, B=major)
    pub mode: KeyMode,
}

impl CamelotKey {
    /// Build a wheel position from a detected (root, mode) pair
    ///
    /// `root` is a pitch class with C=0. Returns `None` for out-of-range
    /// pitch classes.
    pub fn from_pitch_class(root: usize, mode: KeyMode) -> Option<Self> {
        if root >= 12 {
            return None;
        }
        let number = match mode {
            KeyMode::Major => MAJOR_WHEEL[root],
            KeyMode::Minor => MINOR_WHEEL[root],
        };
        Some(Self { number, mode })
    }

    /// Conventional key signature for a (root, mode) pair, e.g. "A minor"
    pub fn signature_name(root: usize, mode: KeyMode) -> Option<String> {
        if root >= 12 {
            return None;
        }
        let suffix = match mode {
            KeyMode::Major => "major",
            KeyMode::Minor => "minor",
        };
        Some(format!("{} {}", NOTE_NAMES[root], suffix))
    }

    /// Circular distance between two wheel numbers (0..=6)
    pub fn wheel_distance(&self, other: &CamelotKey) -> u8 {
        let a = i16::from(self.number);
        let b = i16::from(other.number);
        let diff = (a - b).rem_euclid(12);
        diff.min(12 - diff) as u8
    }

    /// Whether two keys mix cleanly by the wheel convention
    ///
    /// Clean moves: same position, ±1 step in the same ring, or the
    /// relative major/minor (same number, other ring).
    pub fn is_harmonic_neighbor(&self, other: &CamelotKey) -> bool {
        if self.mode == other.mode {
            self.wheel_distance(other) <= 1
        } else {
            self.number == other.number
        }
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self.mode {
            KeyMode::Minor => 'A',
            KeyMode::Major => 'B',
        };
        write!(f, "{}{}", self.number, letter)
    }
}

impl FromStr for CamelotKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() < 2 {
            return Err(format!("invalid camelot key: {s:?}"));
        }
        let (num_part, letter) = s.split_at(s.len() - 1);
        let number: u8 = num_part
            .parse()
            .map_err(|_| format!("invalid camelot number: {s:?}"))?;
        if !(1..=12).contains(&number) {
            return Err(format!("camelot number out of range: {s:?}"));
        }
        let mode = match letter {
            "A" | "a" => KeyMode::Minor,
            "B" | "b" => KeyMode::Major,
            _ => return Err(format!("invalid camelot ring: {s:?}")),
        };
        Ok(Self { number, mode })
    }
}
