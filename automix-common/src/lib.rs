//! # Automix Common Library
//!
//! Shared code for the automix mix-production service including:
//! - Error kinds shared across components
//! - Closed enumerations (transition styles, energy modes, event types,
//!   structure labels, crossfade curves)
//! - Camelot wheel key encoding
//! - Musical time arithmetic (bars, phrases, snapping)
//! - Event types (MixEvent enum) and the broadcast EventBus

pub mod camelot;
pub mod crossfade;
pub mod error;
pub mod events;
pub mod music_time;
pub mod styles;

pub use camelot::CamelotKey;
pub use crossfade::CrossfadeCurve;
pub use error::{Error, Result};
pub use events::{EventBus, MixEvent};
pub use styles::{
    CollisionSeverity, EnergyMode, EnergyPhase, EventType, LoudnessMode, MixInStrategy,
    SectionLabel, SuggestedType, TransitionStyle,
};
