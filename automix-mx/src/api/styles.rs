//! Transition-style catalog endpoint
//!
//! Returns the closed identifier sets UI menus are built from. The ids
//! are normative across versions; new entries append only.

use automix_common::{CrossfadeCurve, EnergyMode, EventType, LoudnessMode, TransitionStyle};
use axum::Json;
use serde_json::{json, Value};

/// GET /api/styles - enumerations for mix-request construction
pub async fn catalog() -> Json<Value> {
    let transition_styles: Vec<&'static str> =
        TransitionStyle::all().iter().map(|s| s.as_str()).collect();
    let energy_modes: Vec<&'static str> = EnergyMode::all().iter().map(|m| m.as_str()).collect();
    let event_types: Vec<&'static str> = EventType::all().iter().map(|e| e.as_str()).collect();
    let curves: Vec<&'static str> = CrossfadeCurve::all().iter().map(|c| c.as_str()).collect();
    let loudness: Vec<&'static str> = LoudnessMode::all().iter().map(|m| m.as_str()).collect();

    Json(json!({
        "transitionStyles": transition_styles,
        "energyModes": energy_modes,
        "eventTypes": event_types,
        "crossfadeCurves": curves,
        "processingOptions": [
            "enableMultibandCompression",
            "enableSidechainDucking",
            "enableDynamicEQ",
            "enableFilterSweep",
        ],
        "loudnessTargets": {
            "modes": loudness,
            "defaultLufs": -14,
            "range": [-70, -5],
        },
    }))
}
