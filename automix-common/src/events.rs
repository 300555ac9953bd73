//! Event types for the automix event system
//!
//! Provides the shared event enum and the broadcast EventBus. Events are
//! emitted by jobs and the supervisor and fan out to SSE subscribers; a
//! send with no subscribers is not an error.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Mix-production events
///
/// Events are broadcast via [`EventBus`] and serialized for SSE
/// transmission with a `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MixEvent {
    /// A track upload was accepted and queued for analysis
    TrackUploaded {
        track_id: Uuid,
        original_name: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An analyze job picked up a track
    AnalysisStarted {
        track_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Track analysis finished and was persisted
    AnalysisCompleted {
        track_id: Uuid,
        /// Estimated tempo, if the envelope supported an estimate
        bpm: Option<f64>,
        /// Camelot wheel position, if key detection found voiced frames
        camelot_key: Option<String>,
        duration_seconds: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Track analysis failed; the track is unusable for mixes
    AnalysisFailed {
        track_id: Uuid,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One stem of a track finished separating and was uploaded
    StemCompleted {
        track_id: Uuid,
        stem: String,
        engine: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A stem failed on every engine including the fallback path
    StemFailed {
        track_id: Uuid,
        stem: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A mashup was accepted and its plan job enqueued
    MashupQueued {
        mashup_id: Uuid,
        track_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The planner produced and persisted a plan
    PlanCompleted {
        mashup_id: Uuid,
        quality: f64,
        transition_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The renderer started executing a plan
    RenderStarted {
        mashup_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The renderer wrote the final mix and updated the mashup
    RenderCompleted {
        mashup_id: Uuid,
        output_key: String,
        generation_time_ms: u64,
        /// True when the simplified fallback graph produced the output
        used_fallback: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Both the main and the fallback graph failed
    RenderFailed {
        mashup_id: Uuid,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast event bus
///
/// Thin wrapper over `tokio::sync::broadcast` shared by jobs, the
/// supervisor and the SSE endpoint.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MixEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<MixEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the no-subscribers case
    pub fn emit_lossy(&self, event: MixEvent) {
        let _ = self.tx.send(event);
    }

    /// Current subscriber count (used by tests and the status endpoint)
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
