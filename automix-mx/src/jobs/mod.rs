//! Job queue core and the mashup supervisor
//!
//! A bounded-concurrency in-process dispatcher with named job kinds
//! drives the analyze → plan → render pipeline. Job failure is logged
//! and swallowed; retries happen by enqueuing a new job (on startup
//! recovery, or by a new user request).

pub mod queue;
pub mod supervisor;

pub use queue::{JobQueue, DEFAULT_CONCURRENCY};
pub use supervisor::Supervisor;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named job kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Analyze,
    Separate,
    Plan,
    Render,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Analyze => "analyze",
            JobKind::Separate => "separate",
            JobKind::Plan => "plan",
            JobKind::Render => "render",
        }
    }
}

/// Job lifecycle state (owned by the queue)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
}

/// A queued unit of work
///
/// Memory-resident; payloads are small JSON objects naming catalog
/// entities, never bulk data.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub payload: serde_json::Value,
    pub attempt: u32,
    pub enqueued_at: DateTime<Utc>,
    pub state: JobState,
}

impl Job {
    pub fn new(kind: JobKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            payload,
            attempt: 1,
            enqueued_at: Utc::now(),
            state: JobState::Queued,
        }
    }
}
