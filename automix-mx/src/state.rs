//! Shared application state
//!
//! One `AppState` is built at startup and cloned into every request
//! handler. All members are cheap to clone (pools, Arcs, channel
//! handles); there is no other process-wide mutable state.

use crate::config::Config;
use crate::jobs::{JobQueue, Supervisor};
use crate::storage::SharedStore;
use automix_common::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;

/// State shared across all API handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub store: SharedStore,
    pub bus: EventBus,
    pub queue: JobQueue,
    pub supervisor: Arc<Supervisor>,
    pub config: Arc<Config>,
}
