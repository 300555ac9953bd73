//! Stem separation engines
//!
//! `StemEngine` is a capability: an ordered list of engines is consulted
//! at runtime, highest quality first. An engine that is unavailable or
//! throws falls through to the next; the deterministic frequency-band
//! engine sits last and always produces a result, so separation as a
//! whole only fails when decode itself does.

pub mod band_filter;
pub mod remote;

pub use band_filter::BandFilterEngine;
pub use remote::RemoteStemEngine;

use crate::db::stems::StemKind;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// One separated stem ready for upload
#[derive(Debug, Clone)]
pub struct StemPayload {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Separation capability
#[async_trait]
pub trait StemEngine: Send + Sync {
    /// Engine identifier recorded on each stem row
    fn name(&self) -> &'static str;

    /// Whether the engine can currently serve requests
    async fn is_available(&self) -> bool;

    /// Separate a source into stems; a partial map is a valid result
    async fn separate(
        &self,
        bytes: &[u8],
        mime: &str,
        name: &str,
    ) -> Result<HashMap<StemKind, StemPayload>>;
}

/// Ordered engine list with fall-through
pub struct StemSeparator {
    engines: Vec<Arc<dyn StemEngine>>,
}

impl StemSeparator {
    pub fn new(engines: Vec<Arc<dyn StemEngine>>) -> Self {
        Self { engines }
    }

    /// Try engines in priority order until one produces stems
    ///
    /// Returns the winning engine's name alongside its stems.
    pub async fn separate(
        &self,
        bytes: &[u8],
        mime: &str,
        name: &str,
    ) -> Result<(&'static str, HashMap<StemKind, StemPayload>)> {
        for engine in &self.engines {
            if !engine.is_available().await {
                info!(engine = engine.name(), "stem engine unavailable, skipping");
                continue;
            }
            match engine.separate(bytes, mime, name).await {
                Ok(stems) if !stems.is_empty() => {
                    info!(
                        engine = engine.name(),
                        stems = stems.len(),
                        "stem separation complete"
                    );
                    return Ok((engine.name(), stems));
                }
                Ok(_) => {
                    warn!(engine = engine.name(), "engine produced no stems, falling through");
                }
                Err(e) => {
                    warn!(engine = engine.name(), error = %e, "stem engine failed, falling through");
                }
            }
        }
        Err(Error::Stem("all stem engines failed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEngine {
        name: &'static str,
        available: bool,
        fail: bool,
    }

    #[async_trait]
    impl StemEngine for FixedEngine {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn separate(
            &self,
            _bytes: &[u8],
            _mime: &str,
            _name: &str,
        ) -> Result<HashMap<StemKind, StemPayload>> {
            if self.fail {
                return Err(Error::Stem("boom".into()));
            }
            let mut map = HashMap::new();
            map.insert(
                StemKind::Vocals,
                StemPayload {
                    bytes: vec![1, 2, 3],
                    mime: "audio/wav".into(),
                },
            );
            Ok(map)
        }
    }

    #[tokio::test]
    async fn test_first_available_engine_wins() {
        let separator = StemSeparator::new(vec![
            Arc::new(FixedEngine {
                name: "premium",
                available: true,
                fail: false,
            }),
            Arc::new(FixedEngine {
                name: "fallback",
                available: true,
                fail: false,
            }),
        ]);
        let (engine, stems) = separator.separate(b"x", "audio/wav", "a.wav").await.unwrap();
        assert_eq!(engine, "premium");
        assert_eq!(stems.len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_engine_skipped() {
        let separator = StemSeparator::new(vec![
            Arc::new(FixedEngine {
                name: "premium",
                available: false,
                fail: false,
            }),
            Arc::new(FixedEngine {
                name: "fallback",
                available: true,
                fail: false,
            }),
        ]);
        let (engine, _) = separator.separate(b"x", "audio/wav", "a.wav").await.unwrap();
        assert_eq!(engine, "fallback");
    }

    #[tokio::test]
    async fn test_failing_engine_falls_through() {
        let separator = StemSeparator::new(vec![
            Arc::new(FixedEngine {
                name: "premium",
                available: true,
                fail: true,
            }),
            Arc::new(FixedEngine {
                name: "fallback",
                available: true,
                fail: false,
            }),
        ]);
        let (engine, _) = separator.separate(b"x", "audio/wav", "a.wav").await.unwrap();
        assert_eq!(engine, "fallback");
    }

    #[tokio::test]
    async fn test_all_engines_failing_is_an_error() {
        let separator = StemSeparator::new(vec![Arc::new(FixedEngine {
            name: "premium",
            available: true,
            fail: true,
        })]);
        assert!(separator.separate(b"x", "audio/wav", "a.wav").await.is_err());
    }
}
