//! Plan execution against the external transcoder
//!
//! Fetches the original sources from the object store into a per-job
//! scratch directory, runs the main filter graph, and on any transcoder
//! failure retries once with the simplified fallback graph. The
//! renderer always either produces an uploaded MP3 or returns an error
//! for the caller to mark the mashup failed.

use super::filters::{build_fallback_graph, build_main_graph};
use super::playback::{build_playback_plan, RenderTrack};
use super::RenderConfig;
use crate::error::{Error, RenderError, Result};
use crate::plan::Plan;
use crate::storage::{self, keys, SharedStore};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of a successful render
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub output_key: String,
    pub generation_time_ms: u64,
    /// True when the fallback graph produced the output
    pub used_fallback: bool,
}

/// Mix renderer
pub struct Renderer {
    ffmpeg_path: String,
    store: SharedStore,
    timeout: Duration,
}

impl Renderer {
    pub fn new(ffmpeg_path: &str, store: SharedStore, timeout_seconds: u64) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.to_string(),
            store,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    /// Execute a plan into `<mashupId>.mp3` on the object store
    ///
    /// `tracks` must be in plan order.
    pub async fn render(
        &self,
        mashup_id: Uuid,
        plan: &Plan,
        tracks: &[RenderTrack],
        config: &RenderConfig,
    ) -> Result<RenderOutput> {
        let started = Instant::now();
        let scratch = tempfile::tempdir().map_err(Error::Io)?;

        let mut inputs = Vec::with_capacity(tracks.len());
        for track in tracks {
            let object = storage::get_with_retry(self.store.as_ref(), &track.storage_key).await?;
            let ext = extension_for_mime(&object.mime);
            let path = scratch.path().join(format!("{}.{ext}", track.id));
            tokio::fs::write(&path, &object.bytes).await.map_err(Error::Io)?;
            inputs.push(path);
        }

        let entries = build_playback_plan(plan, tracks, config.target_duration_seconds);
        let main_graph = build_main_graph(&entries, &plan.transitions, config);
        let output_path = scratch.path().join("mix.mp3");

        let main_result = self
            .run_graph(&inputs, &main_graph, &output_path, config)
            .await;

        let used_fallback = match main_result {
            Ok(()) => false,
            Err(e) => {
                warn!(
                    mashup_id = %mashup_id,
                    error = %e,
                    "main filter graph failed; retrying with fallback graph"
                );
                let mean_fade = if plan.transitions.is_empty() {
                    0.0
                } else {
                    plan.transitions.iter().map(|t| t.fade_duration).sum::<f64>()
                        / plan.transitions.len() as f64
                };
                let fallback_graph = build_fallback_graph(tracks.len(), mean_fade, config);
                self.run_graph(&inputs, &fallback_graph, &output_path, config)
                    .await
                    .map_err(|fallback_err| {
                        Error::Render(RenderError::FallbackFailed {
                            detail: fallback_err.to_string(),
                        })
                    })?;
                true
            }
        };

        let bytes = tokio::fs::read(&output_path).await.map_err(|e| {
            Error::Render(RenderError::GraphFailed {
                detail: format!("transcoder produced no output: {e}"),
            })
        })?;
        if bytes.is_empty() {
            return Err(Error::Render(RenderError::GraphFailed {
                detail: "transcoder produced an empty file".into(),
            }));
        }

        let output_key = keys::mashup_key(mashup_id);
        storage::put_with_retry(self.store.as_ref(), &output_key, &bytes, "audio/mpeg").await?;

        let generation_time_ms = started.elapsed().as_millis() as u64;
        info!(
            mashup_id = %mashup_id,
            output_key,
            generation_time_ms,
            used_fallback,
            bytes = bytes.len(),
            "render complete"
        );

        Ok(RenderOutput {
            output_key,
            generation_time_ms,
            used_fallback,
        })
    }

    /// Run one filter graph to completion under the render deadline
    async fn run_graph(
        &self,
        inputs: &[PathBuf],
        graph: &str,
        output: &Path,
        config: &RenderConfig,
    ) -> Result<()> {
        let mut command = Command::new(&self.ffmpeg_path);
        command.args(["-hide_banner", "-loglevel", "error", "-y"]);
        for input in inputs {
            command.arg("-i").arg(input);
        }
        command
            .args(["-filter_complex", graph, "-map", "[out]"])
            .args(["-ar", "44100", "-ac", "2"])
            .args(["-b:a", &config.output_bitrate])
            .args(["-f", "mp3"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            Error::Render(RenderError::GraphFailed {
                detail: format!("spawn transcoder: {e}"),
            })
        })?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                Error::Render(RenderError::Timeout {
                    seconds: self.timeout.as_secs(),
                })
            })?
            .map_err(|e| {
                Error::Render(RenderError::GraphFailed {
                    detail: format!("waiting for transcoder: {e}"),
                })
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::Render(RenderError::GraphFailed {
                detail: stderr.trim().chars().take(500).collect(),
            }));
        }
        Ok(())
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "audio/mpeg" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FsObjectStore, ObjectStore};
    use std::sync::Arc;

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("audio/mpeg"), "mp3");
        assert_eq!(extension_for_mime("audio/wav"), "wav");
        assert_eq!(extension_for_mime("application/pdf"), "bin");
    }

    #[tokio::test]
    async fn test_missing_source_surfaces_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let store: SharedStore = Arc::new(FsObjectStore::new(dir.path()));
        let renderer = Renderer::new("ffmpeg", store, 600);

        let track = RenderTrack {
            id: Uuid::new_v4(),
            storage_key: "missing/key.mp3".into(),
            mime: "audio/mpeg".into(),
            duration_seconds: 180.0,
            bpm: Some(120.0),
        };
        let plan = Plan {
            order: vec![track.id],
            target_bpm: 120.0,
            transitions: vec![],
            quality: crate::plan::QualityReport {
                score: 100.0,
                transition_scores: vec![],
                suggestions: vec![],
            },
        };
        let config = RenderConfig {
            target_duration_seconds: 60.0,
            loudness: automix_common::LoudnessMode::None,
            target_loudness: -14.0,
            enable_multiband_compression: false,
            enable_sidechain_ducking: false,
            enable_dynamic_eq: false,
            enable_filter_sweep: false,
            tempo_ramp_seconds: 0.0,
            output_bitrate: "192k".into(),
        };

        let result = renderer
            .render(Uuid::new_v4(), &plan, &[track], &config)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_bad_transcoder_path_fails_both_graphs() {
        let dir = tempfile::tempdir().unwrap();
        let store: SharedStore = Arc::new(FsObjectStore::new(dir.path()));
        store
            .put("src/a.mp3", b"fake-audio", "audio/mpeg")
            .await
            .unwrap();
        let renderer = Renderer::new("/nonexistent/transcoder", store, 5);

        let track = RenderTrack {
            id: Uuid::new_v4(),
            storage_key: "src/a.mp3".into(),
            mime: "audio/mpeg".into(),
            duration_seconds: 180.0,
            bpm: Some(120.0),
        };
        let plan = Plan {
            order: vec![track.id],
            target_bpm: 120.0,
            transitions: vec![],
            quality: crate::plan::QualityReport {
                score: 100.0,
                transition_scores: vec![],
                suggestions: vec![],
            },
        };
        let config = RenderConfig {
            target_duration_seconds: 60.0,
            loudness: automix_common::LoudnessMode::None,
            target_loudness: -14.0,
            enable_multiband_compression: false,
            enable_sidechain_ducking: false,
            enable_dynamic_eq: false,
            enable_filter_sweep: false,
            tempo_ramp_seconds: 0.0,
            output_bitrate: "192k".into(),
        };

        let result = renderer
            .render(Uuid::new_v4(), &plan, &[track], &config)
            .await;
        match result {
            Err(Error::Render(RenderError::FallbackFailed { .. })) => {}
            other => panic!("expected fallback failure, got {:?}", other.map(|_| ())),
        }
    }
}
