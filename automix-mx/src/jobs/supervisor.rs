//! Mashup lifecycle supervisor
//!
//! Owns the job handlers: analyze on upload, plan on mix request,
//! render on plan completion. All status transitions on catalog rows
//! happen here, so the queue itself stays free of domain knowledge.
//!
//! On startup the supervisor re-scans unfinished rows and resurrects
//! their jobs; the catalog's status fields are the recovery point, not
//! the in-memory queue.

use crate::analysis::Analyzer;
use crate::audio::FfmpegDecoder;
use crate::config::Config;
use crate::db::{self, mashups::MashupStatus, stems::StemQuality, stems::StemRecord, stems::StemStatus, tracks::AnalysisStatus};
use crate::error::Result;
use crate::jobs::{JobKind, JobQueue};
use crate::plan::{self, PlannerDefaults, PlannerTrack};
use crate::render::{RenderConfig, RenderTrack, Renderer};
use crate::stems::StemSeparator;
use crate::storage::{self, keys, SharedStore};
use automix_common::{EventBus, MixEvent};
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Orchestrates the analyze → plan → render pipeline
pub struct Supervisor {
    db: SqlitePool,
    store: SharedStore,
    bus: EventBus,
    queue: JobQueue,
    decoder: FfmpegDecoder,
    analyzer: Analyzer,
    separator: Arc<StemSeparator>,
    renderer: Arc<Renderer>,
    planner_defaults: PlannerDefaults,
    output_bitrate: String,
    /// Tracks with an analyze job in flight (duplicate suppression)
    inflight_analyze: Mutex<HashSet<Uuid>>,
}

impl Supervisor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: SqlitePool,
        store: SharedStore,
        bus: EventBus,
        queue: JobQueue,
        separator: Arc<StemSeparator>,
        renderer: Arc<Renderer>,
        config: &Config,
    ) -> Arc<Self> {
        let decoder = FfmpegDecoder::new(
            &config.ffmpeg_path,
            &config.ffprobe_path,
            config.analysis_sample_rate,
            config.decode_timeout_seconds,
        );
        Arc::new(Self {
            db,
            store,
            bus,
            queue,
            decoder,
            analyzer: Analyzer::new(config.analysis_sample_rate),
            separator,
            renderer,
            planner_defaults: PlannerDefaults {
                target_bpm_default: config.planner_target_bpm_default,
            },
            output_bitrate: config.output_bitrate.clone(),
            inflight_analyze: Mutex::new(HashSet::new()),
        })
    }

    /// Register all job handlers on the queue
    pub fn register_handlers(self: &Arc<Self>) {
        let supervisor = Arc::clone(self);
        self.queue.on_kind(JobKind::Analyze, move |job| {
            let supervisor = Arc::clone(&supervisor);
            Box::pin(async move {
                let track_id = payload_id(&job.payload, "track_id")?;
                supervisor.run_analyze(track_id).await;
                Ok(())
            })
        });

        let supervisor = Arc::clone(self);
        self.queue.on_kind(JobKind::Separate, move |job| {
            let supervisor = Arc::clone(&supervisor);
            Box::pin(async move {
                let track_id = payload_id(&job.payload, "track_id")?;
                supervisor.run_separate(track_id).await;
                Ok(())
            })
        });

        let supervisor = Arc::clone(self);
        self.queue.on_kind(JobKind::Plan, move |job| {
            let supervisor = Arc::clone(&supervisor);
            Box::pin(async move {
                let mashup_id = payload_id(&job.payload, "mashup_id")?;
                supervisor.run_plan(mashup_id).await;
                Ok(())
            })
        });

        let supervisor = Arc::clone(self);
        self.queue.on_kind(JobKind::Render, move |job| {
            let supervisor = Arc::clone(&supervisor);
            Box::pin(async move {
                let mashup_id = payload_id(&job.payload, "mashup_id")?;
                supervisor.run_render(mashup_id).await;
                Ok(())
            })
        });
    }

    /// Enqueue analysis for a track unless one is already in flight
    pub fn enqueue_analyze(&self, track_id: Uuid) {
        {
            let mut inflight = self.inflight_analyze.lock().expect("inflight set poisoned");
            if !inflight.insert(track_id) {
                info!(track_id = %track_id, "analyze already in flight, not enqueuing");
                return;
            }
        }
        self.queue
            .enqueue(JobKind::Analyze, serde_json::json!({ "track_id": track_id }));
    }

    pub fn enqueue_separate(&self, track_id: Uuid) {
        self.queue
            .enqueue(JobKind::Separate, serde_json::json!({ "track_id": track_id }));
    }

    pub fn enqueue_plan(&self, mashup_id: Uuid) {
        self.queue
            .enqueue(JobKind::Plan, serde_json::json!({ "mashup_id": mashup_id }));
    }

    pub fn enqueue_render(&self, mashup_id: Uuid) {
        self.queue
            .enqueue(JobKind::Render, serde_json::json!({ "mashup_id": mashup_id }));
    }

    /// Resurrect jobs for rows stuck before completion
    ///
    /// Called once at startup: pending/analyzing tracks get a fresh
    /// analyze job, pending mashups a plan job, generating mashups a
    /// render job when their plan survived.
    pub async fn recover_on_startup(&self) -> Result<()> {
        let tracks = db::tracks::list_unfinished_tracks(&self.db).await?;
        for track in &tracks {
            self.enqueue_analyze(track.id);
        }

        let mashups = db::mashups::list_unfinished_mashups(&self.db).await?;
        let mashup_count = mashups.len();
        for mashup in mashups {
            match (mashup.status, mashup.plan.is_some()) {
                (MashupStatus::Generating, true) => self.enqueue_render(mashup.id),
                _ => self.enqueue_plan(mashup.id),
            }
        }

        if !tracks.is_empty() || mashup_count > 0 {
            info!(
                tracks = tracks.len(),
                mashups = mashup_count,
                "resurrected unfinished jobs from catalog"
            );
        }
        Ok(())
    }

    async fn run_analyze(&self, track_id: Uuid) {
        let result = self.analyze_track(track_id).await;
        self.inflight_analyze
            .lock()
            .expect("inflight set poisoned")
            .remove(&track_id);
        if let Err(e) = result {
            error!(track_id = %track_id, error = %e, "analysis failed");
            if let Err(db_err) =
                db::tracks::set_analysis_status(&self.db, track_id, AnalysisStatus::Failed).await
            {
                error!(track_id = %track_id, error = %db_err, "failed to mark track failed");
            }
            self.bus.emit_lossy(MixEvent::AnalysisFailed {
                track_id,
                reason: e.to_string(),
                timestamp: Utc::now(),
            });
        }
    }

    async fn analyze_track(&self, track_id: Uuid) -> Result<()> {
        let track = db::tracks::get_track(&self.db, track_id)
            .await?
            .ok_or_else(|| crate::error::Error::NotFound(format!("track {track_id}")))?;
        if track.analysis_status == AnalysisStatus::Completed {
            info!(track_id = %track_id, "track already analyzed, skipping");
            return Ok(());
        }

        db::tracks::set_analysis_status(&self.db, track_id, AnalysisStatus::Analyzing).await?;
        self.bus.emit_lossy(MixEvent::AnalysisStarted {
            track_id,
            timestamp: Utc::now(),
        });

        let object = storage::get_with_retry(self.store.as_ref(), &track.storage_key).await?;
        let container_duration = self.decoder.probe_duration(&object.bytes, &track.mime).await;
        let pcm = self.decoder.decode_bytes(&object.bytes, &track.mime).await?;
        let result = self.analyzer.analyze(&pcm.samples, container_duration);

        db::tracks::save_analysis(&self.db, track_id, &result).await?;
        info!(
            track_id = %track_id,
            bpm = ?result.bpm,
            camelot = ?result.camelot_key,
            duration = result.duration_seconds,
            "track analysis persisted"
        );
        self.bus.emit_lossy(MixEvent::AnalysisCompleted {
            track_id,
            bpm: result.bpm,
            camelot_key: result.camelot_key.clone(),
            duration_seconds: result.duration_seconds,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn run_separate(&self, track_id: Uuid) {
        if let Err(e) = self.separate_track(track_id).await {
            error!(track_id = %track_id, error = %e, "stem separation failed");
        }
    }

    async fn separate_track(&self, track_id: Uuid) -> Result<()> {
        let track = db::tracks::get_track(&self.db, track_id)
            .await?
            .ok_or_else(|| crate::error::Error::NotFound(format!("track {track_id}")))?;
        let object = storage::get_with_retry(self.store.as_ref(), &track.storage_key).await?;

        let outcome = self
            .separator
            .separate(&object.bytes, &track.mime, &track.original_name)
            .await;

        let (engine, stems) = match outcome {
            Ok(result) => result,
            Err(e) => {
                // All engines exhausted: mark every stem failed
                for kind in crate::db::stems::StemKind::all() {
                    let now = Utc::now();
                    let record = StemRecord {
                        id: Uuid::new_v4(),
                        track_id,
                        kind: *kind,
                        storage_key: None,
                        mime: None,
                        status: StemStatus::Failed,
                        quality: StemQuality::Draft,
                        engine: None,
                        created_at: now,
                        updated_at: now,
                    };
                    db::stems::upsert_stem(&self.db, &record).await?;
                    self.bus.emit_lossy(MixEvent::StemFailed {
                        track_id,
                        stem: kind.as_str().to_string(),
                        reason: e.to_string(),
                        timestamp: now,
                    });
                }
                return Err(e);
            }
        };

        // Each stem uploads and indexes independently; a partial set is
        // a valid completion
        for (kind, payload) in stems {
            let ext = if payload.mime == "audio/mpeg" { "mp3" } else { "wav" };
            let key = keys::stem_key(track_id, kind.as_str(), ext);
            match storage::put_with_retry(self.store.as_ref(), &key, &payload.bytes, &payload.mime)
                .await
            {
                Ok(stored_key) => {
                    let now = Utc::now();
                    let record = StemRecord {
                        id: Uuid::new_v4(),
                        track_id,
                        kind,
                        storage_key: Some(stored_key),
                        mime: Some(payload.mime.clone()),
                        status: StemStatus::Completed,
                        quality: StemQuality::Draft,
                        engine: Some(engine.to_string()),
                        created_at: now,
                        updated_at: now,
                    };
                    db::stems::upsert_stem(&self.db, &record).await?;
                    self.bus.emit_lossy(MixEvent::StemCompleted {
                        track_id,
                        stem: kind.as_str().to_string(),
                        engine: engine.to_string(),
                        timestamp: now,
                    });
                }
                Err(e) => {
                    warn!(track_id = %track_id, stem = kind.as_str(), error = %e, "stem upload failed");
                }
            }
        }
        Ok(())
    }

    async fn run_plan(&self, mashup_id: Uuid) {
        if let Err(e) = self.plan_mashup(mashup_id).await {
            error!(mashup_id = %mashup_id, error = %e, "planning failed");
            if let Err(db_err) = db::mashups::fail_mashup(&self.db, mashup_id, &e.to_string()).await
            {
                error!(mashup_id = %mashup_id, error = %db_err, "failed to mark mashup failed");
            }
        }
    }

    async fn plan_mashup(&self, mashup_id: Uuid) -> Result<()> {
        let mashup = db::mashups::get_mashup(&self.db, mashup_id)
            .await?
            .ok_or_else(|| crate::error::Error::NotFound(format!("mashup {mashup_id}")))?;
        db::mashups::set_status(&self.db, mashup_id, MashupStatus::Generating).await?;

        let mut planner_tracks = Vec::with_capacity(mashup.track_ids.len());
        for track_id in &mashup.track_ids {
            let track = db::tracks::get_track(&self.db, *track_id)
                .await?
                .ok_or_else(|| crate::error::Error::NotFound(format!("track {track_id}")))?;
            if track.analysis_status != AnalysisStatus::Completed {
                return Err(crate::error::Error::AnalysisIncomplete(format!(
                    "track {track_id}"
                )));
            }
            planner_tracks.push(planner_track(&track));
        }

        let outcome = plan::plan(&planner_tracks, &mashup.request, &self.planner_defaults);

        // Heal-on-read: persist recomputed cue sets
        for (track_id, cues) in &outcome.healed_cues {
            if let Err(e) = db::tracks::save_cue_points(&self.db, *track_id, cues).await {
                warn!(track_id = %track_id, error = %e, "persisting healed cue points failed");
            }
        }

        db::mashups::save_plan(&self.db, mashup_id, &outcome.plan).await?;
        self.bus.emit_lossy(MixEvent::PlanCompleted {
            mashup_id,
            quality: outcome.plan.quality.score,
            transition_count: outcome.plan.transitions.len(),
            timestamp: Utc::now(),
        });

        self.enqueue_render(mashup_id);
        Ok(())
    }

    async fn run_render(&self, mashup_id: Uuid) {
        self.bus.emit_lossy(MixEvent::RenderStarted {
            mashup_id,
            timestamp: Utc::now(),
        });
        match self.render_mashup(mashup_id).await {
            Ok(()) => {}
            Err(e) => {
                error!(mashup_id = %mashup_id, error = %e, "render failed");
                if let Err(db_err) =
                    db::mashups::fail_mashup(&self.db, mashup_id, &e.to_string()).await
                {
                    error!(mashup_id = %mashup_id, error = %db_err, "failed to mark mashup failed");
                }
                self.bus.emit_lossy(MixEvent::RenderFailed {
                    mashup_id,
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    async fn render_mashup(&self, mashup_id: Uuid) -> Result<()> {
        let mashup = db::mashups::get_mashup(&self.db, mashup_id)
            .await?
            .ok_or_else(|| crate::error::Error::NotFound(format!("mashup {mashup_id}")))?;
        let mix_plan = mashup
            .plan
            .clone()
            .ok_or_else(|| crate::error::Error::Render(crate::error::RenderError::GraphFailed {
                detail: "mashup has no plan".into(),
            }))?;

        // Sources in plan order
        let mut render_tracks = Vec::with_capacity(mix_plan.order.len());
        for track_id in &mix_plan.order {
            let track = db::tracks::get_track(&self.db, *track_id)
                .await?
                .ok_or_else(|| crate::error::Error::NotFound(format!("track {track_id}")))?;
            render_tracks.push(RenderTrack {
                id: track.id,
                storage_key: track.storage_key.clone(),
                mime: track.mime.clone(),
                duration_seconds: track.duration_seconds.unwrap_or(0.0),
                bpm: track.bpm,
            });
        }

        let config = RenderConfig::from_request(&mashup.request, &self.output_bitrate);
        let output = self
            .renderer
            .render(mashup_id, &mix_plan, &render_tracks, &config)
            .await?;

        db::mashups::complete_render(
            &self.db,
            mashup_id,
            &output.output_key,
            output.generation_time_ms as i64,
        )
        .await?;
        self.bus.emit_lossy(MixEvent::RenderCompleted {
            mashup_id,
            output_key: output.output_key,
            generation_time_ms: output.generation_time_ms,
            used_fallback: output.used_fallback,
            timestamp: Utc::now(),
        });
        Ok(())
    }
}

/// Parse an entity id out of a job payload
fn payload_id(payload: &serde_json::Value, field: &str) -> anyhow::Result<Uuid> {
    let text = payload
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("payload missing {field}"))?;
    Ok(Uuid::parse_str(text)?)
}

/// Catalog track → planner view
fn planner_track(track: &crate::db::tracks::Track) -> PlannerTrack {
    PlannerTrack {
        id: track.id,
        bpm: track.bpm,
        duration_seconds: track.duration_seconds.unwrap_or(0.0),
        beat_grid: track.beat_grid.clone(),
        phrases: track.phrases.clone(),
        structure: track.structure.clone(),
        drop_moments: track.drop_moments.clone(),
        cue_points: track.cue_points,
        camelot_key: track
            .camelot_key
            .as_deref()
            .and_then(|k| k.parse().ok()),
        genre: track.genre.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_id_parses() {
        let id = Uuid::new_v4();
        let payload = serde_json::json!({ "track_id": id });
        assert_eq!(payload_id(&payload, "track_id").unwrap(), id);
        assert!(payload_id(&payload, "mashup_id").is_err());
        assert!(payload_id(&serde_json::json!({ "track_id": 7 }), "track_id").is_err());
    }

    #[test]
    fn test_planner_track_maps_camelot() {
        let mut track =
            crate::db::tracks::Track::new_upload("u", "a.mp3", "audio/mpeg", "k", None, None);
        track.camelot_key = Some("8A".to_string());
        track.duration_seconds = Some(180.0);
        let planner = planner_track(&track);
        assert_eq!(planner.camelot_key.unwrap().to_string(), "8A");
        assert_eq!(planner.duration_seconds, 180.0);
    }
}
