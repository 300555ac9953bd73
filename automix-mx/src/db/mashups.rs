//! Mashup catalog operations

use crate::error::{Error, Result};
use crate::plan::request::MixRequest;
use crate::plan::Plan;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Mashup lifecycle state
///
/// Monotonic pending → generating → completed | failed; a failed render
/// is retried by creating a new mashup record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MashupStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl MashupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MashupStatus::Pending => "pending",
            MashupStatus::Generating => "generating",
            MashupStatus::Completed => "completed",
            MashupStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MashupStatus::Pending),
            "generating" => Some(MashupStatus::Generating),
            "completed" => Some(MashupStatus::Completed),
            "failed" => Some(MashupStatus::Failed),
            _ => None,
        }
    }
}

/// How source material feeds the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixMode {
    /// Full original tracks
    Standard,
    /// Prefer separated stems where available
    Stems,
}

impl MixMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MixMode::Standard => "standard",
            MixMode::Stems => "stems",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(MixMode::Standard),
            "stems" => Some(MixMode::Stems),
            _ => None,
        }
    }
}

/// Mashup record
#[derive(Debug, Clone)]
pub struct Mashup {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub target_duration_seconds: i64,
    pub status: MashupStatus,
    pub mix_mode: MixMode,
    pub track_ids: Vec<Uuid>,
    pub request: MixRequest,
    pub plan: Option<Plan>,
    pub output_key: Option<String>,
    pub generation_time_ms: Option<i64>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mashup {
    /// Fresh record for an accepted mix request
    pub fn new(user_id: &str, name: &str, request: MixRequest) -> Self {
        let now = Utc::now();
        let mix_mode = if request.prefer_stems.unwrap_or(false) {
            MixMode::Stems
        } else {
            MixMode::Standard
        };
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            target_duration_seconds: request.target_duration_seconds,
            status: MashupStatus::Pending,
            mix_mode,
            track_ids: request.track_ids.clone(),
            request,
            plan: None,
            output_key: None,
            generation_time_ms: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

fn row_to_mashup(row: &sqlx::sqlite::SqliteRow) -> Result<Mashup> {
    let id: String = row.get("id");
    let status: String = row.get("status");
    let mix_mode: String = row.get("mix_mode");
    let track_ids: String = row.get("track_ids");
    let request: String = row.get("request");
    let plan: Option<String> = row.get("plan");
    let created: String = row.get("created_at");
    let updated: String = row.get("updated_at");

    Ok(Mashup {
        id: Uuid::parse_str(&id).map_err(|e| Error::Other(e.into()))?,
        user_id: row.get("user_id"),
        name: row.get("name"),
        target_duration_seconds: row.get("target_duration_seconds"),
        status: MashupStatus::parse(&status)
            .ok_or_else(|| Error::Other(anyhow::anyhow!("bad mashup status {status:?}")))?,
        mix_mode: MixMode::parse(&mix_mode)
            .ok_or_else(|| Error::Other(anyhow::anyhow!("bad mix mode {mix_mode:?}")))?,
        track_ids: serde_json::from_str(&track_ids).map_err(anyhow::Error::from)?,
        request: serde_json::from_str(&request).map_err(anyhow::Error::from)?,
        plan: plan.and_then(|p| serde_json::from_str(&p).ok()),
        output_key: row.get("output_key"),
        generation_time_ms: row.get("generation_time_ms"),
        failure_reason: row.get("failure_reason"),
        created_at: DateTime::parse_from_rfc3339(&created)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        updated_at: DateTime::parse_from_rfc3339(&updated)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

/// Insert a new mashup row
pub async fn insert_mashup(pool: &SqlitePool, mashup: &Mashup) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO mashups (
            id, user_id, name, target_duration_seconds, status, mix_mode,
            track_ids, request, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(mashup.id.to_string())
    .bind(&mashup.user_id)
    .bind(&mashup.name)
    .bind(mashup.target_duration_seconds)
    .bind(mashup.status.as_str())
    .bind(mashup.mix_mode.as_str())
    .bind(serde_json::to_string(&mashup.track_ids).map_err(anyhow::Error::from)?)
    .bind(serde_json::to_string(&mashup.request).map_err(anyhow::Error::from)?)
    .bind(mashup.created_at.to_rfc3339())
    .bind(mashup.updated_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// Load a mashup by id
pub async fn get_mashup(pool: &SqlitePool, id: Uuid) -> Result<Option<Mashup>> {
    let row = sqlx::query("SELECT * FROM mashups WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_mashup).transpose()
}

/// Load a mashup owned by `user_id`; others read as absent
pub async fn get_mashup_owned(pool: &SqlitePool, id: Uuid, user_id: &str) -> Result<Mashup> {
    match get_mashup(pool, id).await? {
        Some(mashup) if mashup.user_id == user_id => Ok(mashup),
        _ => Err(Error::NotFound(format!("mashup {id}"))),
    }
}

/// Transition a mashup's status
pub async fn set_status(pool: &SqlitePool, id: Uuid, status: MashupStatus) -> Result<()> {
    sqlx::query("UPDATE mashups SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Persist the computed plan
pub async fn save_plan(pool: &SqlitePool, id: Uuid, plan: &Plan) -> Result<()> {
    sqlx::query("UPDATE mashups SET plan = ?, updated_at = ? WHERE id = ?")
        .bind(serde_json::to_string(plan).map_err(anyhow::Error::from)?)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Record a successful render
pub async fn complete_render(
    pool: &SqlitePool,
    id: Uuid,
    output_key: &str,
    generation_time_ms: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE mashups SET
            status = 'completed', output_key = ?, generation_time_ms = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(output_key)
    .bind(generation_time_ms)
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Record a terminal failure; no partial artifact is exposed
pub async fn fail_mashup(pool: &SqlitePool, id: Uuid, reason: &str) -> Result<()> {
    sqlx::query(
        "UPDATE mashups SET status = 'failed', failure_reason = ?, output_key = NULL, updated_at = ? WHERE id = ?",
    )
    .bind(reason)
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Seconds of completed mixes for a user since a cutoff (quota gate)
pub async fn rendered_seconds_since(
    pool: &SqlitePool,
    user_id: &str,
    since: DateTime<Utc>,
) -> Result<i64> {
    let row: (Option<i64>,) = sqlx::query_as(
        r#"
        SELECT SUM(target_duration_seconds) FROM mashups
        WHERE user_id = ? AND status IN ('pending', 'generating', 'completed') AND created_at >= ?
        "#,
    )
    .bind(user_id)
    .bind(since.to_rfc3339())
    .fetch_one(pool)
    .await?;
    Ok(row.0.unwrap_or(0))
}

/// Mashups stuck before completion, for startup job resurrection
pub async fn list_unfinished_mashups(pool: &SqlitePool) -> Result<Vec<Mashup>> {
    let rows = sqlx::query("SELECT * FROM mashups WHERE status IN ('pending', 'generating')")
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_mashup).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::request::MixRequest;

    fn request(ids: Vec<Uuid>) -> MixRequest {
        MixRequest {
            track_ids: ids,
            target_duration_seconds: 300,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_get_round_trip() {
        let pool = crate::db::init_test_pool().await.unwrap();
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        let mashup = Mashup::new("u1", "Friday set", request(ids.clone()));
        insert_mashup(&pool, &mashup).await.unwrap();

        let loaded = get_mashup(&pool, mashup.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MashupStatus::Pending);
        assert_eq!(loaded.track_ids, ids);
        assert_eq!(loaded.mix_mode, MixMode::Standard);
        assert!(loaded.plan.is_none());
    }

    #[tokio::test]
    async fn test_prefer_stems_sets_mode() {
        let mut req = request(vec![Uuid::new_v4(), Uuid::new_v4()]);
        req.prefer_stems = Some(true);
        let mashup = Mashup::new("u1", "stems", req);
        assert_eq!(mashup.mix_mode, MixMode::Stems);
    }

    #[tokio::test]
    async fn test_complete_render_sets_fields() {
        let pool = crate::db::init_test_pool().await.unwrap();
        let mashup = Mashup::new("u1", "m", request(vec![Uuid::new_v4(), Uuid::new_v4()]));
        insert_mashup(&pool, &mashup).await.unwrap();

        complete_render(&pool, mashup.id, "abc.mp3", 4200).await.unwrap();
        let loaded = get_mashup(&pool, mashup.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MashupStatus::Completed);
        assert_eq!(loaded.output_key.as_deref(), Some("abc.mp3"));
        assert_eq!(loaded.generation_time_ms, Some(4200));
    }

    #[tokio::test]
    async fn test_fail_clears_output() {
        let pool = crate::db::init_test_pool().await.unwrap();
        let mashup = Mashup::new("u1", "m", request(vec![Uuid::new_v4(), Uuid::new_v4()]));
        insert_mashup(&pool, &mashup).await.unwrap();

        fail_mashup(&pool, mashup.id, "graph failed").await.unwrap();
        let loaded = get_mashup(&pool, mashup.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MashupStatus::Failed);
        assert!(loaded.output_key.is_none());
        assert_eq!(loaded.failure_reason.as_deref(), Some("graph failed"));
    }

    #[tokio::test]
    async fn test_quota_sum_counts_active_and_completed() {
        let pool = crate::db::init_test_pool().await.unwrap();
        let since = Utc::now() - chrono::Duration::days(30);

        let a = Mashup::new("u1", "a", request(vec![Uuid::new_v4(), Uuid::new_v4()]));
        insert_mashup(&pool, &a).await.unwrap();
        let b = Mashup::new("u1", "b", request(vec![Uuid::new_v4(), Uuid::new_v4()]));
        insert_mashup(&pool, &b).await.unwrap();
        fail_mashup(&pool, b.id, "x").await.unwrap();

        // Failed renders do not count against quota
        let total = rendered_seconds_since(&pool, "u1", since).await.unwrap();
        assert_eq!(total, 300);
    }
}
