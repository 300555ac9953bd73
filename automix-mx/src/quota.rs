//! Monthly render quota check-gate
//!
//! Billing proper is external; the service only enforces one gate at
//! mix creation: the sum of this month's requested mix durations plus
//! the new request must fit under the configured cap. Failed renders do
//! not count.

use crate::db;
use crate::error::{Error, Result};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;

/// Gate a new mix request against the caller's monthly budget
pub async fn check_monthly_quota(
    pool: &SqlitePool,
    user_id: &str,
    requested_seconds: i64,
    monthly_cap_seconds: u64,
) -> Result<()> {
    let since = Utc::now() - Duration::days(30);
    let used = db::mashups::rendered_seconds_since(pool, user_id, since).await?;
    let total = used + requested_seconds;
    if total > monthly_cap_seconds as i64 {
        return Err(Error::Quota(format!(
            "monthly budget is {monthly_cap_seconds}s; {used}s used, {requested_seconds}s requested"
        )));
    }
    Ok(())
}
