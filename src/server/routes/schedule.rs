use axum::extract::{Query, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;

use super::fail;
use crate::schedule::{parse_date, ScheduleEntry};
use crate::server::context::AppContext;
use crate::server::error::AppError;
use crate::server::middleware::request_id::RequestId;

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    #[serde(default)]
    pub date: Option<String>,
}

/// GET /schedule?date=YYYY-MM-DD
///
/// Defaults to today (UTC). Thumbnails are rewritten to go through the image
/// proxy.
pub async fn get_schedule(
    State(ctx): State<AppContext>,
    Extension(rid): Extension<RequestId>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<ScheduleEntry>>, AppError> {
    let date = match query.date.as_deref() {
        None | Some("") => Utc::now().date_naive(),
        Some(raw) => parse_date(raw).map_err(fail(&rid))?,
    };

    let cancel = ctx.request_token();
    let _guard = cancel.clone().drop_guard();
    let key = format!("schedule:{date}");

    let entries = ctx
        .cache
        .get_or_try_compute(&key, ctx.schedule_ttl(), || async {
            let mut entries = ctx.schedule.day(date, &cancel).await?;
            for entry in &mut entries {
                if !entry.thumbnail.is_empty() {
                    entry.thumbnail = ctx.decoder.decode_thumbnail(&entry.thumbnail);
                }
            }
            Ok::<_, anistream_core::Error>(entries)
        })
        .await
        .map_err(fail(&rid))?;

    Ok(Json(entries.as_ref().clone()))
}
