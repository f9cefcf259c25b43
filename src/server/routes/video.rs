//! Episode source resolution.

use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use anistream_core::{SourceVariant, TranslationMode};

use super::fail;
use crate::server::context::AppContext;
use crate::server::error::AppError;
use crate::server::middleware::request_id::RequestId;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoQuery {
    pub show_id: String,
    pub episode_number: String,
    #[serde(default)]
    pub mode: Option<String>,
}

/// GET /video?showId&episodeNumber&mode
///
/// Resolved variants are cached for the video TTL; failures are not.
pub async fn get_video(
    State(ctx): State<AppContext>,
    Extension(rid): Extension<RequestId>,
    Query(query): Query<VideoQuery>,
) -> Result<Json<Vec<SourceVariant>>, AppError> {
    let mode: TranslationMode = match query.mode.as_deref() {
        None | Some("") => TranslationMode::default(),
        Some(raw) => raw.parse().map_err(fail(&rid))?,
    };

    let key = format!("video:{}:{}:{mode}", query.show_id, query.episode_number);
    let cancel = ctx.request_token();
    let _guard = cancel.clone().drop_guard();

    let variants = ctx
        .cache
        .get_or_try_compute(&key, ctx.video_ttl(), || {
            ctx.resolver.resolve_episode(
                ctx.catalog.as_ref(),
                &query.show_id,
                &query.episode_number,
                mode,
                &cancel,
            )
        })
        .await
        .map_err(fail(&rid))?;

    Ok(Json(variants.as_ref().clone()))
}
