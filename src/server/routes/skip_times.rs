use axum::extract::{Path, State};
use axum::{Extension, Json};

use super::fail;
use crate::server::context::AppContext;
use crate::server::error::AppError;
use crate::server::middleware::request_id::RequestId;
use crate::skip::SkipTimes;

/// GET /skip-times/{mal_id}/{episode}
///
/// "Not found" answers are cached like any other; upstream failures are not.
pub async fn get_skip_times(
    State(ctx): State<AppContext>,
    Extension(rid): Extension<RequestId>,
    Path((mal_id, episode)): Path<(u64, u32)>,
) -> Result<Json<SkipTimes>, AppError> {
    let key = format!("skip:{mal_id}:{episode}");
    let times = ctx
        .cache
        .get_or_try_compute(&key, ctx.skip_ttl(), || ctx.skip.skip_times(mal_id, episode))
        .await
        .map_err(fail(&rid))?;
    Ok(Json(times.as_ref().clone()))
}
