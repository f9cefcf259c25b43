use axum::extract::{Query, State};
use axum::response::Response;
use axum::Extension;
use serde::Deserialize;

use super::fail;
use crate::server::context::AppContext;
use crate::server::error::AppError;
use crate::server::middleware::request_id::RequestId;

#[derive(Debug, Deserialize)]
pub struct SubtitleQuery {
    pub url: String,
}

/// GET /subtitle-proxy?url
pub async fn subtitle_proxy(
    State(ctx): State<AppContext>,
    Extension(rid): Extension<RequestId>,
    Query(query): Query<SubtitleQuery>,
) -> Result<Response, AppError> {
    let cancel = ctx.request_token();
    let _guard = cancel.clone().drop_guard();
    ctx.proxy
        .subtitle(&query.url, &cancel)
        .await
        .map_err(fail(&rid))
}
