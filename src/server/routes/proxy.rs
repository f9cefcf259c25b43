//! Media and manifest pass-through.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use axum::Extension;
use serde::Deserialize;

use super::fail;
use crate::server::context::AppContext;
use crate::server::error::AppError;
use crate::server::middleware::request_id::RequestId;

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: String,
    #[serde(default)]
    pub referer: Option<String>,
}

/// GET /proxy?url&referer
///
/// Manifests come back rewritten, everything else is streamed with the
/// client's Range header forwarded.
pub async fn proxy(
    State(ctx): State<AppContext>,
    Extension(rid): Extension<RequestId>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let cancel = ctx.request_token();
    // Covers the wait for upstream headers; the relayed body holds its own
    // guard once the response exists.
    let guard = cancel.clone().drop_guard();

    let result = ctx
        .proxy
        .proxy(
            &query.url,
            query.referer.as_deref(),
            headers.get(header::RANGE),
            cancel,
        )
        .await;
    let _ = guard.disarm();

    result.map_err(fail(&rid))
}
