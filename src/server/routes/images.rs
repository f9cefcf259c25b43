//! Image proxy with optional resizing.
//!
//! Always answers 200: upstream or decode failures fall back to the bundled
//! placeholder.

use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use tracing::debug;

use crate::images::{image_response, placeholder_response, resize_to_jpeg, TargetSize};
use crate::server::context::AppContext;

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default)]
    pub height: Option<String>,
}

/// GET /image-proxy?url&width&height
pub async fn image_proxy(State(ctx): State<AppContext>, Query(query): Query<ImageQuery>) -> Response {
    let Some(url) = query.url.filter(|u| !u.is_empty()) else {
        return placeholder_response();
    };
    let dimension = |raw: Option<String>| raw.and_then(|v| v.trim().parse::<u32>().ok());
    let size = TargetSize::new(dimension(query.width), dimension(query.height));

    let cancel = ctx.request_token();
    let _guard = cancel.clone().drop_guard();

    let (content_type, bytes) = match ctx.proxy.image_bytes(&url, &cancel).await {
        Ok(fetched) => fetched,
        Err(e) => {
            debug!(url = %url, error = %e, "Image fetch failed; serving placeholder");
            return placeholder_response();
        }
    };

    let content_type = content_type.unwrap_or_default();
    if !content_type.starts_with("image/") {
        debug!(url = %url, content_type = %content_type, "Not an image; serving placeholder");
        return placeholder_response();
    }

    if size.is_passthrough() {
        return image_response(&content_type, bytes.to_vec());
    }

    match tokio::task::spawn_blocking(move || resize_to_jpeg(&bytes, size)).await {
        Ok(Ok(jpeg)) => image_response("image/jpeg", jpeg),
        Ok(Err(e)) => {
            debug!(url = %url, error = %e, "Image resize failed; serving placeholder");
            placeholder_response()
        }
        Err(e) => {
            debug!(url = %url, error = %e, "Resize task failed; serving placeholder");
            placeholder_response()
        }
    }
}
