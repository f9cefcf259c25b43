//! Axum router construction.

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::context::AppContext;
use super::middleware::request_id::request_id_middleware;
use super::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/video", get(routes::video::get_video))
        .route("/proxy", get(routes::proxy::proxy))
        .route("/subtitle-proxy", get(routes::subtitles::subtitle_proxy))
        .route("/image-proxy", get(routes::images::image_proxy))
        .route(
            "/skip-times/{mal_id}/{episode}",
            get(routes::skip_times::get_skip_times),
        )
        .route("/schedule", get(routes::schedule::get_schedule))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
