//! Route handlers for the HTTP API.

pub mod health;
pub mod images;
pub mod proxy;
pub mod schedule;
pub mod skip_times;
pub mod subtitles;
pub mod video;

use anistream_core::Error;

use super::error::AppError;
use super::middleware::request_id::RequestId;

/// Attach the request id to a core error.
pub(crate) fn fail(rid: &RequestId) -> impl Fn(Error) -> AppError + '_ {
    move |e| AppError::new(e).with_request_id(rid.0.clone())
}
