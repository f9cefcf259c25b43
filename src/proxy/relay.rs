//! Cancellable upstream-to-client byte relay.
//!
//! The upstream body is pumped by a spawned task into a bounded channel; the
//! client-facing body reads from that channel and owns a [`DropGuard`] on the
//! request's cancellation token. When the client disconnects, hyper drops the
//! body, the guard cancels the token, and the pump drops the upstream
//! response, closing its connection.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName};
use axum::response::Response;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, trace};

/// Chunks buffered between the pump and the client.
const RELAY_BUFFER: usize = 8;

/// Headers that describe a single hop and must not be mirrored.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Copy end-to-end headers from `upstream` into `target`.
pub fn mirror_headers(upstream: &HeaderMap, target: &mut HeaderMap) {
    for (name, value) in upstream {
        if HOP_BY_HOP.contains(name) {
            continue;
        }
        target.append(name.clone(), value.clone());
    }
}

/// Build the client response for an upstream response: same status, same
/// end-to-end headers, body relayed under `cancel`.
pub fn relay_response(upstream: reqwest::Response, cancel: CancellationToken) -> Response {
    let status = upstream.status();
    let mut headers = HeaderMap::new();
    mirror_headers(upstream.headers(), &mut headers);

    let mut response = Response::new(relay_body(upstream.bytes_stream(), cancel));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Relay `upstream` into a response body.
///
/// A mid-stream upstream error is forwarded as a body error so the server
/// aborts the connection instead of finishing a truncated body cleanly.
pub fn relay_body<S, E>(upstream: S, cancel: CancellationToken) -> Body
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(RELAY_BUFFER);
    let pump_cancel = cancel.clone();

    tokio::spawn(async move {
        let mut upstream = Box::pin(upstream);
        let mut relayed: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = pump_cancel.cancelled() => {
                    trace!(bytes = relayed, "Client disconnected; dropping upstream");
                    break;
                }
                next = upstream.next() => match next {
                    Some(Ok(chunk)) => {
                        relayed += chunk.len() as u64;
                        if tx.send(Ok(chunk)).await.is_err() {
                            trace!(bytes = relayed, "Client body closed; dropping upstream");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(bytes = relayed, error = %e, "Upstream failed mid-stream");
                        let _ = tx.send(Err(io::Error::other(e))).await;
                        break;
                    }
                    None => {
                        trace!(bytes = relayed, "Upstream finished");
                        break;
                    }
                },
            }
        }
        // `upstream` is dropped here, releasing the connection.
    });

    Body::from_stream(GuardedStream {
        inner: ReceiverStream::new(rx),
        _guard: cancel.drop_guard(),
    })
}

/// Receiver stream that cancels the pump when dropped.
struct GuardedStream {
    inner: ReceiverStream<io::Result<Bytes>>,
    _guard: DropGuard,
}

impl Stream for GuardedStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
