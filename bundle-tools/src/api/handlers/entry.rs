use std::io::{self, Read};
use std::path::Path as FsPath;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use bundle::{BundleResult, DecodeMode, Index};
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::api::errors::ApiError;
use crate::api::router::AppState;

/// Chunks buffered between the reader task and the response body
const CHANNEL_DEPTH: usize = 4;

/// Whether `Accept-Encoding` allows a gzip response body
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|coding| {
            let mut parts = coding.split(';').map(str::trim);
            let name = parts.next().unwrap_or_default();
            let refused = parts.any(|p| {
                p.strip_prefix("q=")
                    .and_then(|q| q.parse::<f32>().ok())
                    .is_some_and(|q| q == 0.0)
            });
            name.eq_ignore_ascii_case("gzip") && !refused
        })
}

fn content_type(name: &str) -> &'static str {
    let ext = FsPath::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "txt" => "text/plain; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Runs on a blocking thread: open the entry, report the outcome through
/// `ready`, then push chunks until EOF, an error or a dropped receiver.
fn stream_entry(
    index: &Index,
    name: &str,
    mode: DecodeMode,
    chunk_size: usize,
    ready: oneshot::Sender<BundleResult<()>>,
    tx: mpsc::Sender<io::Result<Bytes>>,
) {
    let mut reader = match index.open(name, mode) {
        Ok(reader) => reader,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }

    let mut buf = vec![0u8; chunk_size];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.blocking_send(Ok(Bytes::copy_from_slice(&buf[..n]))).is_err() {
                    debug!(name, "client went away");
                    return;
                }
            }
            Err(e) => {
                warn!(name, error = %e, "entry stream failed");
                let _ = tx.blocking_send(Err(e));
                return;
            }
        }
    }

    if let Err(e) = reader.close() {
        warn!(name, error = %e, "entry failed verification on close");
        let _ = tx.blocking_send(Err(io::Error::other(e)));
        return;
    }
    debug!(name, bytes = reader.produced(), "entry streamed");
}

/// GET /{*name}
/// Stream one entry
pub async fn entry_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let entry = state
        .index
        .lookup(&name)
        .ok_or_else(|| ApiError::not_found(format!("No such entry: {}", name)))?;

    // Compressed entries go out as stored when the client can take gzip
    let gzip = entry.is_compressed() && accepts_gzip(&headers);
    let mode = if gzip {
        DecodeMode::Raw
    } else {
        DecodeMode::Decompress
    };
    let size = entry.size();
    info!(name = %name, size, gzip, "serving entry");

    let (ready_tx, ready_rx) = oneshot::channel();
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    let index = state.index.clone();
    let chunk_size = state.chunk_size;
    let task_name = name.clone();
    tokio::task::spawn_blocking(move || {
        stream_entry(&index, &task_name, mode, chunk_size, ready_tx, tx)
    });

    ready_rx
        .await
        .map_err(|_| ApiError::internal_error("Entry reader stopped unexpectedly"))??;

    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(&name));
    if gzip {
        response = response
            .header(header::CONTENT_ENCODING, "gzip")
            .header(header::VARY, HeaderValue::from_static("accept-encoding"));
    } else {
        response = response.header(header::CONTENT_LENGTH, size.to_string());
    }

    response
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal_error(format!("Failed to build response: {}", e)))
}
