use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use tracing::{debug, warn};

use crate::auth::AppState;
use crate::error::ApiError;

/// Upstream fetches give up after 15 seconds.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);

/// Clients may cache audio for 30 days.
const CACHE_CONTROL: &str = "public, max-age=2592000";

/// GET /api/audio-proxy/{*path}: stream an audio file from object storage
/// so the browser sees it as same-origin.
pub async fn proxy_audio(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let base = state
        .storage_url
        .as_deref()
        .ok_or_else(|| ApiError::Upstream("audio storage is not configured".into()))?;
    let path = sanitize_path(&path)?;
    let url = format!("{}/{}", base.trim_end_matches('/'), path);

    debug!("Proxying audio {}", url);
    let upstream = state
        .http
        .get(&url)
        .timeout(UPSTREAM_TIMEOUT)
        .send()
        .await
        .map_err(|e| {
            warn!("Audio fetch {} failed: {}", url, e);
            ApiError::Upstream(if e.is_timeout() {
                "audio storage timed out".into()
            } else {
                "audio storage unreachable".into()
            })
        })?;

    let status = upstream.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound("Audio file"));
    }
    if !status.is_success() {
        warn!("Audio fetch {} returned {}", url, status);
        return Err(ApiError::Upstream(format!("audio storage returned {}", status.as_u16())));
    }

    let mut headers = HeaderMap::new();
    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok())
        .unwrap_or_else(|| HeaderValue::from_static("audio/mpeg"));
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Some(len) = upstream.content_length() {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));

    let body = Body::from_stream(upstream.bytes_stream());
    Ok((StatusCode::OK, headers, body))
}

/// Reject traversal and empty segments; the proxy only reads below its base URL.
fn sanitize_path(raw: &str) -> Result<&str, ApiError> {
    let path = raw.trim_start_matches('/');
    let bad = path.is_empty()
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        || path.contains('\\');
    if bad {
        Err(ApiError::BadRequest("Invalid audio path".into()))
    } else {
        Ok(path)
    }
}
