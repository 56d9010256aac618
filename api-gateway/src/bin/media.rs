//! Media Lambda - Proxies Drive images and audio previews.
//!
//! Endpoints:
//! - GET /api/image/{fileId} - Cover image for upcoming releases
//! - GET /api/audio/{fileId} - Audio preview for upcoming releases
//!
//! Lambda returns the whole response at once, so files are buffered in
//! memory and capped at [`MAX_MEDIA_BYTES`].

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::drive::collect_stream;
use shared::http::{error_response, from_error};
use shared::{Config, DriveClient, GoogleDriveClient};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Largest file served. Binary bodies are base64-encoded into the 6 MB
/// Lambda response payload.
const MAX_MEDIA_BYTES: usize = 4 * 1024 * 1024;

/// Which kind of file a route serves.
#[derive(Debug, Clone, Copy, PartialEq)]
enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    fn accepts(&self, mime_type: &str) -> bool {
        match self {
            MediaKind::Image => mime_type.starts_with("image/"),
            MediaKind::Audio => mime_type.starts_with("audio/"),
        }
    }
}

/// Split `/api/image/{id}` style paths into kind and file id.
fn parse_media_path(path: &str) -> Option<(MediaKind, &str)> {
    let (kind, id) = if let Some(id) = path.strip_prefix("/api/image/") {
        (MediaKind::Image, id)
    } else if let Some(id) = path.strip_prefix("/api/audio/") {
        (MediaKind::Audio, id)
    } else {
        return None;
    };

    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some((kind, id))
}

/// Reject files whose reported size is over the cap. Unknown sizes pass and
/// are capped while downloading.
fn check_size(file_id: &str, size: Option<u64>) -> shared::Result<()> {
    match size {
        Some(size) if size > MAX_MEDIA_BYTES as u64 => Err(shared::Error::Validation(format!(
            "file {} is {} bytes, over the {} byte limit",
            file_id, size, MAX_MEDIA_BYTES
        ))),
        _ => Ok(()),
    }
}

/// Application state
struct AppState {
    drive: GoogleDriveClient,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let api_key = shared::resolve_google_api_key(&config).await?;

        Ok(Self {
            drive: GoogleDriveClient::new(reqwest::Client::new(), api_key),
        })
    }

    async fn fetch(&self, kind: MediaKind, file_id: &str) -> shared::Result<(String, Vec<u8>)> {
        let metadata = self.drive.get_file_metadata(file_id).await?;
        if !kind.accepts(&metadata.mime_type) {
            warn!("File {} has type {}, expected {:?}", file_id, metadata.mime_type, kind);
            return Err(shared::Error::NotFound(format!("{:?} {}", kind, file_id)));
        }

        check_size(file_id, metadata.size_bytes())?;

        let stream = self.drive.stream_file(file_id).await?;
        let bytes = collect_stream(stream, MAX_MEDIA_BYTES).await?;
        Ok((metadata.mime_type, bytes))
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let path = event.uri().path();

    info!("Media request: {} {}", method, path);

    let Some((kind, file_id)) = parse_media_path(path) else {
        return error_response(404, "Not found");
    };

    if method != "GET" {
        return error_response(405, "Method not allowed");
    }

    match state.fetch(kind, file_id).await {
        Ok((content_type, bytes)) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", content_type)
            .header("Cache-Control", "public, max-age=86400")
            .header("Access-Control-Allow-Origin", "*")
            .body(Body::Binary(bytes))?),
        Err(e) => from_error(&e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
