//! Albums Lambda - Handles /api/albums.
//!
//! Returns the music catalog assembled from the Drive folder tree. The
//! builder lives in the function's state so its cache survives warm
//! invocations.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{error_response, from_error, success_response};
use shared::{CatalogBuilder, Config, GoogleDriveClient, SpotifyCoverArt, TtlCache};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState {
    builder: CatalogBuilder,
    music_folder_id: String,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let music_folder_id = config.music_folder_id()?.to_string();
        let api_key = shared::resolve_google_api_key(&config).await?;

        let http_client = reqwest::Client::new();
        let builder = CatalogBuilder::new(
            Arc::new(GoogleDriveClient::new(http_client.clone(), api_key)),
            Arc::new(SpotifyCoverArt::new(http_client)),
            TtlCache::new(config.catalog_cache_ttl),
            config.image_base_path.clone(),
        );

        Ok(Self {
            builder,
            music_folder_id,
        })
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let path = event.uri().path();

    info!("Albums request: {} {}", method, path);

    match (method, path) {
        ("GET", "/api/albums") => match state.builder.build_catalog(&state.music_folder_id).await {
            Ok(catalog) => success_response(200, catalog.as_ref()),
            Err(e) => from_error(&e),
        },
        (_, "/api/albums") => error_response(405, "Method not allowed"),
        _ => error_response(404, "Not found"),
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
