//! Biography Lambda - Handles /api/biography.
//!
//! Fetches the published biography Google Doc and returns it as plain text
//! with `*` emphasis markers.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::Serialize;
use shared::http::{error_response, from_error, success_response};
use shared::{format_document, Config};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const PUBLISHED_DOC_BASE_URL: &str = "https://docs.google.com/document/d";

#[derive(Debug, Serialize)]
struct BiographyResponse {
    content: String,
}

/// Application state
struct AppState {
    http_client: reqwest::Client,
    published_url: String,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let doc_id = config.biography_doc_id()?;

        Ok(Self {
            http_client: reqwest::Client::new(),
            published_url: format!("{}/{}/pub", PUBLISHED_DOC_BASE_URL, doc_id),
        })
    }

    async fn fetch_biography(&self) -> shared::Result<String> {
        let response = self.http_client.get(&self.published_url).send().await?;

        if !response.status().is_success() {
            return Err(shared::Error::Upstream {
                service: "Google Docs",
                message: format!("published document returned {}", response.status()),
            });
        }

        let html = response.text().await?;
        Ok(format_document(&html))
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let path = event.uri().path();

    info!("Biography request: {} {}", method, path);

    match (method, path) {
        ("GET", "/api/biography") => match state.fetch_biography().await {
            Ok(content) => success_response(200, BiographyResponse { content }),
            Err(e) => from_error(&e),
        },
        (_, "/api/biography") => error_response(405, "Method not allowed"),
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
