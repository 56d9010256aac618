//! Contact Lambda - Contact form submissions.
//!
//! Endpoints:
//! - POST /api/contact - Submit the contact form
//!
//! Stored submissions are never served back over HTTP.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{error_response, from_error, success_response};
use shared::{parse_body, ContactRequest, ContactStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState {
    store: ContactStore,
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let path = event.uri().path();

    info!("Contact request: {} {}", method, path);

    match (method, path) {
        ("POST", "/api/contact") => {
            let request: ContactRequest = parse_body!(event.body());

            match state.store.submit(request).await {
                Ok(submission) => success_response(201, submission),
                Err(e) => from_error(&e),
            }
        }

        (_, "/api/contact") => error_response(405, "Method not allowed"),
        _ => error_response(404, "Not found"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState {
        store: ContactStore::new(),
    });

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<AppState> {
        Arc::new(AppState {
            store: ContactStore::new(),
        })
    }

    fn request(method: &str, body: Body) -> Request {
        lambda_http::http::Request::builder()
            .method(method)
            .uri("/api/contact")
            .body(body)
            .unwrap()
    }

    #[tokio::test]
    async fn test_post_stores_submission() {
        let state = state();
        let body = Body::from(r#"{"name":"Ada","email":"ada@example.com","message":"Booking?"}"#);

        let response = handler(state.clone(), request("POST", body)).await.unwrap();
        assert_eq!(response.status(), 201);
        assert_eq!(state.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_does_not_expose_submissions() {
        let state = state();
        let body = Body::from(r#"{"name":"Ada","email":"ada@example.com","message":"Booking?"}"#);
        handler(state.clone(), request("POST", body)).await.unwrap();

        let response = handler(state, request("GET", Body::Empty)).await.unwrap();
        assert_eq!(response.status(), 405);
        let Body::Text(text) = response.body() else {
            panic!("expected a text body");
        };
        assert!(!text.contains("ada@example.com"));
    }
}
