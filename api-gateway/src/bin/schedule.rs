//! Schedule Lambda - Handles /api/events.
//!
//! Lists upcoming shows from the public Google Calendar.

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde::Serialize;
use shared::http::{error_response, from_error, success_response};
use shared::{CalendarClient, Config, ScheduleEvent};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 250;

#[derive(Debug, Serialize)]
struct EventsResponse {
    count: usize,
    events: Vec<ScheduleEvent>,
}

/// Application state
struct AppState {
    calendar: CalendarClient,
    calendar_id: String,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let calendar_id = config.calendar_id()?.to_string();
        let api_key = shared::resolve_google_api_key(&config).await?;

        Ok(Self {
            calendar: CalendarClient::new(reqwest::Client::new(), api_key),
            calendar_id,
        })
    }
}

fn parse_limit(raw: Option<&str>) -> usize {
    raw.and_then(|l| l.parse::<usize>().ok())
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_LIMIT)
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let path = event.uri().path();

    info!("Schedule request: {} {}", method, path);

    match (method, path) {
        ("GET", "/api/events") => {
            let params = event.query_string_parameters();
            let limit = parse_limit(params.first("limit"));

            match state
                .calendar
                .list_upcoming_events(&state.calendar_id, limit)
                .await
            {
                Ok(events) => success_response(
                    200,
                    EventsResponse {
                        count: events.len(),
                        events,
                    },
                ),
                Err(e) => from_error(&e),
            }
        }
        (_, "/api/events") => error_response(405, "Method not allowed"),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some("5")), 5);
        assert_eq!(parse_limit(Some("0")), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some("abc")), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some("9999")), MAX_LIMIT);
    }
}
