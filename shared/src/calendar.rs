//! Google Calendar client for the schedule page.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
const SERVICE: &str = "Google Calendar";

/// Upcoming show as returned to the site.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEvent {
    pub id: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
}

/// Google Calendar event from API
#[derive(Debug, Deserialize)]
struct GoogleCalendarEvent {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: GoogleEventTime,
    end: GoogleEventTime,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleEventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleCalendarListResponse {
    items: Option<Vec<GoogleCalendarEvent>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

/// Read-only client for a public calendar.
#[derive(Clone)]
pub struct CalendarClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl CalendarClient {
    pub fn new(http_client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self::with_base_url(http_client, api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        http_client: reqwest::Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Events starting from now, soonest first, skipping cancelled ones.
    pub async fn list_upcoming_events(
        &self,
        calendar_id: &str,
        max_results: usize,
    ) -> Result<Vec<ScheduleEvent>> {
        self.list_events_from(calendar_id, Utc::now(), max_results).await
    }

    pub async fn list_events_from(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        max_results: usize,
    ) -> Result<Vec<ScheduleEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        while events.len() < max_results {
            let mut url = format!(
                "{}/calendars/{}/events?timeMin={}&singleEvents=true&orderBy=startTime&maxResults={}&key={}",
                self.base_url,
                urlencoding::encode(calendar_id),
                urlencoding::encode(&time_min.to_rfc3339()),
                max_results.min(250),
                urlencoding::encode(&self.api_key),
            );

            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let response = self.http_client.get(&url).send().await?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                return Err(Error::upstream(
                    SERVICE,
                    format!("events request failed ({}): {}", status, error_text),
                ));
            }

            let page: GoogleCalendarListResponse = response.json().await?;

            for event in page.items.unwrap_or_default() {
                if event.status.as_deref() == Some("cancelled") {
                    continue;
                }
                events.push(to_schedule_event(event)?);
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        events.truncate(max_results);
        debug!("Fetched {} upcoming events", events.len());
        Ok(events)
    }
}

fn to_schedule_event(event: GoogleCalendarEvent) -> Result<ScheduleEvent> {
    let (start, all_day) = parse_event_time(&event.start)?;
    let (end, _) = parse_event_time(&event.end)?;

    Ok(ScheduleEvent {
        id: event.id,
        summary: event.summary.unwrap_or_else(|| "(No title)".to_string()),
        description: event.description,
        location: event.location,
        start,
        end,
        all_day,
    })
}

/// Parse Google event time to DateTime<Utc>
fn parse_event_time(time: &GoogleEventTime) -> Result<(DateTime<Utc>, bool)> {
    if let Some(date_time) = &time.date_time {
        let dt = DateTime::parse_from_rfc3339(date_time)
            .map_err(|e| Error::upstream(SERVICE, format!("Invalid datetime {}: {}", date_time, e)))?;
        Ok((dt.with_timezone(&Utc), false))
    } else if let Some(date) = &time.date {
        // All-day event (date only)
        let naive = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| Error::upstream(SERVICE, format!("Invalid date {}: {}", date, e)))?;
        Ok((naive.and_time(chrono::NaiveTime::MIN).and_utc(), true))
    } else {
        Err(Error::upstream(SERVICE, "Event has no start time"))
    }
}
