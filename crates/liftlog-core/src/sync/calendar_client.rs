//! HTTP client for the remote calendar provider.
//!
//! Thin transport layer: callers supply the bearer token (normally via the
//! authenticated call executor) and receive tagged [`ApiError`]s. A 401 is
//! reported as [`ApiError::Unauthorized`] so the executor can run its
//! refresh-and-retry cycle.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::sync::event_mapper::RemoteEvent;

/// Transport-level errors from the calendar API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401; the bearer token was rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// Connectivity or timeout.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Any other non-2xx status.
    #[error("calendar API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A 2xx response whose body could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// An event as returned by the list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchedEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: Option<FetchedDateTime>,
    pub end: Option<FetchedDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedDateTime {
    /// Timed events.
    pub date_time: Option<String>,
    /// All-day events.
    pub date: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<FetchedEvent>,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

/// Calendar API client bound to the user's primary calendar.
pub struct CalendarClient {
    http: Client,
    base_url: String,
}

impl CalendarClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/primary/events", self.base_url)
    }

    /// `POST /events`; returns the identifier assigned by the provider.
    pub async fn create_event(&self, token: &str, event: &RemoteEvent) -> Result<String, ApiError> {
        let resp = self
            .http
            .post(self.events_url())
            .bearer_auth(token)
            .json(event)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let body = resp.text().await?;
        let created: CreatedEvent = serde_json::from_str(&body)
            .map_err(|_| ApiError::Malformed("create response missing event id".to_string()))?;
        Ok(created.id)
    }

    /// `PATCH /events/{id}`; no meaningful response body is required.
    pub async fn update_event(
        &self,
        token: &str,
        event_id: &str,
        event: &RemoteEvent,
    ) -> Result<(), ApiError> {
        let resp = self
            .http
            .patch(format!("{}/{}", self.events_url(), event_id))
            .bearer_auth(token)
            .json(event)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    /// `GET /events` ordered by start time within the given window.
    pub async fn list_events(
        &self,
        token: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<FetchedEvent>, ApiError> {
        let resp = self
            .http
            .get(self.events_url())
            .bearer_auth(token)
            .query(&[
                ("maxResults", max_results.to_string()),
                ("orderBy", "startTime".to_string()),
                ("singleEvents", "true".to_string()),
                ("timeMin", time_min.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
                ("timeMax", time_max.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            ])
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let body = resp.text().await?;
        let events: EventsResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        Ok(events.items)
    }
}

/// Non-2xx becomes a tagged error; 401 gets its own variant.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status.as_u16() == 401 {
        return Err(ApiError::Unauthorized);
    }

    let message = resp.text().await.unwrap_or_default();
    // Providers wrap the human-readable message in {"error": {"message": ..}}.
    let message = serde_json::from_str::<serde_json::Value>(&message)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or(message);

    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}
