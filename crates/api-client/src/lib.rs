#![deny(warnings)]

//! Async client for the events REST API.
//!
//! The server owns persistence and authoritative validation; this crate only
//! shapes requests and decodes responses. Any non-success status is surfaced
//! as an opaque [`ApiError::Upstream`] carrying the server's own detail
//! message, never reinterpreted locally.

use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use thiserror::Error;
use ticket_core::{
    Attendee, AttendeeDraft, AttendeeId, Event, EventId, ImportOutcome, NewEvent, PurchaseReceipt,
    SalesReport,
};
use ticket_rules::EventPatch;
use tracing::debug;

/// Failures at the REST boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, decode).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server rejected the request. `detail` is the server's own
    /// description, passed through unmodified.
    #[error("server rejected request ({status}): {detail}")]
    Upstream { status: u16, detail: String },
}

/// Optional filters for the event listing.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// Case-insensitive title substring match.
    pub title: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl EventFilter {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(title) = &self.title {
            pairs.push(("title", title.clone()));
        }
        if let Some(from) = self.date_from {
            pairs.push(("date_from", from.to_string()));
        }
        if let Some(to) = self.date_to {
            pairs.push(("date_to", to.to_string()));
        }
        pairs
    }
}

/// Thin wrapper over `reqwest::Client` bound to one API base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Build a client for `base_url` (e.g. `http://localhost:8000`) with a
    /// per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /events` with optional title/date filters.
    pub async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, ApiError> {
        let resp = self
            .http
            .get(self.url("/events"))
            .query(&filter.to_query())
            .send()
            .await?;
        Ok(ok_or_upstream(resp).await?.json().await?)
    }

    /// `GET /events/{id}`.
    pub async fn get_event(&self, id: EventId) -> Result<Event, ApiError> {
        let resp = self
            .http
            .get(self.url(&format!("/events/{}", id.0)))
            .send()
            .await?;
        Ok(ok_or_upstream(resp).await?.json().await?)
    }

    /// `POST /events`.
    pub async fn create_event(&self, event: &NewEvent) -> Result<Event, ApiError> {
        let resp = self
            .http
            .post(self.url("/events"))
            .json(event)
            .send()
            .await?;
        Ok(ok_or_upstream(resp).await?.json().await?)
    }

    /// `PUT /events/{id}` with a sparse patch. The server re-checks the
    /// capacity invariant and answers a client error when it is violated.
    pub async fn update_event(&self, id: EventId, patch: &EventPatch) -> Result<Event, ApiError> {
        debug!(event_id = id.0, "submitting event patch");
        let resp = self
            .http
            .put(self.url(&format!("/events/{}", id.0)))
            .json(patch)
            .send()
            .await?;
        Ok(ok_or_upstream(resp).await?.json().await?)
    }

    /// `DELETE /events/{id}`. Not retried after success.
    pub async fn delete_event(&self, id: EventId) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/events/{}", id.0)))
            .send()
            .await?;
        ok_or_upstream(resp).await?;
        Ok(())
    }

    /// `GET /events/{id}/attendees`.
    pub async fn list_attendees(&self, event_id: EventId) -> Result<Vec<Attendee>, ApiError> {
        let resp = self
            .http
            .get(self.url(&format!("/events/{}/attendees", event_id.0)))
            .send()
            .await?;
        Ok(ok_or_upstream(resp).await?.json().await?)
    }

    /// `POST /events/{id}/attendees`. The server increments the event's sold
    /// count atomically; the client refreshes instead of counting locally.
    pub async fn register_attendee(
        &self,
        event_id: EventId,
        draft: &AttendeeDraft,
    ) -> Result<Attendee, ApiError> {
        debug!(event_id = event_id.0, "registering attendee");
        let resp = self
            .http
            .post(self.url(&format!("/events/{}/attendees", event_id.0)))
            .json(draft)
            .send()
            .await?;
        Ok(ok_or_upstream(resp).await?.json().await?)
    }

    /// `PUT /attendees/{id}`.
    pub async fn update_attendee(
        &self,
        id: AttendeeId,
        draft: &AttendeeDraft,
    ) -> Result<Attendee, ApiError> {
        let resp = self
            .http
            .put(self.url(&format!("/attendees/{}", id.0)))
            .json(draft)
            .send()
            .await?;
        Ok(ok_or_upstream(resp).await?.json().await?)
    }

    /// `POST /events/{id}/purchase`, form-encoded per the server contract.
    pub async fn purchase_tickets(
        &self,
        event_id: EventId,
        buyer_name: &str,
        buyer_email: &str,
        quantity: u32,
    ) -> Result<PurchaseReceipt, ApiError> {
        let resp = self
            .http
            .post(self.url(&format!("/events/{}/purchase", event_id.0)))
            .form(&[
                ("buyer_name", buyer_name.to_string()),
                ("buyer_email", buyer_email.to_string()),
                ("quantity", quantity.to_string()),
            ])
            .send()
            .await?;
        Ok(ok_or_upstream(resp).await?.json().await?)
    }

    /// `POST /import/events` multipart upload of a CSV file. Row-level
    /// validation happens server-side; partial success is normal.
    pub async fn import_events(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<ImportOutcome, ApiError> {
        let part = Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);
        let resp = self
            .http
            .post(self.url("/import/events"))
            .multipart(form)
            .send()
            .await?;
        Ok(ok_or_upstream(resp).await?.json().await?)
    }

    /// `GET /reports/sales`.
    pub async fn sales_report(&self) -> Result<SalesReport, ApiError> {
        let resp = self.http.get(self.url("/reports/sales")).send().await?;
        Ok(ok_or_upstream(resp).await?.json().await?)
    }
}

async fn ok_or_upstream(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "upstream rejection");
    Err(ApiError::Upstream {
        status: status.as_u16(),
        detail: extract_detail(&body),
    })
}

/// Pull the `detail` field out of an error body when present, otherwise
/// return the raw text.
fn extract_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_extracted_from_json_body() {
        assert_eq!(
            extract_detail(r#"{"detail": "Event is sold out"}"#),
            "Event is sold out"
        );
    }

    #[test]
    fn structured_detail_kept_verbatim() {
        let body = r#"{"detail": [{"loc": ["body", "date"], "msg": "invalid date"}]}"#;
        assert_eq!(
            extract_detail(body),
            r#"[{"loc":["body","date"],"msg":"invalid date"}]"#
        );
    }

    #[test]
    fn raw_text_passes_through() {
        assert_eq!(extract_detail("gateway timeout"), "gateway timeout");
        assert_eq!(extract_detail(r#"{"other": 1}"#), r#"{"other": 1}"#);
    }

    #[test]
    fn filter_query_pairs() {
        let filter = EventFilter {
            title: Some("expo".to_string()),
            date_from: NaiveDate::from_ymd_opt(2026, 1, 1),
            date_to: None,
        };
        assert_eq!(
            filter.to_query(),
            vec![
                ("title", "expo".to_string()),
                ("date_from", "2026-01-01".to_string())
            ]
        );
        assert!(EventFilter::default().to_query().is_empty());
    }

    #[test]
    fn base_url_trailing_slash_normalized() {
        let client = ApiClient::new("http://localhost:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.url("/events"), "http://localhost:8000/events");
    }
}
