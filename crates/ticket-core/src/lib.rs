#![deny(warnings)]

//! Core domain models and invariants for the eventdesk ticketing client.
//!
//! This crate defines the serializable types exchanged with the events API
//! together with the rule-violation taxonomy and the money/quantity
//! normalizer that converts human-entered values into the integer domain
//! used everywhere else. All functions are pure; nothing here performs I/O,
//! retries, or logging.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Server-assigned event identifier. Opaque to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub i64);

/// Server-assigned attendee identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttendeeId(pub i64);

/// A ticketed event as returned by the API.
///
/// `tickets_sold` is maintained exclusively by the server; registrations
/// increment it atomically there. The invariant `tickets_sold <= capacity`
/// holds after every accepted mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Server-assigned identifier.
    pub id: EventId,
    /// Event title (non-empty).
    pub title: String,
    /// Calendar date, wire format `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// Venue or address. Empty when unset.
    #[serde(default)]
    pub location: String,
    /// Free-form description. Empty when unset.
    #[serde(default)]
    pub description: String,
    /// Maximum number of tickets (>= tickets_sold).
    pub capacity: u32,
    /// Tickets sold so far, server-maintained.
    pub tickets_sold: u32,
    /// Ticket price in integer minor units (cents).
    #[serde(default)]
    pub ticket_price_cents: i64,
}

impl Event {
    /// Remaining tickets, floored at zero.
    pub fn tickets_available(&self) -> u32 {
        self.capacity.saturating_sub(self.tickets_sold)
    }

    /// Revenue at the current sold count, in cents.
    pub fn revenue_cents(&self) -> i64 {
        i64::from(self.tickets_sold) * self.ticket_price_cents
    }
}

/// Payload for creating a new event. `tickets_sold` starts at zero on the
/// server and is never part of this payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub capacity: u32,
    pub ticket_price_cents: i64,
}

/// An attendee registered against one event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: AttendeeId,
    pub name: String,
    pub email: String,
    pub event_id: EventId,
}

/// Registration payload: the name/email pair proposed for one event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttendeeDraft {
    pub name: String,
    pub email: String,
}

/// One row of the server-computed sales report. Derived fields
/// (`tickets_available`, `revenue_cents`) are computed at report time and
/// never persisted client-side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SalesReportRow {
    pub event_id: EventId,
    pub title: String,
    pub date: NaiveDate,
    pub capacity: u32,
    pub tickets_sold: u32,
    pub tickets_available: u32,
    pub revenue_cents: i64,
}

/// Full sales report response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SalesReport {
    pub report: Vec<SalesReportRow>,
    /// Server timestamp, passed through as-is.
    pub generated_at: String,
}

/// A successfully imported CSV row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportedRow {
    pub row: u32,
    pub event_id: EventId,
    pub title: String,
}

/// A rejected CSV row with the server's error description.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportRowError {
    pub row: u32,
    pub error: String,
    /// Raw row contents as echoed back by the server.
    #[serde(default)]
    pub row_data: serde_json::Value,
}

/// Outcome of a bulk CSV import. Per-row validation and partial success are
/// the server's responsibility; the client only surfaces these rows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub created: Vec<ImportedRow>,
    pub errors: Vec<ImportRowError>,
}

/// Receipt returned by the multi-ticket purchase endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub tickets_purchased: u32,
    pub revenue_cents: i64,
    pub tickets_sold: u32,
}

/// Rule violations for the inventory reconciliation logic.
///
/// All variants are locally recoverable: callers get a typed rejection and
/// decide whether to re-prompt, abort, or proceed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleViolation {
    /// Amount string does not parse to a finite, non-negative decimal.
    #[error("invalid amount: not a finite non-negative decimal")]
    InvalidAmount,
    /// Quantity is NaN, infinite, negative, or out of range.
    #[error("invalid quantity: must be a finite non-negative count")]
    InvalidQuantity,
    /// Title is empty after trimming.
    #[error("title must not be empty")]
    EmptyTitle,
    /// Proposed capacity is below the tickets already sold.
    #[error("capacity {proposed} is below tickets already sold ({tickets_sold})")]
    CapacityBelowSold { tickets_sold: u32, proposed: u32 },
    /// Registration against an event with no remaining tickets.
    #[error("event is sold out")]
    EventFull,
    /// Attendee name is empty or the email fails the syntactic check.
    #[error("attendee name or email is invalid")]
    InvalidAttendee,
}

/// Convert a human-entered decimal amount in major currency units into
/// integer minor units (cents), rounding half away from zero.
///
/// This is the single conversion boundary between entered decimals and the
/// integer money domain; nothing downstream touches floating point.
///
/// Example:
/// assert_eq!(to_minor_units("12.50").unwrap(), 1250);
pub fn to_minor_units(amount: &str) -> Result<i64, RuleViolation> {
    let value = Decimal::from_str(amount.trim()).map_err(|_| RuleViolation::InvalidAmount)?;
    if value < Decimal::ZERO {
        return Err(RuleViolation::InvalidAmount);
    }
    let cents = value
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(RuleViolation::InvalidAmount)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    cents.to_i64().ok_or(RuleViolation::InvalidAmount)
}

/// Normalize a raw numeric input into a non-negative integer count,
/// truncating toward zero.
pub fn to_count(value: f64) -> Result<u32, RuleViolation> {
    if !value.is_finite() {
        return Err(RuleViolation::InvalidQuantity);
    }
    let truncated = value.trunc();
    if truncated < 0.0 || truncated > f64::from(u32::MAX) {
        return Err(RuleViolation::InvalidQuantity);
    }
    Ok(truncated as u32)
}

/// Render integer cents as a two-decimal major-unit string, e.g. 1250 -> "12.50".
pub fn format_major_units(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Basic syntactic email check: one `@` with non-empty local and domain
/// parts. Full validation is the server's job.
pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    }
}

/// Validate a registration draft.
pub fn validate_attendee_draft(draft: &AttendeeDraft) -> Result<(), RuleViolation> {
    if draft.name.trim().is_empty() || !is_valid_email(draft.email.trim()) {
        return Err(RuleViolation::InvalidAttendee);
    }
    Ok(())
}

/// Validate a creation payload before it is sent.
pub fn validate_new_event(event: &NewEvent) -> Result<(), RuleViolation> {
    if event.title.trim().is_empty() {
        return Err(RuleViolation::EmptyTitle);
    }
    if event.ticket_price_cents < 0 {
        return Err(RuleViolation::InvalidAmount);
    }
    Ok(())
}
