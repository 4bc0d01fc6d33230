#![deny(warnings)]

//! Inventory reconciliation rules for the eventdesk client.
//!
//! This crate provides the pre-submission checks run before talking to the
//! events API:
//! - Capacity invariant check (capacity must stay >= tickets sold)
//! - Event mutation planning (minimal sparse patch from an edit form)
//! - Registration and purchase admission checks
//!
//! Every check here is advisory: the server re-validates authoritatively,
//! and sold counts may change between check and submission. The client never
//! increments counters on optimistic assumption.

use serde::Serialize;
use ticket_core::{
    to_count, to_minor_units, validate_attendee_draft, AttendeeDraft, Event, RuleViolation,
};

/// Raw edit-form state for one event. Fields left as `None` were not touched
/// by the user. Capacity arrives as the raw numeric input and price as the
/// human-entered decimal string; both are normalized during planning.
#[derive(Clone, Debug, Default)]
pub struct EventEdit {
    pub title: Option<String>,
    /// Proposed date, already in `YYYY-MM-DD` form. Passed through verbatim;
    /// syntactic validation is delegated to the server.
    pub date: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub capacity: Option<f64>,
    /// Ticket price in major units, e.g. "12.50".
    pub price: Option<String>,
}

/// Sparse update payload: only changed fields are present, and absent fields
/// are omitted from the JSON entirely. The server treats a present field as
/// an explicit overwrite, so unchanged values must never be sent.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_price_cents: Option<i64>,
}

impl EventPatch {
    /// True when no field changed; a valid "no-op" result that callers
    /// should not submit.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.date.is_none()
            && self.location.is_none()
            && self.description.is_none()
            && self.capacity.is_none()
            && self.ticket_price_cents.is_none()
    }
}

/// Check a proposed capacity against the tickets already sold.
///
/// Example:
/// assert!(check_capacity_change(10, 5).is_err());
pub fn check_capacity_change(
    tickets_sold: u32,
    proposed_capacity: u32,
) -> Result<(), RuleViolation> {
    if proposed_capacity < tickets_sold {
        return Err(RuleViolation::CapacityBelowSold {
            tickets_sold,
            proposed: proposed_capacity,
        });
    }
    Ok(())
}

/// Build the minimal patch turning `original` into the state proposed by an
/// edit form.
///
/// Construction is all-or-nothing: any normalization or invariant failure
/// aborts the whole build and no partial patch is emitted. An empty patch is
/// a valid result meaning nothing changed.
pub fn build_patch(original: &Event, proposed: &EventEdit) -> Result<EventPatch, RuleViolation> {
    let mut patch = EventPatch::default();

    if let Some(title) = &proposed.title {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(RuleViolation::EmptyTitle);
        }
        if trimmed != original.title {
            patch.title = Some(trimmed.to_string());
        }
    }

    if let Some(date) = &proposed.date {
        if *date != original.date.to_string() {
            patch.date = Some(date.clone());
        }
    }

    if let Some(location) = &proposed.location {
        if *location != original.location {
            patch.location = Some(location.clone());
        }
    }

    if let Some(description) = &proposed.description {
        if *description != original.description {
            patch.description = Some(description.clone());
        }
    }

    if let Some(raw) = proposed.capacity {
        let capacity = to_count(raw)?;
        if capacity != original.capacity {
            check_capacity_change(original.tickets_sold, capacity)?;
            patch.capacity = Some(capacity);
        }
    }

    if let Some(price) = &proposed.price {
        let cents = to_minor_units(price)?;
        if cents != original.ticket_price_cents {
            patch.ticket_price_cents = Some(cents);
        }
    }

    Ok(patch)
}

/// Decide whether a single registration is admissible against the current
/// snapshot of an event.
pub fn authorize_registration(event: &Event, draft: &AttendeeDraft) -> Result<(), RuleViolation> {
    if event.tickets_sold >= event.capacity {
        return Err(RuleViolation::EventFull);
    }
    validate_attendee_draft(draft)
}

/// Admission check for a multi-ticket purchase: the quantity must be at
/// least 1 and must fit in the remaining inventory.
pub fn check_purchase(event: &Event, quantity: u32) -> Result<(), RuleViolation> {
    if quantity == 0 {
        return Err(RuleViolation::InvalidQuantity);
    }
    if u64::from(event.tickets_sold) + u64::from(quantity) > u64::from(event.capacity) {
        return Err(RuleViolation::EventFull);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use ticket_core::EventId;

    fn event() -> Event {
        Event {
            id: EventId(1),
            title: "A".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
            location: String::new(),
            description: String::new(),
            capacity: 50,
            tickets_sold: 10,
            ticket_price_cents: 1250,
        }
    }

    fn draft() -> AttendeeDraft {
        AttendeeDraft {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[test]
    fn capacity_below_sold_rejected() {
        assert_eq!(
            check_capacity_change(10, 5),
            Err(RuleViolation::CapacityBelowSold {
                tickets_sold: 10,
                proposed: 5
            })
        );
    }

    #[test]
    fn patch_contains_only_changed_fields() {
        let edit = EventEdit {
            title: Some("A".to_string()),
            capacity: Some(60.0),
            ..EventEdit::default()
        };
        let patch = build_patch(&event(), &edit).unwrap();
        assert_eq!(patch.title, None);
        assert_eq!(patch.capacity, Some(60));
        assert_eq!(patch.ticket_price_cents, None);
    }

    #[test]
    fn patch_json_omits_absent_fields() {
        let edit = EventEdit {
            capacity: Some(60.0),
            ..EventEdit::default()
        };
        let patch = build_patch(&event(), &edit).unwrap();
        let value = serde_json::to_value(&patch).unwrap();
        let obj = value.as_object().unwrap();
        // Present fields are overwrites; nothing may appear as null.
        assert_eq!(obj.len(), 1);
        assert_eq!(obj["capacity"], 60);
    }

    #[test]
    fn patch_build_is_all_or_nothing() {
        let edit = EventEdit {
            title: Some("New Title".to_string()),
            capacity: Some(5.0), // below the 10 already sold
            ..EventEdit::default()
        };
        let err = build_patch(&event(), &edit).unwrap_err();
        assert_eq!(
            err,
            RuleViolation::CapacityBelowSold {
                tickets_sold: 10,
                proposed: 5
            }
        );
    }

    #[test]
    fn bad_price_aborts_patch() {
        let edit = EventEdit {
            title: Some("New Title".to_string()),
            price: Some("abc".to_string()),
            ..EventEdit::default()
        };
        assert_eq!(
            build_patch(&event(), &edit),
            Err(RuleViolation::InvalidAmount)
        );
    }

    #[test]
    fn trimmed_title_and_empty_title() {
        let edit = EventEdit {
            title: Some("  B  ".to_string()),
            ..EventEdit::default()
        };
        let patch = build_patch(&event(), &edit).unwrap();
        assert_eq!(patch.title.as_deref(), Some("B"));

        let edit = EventEdit {
            title: Some("   ".to_string()),
            ..EventEdit::default()
        };
        assert_eq!(build_patch(&event(), &edit), Err(RuleViolation::EmptyTitle));
    }

    #[test]
    fn unchanged_edit_yields_empty_patch() {
        let edit = EventEdit {
            title: Some("A".to_string()),
            date: Some("2026-09-12".to_string()),
            capacity: Some(50.0),
            price: Some("12.50".to_string()),
            ..EventEdit::default()
        };
        let patch = build_patch(&event(), &edit).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn date_passes_through_verbatim() {
        let edit = EventEdit {
            date: Some("2026-10-01".to_string()),
            ..EventEdit::default()
        };
        let patch = build_patch(&event(), &edit).unwrap();
        assert_eq!(patch.date.as_deref(), Some("2026-10-01"));
    }

    #[test]
    fn full_event_denies_registration() {
        let mut e = event();
        e.capacity = 10;
        e.tickets_sold = 10;
        assert_eq!(
            authorize_registration(&e, &draft()),
            Err(RuleViolation::EventFull)
        );
    }

    #[test]
    fn last_seat_allows_registration() {
        let mut e = event();
        e.capacity = 10;
        e.tickets_sold = 9;
        assert!(authorize_registration(&e, &draft()).is_ok());
    }

    #[test]
    fn bad_attendee_denied() {
        let e = event();
        let mut d = draft();
        d.email = "not-an-email".to_string();
        assert_eq!(
            authorize_registration(&e, &d),
            Err(RuleViolation::InvalidAttendee)
        );
        let mut d = draft();
        d.name = "  ".to_string();
        assert_eq!(
            authorize_registration(&e, &d),
            Err(RuleViolation::InvalidAttendee)
        );
    }

    #[test]
    fn purchase_respects_remaining_inventory() {
        let e = event(); // 40 remaining
        assert!(check_purchase(&e, 40).is_ok());
        assert_eq!(check_purchase(&e, 41), Err(RuleViolation::EventFull));
        assert_eq!(check_purchase(&e, 0), Err(RuleViolation::InvalidQuantity));
    }

    proptest! {
        #[test]
        fn capacity_at_or_above_sold_is_ok(sold in 0u32..100_000, headroom in 0u32..100_000) {
            prop_assert!(check_capacity_change(sold, sold + headroom).is_ok());
        }

        #[test]
        fn capacity_below_sold_is_rejected(cap in 0u32..100_000, deficit in 1u32..100_000) {
            let sold = cap + deficit;
            prop_assert_eq!(
                check_capacity_change(sold, cap),
                Err(RuleViolation::CapacityBelowSold { tickets_sold: sold, proposed: cap })
            );
        }

        #[test]
        fn planner_never_emits_unchanged_capacity(cap in 0u32..10_000) {
            let mut e = event();
            e.tickets_sold = 0;
            e.capacity = cap;
            let edit = EventEdit { capacity: Some(cap as f64), ..EventEdit::default() };
            let patch = build_patch(&e, &edit).unwrap();
            prop_assert!(patch.is_empty());
        }
    }
}
