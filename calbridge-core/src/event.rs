//! Normalized event types.
//!
//! These types are independent of any store variant's field layout.
//! Accessors convert store rows into them, and the protocol layer
//! serializes them back to the host.

use chrono::{TimeZone, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::date_range::TimeRange;
use crate::error::CalendarError;

pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Caller-supplied fields for a new event.
///
/// There is no all-day field here: it is always derived from the
/// instants when an [`Event`] is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
    pub start_time: i64,
    pub end_time: i64,
    #[serde(default)]
    pub first_reminder_minutes: Option<i64>,
}

/// A calendar event snapshot. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    title: String,
    location: String,
    notes: String,
    start_time: i64,
    end_time: i64,
    all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_reminder_minutes: Option<i64>,
}

impl Event {
    /// Build an event, deriving the all-day flag in `tz`.
    pub fn new(draft: EventDraft, tz: &Tz) -> Self {
        let all_day = is_all_day(draft.start_time, draft.end_time, tz);
        Event {
            title: draft.title,
            location: draft.location,
            notes: draft.notes,
            start_time: draft.start_time,
            end_time: draft.end_time,
            all_day,
            first_reminder_minutes: draft.first_reminder_minutes,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Start instant in epoch milliseconds.
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// End instant in epoch milliseconds.
    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    pub fn all_day(&self) -> bool {
        self.all_day
    }

    pub fn first_reminder_minutes(&self) -> Option<i64> {
        self.first_reminder_minutes
    }

    /// The unwidened range spanned by this event.
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }

    /// Recover the draft this event was built from.
    pub fn to_draft(&self) -> EventDraft {
        EventDraft {
            title: self.title.clone(),
            location: self.location.clone(),
            notes: self.notes.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            first_reminder_minutes: self.first_reminder_minutes,
        }
    }
}

/// True iff `start` is exactly at local midnight in `tz` and the span is a
/// positive whole number of days.
pub fn is_all_day(start: i64, end: i64, tz: &Tz) -> bool {
    let Some(span) = end.checked_sub(start) else {
        return false;
    };
    if span <= 0 || span % MILLIS_PER_DAY != 0 {
        return false;
    }

    match tz.timestamp_millis_opt(start).single() {
        Some(local) => {
            local.hour() == 0 && local.minute() == 0 && local.second() == 0 && local.nanosecond() == 0
        }
        None => false,
    }
}

/// Query, find and delete input. Empty text fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventFilter {
    pub title: Option<String>,
    pub location: Option<String>,
    pub start_time: i64,
    pub end_time: i64,
}

impl EventFilter {
    /// A filter matching every event inside `start..end`.
    pub fn range(start: i64, end: i64) -> Self {
        EventFilter {
            title: None,
            location: None,
            start_time: start,
            end_time: end,
        }
    }

    pub fn title_pattern(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }

    pub fn location_pattern(&self) -> Option<&str> {
        self.location.as_deref().filter(|l| !l.is_empty())
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }

    pub fn is_wildcard(&self) -> bool {
        self.title_pattern().is_none() && self.location_pattern().is_none()
    }
}

/// A calendar that is currently active on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSummary {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}

/// Events returned by a listing, plus the rows that could not be mapped.
#[derive(Debug, Default)]
pub struct EventListing {
    pub events: Vec<Event>,
    pub skipped: Vec<CalendarError>,
}

impl EventListing {
    /// Logs one aggregate warning if any rows were skipped.
    pub(crate) fn warn_skipped(&self, operation: &str) {
        if self.skipped.is_empty() {
            return;
        }
        let reasons: Vec<String> = self.skipped.iter().map(ToString::to_string).collect();
        warn!(
            operation,
            skipped = self.skipped.len(),
            returned = self.events.len(),
            reasons = %reasons.join("; "),
            "Skipped malformed records"
        );
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl IntoIterator for EventListing {
    type Item = Event;
    type IntoIter = std::vec::IntoIter<Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
