//! Accessor for pre-provider stores.
//!
//! These stores have no reminders and cannot search, delete or enumerate
//! calendars; those operations report `Unsupported`.

use std::sync::Arc;

use chrono_tz::Tz;
use tracing::debug;

use super::table::EventTable;
use super::{AccessorOptions, AccessorVariant, CalendarAccessor};
use crate::date_range::TimeRange;
use crate::error::CalendarResult;
use crate::event::{Event, EventListing};
use crate::schema::Schema;
use crate::store::RecordStore;

/// Legacy stores only ever expose the one local calendar.
const LEGACY_CALENDAR_ID: i64 = 1;

pub struct LegacyAccessor {
    table: EventTable,
    calendar_id: i64,
}

impl LegacyAccessor {
    pub fn new(store: Arc<dyn RecordStore>, options: AccessorOptions) -> Self {
        LegacyAccessor {
            table: EventTable::new(store, &Schema::LEGACY, options.tz),
            calendar_id: options.default_calendar_id.unwrap_or(LEGACY_CALENDAR_ID),
        }
    }
}

impl CalendarAccessor for LegacyAccessor {
    fn variant(&self) -> AccessorVariant {
        AccessorVariant::Legacy
    }

    fn time_zone(&self) -> &Tz {
        self.table.tz()
    }

    fn create_event(&self, event: &Event) -> CalendarResult<bool> {
        // Legacy stores do not report row ids; an accepted insert is success
        let row_id = self.table.insert_event(event, self.calendar_id)?;
        debug!(calendar_id = self.calendar_id, ?row_id, "Inserted event");
        Ok(true)
    }

    fn list_events_in_range(&self, start: i64, end: i64) -> CalendarResult<EventListing> {
        let predicate = TimeRange::new(start, end).predicate(&Schema::LEGACY);
        self.table.query_events(&predicate, "listEventsInRange")
    }

    fn count_snapshot(&self, range: TimeRange) -> CalendarResult<usize> {
        self.table.count_snapshot(range)
    }
}
