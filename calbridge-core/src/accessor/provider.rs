//! Accessor for calendar-provider stores.

use std::sync::Arc;

use chrono_tz::Tz;
use tracing::debug;

use super::table::EventTable;
use super::{AccessorOptions, AccessorVariant, CalendarAccessor};
use crate::date_range::TimeRange;
use crate::error::{CalendarError, CalendarResult};
use crate::event::{CalendarSummary, Event, EventFilter, EventListing};
use crate::schema::Schema;
use crate::store::RecordStore;

pub struct ProviderAccessor {
    table: EventTable,
    default_calendar_id: Option<i64>,
}

impl ProviderAccessor {
    pub fn new(store: Arc<dyn RecordStore>, options: AccessorOptions) -> Self {
        ProviderAccessor {
            table: EventTable::new(store, &Schema::PROVIDER, options.tz),
            default_calendar_id: options.default_calendar_id,
        }
    }

    /// Configured calendar, else the first active one.
    fn target_calendar(&self) -> CalendarResult<i64> {
        if let Some(id) = self.default_calendar_id {
            return Ok(id);
        }

        self.table
            .active_calendars()?
            .first()
            .map(|c| c.id)
            .ok_or_else(|| CalendarError::WriteDenied("no active calendar to write to".into()))
    }
}

impl CalendarAccessor for ProviderAccessor {
    fn variant(&self) -> AccessorVariant {
        AccessorVariant::Provider
    }

    fn time_zone(&self) -> &Tz {
        self.table.tz()
    }

    fn create_event(&self, event: &Event) -> CalendarResult<bool> {
        let calendar_id = self.target_calendar()?;
        let row_id = self.table.insert_event(event, calendar_id)?;
        debug!(calendar_id, ?row_id, "Inserted event");
        Ok(row_id.is_some())
    }

    fn find_events(&self, filter: &EventFilter) -> CalendarResult<EventListing> {
        let predicate = self.table.filter_predicate(filter);
        self.table.query_events(&predicate, "findEvents")
    }

    fn delete_event(&self, filter: &EventFilter) -> CalendarResult<bool> {
        let predicate = self.table.filter_predicate(filter);
        let removed = self.table.delete_events(&predicate)?;
        debug!(removed, "Deleted events");
        Ok(removed > 0)
    }

    fn list_events_in_range(&self, start: i64, end: i64) -> CalendarResult<EventListing> {
        self.find_events(&EventFilter::range(start, end))
    }

    fn count_snapshot(&self, range: TimeRange) -> CalendarResult<usize> {
        self.table.count_snapshot(range)
    }

    fn list_active_calendars(&self) -> CalendarResult<Vec<CalendarSummary>> {
        self.table.active_calendars()
    }
}
