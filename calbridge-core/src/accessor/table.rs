//! Store access shared by both accessor variants.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::date_range::TimeRange;
use crate::error::{CalendarError, CalendarResult};
use crate::event::{CalendarSummary, Event, EventFilter, EventListing};
use crate::record::RecordMapper;
use crate::schema::Schema;
use crate::store::{Predicate, RecordStore, StoreError};

/// The events and calendars tables of one store, seen through one schema.
pub(crate) struct EventTable {
    store: Arc<dyn RecordStore>,
    schema: &'static Schema,
    tz: Tz,
}

impl EventTable {
    pub fn new(store: Arc<dyn RecordStore>, schema: &'static Schema, tz: Tz) -> Self {
        EventTable { store, schema, tz }
    }

    pub fn tz(&self) -> &Tz {
        &self.tz
    }

    fn mapper(&self) -> RecordMapper<'_> {
        RecordMapper::new(self.schema, &self.tz)
    }

    /// Range plus optional substring matches on title and location.
    pub fn filter_predicate(&self, filter: &EventFilter) -> Predicate {
        let mut parts = vec![filter.time_range().predicate(self.schema)];
        if let Some(title) = filter.title_pattern() {
            parts.push(Predicate::contains(self.schema.title, title));
        }
        if let Some(location) = filter.location_pattern() {
            parts.push(Predicate::contains(self.schema.location, location));
        }
        Predicate::and(parts)
    }

    pub fn query_events(&self, predicate: &Predicate, operation: &str) -> CalendarResult<EventListing> {
        debug!(operation, selection = %predicate, "Querying events");

        let rows = self.read(|store| {
            store.query(self.schema.events_table, predicate, Some(self.schema.start))
        })?;

        let mapper = self.mapper();
        let mut listing = EventListing::default();
        for (index, row) in rows.iter().enumerate() {
            match mapper.to_event(row, index) {
                Ok(event) => listing.events.push(event),
                Err(e) => listing.skipped.push(e),
            }
        }

        listing.warn_skipped(operation);
        Ok(listing)
    }

    /// Number of stored rows in the snapshot range around `range`,
    /// malformed or not.
    pub fn count_snapshot(&self, range: TimeRange) -> CalendarResult<usize> {
        let predicate = range.snapshot_predicate(self.schema, &self.tz);
        let rows = self.read(|store| store.query(self.schema.events_table, &predicate, None))?;
        debug!(selection = %predicate, count = rows.len(), "Counted events");
        Ok(rows.len())
    }

    pub fn insert_event(&self, event: &Event, calendar_id: i64) -> CalendarResult<Option<i64>> {
        let row = self.mapper().to_create_args(event, calendar_id);
        self.write(|store| store.insert(self.schema.events_table, row))
    }

    pub fn delete_events(&self, predicate: &Predicate) -> CalendarResult<usize> {
        debug!(selection = %predicate, "Deleting events");
        self.write(|store| store.delete(self.schema.events_table, predicate))
    }

    pub fn active_calendars(&self) -> CalendarResult<Vec<CalendarSummary>> {
        let predicate = Predicate::flag(self.schema.calendar_active);
        let rows = self.read(|store| {
            store.query(
                self.schema.calendars_table,
                &predicate,
                Some(self.schema.calendar_key),
            )
        })?;

        let mapper = self.mapper();
        let mut calendars = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match mapper.to_calendar(row, index) {
                Ok(calendar) => calendars.push(calendar),
                Err(e) => warn!(error = %e, "Skipping malformed calendar"),
            }
        }
        Ok(calendars)
    }

    fn read<T>(
        &self,
        op: impl FnOnce(&dyn RecordStore) -> Result<T, StoreError>,
    ) -> CalendarResult<T> {
        self.guarded(op)?.map_err(|e| CalendarError::Store(e.to_string()))
    }

    fn write<T>(
        &self,
        op: impl FnOnce(&dyn RecordStore) -> Result<T, StoreError>,
    ) -> CalendarResult<T> {
        self.guarded(op)?.map_err(|e| match e {
            StoreError::Denied(reason) => CalendarError::WriteDenied(reason),
            StoreError::Failed(reason) => CalendarError::Store(reason),
        })
    }

    /// Run a store call, turning a panic inside the store into an error.
    fn guarded<T>(&self, op: impl FnOnce(&dyn RecordStore) -> T) -> CalendarResult<T> {
        let store = self.store.as_ref();
        catch_unwind(AssertUnwindSafe(|| op(store))).map_err(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            CalendarError::Store(format!("store crashed: {}", message))
        })
    }
}
