//! Conversion between store rows and normalized events.

use chrono_tz::Tz;
use serde_json::Value;
use tracing::debug;

use crate::error::{CalendarError, CalendarResult};
use crate::event::{CalendarSummary, Event, EventDraft};
use crate::schema::Schema;
use crate::store::Row;

/// Maps rows of one schema, deriving all-day flags in one time zone.
#[derive(Debug, Clone, Copy)]
pub struct RecordMapper<'a> {
    pub schema: &'a Schema,
    pub tz: &'a Tz,
}

impl<'a> RecordMapper<'a> {
    pub fn new(schema: &'a Schema, tz: &'a Tz) -> Self {
        RecordMapper { schema, tz }
    }

    /// Convert one row. `index` is the row's position in its result set and
    /// is only used for error reporting.
    pub fn to_event(&self, row: &Row, index: usize) -> CalendarResult<Event> {
        let s = self.schema;
        let field = RowFields { row, index };

        let title = field.required_str(s.title)?;
        let start_time = field.required_i64(s.start)?;
        let end_time = field.required_i64(s.end)?;
        let location = field.optional_str(s.location)?.unwrap_or_default();
        let notes = field.optional_str(s.notes)?.unwrap_or_default();
        let first_reminder_minutes = match s.reminder_minutes {
            Some(column) => field.optional_i64(column)?,
            None => None,
        };

        let event = Event::new(
            EventDraft {
                title,
                location,
                notes,
                start_time,
                end_time,
                first_reminder_minutes,
            },
            self.tz,
        );

        // The stored flag is informational only
        if let Some(stored) = field.optional_flag(s.all_day)
            && stored != event.all_day()
        {
            debug!(
                index,
                stored,
                derived = event.all_day(),
                "Stored all-day flag disagrees with instants"
            );
        }

        Ok(event)
    }

    /// Row fields for inserting `event` into `calendar_id`.
    pub fn to_create_args(&self, event: &Event, calendar_id: i64) -> Row {
        let s = self.schema;
        let mut row = Row::new();

        row.insert(s.title.into(), Value::from(event.title()));
        row.insert(s.start.into(), Value::from(event.start_time()));
        row.insert(s.end.into(), Value::from(event.end_time()));
        row.insert(s.location.into(), Value::from(event.location()));
        row.insert(s.notes.into(), Value::from(event.notes()));
        row.insert(s.all_day.into(), Value::from(i64::from(event.all_day())));
        row.insert(s.calendar_id.into(), Value::from(calendar_id));

        if let Some(column) = s.has_alarm {
            let has_alarm = event.first_reminder_minutes().is_some();
            row.insert(column.into(), Value::from(i64::from(has_alarm)));
        }
        if let (Some(column), Some(minutes)) = (s.reminder_minutes, event.first_reminder_minutes()) {
            row.insert(column.into(), Value::from(minutes));
        }

        row
    }

    pub fn to_calendar(&self, row: &Row, index: usize) -> CalendarResult<CalendarSummary> {
        let s = self.schema;
        let field = RowFields { row, index };

        let account_name = match s.calendar_account {
            Some(column) => field.optional_str(column)?,
            None => None,
        };

        Ok(CalendarSummary {
            id: field.required_i64(s.calendar_key)?,
            name: field.required_str(s.calendar_name)?,
            account_name,
        })
    }
}

/// Typed field access that reports which column broke.
struct RowFields<'r> {
    row: &'r Row,
    index: usize,
}

impl RowFields<'_> {
    fn malformed(&self, reason: String) -> CalendarError {
        CalendarError::MalformedRecord {
            index: self.index,
            reason,
        }
    }

    fn present(&self, column: &str) -> Option<&Value> {
        self.row.get(column).filter(|v| !v.is_null())
    }

    fn required_str(&self, column: &str) -> CalendarResult<String> {
        self.optional_str(column)?
            .ok_or_else(|| self.malformed(format!("missing '{}'", column)))
    }

    fn optional_str(&self, column: &str) -> CalendarResult<Option<String>> {
        match self.present(column) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.malformed(format!("'{}' is not text: {}", column, other))),
        }
    }

    fn required_i64(&self, column: &str) -> CalendarResult<i64> {
        self.optional_i64(column)?
            .ok_or_else(|| self.malformed(format!("missing '{}'", column)))
    }

    fn optional_i64(&self, column: &str) -> CalendarResult<Option<i64>> {
        match self.present(column) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.malformed(format!("'{}' is not an integer: {}", column, value))),
        }
    }

    /// Accepts 0/1 integers or booleans.
    fn optional_flag(&self, column: &str) -> Option<bool> {
        match self.present(column)? {
            Value::Bool(b) => Some(*b),
            value => value.as_i64().map(|n| n != 0),
        }
    }
}
