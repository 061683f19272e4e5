//! Time range filtering for event queries.
//!
//! Two flavours share one [`TimeRange`]: the standard predicate used for
//! listing, finding and deleting keeps both bounds inclusive, while the
//! snapshot predicate used for before/after counting widens the lower
//! bound by one calendar day and compares strictly.

use chrono::{Days, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::event::MILLIS_PER_DAY;
use crate::schema::Schema;
use crate::store::Predicate;

/// A pair of epoch-millisecond instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        TimeRange { start, end }
    }

    /// Ranges with `start >= end` select nothing.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Move the lower bound one calendar day earlier in `tz`.
    ///
    /// An event that already existed in the extra day is counted as well,
    /// so this is only suitable for before/after comparisons.
    pub fn widened(&self, tz: &Tz) -> Self {
        let start = tz
            .timestamp_millis_opt(self.start)
            .single()
            .and_then(|local| local.checked_sub_days(Days::new(1)))
            .map(|local| local.timestamp_millis())
            .unwrap_or(self.start.saturating_sub(MILLIS_PER_DAY));

        TimeRange {
            start,
            end: self.end,
        }
    }

    /// Rows that start at or after `start` and end at or before `end`.
    pub fn predicate(&self, schema: &Schema) -> Predicate {
        if self.is_empty() {
            return Predicate::Never;
        }

        Predicate::and(vec![
            Predicate::ge(schema.start, self.start),
            Predicate::le(schema.end, self.end),
        ])
    }

    /// Rows that start strictly after the widened lower bound and end
    /// strictly before `end`.
    ///
    /// The extra day absorbs store-side rounding of the persisted start.
    pub fn snapshot_predicate(&self, schema: &Schema, tz: &Tz) -> Predicate {
        if self.is_empty() {
            return Predicate::Never;
        }

        let widened = self.widened(tz);
        Predicate::and(vec![
            Predicate::gt(schema.start, widened.start),
            Predicate::lt(schema.end, widened.end),
        ])
    }
}
