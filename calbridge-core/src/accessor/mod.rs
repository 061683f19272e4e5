//! Calendar accessors.
//!
//! One contract, two implementations: [`ProviderAccessor`] for calendar
//! provider stores and [`LegacyAccessor`] for older stores. The variant is
//! chosen from the platform's capabilities once per process by
//! [`AccessorSlot`] and never re-selected.

mod legacy;
mod provider;
mod table;

pub use legacy::LegacyAccessor;
pub use provider::ProviderAccessor;

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::date_range::TimeRange;
use crate::error::{CalendarError, CalendarResult};
use crate::event::{CalendarSummary, Event, EventFilter, EventListing};
use crate::store::RecordStore;

/// First platform API level with a calendar provider store.
pub const PROVIDER_API_LEVEL: u32 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorVariant {
    Provider,
    Legacy,
}

impl AccessorVariant {
    pub fn for_capabilities(capabilities: PlatformCapabilities) -> Self {
        if capabilities.api_level >= PROVIDER_API_LEVEL {
            AccessorVariant::Provider
        } else {
            AccessorVariant::Legacy
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AccessorVariant::Provider => "provider",
            AccessorVariant::Legacy => "legacy",
        }
    }
}

impl fmt::Display for AccessorVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What the host platform offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    pub api_level: u32,
}

/// Settings shared by both variants.
#[derive(Debug, Clone)]
pub struct AccessorOptions {
    /// Zone used for local-day boundaries.
    pub tz: Tz,
    /// Calendar new events are written to.
    pub default_calendar_id: Option<i64>,
}

/// Create, find, delete and list events in the underlying store.
///
/// Operations block on the store; run them off any latency-sensitive thread.
/// A variant that lacks an operation returns [`CalendarError::Unsupported`].
pub trait CalendarAccessor: Send + Sync {
    fn variant(&self) -> AccessorVariant;

    /// Zone the accessor derives all-day flags and day shifts in.
    fn time_zone(&self) -> &Tz;

    /// Insert one event. True only when the store confirms the insert.
    fn create_event(&self, event: &Event) -> CalendarResult<bool>;

    /// Events matching the filter's title, location and range, ordered by start.
    fn find_events(&self, _filter: &EventFilter) -> CalendarResult<EventListing> {
        Err(self.unsupported("findEvents"))
    }

    /// Delete every matching event. True iff at least one row was removed.
    fn delete_event(&self, _filter: &EventFilter) -> CalendarResult<bool> {
        Err(self.unsupported("deleteEvent"))
    }

    fn list_events_in_range(&self, start: i64, end: i64) -> CalendarResult<EventListing>;

    /// Number of stored rows in the widened snapshot range around `range`.
    /// Used to detect events created outside this accessor.
    fn count_snapshot(&self, range: TimeRange) -> CalendarResult<usize>;

    fn list_active_calendars(&self) -> CalendarResult<Vec<CalendarSummary>> {
        Err(self.unsupported("listActiveCalendars"))
    }

    fn unsupported(&self, operation: &'static str) -> CalendarError {
        CalendarError::Unsupported {
            operation,
            variant: self.variant().name(),
        }
    }
}

/// Build the accessor matching `capabilities`.
pub fn select_accessor(
    capabilities: PlatformCapabilities,
    store: Arc<dyn RecordStore>,
    options: AccessorOptions,
) -> Arc<dyn CalendarAccessor> {
    match AccessorVariant::for_capabilities(capabilities) {
        AccessorVariant::Provider => Arc::new(ProviderAccessor::new(store, options)),
        AccessorVariant::Legacy => Arc::new(LegacyAccessor::new(store, options)),
    }
}

/// Lazily selects an accessor on first use and keeps it for its lifetime.
pub struct AccessorSlot {
    capabilities: PlatformCapabilities,
    store: Arc<dyn RecordStore>,
    options: AccessorOptions,
    accessor: OnceLock<Arc<dyn CalendarAccessor>>,
}

impl AccessorSlot {
    pub fn new(
        capabilities: PlatformCapabilities,
        store: Arc<dyn RecordStore>,
        options: AccessorOptions,
    ) -> Self {
        AccessorSlot {
            capabilities,
            store,
            options,
            accessor: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Arc<dyn CalendarAccessor> {
        self.accessor
            .get_or_init(|| {
                let accessor = select_accessor(
                    self.capabilities,
                    self.store.clone(),
                    self.options.clone(),
                );
                info!(
                    variant = %accessor.variant(),
                    api_level = self.capabilities.api_level,
                    "Initializing calendar accessor"
                );
                accessor
            })
            .clone()
    }
}
