//! Core of calbridge.
//!
//! - `accessor`: the calendar accessor contract and its provider and legacy variants
//! - `date_range`, `record`, `schema`: range predicates and row mapping per store layout
//! - `interactive`: creation through an external editor, confirmed by counting
//! - `protocol` and `service`: the host-facing request types and async facade
//! - `store`: the record-store boundary and an in-memory store

pub mod accessor;
pub mod date_range;
pub mod error;
pub mod event;
pub mod interactive;
pub mod protocol;
pub mod record;
pub mod schema;
pub mod service;
pub mod settings;
pub mod store;

pub use error::{CalendarError, CalendarResult};
pub use event::{CalendarSummary, Event, EventDraft, EventFilter, EventListing};
pub use service::CalendarService;
pub use settings::Settings;
