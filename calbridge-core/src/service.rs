//! Async facade over the accessor and the interactive creator.
//!
//! Store calls block, so each one runs on tokio's blocking pool.

use std::sync::{Arc, OnceLock};

use tokio::task;

use crate::accessor::{AccessorSlot, AccessorVariant, CalendarAccessor};
use crate::error::{CalendarError, CalendarResult};
use crate::event::{CalendarSummary, Event, EventDraft, EventFilter, EventListing};
use crate::interactive::{CorrelationTag, CreateOutcome, ExternalEditor, InteractiveCreator};

pub struct CalendarService {
    slot: Arc<AccessorSlot>,
    editor: Arc<dyn ExternalEditor>,
    creator: OnceLock<Arc<InteractiveCreator>>,
}

impl CalendarService {
    pub fn new(slot: AccessorSlot, editor: Arc<dyn ExternalEditor>) -> Self {
        CalendarService {
            slot: Arc::new(slot),
            editor,
            creator: OnceLock::new(),
        }
    }

    pub fn variant(&self) -> AccessorVariant {
        self.slot.get().variant()
    }

    pub async fn create_event(&self, draft: EventDraft) -> CalendarResult<bool> {
        self.run(move |accessor| {
            let event = Event::new(draft, accessor.time_zone());
            accessor.create_event(&event)
        })
        .await
    }

    pub async fn find_events(&self, filter: EventFilter) -> CalendarResult<EventListing> {
        self.run(move |accessor| accessor.find_events(&filter)).await
    }

    pub async fn delete_event(&self, filter: EventFilter) -> CalendarResult<bool> {
        self.run(move |accessor| accessor.delete_event(&filter)).await
    }

    pub async fn list_events_in_range(&self, start: i64, end: i64) -> CalendarResult<EventListing> {
        self.run(move |accessor| accessor.list_events_in_range(start, end)).await
    }

    pub async fn list_active_calendars(&self) -> CalendarResult<Vec<CalendarSummary>> {
        self.run(|accessor| accessor.list_active_calendars()).await
    }

    /// Start an interactive create. The returned tag identifies the
    /// editor completion that must be passed to [`Self::resolve_interactive`].
    pub async fn begin_interactive(&self, draft: EventDraft) -> CalendarResult<CorrelationTag> {
        let creator = self.creator();
        self.run(move |accessor| {
            let event = Event::new(draft, accessor.time_zone());
            creator.begin(&event)
        })
        .await
    }

    pub async fn resolve_interactive(&self, tag: CorrelationTag) -> CalendarResult<CreateOutcome> {
        let creator = self.creator();
        self.run(move |_| creator.resolve(&tag)).await
    }

    fn creator(&self) -> Arc<InteractiveCreator> {
        self.creator
            .get_or_init(|| Arc::new(InteractiveCreator::new(self.slot.get(), self.editor.clone())))
            .clone()
    }

    async fn run<T, F>(&self, op: F) -> CalendarResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn CalendarAccessor>) -> CalendarResult<T> + Send + 'static,
    {
        let accessor = self.slot.get();
        task::spawn_blocking(move || op(accessor))
            .await
            .map_err(|e| CalendarError::Store(format!("Store task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{AccessorOptions, PlatformCapabilities};
    use crate::interactive::EditorDraft;
    use crate::store::{MemoryStore, RecordStore, Row};
    use chrono_tz::UTC;
    use serde_json::json;
    use std::sync::Mutex;

    const T: i64 = 1_742_457_600_000;
    const HOUR: i64 = 3_600_000;

    #[derive(Default)]
    struct NoopEditor {
        launched: Mutex<Vec<CorrelationTag>>,
    }

    impl ExternalEditor for NoopEditor {
        fn launch(&self, _draft: &EditorDraft, tag: &CorrelationTag) -> CalendarResult<()> {
            self.launched.lock().unwrap().push(tag.clone());
            Ok(())
        }
    }

    fn service(api_level: u32, store: Arc<MemoryStore>) -> CalendarService {
        let slot = AccessorSlot::new(
            PlatformCapabilities { api_level },
            store,
            AccessorOptions {
                tz: UTC,
                default_calendar_id: Some(1),
            },
        );
        CalendarService::new(slot, Arc::new(NoopEditor::default()))
    }

    fn draft(title: &str, start: i64, end: i64) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            location: String::new(),
            notes: String::new(),
            start_time: start,
            end_time: end,
            first_reminder_minutes: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let service = service(30, Arc::new(MemoryStore::new()));

        assert!(service.create_event(draft("Standup", T, T + HOUR)).await.unwrap());
        let listing = service.list_events_in_range(T, T + HOUR).await.unwrap();

        assert_eq!(listing.len(), 1);
        assert_eq!(listing.events[0].title(), "Standup");
        assert!(!listing.events[0].all_day());
    }

    #[tokio::test]
    async fn test_find_and_delete() {
        let service = service(30, Arc::new(MemoryStore::new()));
        service.create_event(draft("Standup", T, T + HOUR)).await.unwrap();
        service.create_event(draft("Retro", T, T + HOUR)).await.unwrap();

        let filter = EventFilter {
            title: Some("Standup".to_string()),
            location: None,
            start_time: T,
            end_time: T + HOUR,
        };
        assert_eq!(service.find_events(filter.clone()).await.unwrap().len(), 1);
        assert!(service.delete_event(filter.clone()).await.unwrap());
        assert!(!service.delete_event(filter).await.unwrap());
        assert_eq!(service.list_events_in_range(T, T + HOUR).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_legacy_variant_reports_unsupported() {
        let service = service(10, Arc::new(MemoryStore::new()));

        assert_eq!(service.variant(), AccessorVariant::Legacy);
        assert!(matches!(
            service.list_active_calendars().await,
            Err(CalendarError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_interactive_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let service = service(30, store.clone());

        let tag = service.begin_interactive(draft("Dentist", T, T + HOUR)).await.unwrap();

        let row: Row = json!({"title": "Dentist", "dtstart": T, "dtend": T + HOUR - 1})
            .as_object()
            .cloned()
            .unwrap();
        store.insert("events", row).unwrap();

        let outcome = service.resolve_interactive(tag).await.unwrap();
        assert_eq!(outcome, CreateOutcome::Created);
    }

    #[tokio::test]
    async fn test_interactive_cancelled() {
        let service = service(30, Arc::new(MemoryStore::new()));

        let tag = service.begin_interactive(draft("Dentist", T, T + HOUR)).await.unwrap();
        let outcome = service.resolve_interactive(tag).await.unwrap();

        assert!(!outcome.is_created());
    }
}
