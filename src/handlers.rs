use calbridge_core::interactive::EditorCompletion;
use calbridge_core::protocol::{Action, CreateEventArgs, RangeArgs, Request, Response};
use calbridge_core::{CalendarResult, CalendarService, EventFilter};
use tracing::{debug, warn};

pub async fn handle_request(service: &CalendarService, request: Request) -> Response {
    debug!(action = ?request.action, "Handling request");

    let result = match request.action {
        Action::CreateEvent => create_event(service, &request, false).await,
        Action::CreateEventWithOptions => create_event(service, &request, true).await,
        Action::CreateEventInteractively => create_event_interactively(service, &request).await,
        Action::DeleteEvent => delete_event(service, &request).await,
        Action::FindEvent => find_event(service, &request).await,
        Action::ListEventsInRange => list_events_in_range(service, &request).await,
        Action::ListCalendars => list_calendars(service).await,
    };

    result.unwrap_or_else(|e| {
        warn!(action = ?request.action, kind = e.label(), error = %e, "Request failed");
        Response::error(&e)
    })
}

/// Turn an editor completion into the deferred answer for its interactive create.
pub async fn handle_completion(service: &CalendarService, completion: EditorCompletion) -> Response {
    let tag = completion.tag;
    match service.resolve_interactive(tag.clone()).await {
        Ok(outcome) => Response::Resolved {
            tag,
            created: outcome.is_created(),
        },
        Err(e) => {
            warn!(%tag, error = %e, "Could not resolve interactive create");
            Response::error(&e)
        }
    }
}

async fn create_event(
    service: &CalendarService,
    request: &Request,
    with_options: bool,
) -> CalendarResult<Response> {
    let mut args: CreateEventArgs = request.args()?;
    if !with_options {
        args.options = None;
    }

    let created = service.create_event(args.into_draft()).await?;
    Ok(Response::success(created))
}

async fn create_event_interactively(
    service: &CalendarService,
    request: &Request,
) -> CalendarResult<Response> {
    let args: CreateEventArgs = request.args()?;
    let tag = service.begin_interactive(args.into_draft()).await?;
    Ok(Response::Pending { tag })
}

async fn delete_event(service: &CalendarService, request: &Request) -> CalendarResult<Response> {
    let filter: EventFilter = request.args()?;
    let deleted = service.delete_event(filter).await?;
    Ok(Response::success(deleted))
}

async fn find_event(service: &CalendarService, request: &Request) -> CalendarResult<Response> {
    let filter: EventFilter = request.args()?;
    let listing = service.find_events(filter).await?;
    Ok(Response::listing(listing))
}

async fn list_events_in_range(
    service: &CalendarService,
    request: &Request,
) -> CalendarResult<Response> {
    let range: RangeArgs = request.args()?;
    let listing = service
        .list_events_in_range(range.start_time, range.end_time)
        .await?;
    Ok(Response::listing(listing))
}

async fn list_calendars(service: &CalendarService) -> CalendarResult<Response> {
    let calendars = service.list_active_calendars().await?;
    Ok(Response::success(calendars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use calbridge_core::accessor::{AccessorOptions, AccessorSlot, PlatformCapabilities};
    use calbridge_core::interactive::{CorrelationTag, EditorDraft, ExternalEditor};
    use calbridge_core::store::{MemoryStore, RecordStore};
    use serde_json::{Value, json};

    const T: i64 = 1_742_457_600_000;
    const HOUR: i64 = 3_600_000;

    /// Saves the draft into the store the moment it is launched.
    struct SavingEditor {
        store: Arc<MemoryStore>,
        launched: Mutex<Vec<CorrelationTag>>,
    }

    impl ExternalEditor for SavingEditor {
        fn launch(&self, draft: &EditorDraft, tag: &CorrelationTag) -> CalendarResult<()> {
            let row = json!({"title": draft.title, "dtstart": draft.begin_time, "dtend": draft.end_time - 1});
            self.store
                .insert("events", row.as_object().cloned().unwrap_or_default())
                .map_err(|e| calbridge_core::CalendarError::Store(e.to_string()))?;
            self.launched.lock().unwrap().push(tag.clone());
            Ok(())
        }
    }

    fn service(api_level: u32) -> (CalendarService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let slot = AccessorSlot::new(
            PlatformCapabilities { api_level },
            store.clone(),
            AccessorOptions {
                tz: chrono_tz::UTC,
                default_calendar_id: Some(1),
            },
        );
        let editor = Arc::new(SavingEditor {
            store: store.clone(),
            launched: Mutex::new(Vec::new()),
        });
        (CalendarService::new(slot, editor), store)
    }

    fn request(value: Value) -> Request {
        serde_json::from_value(value).unwrap()
    }

    fn to_json(response: Response) -> Value {
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let (service, _) = service(30);

        let created = handle_request(
            &service,
            request(json!({
                "action": "createEventWithOptions",
                "args": {"title": "Standup", "startTime": T, "endTime": T + HOUR, "options": {"firstReminderMinutes": 5}}
            })),
        )
        .await;
        assert_eq!(to_json(created), json!({"status": "success", "data": true}));

        let listed = to_json(
            handle_request(
                &service,
                request(json!({"action": "listEventsInRange", "args": {"startTime": T, "endTime": T + HOUR}})),
            )
            .await,
        );
        assert_eq!(listed["data"][0]["title"], "Standup");
        assert_eq!(listed["data"][0]["firstReminderMinutes"], 5);
        assert_eq!(listed["data"][0]["allDay"], false);
    }

    #[tokio::test]
    async fn test_plain_create_ignores_options() {
        let (service, store) = service(30);

        handle_request(
            &service,
            request(json!({
                "action": "createEvent",
                "args": {"title": "A", "startTime": T, "endTime": T + HOUR, "options": {"firstReminderMinutes": 5}}
            })),
        )
        .await;

        let rows = store.rows("events").unwrap();
        assert!(rows[0].get("firstReminderMinutes").is_none());
    }

    #[tokio::test]
    async fn test_find_and_delete() {
        let (service, _) = service(30);
        for title in ["Standup", "Retro"] {
            handle_request(
                &service,
                request(json!({"action": "createEvent", "args": {"title": title, "startTime": T, "endTime": T + HOUR}})),
            )
            .await;
        }

        let filter = json!({"title": "Standup", "startTime": T, "endTime": T + HOUR});
        let found = to_json(handle_request(&service, request(json!({"action": "findEvent", "args": filter}))).await);
        assert_eq!(found["data"].as_array().unwrap().len(), 1);

        let deleted = to_json(handle_request(&service, request(json!({"action": "deleteEvent", "args": filter}))).await);
        assert_eq!(deleted["data"], true);

        let deleted = to_json(handle_request(&service, request(json!({"action": "deleteEvent", "args": filter}))).await);
        assert_eq!(deleted["data"], false);
    }

    #[tokio::test]
    async fn test_listing_reports_skipped_rows() {
        let (service, store) = service(30);
        for row in [
            json!({"title": "Good", "dtstart": T + 1, "dtend": T + 2}),
            json!({"dtstart": T + 3, "dtend": T + 4}),
        ] {
            store.insert("events", row.as_object().cloned().unwrap()).unwrap();
        }

        let range = json!({"startTime": T, "endTime": T + HOUR});
        for action in ["listEventsInRange", "findEvent"] {
            let response = to_json(handle_request(&service, request(json!({"action": action, "args": range}))).await);

            assert_eq!(response["status"], "success");
            assert_eq!(response["data"].as_array().unwrap().len(), 1);
            assert_eq!(response["skipped"][0]["index"], 1);
            assert_eq!(response["skipped"][0]["reason"], "missing 'title'");
        }
    }

    #[tokio::test]
    async fn test_invalid_args_become_error_response() {
        let (service, _) = service(30);

        let response = to_json(
            handle_request(&service, request(json!({"action": "createEvent", "args": {"title": "A"}}))).await,
        );
        assert_eq!(response["status"], "error");
        assert_eq!(response["kind"], "invalid_request");
    }

    #[tokio::test]
    async fn test_legacy_list_calendars_is_unsupported() {
        let (service, _) = service(8);

        let response = to_json(handle_request(&service, request(json!({"action": "listCalendars"}))).await);
        assert_eq!(response["kind"], "unsupported");
    }

    #[tokio::test]
    async fn test_interactive_create_resolves_on_completion() {
        let (service, _) = service(30);

        let pending = handle_request(
            &service,
            request(json!({
                "action": "createEventInteractively",
                "args": {"title": "Dentist", "startTime": T, "endTime": T + HOUR}
            })),
        )
        .await;
        let Response::Pending { tag } = pending else {
            panic!("expected pending response");
        };

        let resolved = handle_completion(&service, EditorCompletion { tag: tag.clone() }).await;
        assert_eq!(
            to_json(resolved),
            json!({"status": "resolved", "tag": tag.as_str(), "created": true})
        );

        // A second completion for the same tag has nothing to resolve
        let again = to_json(handle_completion(&service, EditorCompletion { tag }).await);
        assert_eq!(again["kind"], "unknown_correlation");
    }
}
