//! Interactive event creation.
//!
//! An external editor creates the event and reports back only that it
//! finished. Success is inferred by counting events in a widened range
//! before the hand-off and again on completion: more rows afterwards means
//! the user saved. Another writer touching the same range in between
//! produces a false positive.
//!
//! One creation is pending per [`InteractiveCreator`]. Beginning another
//! replaces the pending snapshot; a late completion for the replaced tag
//! resolves as [`CalendarError::UnknownCorrelation`].

mod editor;

pub use editor::{EditorRequest, ProcessEditor};

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::accessor::CalendarAccessor;
use crate::date_range::TimeRange;
use crate::error::{CalendarError, CalendarResult};
use crate::event::Event;

/// Opaque token tying a completion to the creation that started it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationTag(String);

impl CorrelationTag {
    pub fn new() -> Self {
        CorrelationTag(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationTag {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for CorrelationTag {
    fn from(tag: String) -> Self {
        CorrelationTag(tag)
    }
}

impl fmt::Display for CorrelationTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Prefilled event handed to the editor. Field names follow the editor's
/// insert form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorDraft {
    pub title: String,
    #[serde(rename = "eventLocation")]
    pub location: String,
    #[serde(rename = "description")]
    pub notes: String,
    #[serde(rename = "beginTime")]
    pub begin_time: i64,
    #[serde(rename = "endTime")]
    pub end_time: i64,
    #[serde(rename = "allDay")]
    pub all_day: bool,
}

impl From<&Event> for EditorDraft {
    fn from(event: &Event) -> Self {
        EditorDraft {
            title: event.title().to_string(),
            location: event.location().to_string(),
            notes: event.notes().to_string(),
            begin_time: event.start_time(),
            end_time: event.end_time(),
            all_day: event.all_day(),
        }
    }
}

/// Signal that an editor session ended, saved or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorCompletion {
    pub tag: CorrelationTag,
}

/// A user-facing editor that creates events on its own.
pub trait ExternalEditor: Send + Sync {
    /// Hand `draft` to the editor and return without waiting for the user.
    /// Completion is delivered later, carrying `tag`.
    fn launch(&self, draft: &EditorDraft, tag: &CorrelationTag) -> CalendarResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CreateOutcome {
    Created,
    NotCreated {
        count_before: usize,
        count_after: usize,
    },
}

impl CreateOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, CreateOutcome::Created)
    }
}

/// Observable coordinator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    AwaitingExternalResult { tag: CorrelationTag },
    Resolved { tag: CorrelationTag, outcome: CreateOutcome },
}

#[derive(Debug)]
struct PendingCreate {
    tag: CorrelationTag,
    range: TimeRange,
    count_before: usize,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Awaiting(PendingCreate),
    Resolved {
        tag: CorrelationTag,
        outcome: CreateOutcome,
    },
}

pub struct InteractiveCreator {
    accessor: Arc<dyn CalendarAccessor>,
    editor: Arc<dyn ExternalEditor>,
    phase: Mutex<Phase>,
}

impl InteractiveCreator {
    pub fn new(accessor: Arc<dyn CalendarAccessor>, editor: Arc<dyn ExternalEditor>) -> Self {
        InteractiveCreator {
            accessor,
            editor,
            phase: Mutex::new(Phase::Idle),
        }
    }

    /// Snapshot the event count around `event` and hand it to the editor.
    pub fn begin(&self, event: &Event) -> CalendarResult<CorrelationTag> {
        let range = event.time_range();
        let count_before = self.accessor.count_snapshot(range)?;
        let tag = CorrelationTag::new();

        {
            let mut phase = self.lock();
            if let Phase::Awaiting(previous) = &*phase {
                warn!(superseded = %previous.tag, %tag, "Replacing pending interactive create");
            }
            *phase = Phase::Awaiting(PendingCreate {
                tag: tag.clone(),
                range,
                count_before,
            });
        }

        if let Err(e) = self.editor.launch(&EditorDraft::from(event), &tag) {
            let mut phase = self.lock();
            if matches!(&*phase, Phase::Awaiting(p) if p.tag == tag) {
                *phase = Phase::Idle;
            }
            return Err(e);
        }

        info!(%tag, count_before, "Handed event to external editor");
        Ok(tag)
    }

    /// Settle the pending creation identified by `tag`.
    ///
    /// At most one call succeeds per `begin`; any other tag, or a repeated
    /// call, fails with [`CalendarError::UnknownCorrelation`] and leaves the
    /// pending creation in place.
    pub fn resolve(&self, tag: &CorrelationTag) -> CalendarResult<CreateOutcome> {
        let pending = {
            let mut phase = self.lock();
            match std::mem::replace(&mut *phase, Phase::Idle) {
                Phase::Awaiting(pending) if pending.tag == *tag => pending,
                other => {
                    *phase = other;
                    warn!(%tag, "Completion does not match a pending interactive create");
                    return Err(CalendarError::UnknownCorrelation(tag.to_string()));
                }
            }
        };

        let count_after = match self.accessor.count_snapshot(pending.range) {
            Ok(count) => count,
            Err(e) => {
                // Put the create back so the completion can be retried
                let mut phase = self.lock();
                if matches!(&*phase, Phase::Idle) {
                    *phase = Phase::Awaiting(pending);
                }
                return Err(e);
            }
        };
        let outcome = if count_after > pending.count_before {
            CreateOutcome::Created
        } else {
            CreateOutcome::NotCreated {
                count_before: pending.count_before,
                count_after,
            }
        };

        info!(%tag, count_before = pending.count_before, count_after, created = outcome.is_created(), "Resolved interactive create");

        // A begin that ran while we were counting owns the phase now
        let mut phase = self.lock();
        if matches!(&*phase, Phase::Idle) {
            *phase = Phase::Resolved {
                tag: pending.tag,
                outcome,
            };
        }
        Ok(outcome)
    }

    pub fn state(&self) -> CoordinatorState {
        match &*self.lock() {
            Phase::Idle => CoordinatorState::Idle,
            Phase::Awaiting(pending) => CoordinatorState::AwaitingExternalResult {
                tag: pending.tag.clone(),
            },
            Phase::Resolved { tag, outcome } => CoordinatorState::Resolved {
                tag: tag.clone(),
                outcome: *outcome,
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
