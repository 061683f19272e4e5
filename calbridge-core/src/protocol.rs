//! Host protocol types.
//!
//! The host sends one JSON request per line and reads one JSON response per
//! line. Interactive creates answer twice: `pending` right away and
//! `resolved` once the external editor finishes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, CalendarResult};
use crate::event::{EventDraft, EventListing};
use crate::interactive::CorrelationTag;

/// Actions the host may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    CreateEvent,
    CreateEventWithOptions,
    CreateEventInteractively,
    DeleteEvent,
    FindEvent,
    ListEventsInRange,
    ListCalendars,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub action: Action,
    #[serde(default)]
    pub args: serde_json::Value,
}

impl Request {
    /// Decode the arguments. A missing `args` object decodes like `{}`.
    pub fn args<T: DeserializeOwned>(&self) -> CalendarResult<T> {
        let args = if self.args.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            self.args.clone()
        };

        serde_json::from_value(args).map_err(|e| CalendarError::InvalidRequest(format!("Invalid args: {e}")))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOptions {
    #[serde(default)]
    pub first_reminder_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventArgs {
    pub title: String,
    pub start_time: i64,
    pub end_time: i64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub options: Option<CreateOptions>,
}

impl CreateEventArgs {
    pub fn into_draft(self) -> EventDraft {
        let first_reminder_minutes = self.options.and_then(|o| o.first_reminder_minutes);
        EventDraft {
            title: self.title,
            location: self.location,
            notes: self.notes,
            start_time: self.start_time,
            end_time: self.end_time,
            first_reminder_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeArgs {
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
}

/// A store row left out of a listing because it could not be mapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub reason: String,
}

impl From<&CalendarError> for SkippedRecord {
    fn from(err: &CalendarError) -> Self {
        match err {
            CalendarError::MalformedRecord { index, reason } => SkippedRecord {
                index: Some(*index),
                reason: reason.clone(),
            },
            other => SkippedRecord {
                index: None,
                reason: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Success {
        data: serde_json::Value,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        skipped: Vec<SkippedRecord>,
    },
    Pending {
        tag: CorrelationTag,
    },
    Resolved {
        tag: CorrelationTag,
        created: bool,
    },
    Error {
        error: String,
        kind: String,
    },
}

impl Response {
    pub fn success<T: Serialize>(data: T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Response::Success {
                data,
                skipped: Vec::new(),
            },
            Err(e) => Response::error(&CalendarError::from(e)),
        }
    }

    /// Events as `data`, plus any rows that could not be mapped.
    pub fn listing(listing: EventListing) -> Self {
        let skipped: Vec<SkippedRecord> = listing.skipped.iter().map(SkippedRecord::from).collect();
        match Response::success(listing.events) {
            Response::Success { data, .. } => Response::Success { data, skipped },
            other => other,
        }
    }

    pub fn error(err: &CalendarError) -> Self {
        Response::Error {
            error: err.to_string(),
            kind: err.label().to_string(),
        }
    }

    /// One protocol line, without the trailing newline.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"error","error":"Failed to encode response: {e}","kind":"serialization"}}"#)
        })
    }
}
