//! Field layouts of the two record-store generations.

/// Table and column names used by one store variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub events_table: &'static str,
    pub calendars_table: &'static str,

    // Event columns
    pub title: &'static str,
    pub start: &'static str,
    pub end: &'static str,
    pub location: &'static str,
    pub notes: &'static str,
    pub all_day: &'static str,
    pub calendar_id: &'static str,
    /// Legacy stores have no alarm support.
    pub has_alarm: Option<&'static str>,
    pub reminder_minutes: Option<&'static str>,

    // Calendar columns
    pub calendar_key: &'static str,
    pub calendar_name: &'static str,
    pub calendar_account: Option<&'static str>,
    pub calendar_active: &'static str,
}

impl Schema {
    /// Calendar provider layout (API level 14 and later).
    pub const PROVIDER: Schema = Schema {
        events_table: "events",
        calendars_table: "calendars",
        title: "title",
        start: "dtstart",
        end: "dtend",
        location: "eventLocation",
        notes: "description",
        all_day: "allDay",
        calendar_id: "calendar_id",
        has_alarm: Some("hasAlarm"),
        reminder_minutes: Some("firstReminderMinutes"),
        calendar_key: "_id",
        calendar_name: "calendar_displayName",
        calendar_account: Some("account_name"),
        calendar_active: "visible",
    };

    /// Pre-provider layout.
    pub const LEGACY: Schema = Schema {
        events_table: "events",
        calendars_table: "calendars",
        title: "title",
        start: "dtstart",
        end: "dtend",
        location: "eventLocation",
        notes: "description",
        all_day: "allDay",
        calendar_id: "calendar_id",
        has_alarm: None,
        reminder_minutes: None,
        calendar_key: "_id",
        calendar_name: "displayName",
        calendar_account: None,
        calendar_active: "selected",
    };
}
