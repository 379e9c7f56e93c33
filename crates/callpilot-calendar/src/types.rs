//! Google Calendar v3 wire types (only the fields the sync reads).

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// One page of `events.list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventsPage {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    /// `confirmed`, `tentative`, or `cancelled`.
    pub status: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

/// Timed events carry `dateTime`; all-day events carry only `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: Option<DateTime<Utc>>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: Option<String>,
    #[serde(default)]
    pub organizer: bool,
    #[serde(default, rename = "self")]
    pub is_self: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_event_deserializes_with_offset() {
        let event: CalendarEvent = serde_json::from_value(serde_json::json!({
            "id": "evt1",
            "status": "confirmed",
            "start": { "dateTime": "2026-03-02T09:00:00-05:00" },
            "end": { "dateTime": "2026-03-02T09:30:00-05:00" },
            "created": "2026-02-27T18:04:11.000Z",
            "attendees": [{ "email": "pat@example.com" }, { "email": "desk@example.com", "self": true }]
        }))
        .unwrap();
        assert_eq!(
            event.start.date_time.unwrap().to_rfc3339(),
            "2026-03-02T14:00:00+00:00"
        );
        assert!(event.attendees[1].is_self);
        assert!(!event.attendees[0].organizer);
    }

    #[test]
    fn all_day_event_has_no_date_time() {
        let event: CalendarEvent = serde_json::from_value(serde_json::json!({
            "id": "evt2",
            "start": { "date": "2026-03-02" },
            "end": { "date": "2026-03-03" }
        }))
        .unwrap();
        assert!(event.start.date_time.is_none());
        assert_eq!(event.start.date, NaiveDate::from_ymd_opt(2026, 3, 2));
    }
}
