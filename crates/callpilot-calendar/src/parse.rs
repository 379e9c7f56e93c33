//! Event → appointment extraction.
//!
//! Bookings made by the voice assistant carry caller details as
//! `Label: value` lines in the event description. Only timed, non-cancelled
//! events become appointments.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use uuid::Uuid;

use callpilot_db::NewAppointment;

use crate::types::CalendarEvent;

static FIELD_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(email|e-mail|phone|service|patient[ \t]*type)[ \t]*:(.*)$")
        .expect("valid field regex")
});
static BREAK_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>").expect("valid break regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

const MAX_FIELD_CHARS: usize = 200;

#[derive(Debug, Default, PartialEq, Eq)]
struct DescriptionFields {
    email: Option<String>,
    phone: Option<String>,
    service: Option<String>,
    patient_type: Option<String>,
}

/// Build the appointment row for `event`, or `None` when the event should
/// not be mirrored (cancelled, all-day, or missing an id).
///
/// `booked_at` is the event's creation time when the provider reports one,
/// otherwise `now`.
#[must_use]
pub fn appointment_from_event(
    tenant_id: Uuid,
    assistant_id: Option<Uuid>,
    event: &CalendarEvent,
    now: DateTime<Utc>,
) -> Option<NewAppointment> {
    if event.id.trim().is_empty() || event.status.as_deref() == Some("cancelled") {
        return None;
    }
    let start_time = event.start.date_time?;
    let end_time = event.end.date_time.unwrap_or(start_time);

    let mut fields = event
        .description
        .as_deref()
        .map(parse_description)
        .unwrap_or_default();
    if fields.email.is_none() {
        fields.email = event
            .attendees
            .iter()
            .filter(|a| !a.is_self && !a.organizer)
            .find_map(|a| a.email.clone().filter(|e| e.contains('@')));
    }

    Some(NewAppointment {
        tenant_id,
        assistant_id,
        calendar_event_id: event.id.clone(),
        start_time,
        end_time,
        summary: non_blank(event.summary.as_deref()),
        description: non_blank(event.description.as_deref()),
        email: fields.email,
        phone: fields.phone,
        service: fields.service,
        patient_type: fields.patient_type,
        booked_at: event.created.unwrap_or(now),
    })
}

fn parse_description(description: &str) -> DescriptionFields {
    let text = BREAK_TAG_RE.replace_all(description, "\n");
    let text = TAG_RE.replace_all(&text, "");

    let mut fields = DescriptionFields::default();
    for caps in FIELD_LINE_RE.captures_iter(&text) {
        let label = caps[1].to_ascii_lowercase();
        let value: String = caps[2].trim().chars().take(MAX_FIELD_CHARS).collect();
        if value.is_empty() {
            continue;
        }
        let slot = match label.as_str() {
            "email" | "e-mail" => &mut fields.email,
            "phone" => &mut fields.phone,
            "service" => &mut fields.service,
            _ => &mut fields.patient_type,
        };
        // First occurrence wins.
        slot.get_or_insert(value);
    }
    fields
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attendee, EventTime};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap()
    }

    fn timed_event(id: &str, description: Option<&str>) -> CalendarEvent {
        CalendarEvent {
            id: id.to_owned(),
            status: Some("confirmed".to_owned()),
            summary: Some("Cleaning - Jordan".to_owned()),
            description: description.map(str::to_owned),
            start: EventTime {
                date_time: Some(at(14)),
                date: None,
            },
            end: EventTime {
                date_time: Some(at(15)),
                date: None,
            },
            created: Some(at(9)),
            attendees: Vec::new(),
        }
    }

    #[test]
    fn description_fields_are_extracted() {
        let event = timed_event(
            "evt-1",
            Some(
                "Booked by assistant\nEmail: jordan@example.com\nPhone: (555) 010-2222\n\
                 Service: Cleaning\npatient type:  New  ",
            ),
        );
        let appt = appointment_from_event(Uuid::nil(), None, &event, at(12)).unwrap();

        assert_eq!(appt.calendar_event_id, "evt-1");
        assert_eq!(appt.email.as_deref(), Some("jordan@example.com"));
        assert_eq!(appt.phone.as_deref(), Some("(555) 010-2222"));
        assert_eq!(appt.service.as_deref(), Some("Cleaning"));
        assert_eq!(appt.patient_type.as_deref(), Some("New"));
        assert_eq!(appt.start_time, at(14));
        assert_eq!(appt.end_time, at(15));
        assert_eq!(appt.booked_at, at(9));
    }

    #[test]
    fn html_descriptions_are_flattened() {
        let event = timed_event(
            "evt-2",
            Some("<b>Email:</b> sam@example.com<br>Service: Whitening<br/>Phone: 555-0100"),
        );
        let appt = appointment_from_event(Uuid::nil(), None, &event, at(12)).unwrap();
        assert_eq!(appt.email.as_deref(), Some("sam@example.com"));
        assert_eq!(appt.service.as_deref(), Some("Whitening"));
        assert_eq!(appt.phone.as_deref(), Some("555-0100"));
    }

    #[test]
    fn attendee_email_is_the_fallback() {
        let mut event = timed_event("evt-3", Some("Service: Checkup"));
        event.attendees = vec![
            Attendee {
                email: Some("desk@clinic.example".to_owned()),
                organizer: true,
                is_self: true,
            },
            Attendee {
                email: Some("riley@example.com".to_owned()),
                ..Attendee::default()
            },
        ];
        let appt = appointment_from_event(Uuid::nil(), None, &event, at(12)).unwrap();
        assert_eq!(appt.email.as_deref(), Some("riley@example.com"));
    }

    #[test]
    fn cancelled_and_all_day_events_are_skipped() {
        let mut cancelled = timed_event("evt-4", None);
        cancelled.status = Some("cancelled".to_owned());
        assert!(appointment_from_event(Uuid::nil(), None, &cancelled, at(12)).is_none());

        let mut all_day = timed_event("evt-5", None);
        all_day.start = EventTime {
            date_time: None,
            date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2),
        };
        assert!(appointment_from_event(Uuid::nil(), None, &all_day, at(12)).is_none());

        let blank_id = timed_event("  ", None);
        assert!(appointment_from_event(Uuid::nil(), None, &blank_id, at(12)).is_none());
    }

    #[test]
    fn missing_created_uses_now_and_missing_end_uses_start() {
        let mut event = timed_event("evt-6", None);
        event.created = None;
        event.end = EventTime::default();
        let appt = appointment_from_event(Uuid::nil(), None, &event, at(12)).unwrap();
        assert_eq!(appt.booked_at, at(12));
        assert_eq!(appt.end_time, at(14));
        assert!(appt.email.is_none());
        assert!(appt.description.is_none());
    }
}
