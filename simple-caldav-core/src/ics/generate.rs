//! ICS generation.

use chrono::{DateTime, Utc};
use icalendar::{Calendar, Component, EventLike, Property, Trigger, ValueType};

use crate::constants::{ICS_DATETIME_FORMAT, PRODID};
use crate::error::{CalDavError, CalDavResult};
use crate::event::{Alarm, AlarmAction, Event};

/// Generate .ics content for an event.
///
/// All validation happens before any output is built, so an invalid event
/// never yields partial text.
pub fn generate_ics(event: &Event) -> CalDavResult<String> {
    validate_event(event)?;

    let mut cal = Calendar::new();

    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&event.uid);
    ics_event.summary(&event.summary);
    ics_event.add_property("DTSTAMP", format_datetime(&Utc::now()));
    ics_event.add_property("DTSTART", format_datetime(&event.start));
    ics_event.add_property("DTEND", format_datetime(&event.end));

    if let Some(ref location) = event.location {
        ics_event.location(location);
    }

    if let Some(status) = event.status {
        ics_event.add_property("STATUS", status.as_ics_str());
    }

    if let Some(ref org) = event.organizer
        && !org.email.is_empty()
    {
        let mut prop = Property::new("ORGANIZER", format!("mailto:{}", org.email));
        if let Some(ref name) = org.common_name {
            prop.add_parameter("CN", name);
        }
        ics_event.append_property(prop);
    }

    for alarm in &event.alarms {
        ics_event.alarm(build_alarm(alarm, &event.summary));
    }

    let ics_event = ics_event.done();
    cal.push(ics_event);
    let cal = cal.done();

    Ok(strip_ics_bloat(&cal.to_string()))
}

/// Format a timestamp in UTC basic format. Sub-second precision is dropped.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(ICS_DATETIME_FORMAT).to_string()
}

fn validate_event(event: &Event) -> CalDavResult<()> {
    if event.uid.trim().is_empty() {
        return Err(CalDavError::validation("uid", "must not be empty"));
    }
    if event.summary.trim().is_empty() {
        return Err(CalDavError::validation("summary", "must not be empty"));
    }
    for alarm in &event.alarms {
        validate_alarm(alarm)?;
    }
    Ok(())
}

fn validate_alarm(alarm: &Alarm) -> CalDavResult<()> {
    if let AlarmAction::Other(action) = &alarm.action {
        return Err(CalDavError::validation(
            "alarm.action",
            format!("'{action}' cannot be written, expected EMAIL or SMS"),
        ));
    }
    match alarm.attendee.as_deref().map(str::trim) {
        Some(attendee) if !attendee.is_empty() => Ok(()),
        _ => Err(CalDavError::validation(
            "alarm.attendee",
            format!("required for {} alarms", alarm.action.as_ics_str()),
        )),
    }
}

/// Build a VALARM with an absolute trigger and a scheme-prefixed attendee.
///
/// Only called on validated alarms.
fn build_alarm(alarm: &Alarm, event_summary: &str) -> icalendar::Alarm {
    // DESCRIPTION is mandatory for EMAIL alarms (RFC 5545 §3.6.6)
    let description = alarm
        .description
        .as_deref()
        .or(alarm.summary.as_deref())
        .unwrap_or(event_summary);

    let mut ics_alarm =
        icalendar::Alarm::display(description, Trigger::before_start(chrono::Duration::zero()));
    ics_alarm.add_property("ACTION", alarm.action.as_ics_str());

    let mut trigger = Property::new("TRIGGER", format_datetime(&alarm.trigger));
    trigger.append_parameter(ValueType::DateTime);
    ics_alarm.append_property(trigger);

    if let Some(ref summary) = alarm.summary {
        ics_alarm.add_property("SUMMARY", summary);
    }
    if let Some(ref subject) = alarm.subject {
        ics_alarm.add_property("X-SUBJECT", subject);
    }

    if let (Some(scheme), Some(attendee)) = (alarm.action.scheme(), alarm.attendee.as_deref()) {
        let address = format!("{}{}", scheme, attendee.trim());
        ics_alarm.append_multi_property(Property::new("ATTENDEE", address));
    }

    ics_alarm
}

/// Clean up ICS output from the icalendar crate
/// - Replace PRODID with ours
/// - Remove CALSCALE:GREGORIAN (it's the default)
/// - Remove DTSTAMP and UID inside VALARM sections (not required by RFC 5545)
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    let mut in_valarm = false;

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODID);
            result.push_str("\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        if line == "BEGIN:VALARM" {
            in_valarm = true;
        } else if line == "END:VALARM" {
            in_valarm = false;
        }

        if in_valarm && (line.starts_with("DTSTAMP:") || line.starts_with("UID:")) {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventStatus, Organizer};
    use chrono::TimeZone;

    fn make_test_event() -> Event {
        Event {
            uid: "test-event-123".to_string(),
            start: Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 3, 20, 16, 0, 0).unwrap(),
            summary: "Test Event".to_string(),
            status: None,
            organizer: None,
            location: None,
            alarms: vec![],
            href: None,
        }
    }

    #[test]
    fn test_generate_ics_envelope() {
        let ics = generate_ics(&make_test_event()).unwrap();

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"), "ICS:\n{}", ics);
        assert!(ics.contains("VERSION:2.0"));
        assert!(ics.contains(&format!("PRODID:{}", PRODID)));
        assert!(!ics.contains("CALSCALE"));
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
        assert!(ics.contains("UID:test-event-123"));
        assert!(ics.contains("DTSTART:20250320T150000Z"), "ICS:\n{}", ics);
        assert!(ics.contains("DTEND:20250320T160000Z"), "ICS:\n{}", ics);
        assert!(ics.contains("DTSTAMP:"));
    }

    #[test]
    fn test_generate_ics_drops_subsecond_precision() {
        let mut event = make_test_event();
        event.start = Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 7).unwrap()
            + chrono::Duration::milliseconds(999);

        let ics = generate_ics(&event).unwrap();
        assert!(ics.contains("DTSTART:20250320T150007Z"), "ICS:\n{}", ics);
    }

    #[test]
    fn test_generate_ics_rejects_empty_uid_and_summary() {
        let mut event = make_test_event();
        event.uid = String::new();
        let err = generate_ics(&event).unwrap_err();
        assert!(matches!(err, CalDavError::Validation { field: "uid", .. }));

        let mut event = make_test_event();
        event.summary = "  ".to_string();
        let err = generate_ics(&event).unwrap_err();
        assert!(matches!(err, CalDavError::Validation { field: "summary", .. }));
    }

    #[test]
    fn test_generate_ics_status_and_location() {
        let mut event = make_test_event();
        event.status = Some(EventStatus::Tentative);
        event.location = Some("Room 4".to_string());

        let ics = generate_ics(&event).unwrap();
        assert!(ics.contains("STATUS:TENTATIVE"));
        assert!(ics.contains("LOCATION:Room 4"));
    }

    #[test]
    fn test_generate_ics_organizer_has_proper_parameters() {
        let mut event = make_test_event();
        event.organizer = Some(Organizer {
            email: "organizer@example.com".to_string(),
            common_name: Some("Organizer Name".to_string()),
        });

        let ics = generate_ics(&event).unwrap();

        let organizer_line = ics
            .lines()
            .find(|l| l.starts_with("ORGANIZER"))
            .expect("Should have ORGANIZER line");

        assert!(
            organizer_line.contains(";CN="),
            "CN should be a parameter (;CN=), not part of value. Got: {}",
            organizer_line
        );
        assert!(organizer_line.contains("mailto:organizer@example.com"));
    }

    #[test]
    fn test_generate_ics_email_alarm() {
        let mut event = make_test_event();
        let trigger = Utc.with_ymd_and_hms(2025, 3, 20, 14, 30, 0).unwrap();
        event.alarms = vec![Alarm::email("a@example.com", trigger)];

        let ics = generate_ics(&event).unwrap();

        let valarm_section: String = ics
            .split("BEGIN:VALARM")
            .nth(1)
            .unwrap()
            .split("END:VALARM")
            .next()
            .unwrap()
            .to_string();
        assert!(valarm_section.contains("ACTION:EMAIL"), "VALARM:\n{}", valarm_section);
        assert!(valarm_section.contains("mailto:a@example.com"), "VALARM:\n{}", valarm_section);
        assert!(
            valarm_section.contains("TRIGGER;VALUE=DATE-TIME:20250320T143000Z"),
            "VALARM:\n{}",
            valarm_section
        );
        assert!(!valarm_section.contains("UID:"));
        assert!(!valarm_section.contains("DTSTAMP:"));
    }

    #[test]
    fn test_generate_ics_sms_alarm_uses_sms_scheme() {
        let mut event = make_test_event();
        event.alarms = vec![Alarm::sms("+15551234", event.start)];

        let ics = generate_ics(&event).unwrap();
        assert!(ics.contains("ATTENDEE:sms:+15551234"), "ICS:\n{}", ics);
        assert!(ics.contains("ACTION:SMS"));
    }

    #[test]
    fn test_generate_ics_alarms_keep_order() {
        let mut event = make_test_event();
        event.alarms = vec![
            Alarm::email("first@example.com", event.start),
            Alarm::sms("+15550000", event.start),
        ];

        let ics = generate_ics(&event).unwrap();
        let first = ics.find("mailto:first@example.com").unwrap();
        let second = ics.find("sms:+15550000").unwrap();
        assert!(first < second);
        assert_eq!(ics.matches("BEGIN:VALARM").count(), 2);
    }

    #[test]
    fn test_generate_ics_rejects_alarm_without_attendee() {
        let mut event = make_test_event();
        let mut alarm = Alarm::email("x@example.com", event.start);
        alarm.attendee = None;
        event.alarms = vec![alarm];

        let err = generate_ics(&event).unwrap_err();
        assert!(matches!(err, CalDavError::Validation { field: "alarm.attendee", .. }));
    }

    #[test]
    fn test_generate_ics_rejects_unwritable_action() {
        let mut event = make_test_event();
        let mut alarm = Alarm::email("x@example.com", event.start);
        alarm.action = AlarmAction::Other("DISPLAY".to_string());
        event.alarms = vec![alarm];

        let err = generate_ics(&event).unwrap_err();
        assert!(err.to_string().contains("DISPLAY"), "Got: {}", err);
    }
}
