//! ICS parsing using the icalendar crate's parser.
//!
//! Reading is tolerant where writing is strict: alarms that cannot be
//! decoded are skipped and reported, unknown alarm actions are preserved.
//! A body that is not a calendar at all, or an organizer that is not a
//! `mailto:` address, fails the whole item.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use icalendar::{
    DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};
use tracing::warn;

use crate::error::{CalDavError, CalDavResult};
use crate::event::{Alarm, AlarmAction, Event, EventStatus, Organizer};

/// Something the parser had to leave out of the resulting [`Event`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParseDiagnostic {
    /// Component or property name, e.g. `VALARM`
    pub component: String,
    pub reason: String,
}

/// A decoded event plus everything that was skipped while decoding it.
#[derive(Debug, Clone)]
pub struct ParsedEvent {
    pub event: Event,
    pub skipped: Vec<ParseDiagnostic>,
}

/// Parse ICS content into an Event.
pub fn parse_event(content: &str) -> CalDavResult<ParsedEvent> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded)
        .map_err(|e| CalDavError::MalformedResponse(format!("unparseable content: {e}")))?;
    let vevent = find_vevent(&calendar.components).ok_or_else(|| {
        CalDavError::MalformedResponse("unparseable content: no VEVENT component".into())
    })?;

    let mut skipped = Vec::new();

    let uid = required_prop(vevent, "UID")?.val.to_string();
    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string())
        .unwrap_or_default();
    let start = parse_instant(required_prop(vevent, "DTSTART")?, &mut skipped)?;
    let end = parse_instant(required_prop(vevent, "DTEND")?, &mut skipped)?;
    let location = vevent.find_prop("LOCATION").map(|p| p.val.to_string());

    let status = match vevent.find_prop("STATUS") {
        Some(prop) => match EventStatus::from_str(prop.val.as_ref()) {
            Ok(status) => Some(status),
            Err(_) => {
                skip(&mut skipped, "STATUS", format!("unknown value '{}'", prop.val.as_ref()));
                None
            }
        },
        None => None,
    };

    let organizer = vevent.find_prop("ORGANIZER").map(parse_organizer).transpose()?;

    let alarms = vevent
        .components
        .iter()
        .filter(|c| c.name == "VALARM")
        .filter_map(|alarm| match parse_alarm(alarm) {
            Ok(alarm) => Some(alarm),
            Err(reason) => {
                skip(&mut skipped, "VALARM", reason);
                None
            }
        })
        .collect();

    Ok(ParsedEvent {
        event: Event {
            uid,
            start,
            end,
            summary,
            status,
            organizer,
            location,
            alarms,
            href: None,
        },
        skipped,
    })
}

fn find_vevent<'a, 'src>(components: &'a [Component<'src>]) -> Option<&'a Component<'src>> {
    components.iter().find_map(|c| {
        if c.name == "VEVENT" {
            Some(c)
        } else {
            find_vevent(&c.components)
        }
    })
}

fn required_prop<'a>(vevent: &'a Component<'_>, name: &str) -> CalDavResult<&'a Property<'a>> {
    vevent
        .find_prop(name)
        .ok_or_else(|| CalDavError::MalformedResponse(format!("unparseable content: VEVENT has no {name}")))
}

fn skip(skipped: &mut Vec<ParseDiagnostic>, component: &str, reason: String) {
    warn!(component, %reason, "skipping undecodable calendar data");
    skipped.push(ParseDiagnostic {
        component: component.to_string(),
        reason,
    });
}

/// Resolve DTSTART/DTEND to a UTC instant.
///
/// Zoned times go through the IANA database; floating times and all-day
/// dates are read as UTC.
fn parse_instant(prop: &Property, skipped: &mut Vec<ParseDiagnostic>) -> CalDavResult<DateTime<Utc>> {
    let name = prop.name.to_string();
    let dpt = DatePerhapsTime::try_from(prop).map_err(|_| {
        CalDavError::MalformedResponse(format!(
            "unparseable content: invalid {} '{}'",
            name,
            prop.val.as_ref()
        ))
    })?;

    let instant = match dpt {
        DatePerhapsTime::Date(d) => d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => Some(dt),
            icalendar::CalendarDateTime::Floating(naive) => Some(naive.and_utc()),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => {
                match chrono_tz::Tz::from_str(&tzid) {
                    Ok(tz) => tz
                        .from_local_datetime(&date_time)
                        .earliest()
                        .map(|dt| dt.with_timezone(&Utc)),
                    Err(_) => {
                        skip(skipped, &name, format!("unknown TZID '{tzid}', read as UTC"));
                        Some(date_time.and_utc())
                    }
                }
            }
        },
    };

    instant.ok_or_else(|| {
        CalDavError::MalformedResponse(format!(
            "unparseable content: {} '{}' does not exist",
            name,
            prop.val.as_ref()
        ))
    })
}

/// Parse ORGANIZER. Anything but a `mailto:` address is a server-side defect.
fn parse_organizer(prop: &Property) -> CalDavResult<Organizer> {
    let value = prop.val.as_ref();
    let email = strip_scheme(value, "mailto:").ok_or_else(|| {
        CalDavError::MalformedResponse(format!("ORGANIZER '{value}' is not a mailto: address"))
    })?;

    let common_name = prop
        .params
        .iter()
        .find(|p| p.key == "CN")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    Ok(Organizer {
        email: email.to_string(),
        common_name,
    })
}

/// Parse one VALARM. The error is the reason the alarm was dropped.
fn parse_alarm(alarm: &Component) -> Result<Alarm, String> {
    let action = alarm
        .find_prop("ACTION")
        .map(|p| AlarmAction::from_ics_str(p.val.as_ref()))
        .ok_or_else(|| "missing ACTION".to_string())?;

    let trigger = alarm
        .find_prop("TRIGGER")
        .ok_or_else(|| "missing TRIGGER".to_string())?;
    let trigger = parse_absolute_trigger(trigger)?;

    // Only decode the attendee when its scheme matches the action
    let attendee = action.scheme().and_then(|scheme| {
        alarm
            .find_prop("ATTENDEE")
            .and_then(|p| strip_scheme(p.val.as_ref(), scheme))
            .map(str::to_string)
    });

    Ok(Alarm {
        action,
        attendee,
        trigger,
        summary: alarm.find_prop("SUMMARY").map(|p| p.val.to_string()),
        description: alarm.find_prop("DESCRIPTION").map(|p| p.val.to_string()),
        subject: alarm.find_prop("X-SUBJECT").map(|p| p.val.to_string()),
    })
}

/// Only absolute (`VALUE=DATE-TIME`) UTC triggers can be represented.
fn parse_absolute_trigger(prop: &Property) -> Result<DateTime<Utc>, String> {
    let value = prop.val.as_ref().trim();
    let is_duration = value.starts_with(['-', '+', 'P']);
    if is_duration {
        return Err(format!("relative TRIGGER '{value}' is not supported"));
    }

    value
        .strip_suffix('Z')
        .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S").ok())
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("TRIGGER '{value}' is not an absolute UTC time"))
}

/// Strip a URI scheme (ASCII case-insensitive), returning None on mismatch.
fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let prefix = value.get(..scheme.len())?;
    prefix
        .eq_ignore_ascii_case(scheme)
        .then(|| &value[scheme.len()..])
}
