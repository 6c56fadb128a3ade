//! Structured calendar items.
//!
//! Events and alarms are plain values: they are built fresh on every
//! list/get/create call and never mutated by the client.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalDavError;

/// A calendar event (one VEVENT)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub uid: String,
    /// Whole-second precision survives the wire; anything finer is dropped.
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
    pub status: Option<EventStatus>,
    pub organizer: Option<Organizer>,
    pub location: Option<String>,
    /// Reminders, in insertion order
    pub alarms: Vec<Alarm>,
    /// Resource locator, set only on events materialized from the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl Event {
    /// Create a new event with a freshly generated UID.
    pub fn new(summary: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Event {
            uid: uuid::Uuid::new_v4().to_string(),
            start,
            end,
            summary: summary.into(),
            status: None,
            organizer: None,
            location: None,
            alarms: Vec::new(),
            href: None,
        }
    }
}

/// Event organizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organizer {
    pub email: String,
    /// Display name (CN parameter)
    pub common_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Tentative,
    Confirmed,
    Canceled,
}

impl EventStatus {
    /// Value written to the STATUS property (RFC 5545 spelling).
    pub fn as_ics_str(&self) -> &'static str {
        match self {
            EventStatus::Tentative => "TENTATIVE",
            EventStatus::Confirmed => "CONFIRMED",
            EventStatus::Canceled => "CANCELLED",
        }
    }
}

impl FromStr for EventStatus {
    type Err = CalDavError;

    /// Accepts both the RFC spelling `CANCELLED` and `CANCELED`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TENTATIVE" => Ok(EventStatus::Tentative),
            "CONFIRMED" => Ok(EventStatus::Confirmed),
            "CANCELED" | "CANCELLED" => Ok(EventStatus::Canceled),
            other => Err(CalDavError::validation(
                "status",
                format!("'{other}' is not one of TENTATIVE, CONFIRMED, CANCELLED"),
            )),
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ics_str())
    }
}

/// A reminder attached to an event (one VALARM)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub action: AlarmAction,
    /// Contact address without its scheme prefix
    pub attendee: Option<String>,
    /// Absolute trigger time
    pub trigger: DateTime<Utc>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
}

impl Alarm {
    pub fn email(attendee: impl Into<String>, trigger: DateTime<Utc>) -> Self {
        Alarm::with_action(AlarmAction::Email, attendee, trigger)
    }

    pub fn sms(attendee: impl Into<String>, trigger: DateTime<Utc>) -> Self {
        Alarm::with_action(AlarmAction::Sms, attendee, trigger)
    }

    fn with_action(action: AlarmAction, attendee: impl Into<String>, trigger: DateTime<Utc>) -> Self {
        Alarm {
            action,
            attendee: Some(attendee.into()),
            trigger,
            summary: None,
            description: None,
            subject: None,
        }
    }
}

/// Alarm action.
///
/// Only `Email` and `Sms` can be written. Anything else the server sends
/// (e.g. `DISPLAY`) is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmAction {
    Email,
    Sms,
    Other(String),
}

impl AlarmAction {
    pub fn from_ics_str(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "EMAIL" => AlarmAction::Email,
            "SMS" => AlarmAction::Sms,
            _ => AlarmAction::Other(value.to_string()),
        }
    }

    pub fn as_ics_str(&self) -> &str {
        match self {
            AlarmAction::Email => "EMAIL",
            AlarmAction::Sms => "SMS",
            AlarmAction::Other(value) => value,
        }
    }

    /// URI scheme that addresses the attendee of this action, if any.
    pub fn scheme(&self) -> Option<&'static str> {
        match self {
            AlarmAction::Email => Some("mailto:"),
            AlarmAction::Sms => Some("sms:"),
            AlarmAction::Other(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_rejects_unknown_value() {
        let err = "FOO".parse::<EventStatus>().unwrap_err();
        assert!(err.is_validation(), "Expected validation error, got {err:?}");
        assert!(err.to_string().contains("FOO"));
        assert!(err.to_string().contains("CANCELLED"), "Got: {err}");
        assert_eq!(EventStatus::Canceled.to_string(), "CANCELLED");
    }

    #[test]
    fn test_status_accepts_both_cancel_spellings() {
        assert_eq!("CANCELED".parse::<EventStatus>().unwrap(), EventStatus::Canceled);
        assert_eq!("cancelled".parse::<EventStatus>().unwrap(), EventStatus::Canceled);
        assert_eq!("TENTATIVE".parse::<EventStatus>().unwrap(), EventStatus::Tentative);
    }

    #[test]
    fn test_alarm_action_preserves_unknown_values() {
        assert_eq!(AlarmAction::from_ics_str("email"), AlarmAction::Email);
        assert_eq!(
            AlarmAction::from_ics_str("DISPLAY"),
            AlarmAction::Other("DISPLAY".to_string())
        );
        assert_eq!(AlarmAction::Other("DISPLAY".into()).scheme(), None);
    }

    #[test]
    fn test_new_event_gets_unique_uid() {
        let now = Utc::now();
        let a = Event::new("A", now, now);
        let b = Event::new("B", now, now);
        assert_ne!(a.uid, b.uid);
        assert!(a.href.is_none());
    }
}
