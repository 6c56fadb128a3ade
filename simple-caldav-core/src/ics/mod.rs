//! ICS generation and parsing.
//!
//! This module handles reading and writing VCALENDAR/VEVENT/VALARM text
//! according to RFC 5545.

mod generate;
mod parse;

pub use generate::{format_datetime, generate_ics};
pub use parse::{ParseDiagnostic, ParsedEvent, parse_event};
