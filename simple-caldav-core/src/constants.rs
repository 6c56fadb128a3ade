//! Wire-level constants.

/// PRODID written into every generated calendar.
pub const PRODID: &str = "-//simple-caldav//EN";

/// UTC basic format (RFC 5545 "FORM #2: DATE WITH UTC TIME").
pub const ICS_DATETIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";
pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

pub const DAV_NS: &str = "DAV:";
pub const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

/// Local name of the multistatus envelope every REPORT/PROPFIND reply carries.
pub const MULTISTATUS: &str = "multistatus";
