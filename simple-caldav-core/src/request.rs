//! Protocol message builder.
//!
//! Pure functions producing the `(method, headers, body)` triple for every
//! request the client sends. No I/O happens here.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::constants::{CALDAV_NS, CALENDAR_CONTENT_TYPE, DAV_NS, XML_CONTENT_TYPE};
use crate::ics::format_datetime;
use crate::xml::XmlElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DavMethod {
    Get,
    Put,
    Delete,
    Propfind,
    Report,
}

impl DavMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DavMethod::Get => "GET",
            DavMethod::Put => "PUT",
            DavMethod::Delete => "DELETE",
            DavMethod::Propfind => "PROPFIND",
            DavMethod::Report => "REPORT",
        }
    }
}

impl fmt::Display for DavMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request without its target.
#[derive(Debug, Clone, PartialEq)]
pub struct DavMessage {
    pub method: DavMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl DavMessage {
    fn new(method: DavMethod) -> Self {
        DavMessage {
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    fn xml_body(self, root: XmlElement) -> Self {
        let mut msg = self.header("Content-Type", XML_CONTENT_TYPE);
        msg.body = Some(root.to_document());
        msg
    }

    /// Value of the first header with this name (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Optional VEVENT time-range filter for calendar queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// calendar-query REPORT returning every item's etag and calendar data.
pub fn list_with_data(range: Option<TimeRange>) -> DavMessage {
    calendar_query(true, range)
}

/// calendar-query REPORT returning only hrefs and etags.
pub fn list_tags() -> DavMessage {
    calendar_query(false, None)
}

/// PROPFIND for the collection's display name and current sync token.
pub fn discover_token() -> DavMessage {
    let body = XmlElement::new("d:propfind")
        .attr("xmlns:d", DAV_NS)
        .child(
            XmlElement::new("d:prop")
                .child(XmlElement::new("d:displayname"))
                .child(XmlElement::new("d:sync-token")),
        );

    DavMessage::new(DavMethod::Propfind)
        .header("Depth", "0")
        .xml_body(body)
}

/// sync-collection REPORT (RFC 6578).
///
/// Without a token the `sync-token` element is sent empty, which asks for
/// a full listing plus a token for the next call.
pub fn sync_collection(token: Option<&str>) -> DavMessage {
    let mut sync_token = XmlElement::new("d:sync-token");
    if let Some(token) = token {
        sync_token = sync_token.text(token);
    }

    let body = XmlElement::new("d:sync-collection")
        .attr("xmlns:d", DAV_NS)
        .child(sync_token)
        .child(XmlElement::new("d:sync-level").text("1"))
        .child(XmlElement::new("d:prop").child(XmlElement::new("d:getetag")));

    DavMessage::new(DavMethod::Report)
        .header("Depth", "0")
        .xml_body(body)
}

/// GET of a single calendar resource.
pub fn get_resource() -> DavMessage {
    DavMessage::new(DavMethod::Get).header("Accept", "text/calendar")
}

/// PUT that must not overwrite an existing resource.
pub fn create(ics: String) -> DavMessage {
    put(ics).header("If-None-Match", "*")
}

/// PUT replacing a resource, optionally only if it still has `etag`.
pub fn update(ics: String, etag: Option<&str>) -> DavMessage {
    let msg = put(ics);
    match etag {
        Some(etag) => msg.header("If-Match", etag),
        None => msg,
    }
}

/// DELETE, optionally only if the resource still has `etag`.
pub fn delete(etag: Option<&str>) -> DavMessage {
    let msg = DavMessage::new(DavMethod::Delete);
    match etag {
        Some(etag) => msg.header("If-Match", etag),
        None => msg,
    }
}

fn put(ics: String) -> DavMessage {
    let mut msg = DavMessage::new(DavMethod::Put).header("Content-Type", CALENDAR_CONTENT_TYPE);
    msg.body = Some(ics);
    msg
}

fn calendar_query(with_data: bool, range: Option<TimeRange>) -> DavMessage {
    let mut prop = XmlElement::new("d:prop").child(XmlElement::new("d:getetag"));
    if with_data {
        prop = prop.child(XmlElement::new("c:calendar-data"));
    }

    let mut calendar_filter = XmlElement::new("c:comp-filter").attr("name", "VCALENDAR");
    if let Some(range) = range {
        calendar_filter = calendar_filter.child(
            XmlElement::new("c:comp-filter").attr("name", "VEVENT").child(
                XmlElement::new("c:time-range")
                    .attr("start", format_datetime(&range.start))
                    .attr("end", format_datetime(&range.end)),
            ),
        );
    }

    let body = XmlElement::new("c:calendar-query")
        .attr("xmlns:d", DAV_NS)
        .attr("xmlns:c", CALDAV_NS)
        .child(prop)
        .child(XmlElement::new("c:filter").child(calendar_filter));

    DavMessage::new(DavMethod::Report)
        .header("Depth", "1")
        .xml_body(body)
}
