//! End-to-end tests of the client over real HTTP against a mock server.

use chrono::{TimeZone, Utc};
use simple_caldav_core::{CalDavClient, CalDavError, Event, HttpTransport};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
   <response>
      <href>/cal/50113370.ics</href>
      <propstat>
         <prop>
            <getetag>"1"</getetag>
            <C:calendar-data>BEGIN:VCALENDAR
VERSION:2.0
BEGIN:VEVENT
UID:50113370
DTSTART:20200717T080000Z
DTEND:20200717T113000Z
SUMMARY:Work on this lib
END:VEVENT
END:VCALENDAR
</C:calendar-data>
         </prop>
         <status>HTTP/1.1 200 OK</status>
      </propstat>
   </response>
</multistatus>"#;

fn client(server: &MockServer) -> CalDavClient {
    CalDavClient::new(&format!("{}/cal/", server.uri())).expect("client")
}

#[tokio::test]
async fn test_list_events_sends_calendar_query_report() {
    let server = MockServer::start().await;
    Mock::given(method("REPORT"))
        .and(path("/cal/"))
        .and(header("Depth", "1"))
        .and(body_string_contains("calendar-data"))
        .respond_with(ResponseTemplate::new(207).set_body_string(LISTING))
        .expect(1)
        .mount(&server)
        .await;

    let events = client(&server).list_events().await.expect("listing");

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].uid, "50113370");
    assert_eq!(events[0].start, Utc.with_ymd_and_hms(2020, 7, 17, 8, 0, 0).unwrap());
}

#[tokio::test]
async fn test_server_error_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).discover_token().await.unwrap_err();
    assert!(matches!(err, CalDavError::Server { status: 502, .. }), "Got: {:?}", err);
}

#[tokio::test]
async fn test_get_missing_event_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cal/nope.ics"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client(&server).get_event("nope").await.expect("get").is_none());
}

#[tokio::test]
async fn test_create_event_puts_ics_with_guard() {
    let server = MockServer::start().await;
    let start = Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap();
    let event = Event::new("Dentist", start, start + chrono::Duration::hours(1));

    Mock::given(method("PUT"))
        .and(path(format!("/cal/{}.ics", event.uid)))
        .and(header("If-None-Match", "*"))
        .and(header("Content-Type", "text/calendar; charset=utf-8"))
        .and(body_string_contains("SUMMARY:Dentist"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"abc\""))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server).create_event(&event).await.expect("create");
    assert_eq!(outcome.etag.as_deref(), Some("\"abc\""));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Reserve a free port, then release it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let transport = HttpTransport::with_client(reqwest::Client::new());
    let client = CalDavClient::with_transport(&format!("http://{addr}/cal/"), transport).expect("client");

    let err = client.list_etags().await.unwrap_err();
    assert!(matches!(err, CalDavError::Transport(_)), "Got: {:?}", err);
}
