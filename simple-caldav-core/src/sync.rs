//! Sync-token discovery and incremental collection sync (RFC 6578).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::CalDavClient;
use crate::error::{CalDavError, CalDavResult};
use crate::request;
use crate::transport::Transport;
use crate::xml::{Instruction, Projection, parse_document, project};

static STATUS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"HTTP/\d\.\d (\d{3})").expect("status line pattern is valid"));

/// The collection's current revision token and label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub sync_token: String,
    pub display_name: String,
}

/// One changed (or removed) resource since the previous token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncItem {
    pub href: String,
    pub status_code: u16,
    /// Present only for rows with status 200
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Changes since a token, plus the token to present next time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub sync_token: String,
    pub collection: Vec<SyncItem>,
}

impl<T: Transport> CalDavClient<T> {
    /// Fetch the collection's sync token and display name.
    pub async fn discover_token(&self) -> CalDavResult<TokenInfo> {
        let response = self
            .send(self.url().clone(), request::discover_token(), "discover sync token")
            .await?;
        let doc = parse_document(&response.body)?;
        let projection = project(
            &doc,
            &Instruction::new()
                .field("display_name", "//*[local-name()='displayname']/text()")?
                .field("sync_token", "//*[local-name()='sync-token']/text()")?,
        )?;

        Ok(TokenInfo {
            sync_token: required(&projection, "sync_token")?,
            display_name: required(&projection, "display_name")?,
        })
    }

    /// Report what changed since `token`, or everything when `token` is `None`.
    ///
    /// Store the returned `sync_token` and pass it to the next call.
    pub async fn sync_collection(&self, token: Option<&str>) -> CalDavResult<SyncResult> {
        let response = self
            .send(self.url().clone(), request::sync_collection(token), "sync collection")
            .await?;

        if response.body.trim().is_empty() {
            let sync_token = token.map(str::to_string).ok_or_else(|| {
                CalDavError::MalformedResponse(
                    "empty sync response and no previous sync_token to keep".into(),
                )
            })?;
            debug!("sync response empty, collection unchanged");
            return Ok(SyncResult {
                sync_token,
                collection: Vec::new(),
            });
        }

        let doc = parse_document(&response.body)?;
        let projection = project(
            &doc,
            &Instruction::new()
                .field("sync_token", "//*[local-name()='sync-token']/text()")?
                .field("href", "//*[local-name()='response']/*[local-name()='href']/text()")?
                .field("etag", "//*[local-name()='getetag']/text()")?
                .field("status", "//*[local-name()='response']//*[local-name()='status']/text()")?,
        )?;

        let sync_token = match projection.first("sync_token") {
            Some(fresh) => fresh.trim().to_string(),
            None => match token {
                Some(previous) => {
                    warn!("sync response carries no sync-token, keeping the previous one");
                    previous.to_string()
                }
                None => return Err(missing("sync_token")),
            },
        };

        let collection = reconcile(
            projection.values("href"),
            projection.values("etag"),
            projection.values("status"),
        )?;
        debug!(changes = collection.len(), "synced collection");

        Ok(SyncResult {
            sync_token,
            collection,
        })
    }
}

/// Pair the flat href, etag and status sequences of a sync response into rows.
///
/// Removed resources report an href and a status but no etag, so the three
/// sequences differ in length and cannot share an index. Each one is walked by
/// its own counter instead:
///
/// - the walk continues while an unread href/etag pair remains, or an unread
///   status remains;
/// - every row consumes exactly one href;
/// - every row consumes the next status, when one is left; a row without a
///   status is read as 200;
/// - a row consumes the next etag only when its status is 200 and an etag is
///   left.
///
/// Values are trimmed. A status that does not contain `HTTP/x.y NNN`, or a
/// row with no href left to consume, is a malformed response.
pub fn reconcile(hrefs: &[String], etags: &[String], statuses: &[String]) -> CalDavResult<Vec<SyncItem>> {
    let (mut h, mut e, mut s) = (0, 0, 0);
    let mut rows = Vec::new();

    while (h < hrefs.len() && e < etags.len()) || s < statuses.len() {
        let href = hrefs.get(h).ok_or_else(|| {
            CalDavError::MalformedResponse(format!("sync status row {} has no href", s + 1))
        })?;
        h += 1;

        let status_code = match statuses.get(s) {
            Some(line) => {
                s += 1;
                parse_status_line(line)?
            }
            None => 200,
        };

        let etag = if status_code == 200 && e < etags.len() {
            e += 1;
            Some(etags[e - 1].trim().to_string())
        } else {
            None
        };

        rows.push(SyncItem {
            href: href.trim().to_string(),
            status_code,
            etag,
        });
    }

    Ok(rows)
}

fn parse_status_line(line: &str) -> CalDavResult<u16> {
    STATUS_LINE
        .captures(line)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| CalDavError::MalformedResponse(format!("unrecognized status line '{}'", line.trim())))
}

fn required(projection: &Projection, field: &str) -> CalDavResult<String> {
    projection
        .first(field)
        .map(|v| v.trim().to_string())
        .ok_or_else(|| missing(field))
}

fn missing(field: &str) -> CalDavError {
    CalDavError::MalformedResponse(format!("response has no {field}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::FakeTransport;
    use crate::request::DavMethod;

    const COLLECTION: &str = "https://dav.example.com/calendars/me/personal/";

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn client(transport: FakeTransport) -> CalDavClient<FakeTransport> {
        CalDavClient::with_transport(COLLECTION, transport).unwrap()
    }

    const PROPFIND: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/calendars/me/personal/</d:href>
    <d:propstat>
      <d:prop>
        <d:displayname>Personal</d:displayname>
        <d:sync-token>http://radicale.org/ns/sync/7a1b</d:sync-token>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    const DELTA: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/calendars/me/personal/h1.ics</D:href>
    <D:propstat>
      <D:prop><D:getetag>"e1"</D:getetag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/calendars/me/personal/h2.ics</D:href>
    <D:status>HTTP/1.1 404 Not Found</D:status>
  </D:response>
  <D:sync-token>http://radicale.org/ns/sync/8c2d</D:sync-token>
</D:multistatus>"#;

    #[test]
    fn test_reconcile_removed_item_has_no_etag() {
        let rows = reconcile(
            &strings(&["h1", "h2"]),
            &strings(&["e1"]),
            &strings(&["HTTP/1.1 200 OK", "HTTP/1.1 404 Not Found"]),
        )
        .unwrap();

        assert_eq!(
            rows,
            vec![
                SyncItem {
                    href: "h1".into(),
                    status_code: 200,
                    etag: Some("e1".into())
                },
                SyncItem {
                    href: "h2".into(),
                    status_code: 404,
                    etag: None
                },
            ]
        );
    }

    #[test]
    fn test_reconcile_removed_item_first() {
        let rows = reconcile(
            &strings(&["gone", "kept"]),
            &strings(&["e-kept"]),
            &strings(&["HTTP/1.1 404 Not Found", "HTTP/1.1 200 OK"]),
        )
        .unwrap();

        assert_eq!(rows[0].etag, None);
        assert_eq!(rows[1].etag.as_deref(), Some("e-kept"));
    }

    #[test]
    fn test_reconcile_row_without_status_reads_as_ok() {
        let rows = reconcile(
            &strings(&["h1", "h2"]),
            &strings(&["e1", "e2"]),
            &strings(&["HTTP/1.1 200 OK"]),
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].href, "h2");
        assert_eq!(rows[1].status_code, 200);
        assert_eq!(rows[1].etag.as_deref(), Some("e2"));
    }

    #[test]
    fn test_reconcile_empty() {
        assert!(reconcile(&[], &[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_reconcile_bad_status_line() {
        let err = reconcile(&strings(&["h1"]), &[], &strings(&["gone"])).unwrap_err();
        assert!(err.is_malformed_response());
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_reconcile_status_without_href() {
        let err = reconcile(&[], &[], &strings(&["HTTP/1.1 200 OK"])).unwrap_err();
        assert!(err.is_malformed_response());
    }

    #[tokio::test]
    async fn test_discover_token() {
        let client = client(FakeTransport::default().respond(207, PROPFIND));

        let info = client.discover_token().await.unwrap();
        assert_eq!(info.sync_token, "http://radicale.org/ns/sync/7a1b");
        assert_eq!(info.display_name, "Personal");
        assert_eq!(client_last_method(&client), DavMethod::Propfind);
    }

    #[tokio::test]
    async fn test_discover_token_is_idempotent() {
        let client = client(FakeTransport::default().respond(207, PROPFIND).respond(207, PROPFIND));

        let first = client.discover_token().await.unwrap();
        let second = client.discover_token().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_discover_token_missing_field() {
        let body = r#"<d:multistatus xmlns:d="DAV:"><d:response><d:propstat><d:prop>
            <d:displayname>Personal</d:displayname></d:prop></d:propstat></d:response></d:multistatus>"#;
        let client = client(FakeTransport::default().respond(207, body));

        let err = client.discover_token().await.unwrap_err();
        assert!(err.is_malformed_response());
        assert!(err.to_string().contains("sync_token"), "Got: {}", err);
    }

    #[tokio::test]
    async fn test_sync_collection_delta() {
        let client = client(FakeTransport::default().respond(207, DELTA));

        let result = client
            .sync_collection(Some("http://radicale.org/ns/sync/7a1b"))
            .await
            .unwrap();

        assert_eq!(result.sync_token, "http://radicale.org/ns/sync/8c2d");
        assert_eq!(result.collection.len(), 2);
        assert_eq!(result.collection[0].href, "/calendars/me/personal/h1.ics");
        assert_eq!(result.collection[0].etag.as_deref(), Some("\"e1\""));
        assert_eq!(result.collection[1].status_code, 404);
        assert_eq!(result.collection[1].etag, None);
    }

    #[tokio::test]
    async fn test_sync_collection_no_changes() {
        let body = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:"><d:sync-token>tok-2</d:sync-token></d:multistatus>"#;
        let client = client(FakeTransport::default().respond(207, body));

        let result = client.sync_collection(Some("tok-1")).await.unwrap();
        assert!(result.collection.is_empty());
        assert_eq!(result.sync_token, "tok-2");
    }

    #[tokio::test]
    async fn test_sync_collection_reply_without_token_keeps_previous() {
        let body = DELTA.replace("<D:sync-token>http://radicale.org/ns/sync/8c2d</D:sync-token>", "");
        let client = client(FakeTransport::default().respond(207, &body).respond(207, &body));

        let result = client.sync_collection(Some("tok-1")).await.unwrap();
        assert_eq!(result.sync_token, "tok-1");
        assert_eq!(result.collection.len(), 2);

        let err = client.sync_collection(None).await.unwrap_err();
        assert!(err.is_malformed_response());
        assert!(err.to_string().contains("sync_token"), "Got: {}", err);
    }

    #[tokio::test]
    async fn test_sync_collection_empty_body_keeps_token() {
        let client = client(FakeTransport::default().respond(207, "").respond(207, "  "));

        let result = client.sync_collection(Some("tok-1")).await.unwrap();
        assert_eq!(result.sync_token, "tok-1");
        assert!(result.collection.is_empty());

        let err = client.sync_collection(None).await.unwrap_err();
        assert!(err.is_malformed_response());
    }

    #[tokio::test]
    async fn test_sync_collection_server_error_not_retried() {
        let client = client(FakeTransport::default().respond(500, "boom"));

        let err = client.sync_collection(None).await.unwrap_err();
        assert!(matches!(err, CalDavError::Server { status: 500, .. }));
    }

    fn client_last_method(client: &CalDavClient<FakeTransport>) -> DavMethod {
        client.transport().last_request().message.method
    }
}
