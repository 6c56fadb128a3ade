//! CalDAV client bound to a single calendar collection.
//!
//! Every public operation is exactly one request. The client holds only the
//! collection URL and the transport, so it can be shared and called
//! concurrently without locking. Writes are not serialized: the
//! `If-None-Match: *` guard on create, enforced by the server, is the only
//! protection against concurrent creators.

use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{CalDavError, CalDavResult};
use crate::event::Event;
use crate::ics::{generate_ics, parse_event};
use crate::request::{self, DavMessage, TimeRange};
use crate::transport::{DavRequest, DavResponse, HttpTransport, Transport};
use crate::xml::{Instruction, parse_document, project_items};

const RESPONSE_ITEMS: &str = "//*[local-name()='response']";

/// A resource locator with its current revision tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceTag {
    pub href: String,
    pub etag: String,
}

/// Where a write landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub href: String,
    /// New revision tag, when the server reports one
    pub etag: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CalDavClient<T = HttpTransport> {
    collection: Url,
    transport: T,
}

impl CalDavClient<HttpTransport> {
    pub fn new(collection_url: &str) -> CalDavResult<Self> {
        let transport = HttpTransport::new()?;
        Self::with_transport(collection_url, transport)
    }

    pub fn from_config(config: &ClientConfig) -> CalDavResult<Self> {
        let transport = match config.user_agent.as_deref() {
            Some(user_agent) => HttpTransport::with_user_agent(user_agent)?,
            None => HttpTransport::new()?,
        };
        Self::with_transport(config.require_url()?, transport)
    }
}

impl<T: Transport> CalDavClient<T> {
    pub fn with_transport(collection_url: &str, transport: T) -> CalDavResult<Self> {
        let mut collection = Url::parse(collection_url)?;
        if collection.cannot_be_a_base() || !matches!(collection.scheme(), "http" | "https") {
            return Err(CalDavError::Config(format!(
                "'{collection_url}' is not an http(s) collection URL"
            )));
        }
        // Collections are directories; joining relative hrefs depends on it
        if !collection.path().ends_with('/') {
            let path = format!("{}/", collection.path());
            collection.set_path(&path);
        }

        Ok(CalDavClient {
            collection,
            transport,
        })
    }

    pub fn url(&self) -> &Url {
        &self.collection
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// List every event in the collection.
    ///
    /// Calendar data that is dropped while decoding (relative alarm triggers,
    /// unknown statuses or TZIDs) is only logged at `warn` level here. Use
    /// [`parse_event`](crate::ics::parse_event) on raw data to get the
    /// diagnostics as values.
    pub async fn list_events(&self) -> CalDavResult<Vec<Event>> {
        self.query_events(None).await
    }

    /// List events overlapping `[start, end)` using a server-side time-range filter.
    pub async fn list_events_in_range(&self, range: TimeRange) -> CalDavResult<Vec<Event>> {
        self.query_events(Some(range)).await
    }

    /// List hrefs and etags without downloading calendar data.
    pub async fn list_etags(&self) -> CalDavResult<Vec<ResourceTag>> {
        let response = self
            .send(self.collection.clone(), request::list_tags(), "list etags")
            .await?;
        let doc = parse_document(&response.body)?;
        let instruction = Instruction::new()
            .field("href", "./*[local-name()='href']/text()")?
            .field("etag", ".//*[local-name()='getetag']/text()")?;

        let tags = project_items(&doc, RESPONSE_ITEMS, &instruction)?
            .into_iter()
            .filter_map(|item| {
                let href = item.first("href")?.trim().to_string();
                let etag = item.first("etag")?.trim().to_string();
                Some(ResourceTag { href, etag })
            })
            .collect();

        Ok(tags)
    }

    /// Fetch one event by UID. A missing resource is `None`.
    ///
    /// Decoding diagnostics are logged, not returned, as for [`Self::list_events`].
    pub async fn get_event(&self, uid: &str) -> CalDavResult<Option<Event>> {
        let url = self.resource_url(uid)?;
        let response = self
            .transport
            .send(DavRequest {
                url: url.clone(),
                message: request::get_resource(),
            })
            .await?;

        if response.status == 404 {
            return Ok(None);
        }
        check_status(&response, "get event")?;

        let mut event = parse_event(&response.body)?.event;
        event.href = Some(url.path().to_string());
        Ok(Some(event))
    }

    /// Create a new event. Fails if a resource with the same UID already exists.
    pub async fn create_event(&self, event: &Event) -> CalDavResult<WriteOutcome> {
        let ics = generate_ics(event)?;
        let url = self.resource_url(&event.uid)?;
        self.write(url, request::create(ics), "create event").await
    }

    /// Replace an existing event, at its `href` when known.
    ///
    /// With `etag`, the server rejects the write if the event changed since.
    pub async fn update_event(&self, event: &Event, etag: Option<&str>) -> CalDavResult<WriteOutcome> {
        let ics = generate_ics(event)?;
        let url = match event.href.as_deref() {
            Some(href) => self.href_url(href)?,
            None => self.resource_url(&event.uid)?,
        };
        self.write(url, request::update(ics, etag), "update event").await
    }

    pub async fn delete_event(&self, href: &str, etag: Option<&str>) -> CalDavResult<()> {
        let url = self.href_url(href)?;
        self.send(url, request::delete(etag), "delete event").await?;
        Ok(())
    }

    async fn query_events(&self, range: Option<TimeRange>) -> CalDavResult<Vec<Event>> {
        let response = self
            .send(self.collection.clone(), request::list_with_data(range), "list events")
            .await?;
        let doc = parse_document(&response.body)?;
        let instruction = Instruction::new()
            .field("href", "./*[local-name()='href']/text()")?
            .field("data", ".//*[local-name()='calendar-data']/text()")?;

        let mut events = Vec::new();
        for item in project_items(&doc, RESPONSE_ITEMS, &instruction)? {
            // The collection itself and non-event resources carry no data
            let Some(data) = item.first("data") else {
                continue;
            };
            let mut event = parse_event(data)?.event;
            event.href = item.first("href").map(|h| h.trim().to_string());
            events.push(event);
        }

        debug!(count = events.len(), "listed events");
        Ok(events)
    }

    async fn write(&self, url: Url, message: DavMessage, operation: &'static str) -> CalDavResult<WriteOutcome> {
        let href = url.path().to_string();
        let response = self.send(url, message, operation).await?;
        Ok(WriteOutcome {
            href,
            etag: response.header("ETag").map(str::to_string),
        })
    }

    /// Send and classify the status. Only 2xx replies are returned.
    pub(crate) async fn send(
        &self,
        url: Url,
        message: DavMessage,
        operation: &'static str,
    ) -> CalDavResult<DavResponse> {
        let response = self.transport.send(DavRequest { url, message }).await?;
        check_status(&response, operation)?;
        Ok(response)
    }

    /// Resolve a server href against the collection.
    ///
    /// The result must be a resource strictly inside the collection: the
    /// collection itself, its parents and other hosts are rejected.
    fn href_url(&self, href: &str) -> CalDavResult<Url> {
        let url = self.collection.join(href.trim())?;
        let inside = url.origin() == self.collection.origin()
            && url.path().len() > self.collection.path().len()
            && url.path().starts_with(self.collection.path());
        if !inside {
            return Err(CalDavError::validation(
                "href",
                format!("'{href}' is not a resource inside {}", self.collection),
            ));
        }
        Ok(url)
    }

    /// `{collection}/{uid}.ics`, with the UID percent-encoded as one segment.
    fn resource_url(&self, uid: &str) -> CalDavResult<Url> {
        if uid.trim().is_empty() {
            return Err(CalDavError::validation("uid", "must not be empty"));
        }
        let mut url = self.collection.clone();
        url.path_segments_mut()
            .map_err(|_| CalDavError::Config(format!("'{}' cannot hold resources", self.collection)))?
            .pop_if_empty()
            .push(&format!("{uid}.ics"));
        Ok(url)
    }
}

fn check_status(response: &DavResponse, operation: &'static str) -> CalDavResult<()> {
    if response.is_server_error() {
        return Err(CalDavError::Server {
            status: response.status,
            operation,
        });
    }
    if !response.is_success() {
        return Err(CalDavError::UnexpectedStatus {
            status: response.status,
            operation,
        });
    }
    Ok(())
}
