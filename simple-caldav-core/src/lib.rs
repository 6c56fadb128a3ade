//! Client library for CalDAV calendar collections.
//!
//! This crate provides:
//! - `Event` and related types for calendar events
//! - `ics` module for reading and writing VCALENDAR text
//! - `xml` module for building request bodies and projecting multistatus replies
//! - `CalDavClient` for listing, fetching, writing and syncing a collection
//!
//! ```no_run
//! # async fn run() -> simple_caldav_core::CalDavResult<()> {
//! use simple_caldav_core::CalDavClient;
//!
//! let client = CalDavClient::new("https://dav.example.com/calendars/me/personal/")?;
//! let first = client.sync_collection(None).await?;
//! // Later: only what changed since the stored token
//! let delta = client.sync_collection(Some(&first.sync_token)).await?;
//! # let _ = delta;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ics;
pub mod request;
pub mod sync;
pub mod transport;
pub mod xml;

pub use client::{CalDavClient, ResourceTag, WriteOutcome};
pub use config::ClientConfig;
pub use error::{CalDavError, CalDavResult, TransportError};
pub use event::*;
pub use request::TimeRange;
pub use sync::{SyncItem, SyncResult, TokenInfo};
pub use transport::{DavRequest, DavResponse, HttpTransport, Transport};
