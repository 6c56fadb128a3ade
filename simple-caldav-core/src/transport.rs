//! Transport seam between the client and the network.
//!
//! The client only needs a status code, headers and a text body back. It
//! defines no timeouts and never retries: whatever the transport reports as
//! a failure is passed through as an opaque [`TransportError`].

use std::future::Future;

use tracing::debug;
use url::Url;

use crate::error::TransportError;
use crate::request::DavMessage;

/// A message bound to its target URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DavRequest {
    pub url: Url,
    pub message: DavMessage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DavResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl DavResponse {
    /// Value of the first header with this name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Sends one request and returns the full response.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: DavRequest,
    ) -> impl Future<Output = Result<DavResponse, TransportError>> + Send;
}

/// HTTP transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_user_agent(concat!("simple-caldav/", env!("CARGO_PKG_VERSION")))
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(HttpTransport { client })
    }

    /// Use a preconfigured client (proxies, default headers, TLS roots).
    pub fn with_client(client: reqwest::Client) -> Self {
        HttpTransport { client }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: DavRequest) -> Result<DavResponse, TransportError> {
        let DavRequest { url, message } = request;
        let method = reqwest::Method::from_bytes(message.method.as_str().as_bytes())
            .map_err(TransportError::new)?;

        debug!(%method, %url, "sending CalDAV request");

        let mut builder = self.client.request(method.clone(), url.clone());
        for (name, value) in &message.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = message.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        debug!(%method, %url, status, bytes = body.len(), "received CalDAV response");

        Ok(DavResponse {
            status,
            headers,
            body,
        })
    }
}
