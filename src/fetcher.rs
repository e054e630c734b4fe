//! HTTP fetch capability
//!
//! This module defines the narrow `Fetcher` interface the extractor and the
//! thumbnail cache talk to, and a blocking reqwest implementation of it.

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// Default timeout applied to every request issued by `HttpFetcher`
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while fetching a remote resource
///
/// Only transport-level failures are represented here. A response with an
/// unexpected status code is still a successful fetch; callers inspect
/// `FetchResponse::status` themselves.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Failed to construct the HTTP client
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be completed (DNS, connect, TLS, timeout, body read)
    #[error("Failed to fetch {url}: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },
}

/// A fully read HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Returns true for 2xx status codes
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Capability for issuing GET requests
///
/// Implementors only need to report transport failures as errors; any
/// response that arrives, whatever its status, is returned as `Ok`.
pub trait Fetcher {
    /// Fetches the given URL and returns the complete response
    fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        (**self).get(url)
    }
}

/// Blocking HTTP fetcher backed by reqwest
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default timeout
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a fetcher whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("libsyn_media/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| FetchError::Transport {
            url: url.to_string(),
            source: e,
        })?;

        debug!(status, bytes = body.len(), "Fetched resource");

        Ok(FetchResponse {
            status,
            body: body.to_vec(),
        })
    }
}
