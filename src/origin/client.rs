//! HTTP Origin Client
//!
//! reqwest-backed implementation of [`OriginClient`].

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::OriginClient;

// == Origin Error ==
/// Failure to obtain a body from the origin.
#[derive(Error, Debug)]
pub enum OriginError {
    /// Transport failure, timeout, non-success status or undecodable body
    #[error("{0}")]
    Request(#[from] reqwest::Error),
}

impl OriginError {
    /// Error message including every underlying cause, outermost first.
    pub fn detail(&self) -> String {
        let mut message = self.to_string();
        let mut source = StdError::source(self).and_then(|inner| inner.source());
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

// == HTTP Origin Client ==
/// Performs plain GET requests against the origin.
#[derive(Debug, Clone)]
pub struct HttpOriginClient {
    client: reqwest::Client,
}

impl HttpOriginClient {
    /// Builds a client. With `timeout` unset a hanging origin blocks only the
    /// request waiting on it.
    pub fn new(timeout: Option<Duration>) -> Result<Self, OriginError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl OriginClient for HttpOriginClient {
    async fn fetch(&self, url: &str) -> Result<String, OriginError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        debug!(url, status = %response.status(), "origin responded");

        Ok(response.text().await?)
    }
}
