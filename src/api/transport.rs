//! HTTP transport for the remote API.

use crate::api::request::ApiRequest;
use crate::config::credentials::Credentials;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Longest response body kept in a [`Error::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Performs one GET and returns the response body.
///
/// Implementations classify failures into the crate's error variants but do
/// not retry; that is left to [`super::client::BesApi`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &ApiRequest) -> Result<String>;
}

/// Basic-auth HTTPS transport built on `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl HttpTransport {
    /// Builds a client for `base_url`.
    ///
    /// `ignore_ssl` accepts self-signed certificates, which root servers commonly use.
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        timeout: Duration,
        ignore_ssl: bool,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| Error::Config {
            message: format!("invalid server base_url {base_url:?}: {e}"),
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(ignore_ssl)
            .build()
            .map_err(|source| Error::Transport {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }
}

fn classify(url: &Url, source: reqwest::Error) -> Error {
    if source.is_timeout() {
        Error::Timeout {
            url: url.to_string(),
        }
    } else {
        Error::Transport {
            url: url.to_string(),
            source,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(request = %request))]
    async fn get(&self, request: &ApiRequest) -> Result<String> {
        let url = request.url(&self.base_url)?;
        let response = self
            .client
            .get(url.clone())
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|e| classify(&url, e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| classify(&url, e))?;
        debug!("{} answered {} ({} bytes)", request, status, body.len());

        if !status.is_success() {
            let body = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
