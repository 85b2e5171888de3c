//! Thin `reqwest` wrapper shared by the remote providers.

use std::time::Duration;

use lyricsync_core::{Error, HttpError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::debug;

const CLIENT_USER_AGENT: &str = concat!(
    "lyricsync/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/shydev/lyricsync)"
);

/// HTTP client with per-provider default headers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
}

impl HttpClient {
    /// Build a client sending `headers` on every request in addition to the
    /// lyricsync user agent.
    pub fn new(timeout: Duration, mut headers: HeaderMap) -> Result<Self> {
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { http })
    }

    /// GET `url` and return the response body.
    pub async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        debug!("GET {url} {query:?}");

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Http(HttpError::StatusError {
                status: status.as_u16(),
                message,
            }));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response body: {e}")))
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// The body is decoded regardless of the declared content type.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let body = self.get_text(url, query).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn map_send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Http(HttpError::Timeout)
    } else if e.is_connect() {
        Error::Http(HttpError::ConnectionFailed(e.to_string()))
    } else {
        Error::Network(e.to_string())
    }
}
