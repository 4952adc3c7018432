//! HTTP utilities for web-API inventory sources.
//!
//! Wraps `reqwest` with per-call timeouts, Basic authentication and a mapping
//! of transport failures and non-success statuses onto [`SourceError`]. Calls
//! are issued exactly once; nothing is retried within one invocation.

use crate::secure_string::SecureString;
use crate::traits::{SourceError, SourceResult};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Authentication applied to every request.
#[derive(Debug, Clone)]
pub enum HttpAuth {
    None,
    Basic {
        username: String,
        password: SecureString,
    },
}

/// Settings for one [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL that request paths are appended to.
    pub base_url: String,
    pub auth: HttpAuth,
    /// Timeout applied to each call independently.
    pub timeout: Duration,
}

/// HTTP client bound to one base URL.
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> SourceResult<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| SourceError::ConfigurationMissing(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Builds a URL from a path.
    pub fn build_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Executes a GET request with query parameters.
    ///
    /// Any non-2xx status is returned as [`SourceError::UnexpectedStatus`].
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> SourceResult<Response> {
        let url = self.build_url(path);
        debug!(url = %url, "GET");

        let mut request = self.client.get(&url).query(query);
        if let HttpAuth::Basic { username, password } = &self.config.auth {
            request = request.basic_auth(username, Some(password.expose_secret()));
        }

        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(response)
    }

    /// Executes a GET request and deserializes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> SourceResult<T> {
        let response = self.get(path, query).await?;
        parse_json_response(response).await
    }
}

fn map_transport_error(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout(e.to_string())
    } else {
        SourceError::Transport(e.to_string())
    }
}

async fn parse_json_response<T: DeserializeOwned>(response: Response) -> SourceResult<T> {
    let status = response.status();
    let text = response.text().await.map_err(map_transport_error)?;

    serde_json::from_str(&text).map_err(|e| {
        SourceError::DataFormat(format!(
            "Failed to parse response (status {}): {} - Body: {}",
            status,
            e,
            text.chars().take(200).collect::<String>()
        ))
    })
}
