//! Splunk management API client.
//!
//! This module provides the HTTP client used for every call against the
//! management port: form-encoded POSTs for writes and JSON GETs for reads.

use reqwest::{header, Client, Url};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::trace;

use crate::error::{ApplyError, Result, SplunkConfError};

use super::types::RemoteResponse;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connection timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Query parameter asking Splunk for JSON instead of Atom XML.
const JSON_OUTPUT: (&str, &str) = ("output_mode", "json");

/// Transport settings of the client.
#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Whether TLS certificates are verified.
    pub verify_tls: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verify_tls: false,
        }
    }
}

/// Splunk management API client.
#[derive(Debug, Clone)]
pub struct SplunkClient {
    /// HTTP client.
    client: Client,
    /// Bearer token.
    token: String,
}

impl SplunkClient {
    /// Creates a new client with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_settings(token, ClientSettings::default())
    }

    /// Creates a client with custom transport settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_settings(token: &str, settings: ClientSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .danger_accept_invalid_certs(!settings.verify_tls)
            .build()
            .map_err(|e| SplunkConfError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.to_string(),
        })
    }

    /// Posts form-encoded settings to a URL.
    ///
    /// # Errors
    ///
    /// Returns a transport error if no response was received.
    pub async fn post_form(
        &self,
        url: Url,
        form: &BTreeMap<String, String>,
    ) -> std::result::Result<RemoteResponse, ApplyError> {
        trace!("POST {url} ({} field(s))", form.len());

        let response = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .form(form)
            .send()
            .await
            .map_err(|e| ApplyError::transport(format!("Request failed: {e}")))?;

        Self::collect(response).await
    }

    /// Reads a resource as JSON.
    ///
    /// # Errors
    ///
    /// Returns a transport error if no response was received.
    pub async fn get_json(&self, url: Url) -> std::result::Result<RemoteResponse, ApplyError> {
        trace!("GET {url}");

        let response = self
            .client
            .get(url)
            .query(&[JSON_OUTPUT])
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| ApplyError::transport(format!("Request failed: {e}")))?;

        Self::collect(response).await
    }

    async fn collect(response: reqwest::Response) -> std::result::Result<RemoteResponse, ApplyError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApplyError::transport(format!("Failed to read response body: {e}")))?;

        Ok(RemoteResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_post_form_sends_bearer_and_form_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/servicesNS/nobody/search/configs/conf-macros/m"))
            .and(header("authorization", "Bearer secret"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("definition=index%3Dmain"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = SplunkClient::new("secret").unwrap();
        let url = Url::parse(&format!(
            "{}/servicesNS/nobody/search/configs/conf-macros/m",
            server.uri()
        ))
        .unwrap();
        let form = BTreeMap::from([(String::from("definition"), String::from("index=main"))]);

        let response = client.post_form(url, &form).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "ok");
    }

    #[tokio::test]
    async fn test_get_json_adds_output_mode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/shcluster/captain/info"))
            .and(query_param("output_mode", "json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = SplunkClient::new("secret").unwrap();
        let url = Url::parse(&format!("{}/services/shcluster/captain/info", server.uri())).unwrap();

        let response = client.get_json(url).await.unwrap();
        assert_eq!(response.status, 503);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let client = SplunkClient::new("secret").unwrap();
        let url = Url::parse("http://127.0.0.1:1/services/server/info").unwrap();

        let err = client.get_json(url).await.unwrap_err();
        assert!(err.is_transport());
    }
}
