//! The HTTP transport capability.
//!
//! The orchestrator prepares fully signed requests and hands them to a
//! [`StorageTransport`] for execution. Keeping the transport behind a trait
//! keeps the protocol logic independent of any HTTP client and lets tests
//! feed canned responses through the same code path as production traffic.
//!
//! The transport applies no timeout or retry policy of its own; both belong
//! to the underlying client's configuration.

use async_trait::async_trait;
use bytes::Bytes;
use concentriq_s3_auth::Method;

/// One prepared request against the image store.
#[derive(Debug, Clone)]
pub struct StorageRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute target URL (scheme, host, and object path).
    pub url: String,
    /// Query parameters, in the order they were signed.
    pub query: Vec<(String, String)>,
    /// Request headers, authorization included.
    pub headers: Vec<(String, String)>,
    /// Request body, if the phase carries one.
    pub body: Option<Bytes>,
}

/// The response to a [`StorageRequest`].
#[derive(Debug, Clone)]
pub struct StorageResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Bytes,
}

impl StorageResponse {
    /// Look up a response header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the status code is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability that executes one prepared HTTP request.
#[async_trait]
pub trait StorageTransport: Send + Sync {
    /// Execute the request and return the raw response.
    ///
    /// # Errors
    ///
    /// Implementations surface connection-level failures here; HTTP error
    /// statuses are returned as ordinary responses for the protocol layer to
    /// judge.
    async fn execute(&self, request: StorageRequest) -> anyhow::Result<StorageResponse>;
}

/// The production transport, backed by [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport over an existing client, inheriting its TLS and
    /// timeout configuration.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StorageTransport for HttpTransport {
    async fn execute(&self, request: StorageRequest) -> anyhow::Result<StorageResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
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
                    .map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        let body = response.bytes().await?;

        Ok(StorageResponse {
            status,
            headers,
            body,
        })
    }
}
