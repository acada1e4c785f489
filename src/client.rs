//! HTTP transport for OpenAI-compatible completion servers.

use std::env;
use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use futures::stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};

use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_ERRORS, CLIENT_REQUEST_RETRIES, CLIENT_REQUESTS, CLIENT_RETRY_BACKOFF,
};
use crate::sse::decode_deltas;
use crate::types::{ChatCompletionParams, ModelListResponse};

/// Environment variable consulted for the default base URL.
const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Fallback base URL for a locally served backend.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/v1";

/// Retries for idempotent GET requests. The streaming POST is never
/// retried; its side effects have already fired server-side.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base unit for exponential retry backoff (1s, 2s, 4s).
const RETRY_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Per-request timeouts for the three request kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    /// Health probe (models listing used as a liveness check).
    pub health: Duration,
    /// Model catalog listing.
    pub list: Duration,
    /// Streaming chat completion, covering the entire response body.
    pub stream: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            health: Duration::from_secs(5),
            list: Duration::from_secs(15),
            stream: Duration::from_secs(600),
        }
    }
}

/// Client for an OpenAI-compatible completion server (vLLM, llama.cpp
/// server, and friends).
///
/// The endpoint is rebindable: callers may retarget the client with
/// [`VllmClient::set_base_url`] between requests without rebuilding it.
#[derive(Debug, Clone)]
pub struct VllmClient {
    client: ReqwestClient,
    base_url: String,
    timeouts: Timeouts,
    max_retries: u32,
}

impl VllmClient {
    /// Create a new client.
    ///
    /// The base URL can be provided directly or read from the
    /// OPENAI_BASE_URL environment variable, falling back to a local
    /// default.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, Timeouts::default(), DEFAULT_MAX_RETRIES)
    }

    /// Create a new client with custom timeouts and retry limit.
    pub fn with_options(
        base_url: Option<String>,
        timeouts: Timeouts,
        max_retries: u32,
    ) -> Result<Self> {
        let base_url = base_url
            .or_else(|| env::var(BASE_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        // Timeouts are applied per request, not on the client, because
        // the three request kinds need different budgets.
        let client = ReqwestClient::builder().build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&base_url),
            timeouts,
            max_retries,
        })
    }

    /// Returns the current base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Rebinds the client to a different server. Takes effect on the
    /// next request; in-flight streams keep their original endpoint.
    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = normalize_base_url(base_url);
    }

    /// Returns the configured timeouts.
    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Probe whether the server is up.
    ///
    /// Any network error or non-200 status reads as down; this never
    /// returns an error.
    pub async fn health(&self) -> bool {
        let url = self.models_url();
        self.get_with_retry(&url, self.timeouts.health).await.is_ok()
    }

    /// List the models the server reports as available.
    ///
    /// Returns an empty vector on any failure (network, non-200,
    /// malformed body); failures are counted but never propagated.
    pub async fn list_models(&self) -> Vec<String> {
        self.try_list_models().await.unwrap_or_default()
    }

    /// List models, surfacing the failure cause.
    pub async fn try_list_models(&self) -> Result<Vec<String>> {
        let url = self.models_url();
        let response = self.get_with_retry(&url, self.timeouts.list).await?;
        let body: ModelListResponse = response.json().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse models listing: {e}"),
                Some(Box::new(e)),
            )
        })?;
        Ok(body.ids())
    }

    /// Issue a streaming chat completion request.
    ///
    /// Returns a finite, non-restartable stream of text deltas in
    /// arrival order. A non-2xx response yields a stream with exactly
    /// one error item; a transport failure mid-stream likewise ends the
    /// stream after one error item. Dropping the stream closes the
    /// response body, aborting the request.
    pub async fn chat_stream(
        &self,
        mut params: ChatCompletionParams,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String>> + Send>>> {
        params.stream = true;

        let url = format!("{}/chat/completions", self.base_url);
        let mut headers = self.default_headers();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&params)
            .timeout(self.timeouts.stream)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                self.map_send_error(e, self.timeouts.stream)
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = Self::status_error(response).await;
            let error_stream: Pin<Box<dyn Stream<Item = Result<String>> + Send>> =
                Box::pin(stream::once(async move { Err(err) }));
            return Ok(error_stream);
        }

        Ok(Box::pin(decode_deltas(response.bytes_stream())))
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// GET with bounded exponential backoff on retryable failures.
    async fn get_with_retry(&self, url: &str, timeout: Duration) -> Result<Response> {
        let mut attempt = 0u32;
        loop {
            CLIENT_REQUESTS.click();
            match self.execute_get(url, timeout).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    CLIENT_REQUEST_RETRIES.click();
                    let backoff = RETRY_BACKOFF_BASE * 2u32.pow(attempt - 1);
                    CLIENT_RETRY_BACKOFF.add(backoff.as_secs_f64());
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => {
                    CLIENT_REQUEST_ERRORS.click();
                    return Err(err);
                }
            }
        }
    }

    async fn execute_get(&self, url: &str, timeout: Duration) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .headers(self.default_headers())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, timeout))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::status_error(response).await)
        }
    }

    /// Map a reqwest send error into our error type.
    fn map_send_error(&self, e: reqwest::Error, timeout: Duration) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Map a non-2xx response to the matching error variant.
    async fn status_error(response: Response) -> Error {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        match status {
            429 => Error::rate_limit(body, retry_after),
            500 => Error::internal_server(body),
            502..=504 => Error::service_unavailable(body, retry_after),
            _ => Error::api(status, body),
        }
    }
}

/// Trims whitespace and trailing slashes so that path joins are stable
/// no matter how the user typed the URL.
fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}
