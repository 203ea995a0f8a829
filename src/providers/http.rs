//! Generic HTTP provider client.
//!
//! Speaks a minimal JSON contract: POST the chunk plus document context to
//! the provider's analyze endpoint, read back either a structured analysis
//! or free text. Status codes map onto the typed [`ProviderError`] taxonomy
//! so the resilience layer can classify them without peeking at HTTP.

use std::time::Duration;

use async_trait::async_trait;
use miette::Diagnostic;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::chunker::TextChunk;
use crate::config::ProviderConfig;

use super::{ChunkAnalysis, PromptContext, ProviderClient, ProviderError, ProviderResponse, text_metrics};

/// How much of an error body to keep in error messages.
const ERROR_BODY_LIMIT: usize = 256;

/// Errors constructing an [`HttpProviderClient`].
#[derive(Debug, Error, Diagnostic)]
pub enum HttpClientError {
    /// The underlying HTTP client could not be built.
    #[error("failed to construct HTTP client: {0}")]
    #[diagnostic(code(textweave::provider::http_client))]
    Client(#[from] reqwest::Error),

    /// The configured API key environment variable is not set.
    #[error("API key environment variable '{0}' is not set")]
    #[diagnostic(
        code(textweave::provider::missing_api_key),
        help("Export the variable or remove `api_key_env` from the provider config.")
    )]
    MissingApiKey(String),
}

/// A [`ProviderClient`] backed by an HTTP(S) analysis service.
#[derive(Debug)]
pub struct HttpProviderClient {
    name: String,
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl HttpProviderClient {
    /// Start building a client.
    pub fn builder(name: impl Into<String>, endpoint: Url) -> HttpProviderClientBuilder {
        HttpProviderClientBuilder {
            name: name.into(),
            endpoint,
            api_key: None,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Build a client from a [`ProviderConfig`], resolving the API key from
    /// the configured environment variable.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, HttpClientError> {
        let mut builder = Self::builder(&config.name, config.endpoint.clone())
            .request_timeout(config.request_timeout());
        if let Some(var) = &config.api_key_env {
            let key =
                std::env::var(var).map_err(|_| HttpClientError::MissingApiKey(var.clone()))?;
            builder = builder.api_key(key);
        }
        builder.build()
    }
}

/// Builder for [`HttpProviderClient`].
#[derive(Debug)]
pub struct HttpProviderClientBuilder {
    name: String,
    endpoint: Url,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl HttpProviderClientBuilder {
    /// Bearer token sent with each request.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Per-call timeout (default 30 s).
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpProviderClient, HttpClientError> {
        let client = reqwest::Client::builder().build()?;
        Ok(HttpProviderClient {
            name: self.name,
            client,
            endpoint: self.endpoint,
            api_key: self.api_key,
            request_timeout: self.request_timeout,
        })
    }
}

fn map_send_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout { elapsed: timeout }
    } else {
        ProviderError::Connection(err.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() > ERROR_BODY_LIMIT {
        body.chars().take(ERROR_BODY_LIMIT).collect()
    } else {
        body.to_string()
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip_all, fields(provider = %self.name, chunk = chunk.index))]
    async fn analyze(
        &self,
        chunk: &TextChunk,
        ctx: &PromptContext,
    ) -> Result<ChunkAnalysis, ProviderError> {
        let payload = serde_json::json!({
            "document_title": ctx.document_title,
            "language": ctx.language,
            "section": chunk.section_heading,
            "chunk_index": chunk.index,
            "total_chunks": chunk.total_chunks,
            "text": chunk.text,
        });

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.request_timeout)
            .json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| map_send_error(err, self.request_timeout))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Service {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::InvalidRequest(truncate_body(&body)));
        }

        let body = response
            .text()
            .await
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;

        let response = ProviderResponse::parse(&body);
        if !response.is_structured() {
            tracing::debug!("unstructured provider response, degrading to summary-only");
        }
        let mut analysis = response.into_analysis();
        if analysis.metadata.word_count == 0 {
            let (words, minutes) = text_metrics(&chunk.text);
            analysis.metadata.word_count = words;
            analysis.metadata.reading_time_minutes = minutes;
        }
        Ok(analysis)
    }
}
