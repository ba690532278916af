use std::env;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{FreeToken, QueryRequest, QueryResult};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8082/";

/// Path of the free-token endpoint, relative to the base URL.
pub const FREE_TOKEN_PATH: &str = "auth/free_token/";

/// Path of the RAG query endpoint, relative to the base URL.
pub const QUERY_PATH: &str = "rag/query/";

/// Environment variable consulted for the base URL.
pub const BASE_URL_ENV: &str = "VERITLY_BASE_URL";

/// The two backend calls the chat client makes.
///
/// [`VeritlyClient`] talks HTTP; tests substitute scripted implementations.
#[async_trait::async_trait]
pub trait RagBackend: Send + Sync {
    /// Requests a free bearer token.
    async fn free_token(&self) -> Result<FreeToken>;

    /// Sends `question`, authorized with `token` when one is given.
    async fn query(&self, question: &str, token: Option<&str>) -> Result<QueryResult>;
}

/// HTTP client for the VeritlyAI backend.
#[derive(Debug, Clone)]
pub struct VeritlyClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Option<Duration>,
}

impl VeritlyClient {
    /// Create a new client.
    ///
    /// The base URL is read from the VERITLY_BASE_URL environment variable,
    /// falling back to [`DEFAULT_BASE_URL`].  No timeout is applied.
    pub fn new() -> Result<Self> {
        Self::with_options(env::var(BASE_URL_ENV).ok(), None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = parse_base_url(base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;

        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Returns the base URL every endpoint is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the configured request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Resolves an endpoint path against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Sends a request and decodes a 2xx JSON body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.execute_inner(request).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if result.is_err() {
            CLIENT_REQUEST_ERRORS.click();
        }
        result
    }

    async fn execute_inner<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .headers(self.default_headers())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<T>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                self.timeout.map(|t| t.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Convert a non-2xx response into an API error carrying its status.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        match response.text().await {
            Ok(body) => Error::api(status_code, body.trim()),
            Err(e) => Error::api(status_code, format!("failed to read error body: {}", e)),
        }
    }
}

#[async_trait::async_trait]
impl RagBackend for VeritlyClient {
    async fn free_token(&self) -> Result<FreeToken> {
        let url = self.endpoint(FREE_TOKEN_PATH)?;
        self.execute(self.client.get(url)).await
    }

    async fn query(&self, question: &str, token: Option<&str>) -> Result<QueryResult> {
        let url = self.endpoint(QUERY_PATH)?;
        let mut request = self.client.post(url).json(&QueryRequest::new(question));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        self.execute(request).await
    }
}

/// Parses a base URL, making sure it ends in `/` so endpoint paths join
/// beneath it instead of replacing its last segment.
fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::validation(
            "base URL must not be empty",
            Some("base_url".to_string()),
        ));
    }
    let mut url = Url::parse(raw)?;
    if url.cannot_be_a_base() {
        return Err(Error::validation(
            format!("{raw} cannot be used as a base URL"),
            Some("base_url".to_string()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
