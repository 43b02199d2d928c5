//! HTTP transport for the comment extraction pipeline
//!
//! One fetcher per extraction, covering both outbound call shapes:
//! - GET of the video landing page (bootstrap)
//! - POST to the internal paginated comments endpoint
//!
//! Features:
//! - User-Agent rotation from a pool of realistic browser strings
//! - Rate limiting with governor
//! - Optional proxy egress handle
//! - Base URL override for testing with mock servers
//!
//! The fetcher performs exactly one attempt per call; retry and
//! classification live in [`crate::utils::retry`].

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::seq::SliceRandom;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT},
    Client, Proxy,
};
use serde::Serialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::config::ExtractorConfig;
use crate::extractor::egress::Egress;
use crate::extractor::url::canonical_watch_url;
use crate::utils::error::FetchError;

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
];

/// Origin of the real platform; overridable per-fetcher for tests
const PAGE_ORIGIN: &str = "https://www.youtube.com";

/// Path of the internal paginated comments endpoint
const NEXT_ENDPOINT_PATH: &str = "/youtubei/v1/next";

/// Request body for one paginated call
///
/// Exactly one of `video_id` / `continuation` is present per call: the
/// first call for a video carries the id, every later page carries the
/// token issued by the preceding response.
#[derive(Debug, Clone)]
pub enum PageRequest {
    VideoId(String),
    Continuation(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo<'a> {
    client_name: &'static str,
    client_version: &'a str,
    hl: &'a str,
    gl: &'a str,
    time_zone: &'a str,
    utc_offset_minutes: i32,
}

#[derive(Serialize)]
struct RequestContext<'a> {
    client: ClientInfo<'a>,
}

/// HTTP fetcher for landing pages and paginated comment requests
pub struct PageFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    config: ExtractorConfig,

    /// Optional base URL override for testing with mock servers
    base_url: Option<String>,

    /// Label of the egress handle this fetcher routes through
    egress_label: String,
}

impl PageFetcher {
    /// Create a fetcher with a direct (proxyless) egress
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(config: ExtractorConfig) -> Result<Self, FetchError> {
        Self::with_egress(config, &Egress::direct())
    }

    /// Create a fetcher routed through the given egress handle
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidEgress` if the proxy URL is malformed,
    /// or `FetchError::Http` if the HTTP client cannot be created
    pub fn with_egress(config: ExtractorConfig, egress: &Egress) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .cookie_store(true);

        if let Some(proxy_url) = &egress.proxy_url {
            let proxy =
                Proxy::all(proxy_url).map_err(|e| FetchError::InvalidEgress(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        let rate = NonZeroU32::new(config.requests_per_second)
            .unwrap_or_else(|| NonZeroU32::new(1).unwrap());
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            config,
            base_url: None,
            egress_label: egress.label.clone(),
        })
    }

    /// Override the base URL (for mock-server tests)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    pub fn egress_label(&self) -> &str {
        &self.egress_label
    }

    fn origin(&self) -> &str {
        self.base_url.as_deref().unwrap_or(PAGE_ORIGIN)
    }

    /// Fetch the video landing page once
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Status` for non-success responses and
    /// `FetchError::Timeout` when the transport timeout fires
    pub async fn fetch_watch_page(&self, video_id: &str) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/watch?v={video_id}", self.origin());
        tracing::debug!(url = %url, egress = %self.egress_label, "Fetching landing page");

        let response = self
            .client
            .get(&url)
            .headers(self.page_headers())
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Fetch one page of the paginated comments feed
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Status` for non-success responses,
    /// `FetchError::Timeout` on transport timeout, and `FetchError::Decode`
    /// when the body is not valid JSON
    pub async fn fetch_comment_page(&self, request: &PageRequest) -> Result<Value, FetchError> {
        self.rate_limiter.until_ready().await;

        let url = format!(
            "{}{NEXT_ENDPOINT_PATH}?key={}&prettyPrint=false",
            self.origin(),
            self.config.api_key
        );

        let body = self.build_body(request);
        tracing::debug!(egress = %self.egress_label, "Fetching comment page");

        let response = self
            .client
            .post(&url)
            .headers(self.api_headers(request))
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn build_body(&self, request: &PageRequest) -> Value {
        let context = RequestContext {
            client: ClientInfo {
                client_name: "WEB",
                client_version: &self.config.client_version,
                hl: &self.config.hl,
                gl: &self.config.gl,
                time_zone: &self.config.time_zone,
                utc_offset_minutes: self.config.utc_offset_minutes,
            },
        };

        let mut body = serde_json::json!({
            "context": serde_json::to_value(&context).unwrap_or_default(),
        });

        match request {
            PageRequest::VideoId(id) => {
                body["videoId"] = Value::String(id.clone());
            }
            PageRequest::Continuation(token) => {
                body["continuation"] = Value::String(token.clone());
            }
        }

        body
    }

    /// Headers for the landing-page GET
    fn page_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_static(self.random_user_agent()));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );

        headers
    }

    /// Headers for the paginated POST: the origin and referer must match the
    /// page's own origin or the endpoint rejects the call
    fn api_headers(&self, request: &PageRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_static(self.random_user_agent()));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );

        if let Ok(origin) = HeaderValue::from_str(PAGE_ORIGIN) {
            headers.insert(ORIGIN, origin);
        }

        let referer = match request {
            PageRequest::VideoId(id) => canonical_watch_url(id),
            PageRequest::Continuation(_) => format!("{PAGE_ORIGIN}/"),
        };
        if let Ok(value) = HeaderValue::from_str(&referer) {
            headers.insert(REFERER, value);
        }

        headers
    }

    /// Get a random user agent from the pool
    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0])
    }
}

fn map_send_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(e)
    }
}
