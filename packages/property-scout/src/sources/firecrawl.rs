//! Firecrawl-backed listing source.
//!
//! Uses the Firecrawl extract API: one job per site, started with the site's
//! search URL, an extraction instruction and a JSON schema, then polled until
//! it completes.
//!
//! Requires the `firecrawl` feature to be enabled.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{SourceError, SourceResult};
use crate::pipeline::prompts::format_extract_prompt;
use crate::security::{ApiKey, ServiceCredentials};
use crate::sites::Site;
use crate::traits::source::{ExtractedListings, ListingSource, RawListing};
use crate::types::query::SearchQuery;

/// Default API root.
pub const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev";

/// Firecrawl extract client.
///
/// # Example
///
/// ```rust,ignore
/// use property_scout::sources::FirecrawlSource;
///
/// let source = FirecrawlSource::new(std::env::var("FIRECRAWL_API_KEY")?)?
///     .with_poll_timeout(Duration::from_secs(180));
/// let raw = source.fetch(Site::Bikroy, &query).await?;
/// ```
pub struct FirecrawlSource {
    client: Client,
    credentials: ServiceCredentials,
    poll_interval: Duration,
    poll_timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequest {
    urls: Vec<String>,
    prompt: String,
    schema: serde_json::Value,
    enable_web_search: bool,
}

#[derive(Debug, Deserialize)]
struct ExtractStartResponse {
    success: bool,
    id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtractStatusResponse {
    #[serde(default)]
    status: String,
    data: Option<serde_json::Value>,
    error: Option<String>,
}

impl FirecrawlSource {
    /// Create a source with the given API key.
    pub fn new(api_key: impl Into<ApiKey>) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SourceError::Http(Box::new(e)))?;

        Ok(Self {
            client,
            credentials: ServiceCredentials::new(api_key.into(), FIRECRAWL_API_URL),
            poll_interval: Duration::from_secs(3),
            poll_timeout: Duration::from_secs(240),
        })
    }

    /// Create from environment variable `FIRECRAWL_API_KEY`.
    pub fn from_env() -> SourceResult<Self> {
        let api_key = ApiKey::from_env(&["FIRECRAWL_API_KEY"])
            .ok_or_else(|| SourceError::Config("FIRECRAWL_API_KEY not set".into()))?;
        Self::new(api_key)
    }

    /// Point at a different API root (self-hosted Firecrawl, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.credentials = ServiceCredentials::new(self.credentials.api_key.clone(), url);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Give up on a job after this long.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    fn extract_request(site: Site, query: &SearchQuery) -> ExtractRequest {
        ExtractRequest {
            urls: vec![site.search_url(query)],
            prompt: format_extract_prompt(site, query),
            schema: serde_json::to_value(schemars::schema_for!(ExtractedListings))
                .unwrap_or_default(),
            enable_web_search: false,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1{}", self.credentials.base_url, path)
    }

    async fn send<R: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> SourceResult<R> {
        let response = request
            .bearer_auth(self.credentials.api_key.expose())
            .send()
            .await
            .map_err(|e| SourceError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, text));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }

    async fn start(&self, site: Site, query: &SearchQuery) -> SourceResult<String> {
        let body = Self::extract_request(site, query);
        let request = self.client.post(self.endpoint("/extract")).json(&body);
        let response: ExtractStartResponse = self.send(request).await?;

        if !response.success {
            return Err(SourceError::Extraction(
                response
                    .error
                    .unwrap_or_else(|| "extract job was not accepted".into()),
            ));
        }
        response
            .id
            .ok_or_else(|| SourceError::Parse("no extract job id returned".into()))
    }

    async fn poll(&self, site: Site, job_id: &str) -> SourceResult<serde_json::Value> {
        let interval = self.poll_interval.max(Duration::from_millis(10));
        let max_attempts = (self.poll_timeout.as_millis() / interval.as_millis()).max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            if attempts > max_attempts {
                return Err(SourceError::Timeout { site });
            }

            tokio::time::sleep(interval).await;

            let request = self.client.get(self.endpoint(&format!("/extract/{}", job_id)));
            let status: ExtractStatusResponse = self.send(request).await?;

            match status.status.as_str() {
                "completed" => {
                    return status
                        .data
                        .ok_or_else(|| SourceError::Parse("completed job has no data".into()));
                }
                "failed" | "cancelled" => {
                    return Err(SourceError::Extraction(
                        status.error.unwrap_or_else(|| format!("job {}", status.status)),
                    ));
                }
                _ => {
                    if attempts % 10 == 0 {
                        tracing::info!(
                            site = %site,
                            job_id = %job_id,
                            status = %status.status,
                            "Extract job in progress"
                        );
                    }
                }
            }
        }
    }
}

fn status_error(status: StatusCode, body: String) -> SourceError {
    match status {
        StatusCode::PAYMENT_REQUIRED | StatusCode::TOO_MANY_REQUESTS => {
            SourceError::Quota(format!("{}: {}", status, body))
        }
        _ => SourceError::Api {
            status: status.as_u16(),
            message: body,
        },
    }
}

/// Pull the listings for one site out of a completed job's data, dropping
/// links that point at another domain.
fn listings_from_data(site: Site, data: serde_json::Value) -> SourceResult<Vec<RawListing>> {
    let extracted: ExtractedListings =
        serde_json::from_value(data).map_err(|e| SourceError::Parse(e.to_string()))?;

    Ok(extracted
        .properties
        .into_iter()
        .filter(|raw| raw.listing_url.as_deref().map_or(true, |u| on_site(site, u)))
        .collect())
}

fn on_site(site: Site, link: &str) -> bool {
    match Url::parse(link.trim()) {
        Ok(url) => url
            .host_str()
            .map_or(false, |host| host == site.domain() || host.ends_with(&format!(".{}", site.domain()))),
        // Relative links belong to the page they came from
        Err(_) => true,
    }
}

#[async_trait]
impl ListingSource for FirecrawlSource {
    async fn fetch(&self, site: Site, query: &SearchQuery) -> SourceResult<Vec<RawListing>> {
        tracing::info!(
            site = %site,
            url = %site.search_url(query),
            "Starting Firecrawl extract"
        );

        let job_id = self.start(site, query).await?;
        tracing::debug!(site = %site, job_id = %job_id, "Extract job started");

        let data = self.poll(site, &job_id).await?;
        let listings = listings_from_data(site, data)?;

        tracing::info!(site = %site, listings = listings.len(), "Firecrawl extract completed");
        Ok(listings)
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}
