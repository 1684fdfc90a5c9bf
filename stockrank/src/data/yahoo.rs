//! Yahoo Finance fundamentals provider.
//!
//! Reads the `financialData`, `defaultKeyStatistics` and `summaryDetail`
//! quoteSummary modules and flattens them into one record keyed by field
//! name. Yahoo wraps numbers as `{"raw": 1.23, "fmt": "1.23"}`; only `raw`
//! is kept.
//!
//! quoteSummary requires a session cookie plus a crumb token. The cookie is
//! held by the client's cookie store; the crumb is cached until the
//! upstream rejects it.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use stockrank_common::ProviderConfig;

use super::provider::{FundamentalsProvider, MetricRecord, ProviderError};

/// Modules requested from quoteSummary, in field-precedence order.
const MODULES: [&str; 3] = ["financialData", "defaultKeyStatistics", "summaryDetail"];

/// Longest body accepted as a crumb.
const MAX_CRUMB_LEN: usize = 64;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    #[serde(default)]
    result: Option<Vec<serde_json::Map<String, serde_json::Value>>>,
    #[serde(default)]
    error: Option<QuoteSummaryError>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

// ============================================================================
// Yahoo Provider
// ============================================================================

/// Yahoo Finance quoteSummary client.
pub struct YahooProvider {
    client: Client,
    base_url: String,
    session_url: String,
    crumb: RwLock<Option<String>>,
}

impl YahooProvider {
    /// Create a new provider from configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_url: config.session_url.clone(),
            crumb: RwLock::new(None),
        })
    }

    /// Cached crumb, obtaining one first if needed.
    async fn crumb(&self) -> Result<String, ProviderError> {
        if let Some(crumb) = self.crumb.read().await.as_ref() {
            return Ok(crumb.clone());
        }

        let mut slot = self.crumb.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(crumb) = slot.as_ref() {
            return Ok(crumb.clone());
        }

        let crumb = self.fetch_crumb().await?;
        *slot = Some(crumb.clone());
        Ok(crumb)
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.write().await = None;
    }

    /// Establish the session cookie, then request a crumb.
    async fn fetch_crumb(&self) -> Result<String, ProviderError> {
        // The session endpoint usually answers 404 but still sets the cookie
        let session = self.client.get(&self.session_url).send().await?;
        debug!(status = %session.status(), "Yahoo session established");

        let response = self
            .client
            .get(format!("{}/v1/test/getcrumb", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after(&response),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "crumb request failed with HTTP {}",
                status
            )));
        }

        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() || crumb.len() > MAX_CRUMB_LEN || crumb.contains('<') {
            return Err(ProviderError::Unavailable("invalid crumb response".into()));
        }

        info!("Obtained Yahoo crumb");
        Ok(crumb)
    }

    fn summary_url(&self, symbol: &str, crumb: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!("{}/v10/finance/quoteSummary", self.base_url))
            .map_err(|e| ProviderError::InvalidRequest(format!("bad base URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidRequest("base URL cannot hold a path".into()))?
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("modules", &MODULES.join(","))
            .append_pair("crumb", crumb);

        Ok(url)
    }

    /// One quoteSummary request. `Ok(None)` means the crumb was rejected.
    async fn request_summary(
        &self,
        symbol: &str,
        crumb: &str,
    ) -> Result<Option<MetricRecord>, ProviderError> {
        let url = self.summary_url(symbol, crumb)?;
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Ok(None),
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::RateLimited {
                    retry_after_secs: retry_after(&response),
                })
            }
            _ => {}
        }

        // quoteSummary reports unknown symbols as 404 with an error body
        let body = response.text().await?;
        if status.is_server_error() {
            return Err(ProviderError::Unavailable(format!("HTTP {}", status)));
        }
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(ProviderError::InvalidRequest(format!("HTTP {}", status)));
        }

        parse_summary(symbol, &body).map(Some)
    }
}

#[async_trait]
impl FundamentalsProvider for YahooProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn lookup(&self, symbol: &str) -> Result<MetricRecord, ProviderError> {
        let crumb = self.crumb().await?;
        if let Some(record) = self.request_summary(symbol, &crumb).await? {
            return Ok(record);
        }

        warn!(symbol = %symbol, "Yahoo rejected crumb, refreshing");
        self.invalidate_crumb().await;
        let crumb = self.crumb().await?;

        self.request_summary(symbol, &crumb).await?.ok_or_else(|| {
            ProviderError::Unavailable("quoteSummary rejected a fresh crumb".into())
        })
    }
}

/// Seconds from a `Retry-After` header, when present.
fn retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Flatten a quoteSummary body into one record.
///
/// Earlier modules win when a field appears in several. Empty objects
/// (Yahoo's "no value") are skipped.
fn parse_summary(symbol: &str, body: &str) -> Result<MetricRecord, ProviderError> {
    let envelope: QuoteSummaryEnvelope =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    let summary = envelope.quote_summary;

    if let Some(error) = summary.error {
        let detail = error
            .description
            .or(error.code)
            .unwrap_or_else(|| "unknown error".into());
        return Err(ProviderError::DataNotAvailable(format!("{}: {}", symbol, detail)));
    }

    let modules = summary
        .result
        .and_then(|result| result.into_iter().next())
        .ok_or_else(|| ProviderError::DataNotAvailable(format!("{}: empty result", symbol)))?;

    let mut record = MetricRecord::new();
    for module in MODULES {
        let Some(serde_json::Value::Object(fields)) = modules.get(module) else {
            continue;
        };

        for (name, value) in fields {
            if record.contains_key(name) {
                continue;
            }
            let flattened = match value {
                serde_json::Value::Object(wrapped) => match wrapped.get("raw") {
                    Some(raw) => raw.clone(),
                    None => continue,
                },
                serde_json::Value::Number(_) | serde_json::Value::String(_) => value.clone(),
                _ => continue,
            };
            record.insert(name.clone(), flattened);
        }
    }

    Ok(record)
}

// ============================================================================
// Tests
// ============================================================================
