//! Financial Modeling Prep client.
//!
//! Fetches raw records only; all interpretation of fields happens in the
//! metrics engine. Payloads may be a list or a single object, and an object
//! carrying `Error Message` is the provider's way of reporting failure.

use analysis_core::{AnalysisError, FinancialDataProvider, Record};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";
pub const DEFAULT_V4_BASE_URL: &str = "https://financialmodelingprep.com/api/v4";

/// Connection settings for the FMP API
#[derive(Clone)]
pub struct FmpConfig {
    pub api_key: String,
    pub base_url: String,
    pub v4_base_url: String,
    /// Requests allowed per minute
    pub rate_limit: usize,
    pub timeout: Duration,
    /// Restrict the sector P/E snapshot to one exchange (e.g. NYSE)
    pub sector_exchange: Option<String>,
    /// Attempts per request while FMP answers 429
    pub max_attempts: u32,
    /// Pause after a 429 before the next attempt
    pub retry_wait: Duration,
}

impl FmpConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            v4_base_url: DEFAULT_V4_BASE_URL.to_string(),
            rate_limit: 300,
            timeout: Duration::from_secs(30),
            sector_exchange: None,
            max_attempts: 3,
            retry_wait: Duration::from_secs(15),
        }
    }
}

impl fmt::Debug for FmpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FmpConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("v4_base_url", &self.v4_base_url)
            .field("rate_limit", &self.rate_limit)
            .field("timeout", &self.timeout)
            .field("sector_exchange", &self.sector_exchange)
            .field("max_attempts", &self.max_attempts)
            .field("retry_wait", &self.retry_wait)
            .finish()
    }
}

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait for the oldest request to leave the window
            let oldest = match ts.front() {
                Some(&t) => t,
                None => continue,
            };
            let sleep_dur = (oldest + self.window).saturating_duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for FMP slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Clone)]
pub struct FmpClient {
    config: FmpConfig,
    client: Client,
    rate_limiter: RateLimiter,
}

impl FmpClient {
    pub fn new(config: FmpConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        let rate_limiter = RateLimiter::new(config.rate_limit, Duration::from_secs(60));

        Self {
            config,
            client,
            rate_limiter,
        }
    }

    pub fn config(&self) -> &FmpConfig {
        &self.config
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        let attempts = self.config.max_attempts.max(1);
        for attempt in 1..=attempts {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            if attempt == attempts {
                break;
            }
            tracing::warn!(
                "FMP 429 rate limited on attempt {}/{}, waiting {:.1}s",
                attempt,
                attempts,
                self.config.retry_wait.as_secs_f64()
            );
            tokio::time::sleep(self.config.retry_wait).await;
        }

        Err(AnalysisError::ApiError(format!(
            "Rate limited by FMP after {} attempts",
            attempts
        )))
    }

    /// GET `url` and split the payload into records.
    async fn get_records(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<Record>, AnalysisError> {
        let response = self
            .send_request(
                self.client
                    .get(url)
                    .query(query)
                    .query(&[("apikey", self.config.api_key.as_str())]),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        records_from_payload(payload)
    }

    async fn first_record(&self, url: &str, query: &[(&str, String)]) -> Result<Option<Record>, AnalysisError> {
        Ok(self.get_records(url, query).await?.into_iter().next())
    }

    fn v3_url(&self, path: &str, ticker: &str) -> String {
        format!("{}/{}/{}", self.config.base_url.trim_end_matches('/'), path, ticker)
    }

    /// Company profile sector, trimmed; `None` when empty or missing
    pub async fn get_company_sector(&self, ticker: &str) -> Result<Option<String>, AnalysisError> {
        let profile = self.first_record(&self.v3_url("profile", ticker), &[]).await?;
        Ok(profile.as_ref().and_then(sector_from_profile))
    }

    pub async fn get_dcf(&self, ticker: &str) -> Result<Option<Record>, AnalysisError> {
        self.first_record(&self.v3_url("discounted-cash-flow", ticker), &[]).await
    }

    /// Latest annual ratios
    pub async fn get_ratios(&self, ticker: &str) -> Result<Option<Record>, AnalysisError> {
        self.first_record(
            &self.v3_url("ratios", ticker),
            &[("period", "annual".to_string()), ("limit", "1".to_string())],
        )
        .await
    }

    pub async fn get_key_metrics(&self, ticker: &str, years: u32) -> Result<Vec<Record>, AnalysisError> {
        self.get_records(&self.v3_url("key-metrics", ticker), &[("limit", years.to_string())])
            .await
    }

    pub async fn get_income_statements(&self, ticker: &str, years: u32) -> Result<Vec<Record>, AnalysisError> {
        self.get_records(&self.v3_url("income-statement", ticker), &[("limit", years.to_string())])
            .await
    }

    pub async fn get_cash_flow_statements(&self, ticker: &str, years: u32) -> Result<Vec<Record>, AnalysisError> {
        self.get_records(&self.v3_url("cash-flow-statement", ticker), &[("limit", years.to_string())])
            .await
    }

    /// Sector P/E rows for `date`, one per sector (per exchange when unfiltered)
    pub async fn get_sector_pe_snapshot(&self, date: NaiveDate) -> Result<Vec<Record>, AnalysisError> {
        let url = format!(
            "{}/sector_price_earning_ratio",
            self.config.v4_base_url.trim_end_matches('/')
        );
        let mut query = vec![("date", date.format("%Y-%m-%d").to_string())];
        if let Some(exchange) = &self.config.sector_exchange {
            query.push(("exchange", exchange.clone()));
        }
        let rows = self.get_records(&url, &query).await?;
        tracing::debug!("Fetched {} sector P/E rows for {}", rows.len(), date);
        Ok(rows)
    }
}

#[async_trait]
impl FinancialDataProvider for FmpClient {
    async fn company_sector(&self, ticker: &str) -> Result<Option<String>, AnalysisError> {
        self.get_company_sector(ticker).await
    }

    async fn dcf(&self, ticker: &str) -> Result<Option<Record>, AnalysisError> {
        self.get_dcf(ticker).await
    }

    async fn ratios(&self, ticker: &str) -> Result<Option<Record>, AnalysisError> {
        self.get_ratios(ticker).await
    }

    async fn key_metrics(&self, ticker: &str, years: u32) -> Result<Vec<Record>, AnalysisError> {
        self.get_key_metrics(ticker, years).await
    }

    async fn income_statements(&self, ticker: &str, years: u32) -> Result<Vec<Record>, AnalysisError> {
        self.get_income_statements(ticker, years).await
    }

    async fn cash_flow_statements(&self, ticker: &str, years: u32) -> Result<Vec<Record>, AnalysisError> {
        self.get_cash_flow_statements(ticker, years).await
    }

    async fn sector_pe_snapshot(&self, date: NaiveDate) -> Result<Vec<Record>, AnalysisError> {
        self.get_sector_pe_snapshot(date).await
    }
}

/// Split a response body into records. Lists keep their object items,
/// a non-empty object is a single record, anything else is no data.
pub fn records_from_payload(payload: Value) -> Result<Vec<Record>, AnalysisError> {
    match payload {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()),
        Value::Object(map) => {
            if let Some(message) = map.get("Error Message") {
                let message = message.as_str().map(str::to_string).unwrap_or_else(|| message.to_string());
                return Err(AnalysisError::ApiError(format!("FMP error: {}", message)));
            }
            if map.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(vec![map])
            }
        }
        _ => Ok(Vec::new()),
    }
}

fn sector_from_profile(profile: &Record) -> Option<String> {
    profile
        .get("sector")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
