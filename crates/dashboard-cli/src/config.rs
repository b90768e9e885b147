use analysis_orchestrator::OrchestratorConfig;
use anyhow::{anyhow, Context, Result};
use fmp_client::{FmpConfig, DEFAULT_BASE_URL, DEFAULT_V4_BASE_URL};
use fundamental_analysis::SectorAliases;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub fmp: FmpConfig,
    pub orchestrator: OrchestratorConfig,
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = var("FMP_API_KEY").ok_or_else(|| anyhow!("FMP_API_KEY must be set"))?;

        let fmp = FmpConfig {
            api_key,
            base_url: var("FMP_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            v4_base_url: var("FMP_V4_BASE_URL").unwrap_or_else(|| DEFAULT_V4_BASE_URL.to_string()),
            rate_limit: var("FMP_RATE_LIMIT")
                .unwrap_or_else(|| "300".to_string())
                .parse()
                .context("FMP_RATE_LIMIT must be a whole number of requests per minute")?,
            timeout: Duration::from_secs(
                var("FMP_TIMEOUT_SECS")
                    .unwrap_or_else(|| "30".to_string())
                    .parse()
                    .context("FMP_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            sector_exchange: var("FMP_SECTOR_EXCHANGE"),
            max_attempts: var("FMP_MAX_ATTEMPTS")
                .unwrap_or_else(|| "3".to_string())
                .parse()
                .context("FMP_MAX_ATTEMPTS must be a whole number")?,
            retry_wait: Duration::from_secs(
                var("FMP_RETRY_WAIT_SECS")
                    .unwrap_or_else(|| "15".to_string())
                    .parse()
                    .context("FMP_RETRY_WAIT_SECS must be a whole number of seconds")?,
            ),
        };

        let aliases = match var("SECTOR_ALIASES") {
            Some(list) => SectorAliases::parse(&list).context("invalid SECTOR_ALIASES")?,
            None => SectorAliases::default(),
        };

        let orchestrator = OrchestratorConfig {
            cache_ttl: Duration::from_secs(
                var("SECTOR_PE_CACHE_TTL_SECS")
                    .unwrap_or_else(|| "300".to_string())
                    .parse()
                    .context("SECTOR_PE_CACHE_TTL_SECS must be a whole number of seconds")?,
            ),
            aliases,
            growth_years: var("GROWTH_YEARS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .context("GROWTH_YEARS must be a whole number")?,
        };

        Ok(Self { fmp, orchestrator })
    }
}
