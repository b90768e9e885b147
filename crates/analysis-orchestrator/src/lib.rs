use analysis_core::{AnalysisError, FinancialDataProvider, FinancialPeriod, Record, SectorBenchmark};
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use fundamental_analysis::{
    benchmark_from_records, FundamentalAnalysisEngine, GrowthInputs, GrowthReport, SectorAliases,
    ValuationInputs, ValuationReport,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How long a sector P/E snapshot is served from cache
    pub cache_ttl: Duration,
    pub aliases: SectorAliases,
    /// Annual periods requested for the growth screen
    pub growth_years: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            aliases: SectorAliases::default(),
            growth_years: 5,
        }
    }
}

/// Runs one screen per request: fetch, compute, report.
///
/// Sector P/E snapshots are shared across requests for `cache_ttl`; a cached
/// snapshot is never modified after insertion.
pub struct DashboardOrchestrator<P> {
    provider: P,
    engine: FundamentalAnalysisEngine,
    config: OrchestratorConfig,
    /// Sector P/E snapshots per date
    benchmark_cache: DashMap<NaiveDate, CacheEntry<Arc<SectorBenchmark>>>,
}

impl<P: FinancialDataProvider> DashboardOrchestrator<P> {
    pub fn new(provider: P, config: OrchestratorConfig) -> Self {
        let engine = FundamentalAnalysisEngine::new().with_aliases(config.aliases.clone());
        Self {
            provider,
            engine,
            config,
            benchmark_cache: DashMap::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Valuation screen as of today (UTC)
    pub async fn analyze_valuation(&self, ticker: &str) -> Result<ValuationReport, AnalysisError> {
        self.analyze_valuation_on(ticker, Utc::now().date_naive()).await
    }

    pub async fn analyze_valuation_on(
        &self,
        ticker: &str,
        date: NaiveDate,
    ) -> Result<ValuationReport, AnalysisError> {
        let ticker = normalize_ticker(ticker)?;

        let (sector, dcf, ratios) = tokio::join!(
            degrade(&ticker, "profile", self.provider.company_sector(&ticker)),
            degrade(&ticker, "dcf", self.provider.dcf(&ticker)),
            degrade(&ticker, "ratios", self.provider.ratios(&ticker)),
        );
        let sector = sector.flatten();

        let (dcf, ratios) = match (dcf.flatten(), ratios.flatten()) {
            (Some(dcf), Some(ratios)) => (dcf, ratios),
            _ => {
                return Err(AnalysisError::InsufficientData(format!(
                    "could not retrieve DCF and ratio data for {}",
                    ticker
                )))
            }
        };

        let benchmark = match &sector {
            Some(_) => self.get_sector_benchmark(date).await,
            None => None,
        };

        tracing::debug!(
            "Valuation inputs for {}: sector={:?}, benchmark_sectors={}",
            ticker,
            sector,
            benchmark.as_ref().map_or(0, |b| b.len())
        );

        Ok(self.engine.valuation_report(ValuationInputs {
            ticker: &ticker,
            sector: sector.as_deref(),
            as_of: date,
            dcf: &dcf,
            ratios: &ratios,
            benchmark: benchmark.as_deref(),
        }))
    }

    pub async fn analyze_growth(&self, ticker: &str) -> Result<GrowthReport, AnalysisError> {
        let ticker = normalize_ticker(ticker)?;
        let years = self.config.growth_years;

        let (key_metrics, income, cash_flow) = tokio::join!(
            degrade(&ticker, "key-metrics", self.provider.key_metrics(&ticker, years)),
            degrade(&ticker, "income-statement", self.provider.income_statements(&ticker, years)),
            degrade(&ticker, "cash-flow-statement", self.provider.cash_flow_statements(&ticker, years)),
        );

        let key_metrics = to_periods(key_metrics);
        let income = to_periods(income);
        let cash_flow = to_periods(cash_flow);

        if key_metrics.is_empty() && income.is_empty() && cash_flow.is_empty() {
            return Err(AnalysisError::InsufficientData(format!(
                "could not retrieve key metrics for {}",
                ticker
            )));
        }

        Ok(self.engine.growth_report(GrowthInputs {
            ticker: &ticker,
            key_metrics: &key_metrics,
            income_statements: &income,
            cash_flow_statements: &cash_flow,
        }))
    }

    /// Sector P/E snapshot for `date` (cached). `None` when the provider
    /// could not supply one; failures are not cached.
    pub async fn get_sector_benchmark(&self, date: NaiveDate) -> Option<Arc<SectorBenchmark>> {
        if let Some(entry) = self.benchmark_cache.get(&date) {
            if self.is_fresh(&entry) {
                tracing::debug!("Sector P/E cache hit for {}", date);
                return Some(Arc::clone(&entry.data));
            }
        }

        let rows = degrade(&date.to_string(), "sector P/E snapshot", self.provider.sector_pe_snapshot(date)).await?;
        let benchmark = Arc::new(benchmark_from_records(date, &rows));
        if benchmark.is_empty() {
            tracing::warn!("Sector P/E snapshot for {} had no usable rows", date);
            return None;
        }

        self.evict_expired();
        self.benchmark_cache.insert(date, CacheEntry {
            data: Arc::clone(&benchmark),
            cached_at: Utc::now(),
        });

        Some(benchmark)
    }

    /// Drop expired snapshots. Runs before every insert, so the cache holds
    /// at most the dates fetched within one TTL.
    pub fn evict_expired(&self) {
        self.benchmark_cache.retain(|_, entry| self.is_fresh(entry));
    }

    fn is_fresh<T>(&self, entry: &CacheEntry<T>) -> bool {
        let age = (Utc::now() - entry.cached_at).to_std().unwrap_or_default();
        age < self.config.cache_ttl
    }

    pub fn cached_snapshots(&self) -> usize {
        self.benchmark_cache.len()
    }
}

/// Await a provider call, logging a failure and treating it as no data.
async fn degrade<T>(
    ticker: &str,
    what: &str,
    fut: impl Future<Output = Result<T, AnalysisError>>,
) -> Option<T> {
    match fut.await {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("Failed to fetch {} for {}: {}", what, ticker, e);
            None
        }
    }
}

fn to_periods(records: Option<Vec<Record>>) -> Vec<FinancialPeriod> {
    FinancialPeriod::from_records(records.unwrap_or_default())
}

/// Uppercase and validate a ticker before it is placed in a URL path.
pub fn normalize_ticker(ticker: &str) -> Result<String, AnalysisError> {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AnalysisError::InvalidData("ticker is empty".to_string()));
    }
    if !ticker
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^'))
    {
        return Err(AnalysisError::InvalidData(format!("invalid ticker '{}'", ticker)));
    }
    Ok(ticker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{Reading, RelativeVerdict, Unavailable};
    use async_trait::async_trait;
    use fundamental_analysis::PeComparison;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
            .unwrap_or_default()
    }

    #[derive(Default)]
    struct MockProvider {
        sector: Option<String>,
        dcf: Option<Record>,
        ratios: Option<Record>,
        key_metrics: Vec<Record>,
        income: Vec<Record>,
        cash_flow: Vec<Record>,
        sector_rows: Vec<Record>,
        fail_snapshot: bool,
        fail_profile: bool,
        fail_cash_flow: bool,
        snapshot_calls: AtomicUsize,
    }

    #[async_trait]
    impl FinancialDataProvider for MockProvider {
        async fn company_sector(&self, _ticker: &str) -> Result<Option<String>, AnalysisError> {
            if self.fail_profile {
                return Err(AnalysisError::ApiError("HTTP 500".to_string()));
            }
            Ok(self.sector.clone())
        }

        async fn dcf(&self, _ticker: &str) -> Result<Option<Record>, AnalysisError> {
            Ok(self.dcf.clone())
        }

        async fn ratios(&self, _ticker: &str) -> Result<Option<Record>, AnalysisError> {
            Ok(self.ratios.clone())
        }

        async fn key_metrics(&self, _ticker: &str, _years: u32) -> Result<Vec<Record>, AnalysisError> {
            Ok(self.key_metrics.clone())
        }

        async fn income_statements(&self, _ticker: &str, _years: u32) -> Result<Vec<Record>, AnalysisError> {
            Ok(self.income.clone())
        }

        async fn cash_flow_statements(&self, _ticker: &str, _years: u32) -> Result<Vec<Record>, AnalysisError> {
            if self.fail_cash_flow {
                return Err(AnalysisError::ApiError("cash flow endpoint down".to_string()));
            }
            Ok(self.cash_flow.clone())
        }

        async fn sector_pe_snapshot(&self, _date: NaiveDate) -> Result<Vec<Record>, AnalysisError> {
            self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_snapshot {
                return Err(AnalysisError::ApiError("HTTP 502".to_string()));
            }
            Ok(self.sector_rows.clone())
        }
    }

    fn valuation_provider() -> MockProvider {
        MockProvider {
            sector: Some("Financial Services".to_string()),
            dcf: Some(record(json!({"symbol": "JPM", "dcf": 210.4, "Stock Price": 195.1}))),
            ratios: Some(record(json!({"priceEarningsRatio": "11.5", "currentRatio": 0.9}))),
            sector_rows: records(json!([
                {"date": "2024-03-01", "sector": "Financials", "exchange": "NYSE", "pe": "14.0"},
                {"date": "2024-03-01", "sector": "Technology", "exchange": "NYSE", "pe": "31.0"}
            ])),
            ..Default::default()
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[tokio::test]
    async fn test_valuation_pipeline() {
        let orchestrator = DashboardOrchestrator::new(valuation_provider(), OrchestratorConfig::default());
        let report = orchestrator.analyze_valuation_on(" jpm ", date()).await.unwrap();

        assert_eq!(report.ticker, "JPM");
        assert_eq!(report.dcf_value.value(), Some(210.4));
        assert_eq!(report.stock_price.value(), Some(195.1));
        match &report.pe_comparison {
            PeComparison::Compared { benchmark_sector, comparison, .. } => {
                assert_eq!(benchmark_sector, "Financials");
                assert_eq!(comparison.entity_value(), 11.5);
                assert_eq!(comparison.benchmark_value(), 14.0);
                assert_eq!(comparison.verdict(), RelativeVerdict::Undervalued);
            }
            other => panic!("expected comparison, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_snapshot_is_cached_per_date() {
        let orchestrator = DashboardOrchestrator::new(valuation_provider(), OrchestratorConfig::default());
        orchestrator.analyze_valuation_on("JPM", date()).await.unwrap();
        orchestrator.analyze_valuation_on("BAC", date()).await.unwrap();
        assert_eq!(orchestrator.provider().snapshot_calls.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.cached_snapshots(), 1);

        let next_day = date().succ_opt().unwrap();
        orchestrator.analyze_valuation_on("JPM", next_day).await.unwrap();
        assert_eq!(orchestrator.provider().snapshot_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_refetches() {
        let config = OrchestratorConfig {
            cache_ttl: Duration::ZERO,
            ..Default::default()
        };
        let orchestrator = DashboardOrchestrator::new(valuation_provider(), config);
        orchestrator.get_sector_benchmark(date()).await.unwrap();
        orchestrator.get_sector_benchmark(date()).await.unwrap();
        assert_eq!(orchestrator.provider().snapshot_calls.load(Ordering::SeqCst), 2);

        orchestrator.evict_expired();
        assert_eq!(orchestrator.cached_snapshots(), 0);
    }

    #[tokio::test]
    async fn test_cache_stays_bounded_across_dates() {
        let config = OrchestratorConfig {
            cache_ttl: Duration::ZERO,
            ..Default::default()
        };
        let orchestrator = DashboardOrchestrator::new(valuation_provider(), config);
        let mut day = date();
        for _ in 0..50 {
            orchestrator.analyze_valuation_on("JPM", day).await.unwrap();
            day = day.succ_opt().unwrap();
        }
        assert_eq!(orchestrator.provider().snapshot_calls.load(Ordering::SeqCst), 50);
        assert_eq!(orchestrator.cached_snapshots(), 1);
    }

    #[tokio::test]
    async fn test_fresh_snapshots_for_other_dates_are_kept() {
        let orchestrator = DashboardOrchestrator::new(valuation_provider(), OrchestratorConfig::default());
        let mut day = date();
        for _ in 0..3 {
            orchestrator.get_sector_benchmark(day).await.unwrap();
            day = day.succ_opt().unwrap();
        }
        assert_eq!(orchestrator.cached_snapshots(), 3);
    }

    #[tokio::test]
    async fn test_failed_snapshot_surfaces_benchmark_not_found() {
        let provider = MockProvider {
            fail_snapshot: true,
            ..valuation_provider()
        };
        let orchestrator = DashboardOrchestrator::new(provider, OrchestratorConfig::default());
        let report = orchestrator.analyze_valuation_on("JPM", date()).await.unwrap();
        assert!(matches!(report.pe_comparison, PeComparison::BenchmarkNotFound { .. }));

        // Failures are not cached
        orchestrator.analyze_valuation_on("JPM", date()).await.unwrap();
        assert_eq!(orchestrator.provider().snapshot_calls.load(Ordering::SeqCst), 2);
        assert_eq!(orchestrator.cached_snapshots(), 0);
    }

    #[tokio::test]
    async fn test_unknown_sector_skips_snapshot() {
        let provider = MockProvider {
            fail_profile: true,
            ..valuation_provider()
        };
        let orchestrator = DashboardOrchestrator::new(provider, OrchestratorConfig::default());
        let report = orchestrator.analyze_valuation_on("JPM", date()).await.unwrap();
        assert!(matches!(report.pe_comparison, PeComparison::SectorUnknown));
        assert_eq!(orchestrator.provider().snapshot_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_required_data_is_an_error() {
        let provider = MockProvider {
            ratios: None,
            ..valuation_provider()
        };
        let orchestrator = DashboardOrchestrator::new(provider, OrchestratorConfig::default());
        let err = orchestrator.analyze_valuation_on("JPM", date()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(ref m) if m.contains("JPM")));
    }

    #[tokio::test]
    async fn test_growth_pipeline_with_partial_upstream_failure() {
        let provider = MockProvider {
            key_metrics: records(json!([
                {"date": "2023-12-31", "priceToSalesRatio": 3.2, "revenuePerShare": 10.0},
                {"date": "2022-12-31", "priceToSalesRatio": 2.9, "revenuePerShare": 9.0}
            ])),
            income: records(json!([
                {"date": "2022-12-31", "revenue": 80.0, "grossProfit": 20.0},
                {"date": "2023-12-31", "revenue": 100.0, "grossProfit": 55.0}
            ])),
            fail_cash_flow: true,
            ..Default::default()
        };
        let orchestrator = DashboardOrchestrator::new(provider, OrchestratorConfig::default());
        let report = orchestrator.analyze_growth("acme").await.unwrap();

        let revenue = report.metric("revenueGrowth").unwrap();
        assert!((revenue.reading.value().unwrap() - 25.0).abs() < 1e-9);
        let margin = report.metric("grossProfitMargin").unwrap();
        assert_eq!(margin.label.as_deref(), Some("strong pricing power"));
        // Cash-flow fetch failed and degrades to undefined growth
        assert_eq!(
            report.metric("operatingCashFlowGrowth").unwrap().reading,
            Reading::Unavailable { reason: Unavailable::InsufficientData }
        );
    }

    #[tokio::test]
    async fn test_growth_without_any_data_is_an_error() {
        let orchestrator = DashboardOrchestrator::new(MockProvider::default(), OrchestratorConfig::default());
        assert!(matches!(
            orchestrator.analyze_growth("NONE").await,
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" brk.b ").unwrap(), "BRK.B");
        assert!(normalize_ticker("").is_err());
        assert!(normalize_ticker("AAPL/../x").is_err());
        assert!(normalize_ticker("AAPL?apikey=x").is_err());
    }
}
