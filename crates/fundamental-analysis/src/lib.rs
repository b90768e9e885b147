//! Derived financial metrics: field extraction, YoY growth, sector matching
//! and valuation labels, assembled into the valuation and growth screens.
//!
//! Everything here is pure and synchronous. Missing data is an ordinary
//! outcome and shows up as [`Reading::Unavailable`], never as zero.

pub mod classifier;
pub mod extractor;
pub mod growth;
pub mod guidance;
pub mod report;
pub mod sector;

pub use classifier::{classify_bands, classify_relative, Band, BandTable};
pub use extractor::{coerce, extract, extract_any, extract_field};
pub use growth::{field_growth, percentage_change, series_from_periods, yoy_growth};
pub use guidance::{MetricGuidance, GROWTH_GUIDANCE, RATIO_GUIDANCE};
pub use report::{GrowthReport, MetricReading, PeComparison, ValuationReport};
pub use sector::{benchmark_from_records, SectorAliases, SectorMatcher};

use analysis_core::{FinancialPeriod, Reading, Record, SectorBenchmark, Unavailable};
use chrono::NaiveDate;
use guidance::{GROSS_PROFIT_MARGIN, OCF_GROWTH, PE_RATIO, REVENUE_GROWTH};

const DCF_FIELDS: &[&str] = &["dcf"];
const PRICE_FIELDS: &[&str] = &["Stock Price", "stockPrice"];

/// Inputs for the valuation screen, already fetched
#[derive(Debug, Clone, Copy)]
pub struct ValuationInputs<'a> {
    pub ticker: &'a str,
    pub sector: Option<&'a str>,
    pub as_of: NaiveDate,
    pub dcf: &'a Record,
    pub ratios: &'a Record,
    /// `None` when no snapshot could be obtained for the date
    pub benchmark: Option<&'a SectorBenchmark>,
}

/// Inputs for the growth screen, in any period order
#[derive(Debug, Clone, Copy)]
pub struct GrowthInputs<'a> {
    pub ticker: &'a str,
    pub key_metrics: &'a [FinancialPeriod],
    pub income_statements: &'a [FinancialPeriod],
    pub cash_flow_statements: &'a [FinancialPeriod],
}

pub struct FundamentalAnalysisEngine {
    bands: BandTable,
    matcher: SectorMatcher,
}

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self {
            bands: BandTable::standard(),
            matcher: SectorMatcher::default(),
        }
    }

    pub fn with_aliases(mut self, aliases: SectorAliases) -> Self {
        self.matcher = SectorMatcher::new(aliases);
        self
    }

    fn calculate_gross_margin(&self, gross_profit: f64, revenue: f64) -> Option<f64> {
        if revenue > 0.0 {
            Some((gross_profit / revenue) * 100.0)
        } else {
            None
        }
    }

    fn reading(&self, guide: &MetricGuidance, value: Option<f64>, reason: Unavailable) -> MetricReading {
        let label = value
            .and_then(|v| self.bands.classify(guide.key, v))
            .map(str::to_string);
        MetricReading {
            key: guide.key.to_string(),
            title: guide.title.to_string(),
            guidance: guide.guidance.to_string(),
            reading: Reading::from_option(value, reason),
            label,
        }
    }

    /// Compare a stock's P/E with its sector's, keeping "no sector",
    /// "no stock P/E" and "no benchmark" apart.
    pub fn compare_to_sector(
        &self,
        sector: Option<&str>,
        stock_pe: Option<f64>,
        benchmark: Option<&SectorBenchmark>,
    ) -> PeComparison {
        let sector = match sector.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => s.to_string(),
            None => return PeComparison::SectorUnknown,
        };
        let stock_pe = match stock_pe {
            Some(pe) => pe,
            None => return PeComparison::StockPeUnavailable { sector },
        };
        match benchmark.and_then(|b| self.matcher.find(&sector, b)) {
            Some(entry) => PeComparison::Compared {
                benchmark_sector: entry.sector.clone(),
                comparison: classify_relative(stock_pe, entry.pe),
                sector,
            },
            None => PeComparison::BenchmarkNotFound { sector },
        }
    }

    pub fn valuation_report(&self, inputs: ValuationInputs<'_>) -> ValuationReport {
        let ratios = RATIO_GUIDANCE
            .iter()
            .map(|guide| self.reading(guide, extract(inputs.ratios, guide.key), Unavailable::AbsentValue))
            .collect();

        let stock_pe = extract(inputs.ratios, PE_RATIO);

        ValuationReport {
            ticker: inputs.ticker.to_string(),
            sector: inputs.sector.map(str::to_string),
            as_of: inputs.as_of,
            dcf_value: Reading::from_option(extract_any(inputs.dcf, DCF_FIELDS), Unavailable::AbsentValue),
            stock_price: Reading::from_option(extract_any(inputs.dcf, PRICE_FIELDS), Unavailable::AbsentValue),
            ratios,
            pe_comparison: self.compare_to_sector(inputs.sector, stock_pe, inputs.benchmark),
        }
    }

    pub fn growth_report(&self, inputs: GrowthInputs<'_>) -> GrowthReport {
        let latest_metrics = newest(inputs.key_metrics);

        // Statement revenue when available, otherwise revenue per share
        let revenue_growth = if inputs.income_statements.is_empty() {
            field_growth(inputs.key_metrics, "revenuePerShare")
        } else {
            field_growth(inputs.income_statements, "revenue")
        };

        let gross_margin = newest(inputs.income_statements).and_then(|p| {
            let gross_profit = extract_field(p, "grossProfit")?;
            let revenue = extract_field(p, "revenue")?;
            self.calculate_gross_margin(gross_profit, revenue)
        });

        let ocf_growth = field_growth(inputs.cash_flow_statements, "operatingCashFlow");

        let metrics = GROWTH_GUIDANCE
            .iter()
            .map(|guide| match guide.key {
                REVENUE_GROWTH => self.reading(guide, revenue_growth, Unavailable::InsufficientData),
                OCF_GROWTH => self.reading(guide, ocf_growth, Unavailable::InsufficientData),
                GROSS_PROFIT_MARGIN => self.reading(guide, gross_margin, Unavailable::AbsentValue),
                key => self.reading(
                    guide,
                    latest_metrics.and_then(|p| extract_field(p, key)),
                    Unavailable::AbsentValue,
                ),
            })
            .collect();

        GrowthReport {
            ticker: inputs.ticker.to_string(),
            latest_period: latest_metrics.map(|p| p.period),
            metrics,
        }
    }
}

fn newest(periods: &[FinancialPeriod]) -> Option<&FinancialPeriod> {
    periods.iter().max_by_key(|p| p.period)
}

impl Default for FundamentalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{RelativeVerdict, SectorEntry};
    use crate::guidance::{CURRENT_RATIO, FCF_YIELD, PRICE_TO_SALES, QUICK_RATIO, RETURN_ON_EQUITY};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    fn periods(values: Vec<Value>) -> Vec<FinancialPeriod> {
        FinancialPeriod::from_records(values.into_iter().map(record))
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn benchmark(rows: &[(&str, f64)]) -> SectorBenchmark {
        let mut bench = SectorBenchmark::new(as_of());
        for (sector, pe) in rows {
            bench.insert(SectorEntry {
                sector: sector.to_string(),
                pe: *pe,
                other: HashMap::new(),
            });
        }
        bench
    }

    #[test]
    fn test_valuation_report_compares_against_sector() {
        let engine = FundamentalAnalysisEngine::new();
        let dcf = record(json!({"symbol": "AAPL", "dcf": 151.2, "Stock Price": "172.5"}));
        let ratios = record(json!({
            "priceEarningsRatio": 30.0,
            "currentRatio": "0.98",
            "quickRatio": null,
            "returnOnEquity": 1.56
        }));
        let bench = benchmark(&[("Technology", 20.0)]);

        let report = engine.valuation_report(ValuationInputs {
            ticker: "AAPL",
            sector: Some("Technology"),
            as_of: as_of(),
            dcf: &dcf,
            ratios: &ratios,
            benchmark: Some(&bench),
        });

        assert_eq!(report.dcf_value.value(), Some(151.2));
        assert_eq!(report.stock_price.value(), Some(172.5));

        let pe = report.ratio(PE_RATIO).unwrap();
        assert_eq!(pe.label.as_deref(), Some("overvalued"));
        let current = report.ratio(CURRENT_RATIO).unwrap();
        assert_eq!(current.label.as_deref(), Some("potential liquidity issues"));
        let roe = report.ratio(RETURN_ON_EQUITY).unwrap();
        assert_eq!(roe.label.as_deref(), Some("strong"));

        let quick = report.ratio(QUICK_RATIO).unwrap();
        assert_eq!(quick.reading, Reading::Unavailable { reason: Unavailable::AbsentValue });
        assert!(quick.label.is_none());

        let comparison = report.pe_comparison.comparison().unwrap();
        assert_eq!(comparison.verdict(), RelativeVerdict::Overvalued);
        assert_eq!(comparison.benchmark_value(), 20.0);
    }

    #[test]
    fn test_missing_dcf_fields_are_not_zero() {
        let engine = FundamentalAnalysisEngine::new();
        let dcf = record(json!({"symbol": "XYZ"}));
        let ratios = record(json!({}));
        let report = engine.valuation_report(ValuationInputs {
            ticker: "XYZ",
            sector: None,
            as_of: as_of(),
            dcf: &dcf,
            ratios: &ratios,
            benchmark: None,
        });
        assert!(!report.dcf_value.is_available());
        assert!(!report.stock_price.is_available());
        assert!(report.ratios.iter().all(|m| !m.reading.is_available()));
        assert!(matches!(report.pe_comparison, PeComparison::SectorUnknown));
    }

    #[test]
    fn test_compare_to_sector_states() {
        let engine = FundamentalAnalysisEngine::new();
        let bench = benchmark(&[("Financials", 12.0), ("Energy", 0.0)]);

        assert!(matches!(
            engine.compare_to_sector(Some("  "), Some(10.0), Some(&bench)),
            PeComparison::SectorUnknown
        ));
        assert!(matches!(
            engine.compare_to_sector(Some("Energy"), None, Some(&bench)),
            PeComparison::StockPeUnavailable { .. }
        ));
        assert!(matches!(
            engine.compare_to_sector(Some("Utilities"), Some(10.0), Some(&bench)),
            PeComparison::BenchmarkNotFound { .. }
        ));
        assert!(matches!(
            engine.compare_to_sector(Some("Energy"), Some(10.0), None),
            PeComparison::BenchmarkNotFound { .. }
        ));

        // Default aliases join the profile name to the GICS-style row
        match engine.compare_to_sector(Some("Financial Services"), Some(15.0), Some(&bench)) {
            PeComparison::Compared { sector, benchmark_sector, comparison } => {
                assert_eq!(sector, "Financial Services");
                assert_eq!(benchmark_sector, "Financials");
                assert_eq!(comparison.verdict(), RelativeVerdict::Undervalued);
            }
            other => panic!("expected comparison, got {:?}", other),
        }

        // A zero benchmark is a real value and still compares
        let zero = engine.compare_to_sector(Some("energy"), Some(5.0), Some(&bench));
        assert_eq!(zero.comparison().map(|c| c.verdict()), Some(RelativeVerdict::Overvalued));
    }

    #[test]
    fn test_growth_report_derived_metrics() {
        let engine = FundamentalAnalysisEngine::new();
        let key_metrics = periods(vec![
            json!({"date": "2022-09-24", "priceToSalesRatio": 6.1, "freeCashFlowYield": 0.04}),
            json!({"date": "2023-09-30", "priceToSalesRatio": "7.4", "freeCashFlowYield": null}),
        ]);
        let income = periods(vec![
            json!({"date": "2023-09-30", "revenue": 100.0, "grossProfit": 45.0}),
            json!({"date": "2022-09-24", "revenue": 80.0, "grossProfit": 30.0}),
        ]);
        let cash_flow = periods(vec![
            json!({"date": "2023-09-30", "operatingCashFlow": 90.0}),
            json!({"date": "2022-09-24", "operatingCashFlow": 100.0}),
        ]);

        let report = engine.growth_report(GrowthInputs {
            ticker: "AAPL",
            key_metrics: &key_metrics,
            income_statements: &income,
            cash_flow_statements: &cash_flow,
        });

        let revenue = report.metric(REVENUE_GROWTH).unwrap();
        assert!((revenue.reading.value().unwrap() - 25.0).abs() < 1e-9);
        assert_eq!(revenue.label.as_deref(), Some("strong"));

        let margin = report.metric(GROSS_PROFIT_MARGIN).unwrap();
        assert!((margin.reading.value().unwrap() - 45.0).abs() < 1e-9);
        assert_eq!(margin.label.as_deref(), Some("average"));

        let ocf = report.metric(OCF_GROWTH).unwrap();
        assert!((ocf.reading.value().unwrap() - (-10.0)).abs() < 1e-9);
        assert_eq!(ocf.label.as_deref(), Some("declining"));

        // Snapshot values come from the newest period regardless of input order
        assert_eq!(report.metric(PRICE_TO_SALES).unwrap().reading.value(), Some(7.4));
        assert!(!report.metric(FCF_YIELD).unwrap().reading.is_available());
        assert_eq!(report.metrics.len(), GROWTH_GUIDANCE.len());
    }

    #[test]
    fn test_growth_report_falls_back_to_revenue_per_share() {
        let engine = FundamentalAnalysisEngine::new();
        let key_metrics = periods(vec![
            json!({"calendarYear": "2023", "revenuePerShare": 24.0}),
            json!({"calendarYear": "2022", "revenuePerShare": 20.0}),
        ]);
        let report = engine.growth_report(GrowthInputs {
            ticker: "MSFT",
            key_metrics: &key_metrics,
            income_statements: &[],
            cash_flow_statements: &[],
        });
        let revenue = report.metric(REVENUE_GROWTH).unwrap();
        assert!((revenue.reading.value().unwrap() - 20.0).abs() < 1e-9);

        assert_eq!(
            report.metric(OCF_GROWTH).unwrap().reading,
            Reading::Unavailable { reason: Unavailable::InsufficientData }
        );
        assert_eq!(
            report.metric(GROSS_PROFIT_MARGIN).unwrap().reading,
            Reading::Unavailable { reason: Unavailable::AbsentValue }
        );
    }

    #[test]
    fn test_growth_undefined_with_zero_latest() {
        let engine = FundamentalAnalysisEngine::new();
        let income = periods(vec![
            json!({"calendarYear": "2023", "revenue": 0}),
            json!({"calendarYear": "2022", "revenue": 100}),
        ]);
        let report = engine.growth_report(GrowthInputs {
            ticker: "ZERO",
            key_metrics: &[],
            income_statements: &income,
            cash_flow_statements: &[],
        });
        assert_eq!(
            report.metric(REVENUE_GROWTH).unwrap().reading,
            Reading::Unavailable { reason: Unavailable::InsufficientData }
        );
        // Latest revenue is zero, so no margin either
        assert!(!report.metric(GROSS_PROFIT_MARGIN).unwrap().reading.is_available());
        assert!(report.latest_period.is_none());
    }
}
