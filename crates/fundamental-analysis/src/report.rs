use analysis_core::{ComparisonResult, PeriodId, Reading};
use chrono::NaiveDate;
use serde::Serialize;

/// One metric on a screen, ready for the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct MetricReading {
    pub key: String,
    pub title: String,
    pub guidance: String,
    pub reading: Reading,
    /// Band label when the metric has thresholds and a value
    pub label: Option<String>,
}

/// State of the stock-vs-sector P/E comparison
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PeComparison {
    Compared {
        sector: String,
        /// Sector name as spelled by the benchmark snapshot
        benchmark_sector: String,
        comparison: ComparisonResult,
    },
    SectorUnknown,
    StockPeUnavailable {
        sector: String,
    },
    BenchmarkNotFound {
        sector: String,
    },
}

impl PeComparison {
    pub fn comparison(&self) -> Option<&ComparisonResult> {
        match self {
            PeComparison::Compared { comparison, .. } => Some(comparison),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValuationReport {
    pub ticker: String,
    pub sector: Option<String>,
    pub as_of: NaiveDate,
    pub dcf_value: Reading,
    pub stock_price: Reading,
    pub ratios: Vec<MetricReading>,
    pub pe_comparison: PeComparison,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrowthReport {
    pub ticker: String,
    /// Newest key-metrics period the snapshot values were read from
    pub latest_period: Option<PeriodId>,
    pub metrics: Vec<MetricReading>,
}

impl ValuationReport {
    pub fn ratio(&self, key: &str) -> Option<&MetricReading> {
        self.ratios.iter().find(|m| m.key == key)
    }
}

impl GrowthReport {
    pub fn metric(&self, key: &str) -> Option<&MetricReading> {
        self.metrics.iter().find(|m| m.key == key)
    }
}
