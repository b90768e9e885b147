//! Plain-text rendering of the screens. Unavailable values always print as
//! `N/A` with the reason, never as a number.

use analysis_core::Reading;
use fundamental_analysis::{GrowthReport, MetricReading, PeComparison, ValuationReport};
use std::fmt::Write;

pub const NOT_AVAILABLE: &str = "N/A";

pub fn format_reading(reading: &Reading, prefix: &str, suffix: &str) -> String {
    match reading.value() {
        Some(v) => format!("{}{:.2}{}", prefix, v, suffix),
        None => match reading.reason() {
            Some(reason) => format!("{} ({})", NOT_AVAILABLE, reason.to_label()),
            None => NOT_AVAILABLE.to_string(),
        },
    }
}

fn write_metric(out: &mut String, metric: &MetricReading, suffix: &str) {
    let _ = write!(out, "{}: {}", metric.title, format_reading(&metric.reading, "", suffix));
    if let Some(label) = &metric.label {
        let _ = write!(out, " ({})", label);
    }
    let _ = writeln!(out, "\n  {}", metric.guidance);
}

pub fn render_valuation(report: &ValuationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Valuation Metrics for {} (as of {})", report.ticker, report.as_of);
    let _ = writeln!(out, "DCF Valuation: {}", format_reading(&report.dcf_value, "$", ""));
    let _ = writeln!(out, "Stock Price: {}", format_reading(&report.stock_price, "$", ""));

    let _ = writeln!(out, "\nKey Financial Ratios");
    for metric in &report.ratios {
        write_metric(&mut out, metric, "");
    }

    let _ = writeln!(out, "\nP/E Ratio Comparison");
    match &report.pe_comparison {
        PeComparison::Compared { sector, comparison, .. } => {
            let _ = writeln!(out, "{} P/E: {:.2}", report.ticker, comparison.entity_value());
            let _ = writeln!(out, "{} Sector P/E: {:.2}", sector, comparison.benchmark_value());
            let _ = writeln!(
                out,
                "{} P/E is {}.",
                report.ticker,
                comparison.verdict().to_label()
            );
        }
        PeComparison::SectorUnknown => {
            let _ = writeln!(out, "Sector for {} is not available.", report.ticker);
        }
        PeComparison::StockPeUnavailable { .. } => {
            let _ = writeln!(out, "P/E for {} is not available.", report.ticker);
        }
        PeComparison::BenchmarkNotFound { sector } => {
            let _ = writeln!(out, "Sector P/E ratio for {} is not available.", sector);
        }
    }
    out
}

pub fn render_growth(report: &GrowthReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Growth Metrics for {}", report.ticker);
    if let Some(period) = report.latest_period {
        let _ = writeln!(out, "Latest period: {}", period);
    }
    let _ = writeln!(out);
    for metric in &report.metrics {
        let suffix = match metric.key.as_str() {
            "revenueGrowth" | "grossProfitMargin" | "operatingCashFlowGrowth" => "%",
            _ => "",
        };
        write_metric(&mut out, metric, suffix);
    }
    out
}
