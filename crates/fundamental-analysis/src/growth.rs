//! Period-over-period growth.

use analysis_core::{FinancialPeriod, MetricSeries};
use crate::extractor::extract_field;

/// Build the series for `field`, sorted newest first, keeping only positive values.
pub fn series_from_periods(periods: &[FinancialPeriod], field: &str) -> MetricSeries {
    MetricSeries::new(
        field,
        periods
            .iter()
            .filter_map(|p| extract_field(p, field).map(|v| (p.period, v))),
    )
}

/// `((latest - previous) / previous) * 100`, `None` when `previous` is zero
/// or the result is not finite.
pub fn percentage_change(latest: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    let change = ((latest - previous) / previous) * 100.0;
    change.is_finite().then_some(change)
}

/// Growth between the two most recent valid points, `None` with fewer than two.
pub fn yoy_growth(series: &MetricSeries) -> Option<f64> {
    let (latest, previous) = series.latest_pair()?;
    percentage_change(latest, previous)
}

pub fn field_growth(periods: &[FinancialPeriod], field: &str) -> Option<f64> {
    yoy_growth(&series_from_periods(periods, field))
}
