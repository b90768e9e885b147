//! Qualitative labels for ratio values.
//!
//! Threshold-band mode maps a metric key to ordered bands; each band covers
//! `[lower, next lower)` and the first one starts at negative infinity, so
//! every real value falls in exactly one band. Relative mode compares a value
//! against a paired benchmark.

use analysis_core::{AnalysisError, ComparisonResult};
use std::collections::HashMap;
use crate::guidance::{
    CURRENT_RATIO, DEBT_EQUITY_RATIO, GROSS_PROFIT_MARGIN, OCF_GROWTH, PE_RATIO, QUICK_RATIO,
    RETURN_ON_EQUITY, REVENUE_GROWTH,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    /// Inclusive lower bound
    pub lower: f64,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct BandTable {
    bands: HashMap<String, Vec<Band>>,
}

impl BandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `metric` with `floor_label` below the first threshold and
    /// `(threshold, label)` pairs above it. Thresholds must be finite and
    /// strictly increasing. Re-registering a metric replaces its bands.
    pub fn insert(
        &mut self,
        metric: &str,
        floor_label: &str,
        thresholds: &[(f64, &str)],
    ) -> Result<(), AnalysisError> {
        let mut bands = vec![Band {
            lower: f64::NEG_INFINITY,
            label: floor_label.to_string(),
        }];
        for (threshold, label) in thresholds {
            let previous = bands.last().map(|b| b.lower).unwrap_or(f64::NEG_INFINITY);
            if !threshold.is_finite() || *threshold <= previous {
                return Err(AnalysisError::InvalidData(format!(
                    "thresholds for {} must be finite and strictly increasing (got {} after {})",
                    metric, threshold, previous
                )));
            }
            bands.push(Band {
                lower: *threshold,
                label: label.to_string(),
            });
        }
        self.bands.insert(metric.to_string(), bands);
        Ok(())
    }

    pub fn bands(&self, metric: &str) -> Option<&[Band]> {
        self.bands.get(metric).map(Vec::as_slice)
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.bands.contains_key(metric)
    }

    /// Label for `value`; `None` for an unregistered metric or NaN.
    pub fn classify(&self, metric: &str, value: f64) -> Option<&str> {
        classify_bands(self.bands(metric)?, value)
    }

    /// Bands from the guidance tables. Ratios from the provider keep its
    /// units (return on equity is a fraction); derived growth and margin
    /// figures are percentages.
    pub fn standard() -> Self {
        let defaults: [(&str, Vec<Band>); 8] = [
            (PE_RATIO, ladder("undervalued", &[(15.0, "fairly valued"), (25.0, "overvalued")])),
            (CURRENT_RATIO, ladder("potential liquidity issues", &[(1.0, "adequate"), (1.5, "strong liquidity")])),
            (QUICK_RATIO, ladder("risky", &[(0.5, "acceptable"), (1.0, "strong liquidity")])),
            (DEBT_EQUITY_RATIO, ladder("conservative financing", &[(1.0, "moderate risk"), (2.0, "highly leveraged")])),
            (RETURN_ON_EQUITY, ladder("weak", &[(0.10, "average"), (0.15, "strong")])),
            (REVENUE_GROWTH, ladder("weak", &[(10.0, "average"), (20.0, "strong")])),
            (GROSS_PROFIT_MARGIN, ladder("low", &[(20.0, "average"), (50.0, "strong pricing power")])),
            (OCF_GROWTH, ladder("declining", &[(0.0, "growing")])),
        ];
        Self {
            bands: defaults
                .into_iter()
                .map(|(metric, bands)| (metric.to_string(), bands))
                .collect(),
        }
    }
}

/// Bands for a fixed, already ordered threshold list.
fn ladder(floor_label: &str, thresholds: &[(f64, &str)]) -> Vec<Band> {
    std::iter::once(Band {
        lower: f64::NEG_INFINITY,
        label: floor_label.to_string(),
    })
    .chain(thresholds.iter().map(|(lower, label)| Band {
        lower: *lower,
        label: label.to_string(),
    }))
    .collect()
}

pub fn classify_bands(bands: &[Band], value: f64) -> Option<&str> {
    if value.is_nan() {
        return None;
    }
    bands
        .iter()
        .rev()
        .find(|band| value >= band.lower)
        .map(|band| band.label.as_str())
}

/// Relative mode: the verdict is derived from the pair and never stored apart from it.
pub fn classify_relative(entity: f64, benchmark: f64) -> ComparisonResult {
    ComparisonResult::relative(entity, benchmark)
}
