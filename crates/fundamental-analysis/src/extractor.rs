//! Numeric field extraction from loosely typed provider records.
//!
//! Providers mix numbers, numeric strings, nulls and the odd placeholder
//! string in the same field across periods. Everything funnels through
//! [`coerce`] so every consumer sees the same present/absent semantics.

use analysis_core::{FinancialPeriod, Record};
use serde_json::Value;

/// Convert a raw value to a finite `f64`, or `None` when it is not numeric.
pub fn coerce(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

pub fn extract(record: &Record, field: &str) -> Option<f64> {
    record.get(field).and_then(coerce)
}

pub fn extract_field(period: &FinancialPeriod, field: &str) -> Option<f64> {
    extract(&period.record, field)
}

/// First field of `fields` that yields a number.
pub fn extract_any(record: &Record, fields: &[&str]) -> Option<f64> {
    fields.iter().find_map(|field| extract(record, field))
}
