use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// One loosely typed record as returned by the data provider.
pub type Record = serde_json::Map<String, Value>;

/// Reporting period identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodId {
    Date(NaiveDate),
    FiscalYear(i32),
}

impl PeriodId {
    fn sort_key(&self) -> (i32, u32) {
        match self {
            PeriodId::Date(d) => (d.year(), d.ordinal()),
            // A bare fiscal year sorts after every dated period of that year
            PeriodId::FiscalYear(y) => (*y, 367),
        }
    }

    pub fn year(&self) -> i32 {
        self.sort_key().0
    }

    /// Read the period from a provider record: `date` first, then
    /// `calendarYear` / `fiscalYear` (number or numeric string).
    pub fn from_record(record: &Record) -> Option<Self> {
        if let Some(date) = record.get("date").and_then(|v| v.as_str()) {
            if let Ok(d) = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
                return Some(PeriodId::Date(d));
            }
        }

        ["calendarYear", "fiscalYear"]
            .iter()
            .find_map(|key| match record.get(*key)? {
                Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
                Value::String(s) => s.trim().parse::<i32>().ok(),
                _ => None,
            })
            .map(PeriodId::FiscalYear)
    }
}

impl Ord for PeriodId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for PeriodId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodId::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            PeriodId::FiscalYear(y) => write!(f, "FY{}", y),
        }
    }
}

/// One reporting period's raw data, immutable once fetched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialPeriod {
    pub period: PeriodId,
    pub record: Record,
}

impl FinancialPeriod {
    /// Wrap a raw record; `None` when it carries no usable period identifier.
    pub fn from_record(record: Record) -> Option<Self> {
        let period = PeriodId::from_record(&record)?;
        Some(Self { period, record })
    }

    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Vec<Self> {
        records.into_iter().filter_map(Self::from_record).collect()
    }
}

/// Values of one metric across periods, newest first.
///
/// Only strictly positive, finite values are kept: zero and negative
/// readings are treated as missing data. When two points share a period
/// the first one supplied wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    metric: String,
    points: Vec<(PeriodId, f64)>,
}

impl MetricSeries {
    pub fn new(metric: impl Into<String>, points: impl IntoIterator<Item = (PeriodId, f64)>) -> Self {
        let mut points: Vec<(PeriodId, f64)> = points
            .into_iter()
            .filter(|(_, v)| v.is_finite() && *v > 0.0)
            .collect();
        // Stable sort keeps the first-supplied point ahead of later duplicates
        points.sort_by(|a, b| b.0.cmp(&a.0));
        points.dedup_by_key(|(period, _)| *period);

        Self {
            metric: metric.into(),
            points,
        }
    }

    pub fn points(&self) -> &[(PeriodId, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<(PeriodId, f64)> {
        self.points.first().copied()
    }

    /// The two most recent valid values as `(latest, previous)`.
    pub fn latest_pair(&self) -> Option<(f64, f64)> {
        match self.points.as_slice() {
            [(_, latest), (_, previous), ..] => Some((*latest, *previous)),
            _ => None,
        }
    }
}

/// Canonical form of a sector name: whitespace runs collapsed, trimmed, lowercased.
pub fn normalize_sector_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One sector row of a benchmark snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorEntry {
    /// Sector name as the provider spelled it
    pub sector: String,
    pub pe: f64,
    /// Any other numeric fields the snapshot carried for this sector
    #[serde(default)]
    pub other: HashMap<String, f64>,
}

/// Sector-level P/E values for one snapshot date, keyed by normalized sector name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorBenchmark {
    as_of: NaiveDate,
    entries: HashMap<String, SectorEntry>,
}

impl SectorBenchmark {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            entries: HashMap::new(),
        }
    }

    /// Add a sector row. The first row for a sector wins; returns `false`
    /// when the sector was already present.
    pub fn insert(&mut self, entry: SectorEntry) -> bool {
        let key = normalize_sector_name(&entry.sector);
        if key.is_empty() || self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    /// Look up by an already-normalized key.
    pub fn get(&self, normalized: &str) -> Option<&SectorEntry> {
        self.entries.get(normalized)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of comparing an entity ratio against its benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativeVerdict {
    Overvalued,
    Undervalued,
}

impl RelativeVerdict {
    /// Strictly above the benchmark is overvalued; ties fall to undervalued.
    pub fn from_values(entity: f64, benchmark: f64) -> Self {
        if entity > benchmark {
            RelativeVerdict::Overvalued
        } else {
            RelativeVerdict::Undervalued
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            RelativeVerdict::Overvalued => "higher than benchmark - possibly overvalued",
            RelativeVerdict::Undervalued => "lower than benchmark - possibly undervalued",
        }
    }
}

/// Entity value, benchmark value and the verdict derived from them.
///
/// Only constructible through [`ComparisonResult::relative`], so the verdict
/// always agrees with the pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparisonResult {
    entity_value: f64,
    benchmark_value: f64,
    verdict: RelativeVerdict,
}

impl ComparisonResult {
    pub fn relative(entity_value: f64, benchmark_value: f64) -> Self {
        Self {
            entity_value,
            benchmark_value,
            verdict: RelativeVerdict::from_values(entity_value, benchmark_value),
        }
    }

    pub fn entity_value(&self) -> f64 {
        self.entity_value
    }

    pub fn benchmark_value(&self) -> f64 {
        self.benchmark_value
    }

    pub fn verdict(&self) -> RelativeVerdict {
        self.verdict
    }
}

/// Why a metric could not be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unavailable {
    /// Field missing or not numeric
    AbsentValue,
    /// Fewer than two valid points for a growth figure
    InsufficientData,
}

impl Unavailable {
    pub fn to_label(&self) -> &'static str {
        match self {
            Unavailable::AbsentValue => "value not reported",
            Unavailable::InsufficientData => "not enough periods",
        }
    }
}

/// A metric value or the explicit reason it is missing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reading {
    Value { value: f64 },
    Unavailable { reason: Unavailable },
}

impl Reading {
    pub fn from_option(value: Option<f64>, reason: Unavailable) -> Self {
        match value {
            Some(value) => Reading::Value { value },
            None => Reading::Unavailable { reason },
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Value { value } => Some(*value),
            Reading::Unavailable { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<Unavailable> {
        match self {
            Reading::Value { .. } => None,
            Reading::Unavailable { reason } => Some(*reason),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Reading::Value { .. })
    }
}
