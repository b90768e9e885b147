//! Joining a company's sector to a sector benchmark entry.
//!
//! Profile and benchmark endpoints do not share a taxonomy, so the target
//! name may first be mapped through an alias table. Matching is exact after
//! normalization: never fuzzy, never a substring.

use analysis_core::{normalize_sector_name, AnalysisError, Record, SectorBenchmark, SectorEntry};
use chrono::NaiveDate;
use std::collections::HashMap;
use crate::extractor::{coerce, extract};

/// Default mapping from profile sector names to GICS-style benchmark names
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("Financial Services", "Financials"),
    ("Consumer Cyclical", "Consumer Discretionary"),
    ("Consumer Defensive", "Consumer Staples"),
    ("Basic Materials", "Materials"),
    ("Healthcare", "Health Care"),
];

/// Sector name aliases, keyed by normalized source name
#[derive(Debug, Clone, PartialEq)]
pub struct SectorAliases {
    map: HashMap<String, String>,
}

impl SectorAliases {
    pub fn empty() -> Self {
        Self { map: HashMap::new() }
    }

    pub fn insert(&mut self, from: &str, to: &str) {
        self.map.insert(normalize_sector_name(from), to.trim().to_string());
    }

    /// Parse `from=to` pairs separated by `;`, e.g.
    /// `"Financial Services=Financials;Healthcare=Health Care"`.
    pub fn parse(list: &str) -> Result<Self, AnalysisError> {
        let mut aliases = Self::empty();
        for pair in list.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (from, to) = pair.split_once('=').ok_or_else(|| {
                AnalysisError::ConfigError(format!("sector alias '{}' is not of the form from=to", pair))
            })?;
            if from.trim().is_empty() || to.trim().is_empty() {
                return Err(AnalysisError::ConfigError(format!(
                    "sector alias '{}' has an empty side",
                    pair
                )));
            }
            aliases.insert(from, to);
        }
        Ok(aliases)
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.map.get(&normalize_sector_name(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for SectorAliases {
    fn default() -> Self {
        let mut aliases = Self::empty();
        for (from, to) in DEFAULT_ALIASES {
            aliases.insert(from, to);
        }
        aliases
    }
}

#[derive(Debug, Clone, Default)]
pub struct SectorMatcher {
    aliases: SectorAliases,
}

impl SectorMatcher {
    pub fn new(aliases: SectorAliases) -> Self {
        Self { aliases }
    }

    /// Find the benchmark entry for `target`.
    ///
    /// The alias target is tried first, then the name itself. `None` means
    /// the sector has no benchmark, which is not the same as a zero P/E.
    pub fn find<'a>(&self, target: &str, benchmark: &'a SectorBenchmark) -> Option<&'a SectorEntry> {
        let direct = normalize_sector_name(target);
        if direct.is_empty() {
            return None;
        }

        self.aliases
            .resolve(target)
            .and_then(|canonical| benchmark.get(&normalize_sector_name(canonical)))
            .or_else(|| benchmark.get(&direct))
    }
}

/// Build a benchmark from raw snapshot rows.
///
/// Rows without a sector name or without a numeric `pe` are skipped rather
/// than stored as zero. Other numeric fields are kept alongside the P/E.
pub fn benchmark_from_records(as_of: NaiveDate, records: &[Record]) -> SectorBenchmark {
    let mut benchmark = SectorBenchmark::new(as_of);
    for record in records {
        let sector = match record.get("sector").and_then(|v| v.as_str()).map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => continue,
        };
        let pe = match extract(record, "pe") {
            Some(pe) => pe,
            None => continue,
        };
        let other = record
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "pe" | "sector" | "date" | "exchange"))
            .filter_map(|(key, value)| coerce(value).map(|v| (key.clone(), v)))
            .collect();
        benchmark.insert(SectorEntry {
            sector: sector.to_string(),
            pe,
            other,
        });
    }
    benchmark
}
