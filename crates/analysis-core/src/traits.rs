use async_trait::async_trait;
use chrono::NaiveDate;
use crate::{AnalysisError, Record};

/// Source of raw financial records and sector benchmark snapshots.
///
/// Every call may fail (network, non-success status, error payload) or
/// succeed with partial records. Empty results are not errors.
#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    /// Trimmed sector name from the company profile, `None` when not reported
    async fn company_sector(&self, ticker: &str) -> Result<Option<String>, AnalysisError>;

    /// Latest discounted-cash-flow record
    async fn dcf(&self, ticker: &str) -> Result<Option<Record>, AnalysisError>;

    /// Latest annual ratios record
    async fn ratios(&self, ticker: &str) -> Result<Option<Record>, AnalysisError>;

    async fn key_metrics(&self, ticker: &str, years: u32) -> Result<Vec<Record>, AnalysisError>;

    async fn income_statements(&self, ticker: &str, years: u32) -> Result<Vec<Record>, AnalysisError>;

    async fn cash_flow_statements(&self, ticker: &str, years: u32) -> Result<Vec<Record>, AnalysisError>;

    /// Raw sector P/E rows (`sector`, `pe`, ...) for one date
    async fn sector_pe_snapshot(&self, date: NaiveDate) -> Result<Vec<Record>, AnalysisError>;
}
