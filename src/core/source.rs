//! Upstream fund data abstractions

use super::fund::{FundCode, FundProfile, NavRow, Quote};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// A third-party portal that knows about funds. Each method maps to one
/// upstream page or endpoint; combining them is left to
/// [`crate::core::resolver::FundResolver`].
#[async_trait]
pub trait FundSource: Send + Sync {
    /// Real-time quote. `Ok(None)` when the endpoint answered without data.
    async fn realtime_quote(&self, code: &FundCode) -> Result<Option<Quote>>;

    /// Published NAV rows of the last few days, most recent first.
    async fn recent_navs(&self, code: &FundCode) -> Result<Vec<NavRow>>;

    /// Published NAV rows between `start` and `end` inclusive, most recent
    /// first.
    async fn nav_history(
        &self,
        code: &FundCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NavRow>>;

    /// Fund name scraped from the detail page.
    async fn page_name(&self, code: &FundCode) -> Result<Option<String>>;

    /// Most recent dividend date. Upstream failures count as "none found".
    async fn dividend_date(&self, code: &FundCode) -> Option<String>;

    async fn profile(&self, code: &FundCode) -> Result<FundProfile>;
}
