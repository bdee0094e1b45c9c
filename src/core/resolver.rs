//! Combines the upstream sources into one view of a fund.

use super::cache::Cache;
use super::fund::{FundCode, FundProfile, HistoryRange, NavPoint, NavRow, ResolvedFundData};
use super::source::FundSource;
use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

pub type NameCache = dyn Cache<String, String>;

pub struct FundResolver {
    source: Arc<dyn FundSource>,
    names: Arc<NameCache>,
}

impl FundResolver {
    pub fn new(source: Arc<dyn FundSource>, names: Arc<NameCache>) -> Self {
        Self { source, names }
    }

    /// Name only. A cached name avoids any upstream call.
    pub async fn resolve_name(&self, code: &FundCode) -> Option<String> {
        if let Some(name) = self.names.get(&code.to_string()).await {
            return Some(name);
        }

        let quoted = match self.source.realtime_quote(code).await {
            Ok(quote) => quote.and_then(|q| non_blank(q.name)),
            Err(e) => {
                debug!("Real-time quote failed for fund {}: {:#}", code, e);
                None
            }
        };
        let name = match quoted {
            Some(name) => Some(name),
            None => self.scrape_name(code).await,
        };

        if let Some(name) = &name {
            self.names.put(code.to_string(), name.clone()).await;
        }
        name
    }

    /// Name, NAV, day growth and dividend date, merged from whichever
    /// sources answered.
    pub async fn resolve_info(&self, code: &FundCode) -> ResolvedFundData {
        let mut data = self.resolve_quote(code).await;
        data.dividend_date = self.source.dividend_date(code).await;
        data
    }

    /// Whether the portal knows the code at all, i.e. yields a name or a NAV.
    pub async fn is_known(&self, code: &FundCode) -> bool {
        let data = self.resolve_quote(code).await;
        data.name.is_some() || data.net_value.is_some()
    }

    /// Published NAVs over `range` ending at `end`, oldest first. Rows whose
    /// NAV is not a number are skipped.
    pub async fn resolve_history(
        &self,
        code: &FundCode,
        range: HistoryRange,
        end: NaiveDate,
    ) -> Result<Vec<NavPoint>> {
        let rows = self
            .source
            .nav_history(code, range.start(end), end)
            .await?;
        let mut points: Vec<NavPoint> = rows
            .iter()
            .filter_map(|row| {
                let net_value = row.net_value.parse::<f64>().ok()?;
                Some(NavPoint {
                    date: row.date.clone(),
                    net_value,
                })
            })
            .collect();
        points.reverse();
        debug!("Fund {} has {} NAV points over {}", code, points.len(), range);
        Ok(points)
    }

    /// Everything but the dividend date.
    async fn resolve_quote(&self, code: &FundCode) -> ResolvedFundData {
        let mut data = ResolvedFundData::new(code);

        match self.source.realtime_quote(code).await {
            Ok(Some(quote)) => {
                data.name = non_blank(quote.name);
                data.net_value = non_blank(quote.net_value);
                data.net_value_date = non_blank(quote.net_value_date);
                data.day_growth = non_blank(quote.day_growth);
            }
            Ok(None) => debug!("No real-time quote for fund {}", code),
            Err(e) => debug!("Real-time quote failed for fund {}: {:#}", code, e),
        }

        match &data.name {
            Some(name) => self.names.put(code.to_string(), name.clone()).await,
            None => data.name = self.names.get(&code.to_string()).await,
        }

        if data.net_value.is_none() {
            self.fill_from_history(code, &mut data).await;
        }

        if data.name.is_none() {
            data.name = self.scrape_name(code).await;
            if let Some(name) = &data.name {
                self.names.put(code.to_string(), name.clone()).await;
            }
        }
        data
    }

    pub async fn resolve_dividend(&self, code: &FundCode) -> Option<String> {
        self.source.dividend_date(code).await
    }

    pub async fn resolve_profile(&self, code: &FundCode) -> Result<FundProfile> {
        self.source.profile(code).await
    }

    async fn fill_from_history(&self, code: &FundCode, data: &mut ResolvedFundData) {
        let rows = match self.source.recent_navs(code).await {
            Ok(rows) => rows,
            Err(e) => {
                debug!("NAV history failed for fund {}: {:#}", code, e);
                return;
            }
        };

        let Some(latest) = rows.first() else {
            debug!("NAV history is empty for fund {}", code);
            return;
        };
        data.net_value = Some(latest.net_value.clone());
        data.net_value_date = Some(latest.date.clone());
        data.day_growth = rows.get(1).and_then(|previous| day_growth(latest, previous));
    }

    async fn scrape_name(&self, code: &FundCode) -> Option<String> {
        match self.source.page_name(code).await {
            Ok(name) => name,
            Err(e) => {
                debug!("Detail page failed for fund {}: {:#}", code, e);
                None
            }
        }
    }
}

/// Upstream sends empty strings for fields it has no value for.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Percentage change between two published NAVs, two decimals.
fn day_growth(latest: &NavRow, previous: &NavRow) -> Option<String> {
    let latest: f64 = latest.net_value.parse().ok()?;
    let previous: f64 = previous.net_value.parse().ok()?;
    if previous == 0.0 {
        return None;
    }
    let growth = (latest - previous) / previous * 100.0;
    growth.is_finite().then(|| format!("{growth:.2}"))
}
