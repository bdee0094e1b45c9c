use super::ui;
use crate::core::fund::{FundEntry, ResolvedFundData};
use crate::core::resolver::FundResolver;
use crate::store::fund_list::FundListStore;
use anyhow::Result;
use chrono::{Local, NaiveDate};
use comfy_table::Cell;
use futures::future::join_all;

/// Dividends paid within this many days are highlighted.
const RECENT_DIVIDEND_DAYS: i64 = 45;

#[derive(Debug, Clone)]
pub struct FundHolding {
    pub entry: FundEntry,
    pub data: ResolvedFundData,
}

impl FundHolding {
    pub fn net_value(&self) -> Option<f64> {
        self.data.net_value.as_deref()?.parse().ok()
    }

    pub fn market_value(&self) -> Option<f64> {
        Some(self.entry.shares? * self.net_value()?)
    }
}

#[derive(Debug)]
pub struct FundListSummary {
    pub holdings: Vec<FundHolding>,
    pub today: NaiveDate,
}

pub fn is_recent_dividend(date: &str, today: NaiveDate) -> bool {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| (0..=RECENT_DIVIDEND_DAYS).contains(&(today - d).num_days()))
        .unwrap_or(false)
}

impl FundListSummary {
    /// Sum over the holdings whose value is known.
    pub fn total_market_value(&self) -> Option<f64> {
        let values: Vec<f64> = self
            .holdings
            .iter()
            .filter_map(FundHolding::market_value)
            .collect();
        (!values.is_empty()).then(|| values.iter().sum())
    }

    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Fund"),
            ui::header_cell("Code"),
            ui::header_cell("NAV Date"),
            ui::header_cell("NAV"),
            ui::header_cell("Day"),
            ui::header_cell("Shares"),
            ui::header_cell("Value"),
            ui::header_cell("Dividend"),
        ]);

        for holding in &self.holdings {
            let data = &holding.data;
            let name = data.name.as_deref().unwrap_or("-");
            let growth = data.day_growth.as_deref().and_then(|g| g.parse().ok());
            let dividend = data.dividend_date.as_deref();
            let recent = dividend.is_some_and(|d| is_recent_dividend(d, self.today));

            table.add_row(vec![
                Cell::new(name),
                Cell::new(holding.entry.code.as_str()),
                Cell::new(data.net_value_date.as_deref().unwrap_or("-")),
                ui::format_optional_cell(holding.net_value(), |v| format!("{v:.4}")),
                ui::growth_cell(growth),
                ui::format_optional_cell(holding.entry.shares, |s| format!("{s:.2}")),
                ui::format_optional_cell(holding.market_value(), |v| format!("{v:.2}")),
                ui::dividend_cell(dividend, recent),
            ]);
        }

        let total = match self.total_market_value() {
            Some(v) => ui::style_text(&format!("{v:.2}"), ui::StyleType::TotalValue),
            None => ui::style_text("-", ui::StyleType::Error),
        };

        let mut output = format!(
            "{}\n\n",
            ui::style_text("Fund List", ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{}: {}",
            ui::style_text("Total Market Value", ui::StyleType::TotalLabel),
            total
        ));
        output
    }
}

/// Resolves every stored fund and prints the summary table.
pub async fn run(store: &FundListStore, resolver: &FundResolver) -> Result<()> {
    let funds = store.list().await?;
    if funds.is_empty() {
        println!("No funds tracked yet. Add some through the web client first.");
        return Ok(());
    }

    let pb = ui::new_progress_bar(funds.len() as u64);
    pb.set_message("Fetching fund data...");

    let futures = funds.into_iter().map(|entry| {
        let pb = pb.clone();
        async move {
            let data = resolver.resolve_info(&entry.code).await;
            pb.inc(1);
            FundHolding { entry, data }
        }
    });
    let holdings = join_all(futures).await;
    pb.finish_and_clear();

    let summary = FundListSummary {
        holdings,
        today: Local::now().date_naive(),
    };
    println!("{}", summary.display_as_table());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fund::FundCode;

    fn holding(code: &str, shares: Option<f64>, nav: Option<&str>) -> FundHolding {
        let code = FundCode::parse(code).unwrap();
        let mut data = ResolvedFundData::new(&code);
        data.name = Some(format!("Fund {code}"));
        data.net_value = nav.map(str::to_string);
        FundHolding {
            entry: FundEntry { code, shares },
            data,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[test]
    fn test_market_value() {
        assert_eq!(
            holding("000001", Some(100.0), Some("1.5")).market_value(),
            Some(150.0)
        );
        assert_eq!(holding("000001", None, Some("1.5")).market_value(), None);
        assert_eq!(holding("000001", Some(100.0), None).market_value(), None);
        assert_eq!(holding("000001", Some(100.0), Some("--")).market_value(), None);
    }

    #[test]
    fn test_total_market_value_skips_unknown() {
        let summary = FundListSummary {
            holdings: vec![
                holding("000001", Some(100.0), Some("1.5")),
                holding("000002", Some(10.0), Some("2.0")),
                holding("000003", None, Some("3.0")),
            ],
            today: today(),
        };
        assert_eq!(summary.total_market_value(), Some(170.0));

        let empty = FundListSummary {
            holdings: vec![holding("000003", None, None)],
            today: today(),
        };
        assert_eq!(empty.total_market_value(), None);
    }

    #[test]
    fn test_is_recent_dividend() {
        assert!(is_recent_dividend("2024-06-30", today()));
        assert!(is_recent_dividend("2024-05-16", today()));
        assert!(!is_recent_dividend("2024-05-15", today()));
        assert!(!is_recent_dividend("2024-07-01", today()));
        assert!(!is_recent_dividend("not a date", today()));
    }

    #[test]
    fn test_display_as_table() {
        let summary = FundListSummary {
            holdings: vec![holding("000001", Some(100.0), Some("1.5"))],
            today: today(),
        };
        let output = summary.display_as_table();
        assert!(output.contains("Fund 000001"));
        assert!(output.contains("1.5000"));
        assert!(output.contains("150.00"));
        assert!(output.contains("Total Market Value"));
    }
}
