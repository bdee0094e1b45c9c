//! Fund domain types shared by the store, the resolver and the API

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Validation failures on fund list operations.
#[derive(Debug, Error, PartialEq)]
pub enum FundError {
    #[error("Invalid fund code '{0}': expected 6 digits")]
    InvalidCode(String),
    #[error("Fund {0} is already in the list")]
    Duplicate(String),
    #[error("Fund {0} not found")]
    NotFound(String),
    #[error("Invalid shares value '{0}': expected a non-negative number")]
    InvalidShares(String),
    #[error("Fund {0} appears more than once in the new order")]
    DuplicateInOrder(String),
    #[error("Invalid fund codes (expected 6 digits each): {0}")]
    InvalidCodes(String),
    #[error("No fund codes given")]
    EmptyCodeList,
    #[error("At most {max} funds can be added at once, got {0}", max = MAX_BATCH_CODES)]
    TooManyCodes(usize),
    #[error("Invalid history range '{0}': expected one of 1m, 3m, 6m, 1y")]
    InvalidRange(String),
}

/// Upper bound on the codes accepted by one batch add.
pub const MAX_BATCH_CODES: usize = 50;

/// A 6 digit fund code, e.g. `000001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FundCode(String);

impl FundCode {
    /// Accepts exactly six ASCII digits. Surrounding whitespace is not
    /// stripped, so `" 000001"` is rejected like any other malformed code.
    pub fn parse(raw: &str) -> Result<Self, FundError> {
        if raw.len() == 6 && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(FundCode(raw.to_string()))
        } else {
            Err(FundError::InvalidCode(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FundCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FundCode {
    type Err = FundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FundCode::parse(s)
    }
}

impl TryFrom<String> for FundCode {
    type Error = FundError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FundCode::parse(&value)
    }
}

impl From<FundCode> for String {
    fn from(code: FundCode) -> String {
        code.0
    }
}

/// Splits user input such as `000001, 000002，161725` into codes. ASCII and
/// full-width commas both separate; blank items are ignored. Every item must
/// be a valid code, and the list must hold between 1 and
/// [`MAX_BATCH_CODES`] items.
pub fn parse_code_list(raw: &str) -> Result<Vec<FundCode>, FundError> {
    let items: Vec<&str> = raw
        .split([',', '，'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect();

    let invalid: Vec<&str> = items
        .iter()
        .copied()
        .filter(|item| FundCode::parse(item).is_err())
        .collect();
    if !invalid.is_empty() {
        return Err(FundError::InvalidCodes(invalid.join(", ")));
    }
    if items.is_empty() {
        return Err(FundError::EmptyCodeList);
    }
    if items.len() > MAX_BATCH_CODES {
        return Err(FundError::TooManyCodes(items.len()));
    }

    Ok(items
        .into_iter()
        .map(|item| FundCode(item.to_string()))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundEntry {
    pub code: FundCode,
    #[serde(default)]
    pub shares: Option<f64>,
}

impl FundEntry {
    pub fn new(code: FundCode) -> Self {
        Self { code, shares: None }
    }
}

/// Everything known about a fund after one resolution pass. Fields stay
/// `None` when no source answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFundData {
    pub code: String,
    pub name: Option<String>,
    pub net_value: Option<String>,
    pub net_value_date: Option<String>,
    pub day_growth: Option<String>,
    pub dividend_date: Option<String>,
}

impl ResolvedFundData {
    pub fn new(code: &FundCode) -> Self {
        Self {
            code: code.to_string(),
            ..Default::default()
        }
    }
}

/// Payload of the real-time quote endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Quote {
    #[serde(rename = "fundcode")]
    pub code: String,
    pub name: Option<String>,
    /// Net value of the last published trading day
    #[serde(rename = "dwjz")]
    pub net_value: Option<String>,
    #[serde(rename = "jzrq")]
    pub net_value_date: Option<String>,
    /// Intraday estimated growth in percent
    #[serde(rename = "gszzl")]
    pub day_growth: Option<String>,
}

/// One row of the historical NAV table.
#[derive(Debug, Clone, PartialEq)]
pub struct NavRow {
    pub date: String,
    pub net_value: String,
}

/// One point of a NAV chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavPoint {
    pub date: String,
    pub net_value: f64,
}

/// Look-back window of a NAV chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryRange {
    #[default]
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl HistoryRange {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryRange::OneMonth => "1m",
            HistoryRange::ThreeMonths => "3m",
            HistoryRange::SixMonths => "6m",
            HistoryRange::OneYear => "1y",
        }
    }

    fn months(self) -> u32 {
        match self {
            HistoryRange::OneMonth => 1,
            HistoryRange::ThreeMonths => 3,
            HistoryRange::SixMonths => 6,
            HistoryRange::OneYear => 12,
        }
    }

    /// First day of the window ending at `end`. Month ends clamp, so three
    /// months before May 31 is Feb 29 in a leap year.
    pub fn start(self, end: NaiveDate) -> NaiveDate {
        end.checked_sub_months(Months::new(self.months()))
            .unwrap_or(NaiveDate::MIN)
    }
}

impl Display for HistoryRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryRange {
    type Err = FundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(HistoryRange::OneMonth),
            "3m" => Ok(HistoryRange::ThreeMonths),
            "6m" => Ok(HistoryRange::SixMonths),
            "1y" => Ok(HistoryRange::OneYear),
            other => Err(FundError::InvalidRange(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundProfile {
    pub manager: String,
    pub scale: String,
    pub establish_date: String,
    pub company: String,
}
