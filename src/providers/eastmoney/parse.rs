//! Extraction of fund data from Eastmoney payloads and pages.
//!
//! The portal has no stable API for most of what we need, so everything
//! below is pattern matching against its markup. Patterns are tried in a
//! fixed order and the first usable answer wins.

use crate::core::fund::{FundProfile, NavRow, Quote};
use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Dates before this year are noise from unrelated page sections.
const MIN_DIVIDEND_YEAR: i32 = 2015;

static JSONP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)jsonpgz\((.*)\)\s*;?\s*$").expect("Failed to compile jsonp regex"));

static NAV_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<tr>\s*<td[^>]*>(\d{4}-\d{2}-\d{2})</td>\s*<td[^>]*>([^<]*)</td>")
        .expect("Failed to compile nav row regex")
});

static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"<title>\s*([^(（<]+)",
        r#"class="fundDetail-tit"[^>]*>\s*(?:<[^>]+>\s*)*([^<(（]+)"#,
        r#"fS_name\s*=\s*["']([^"']+)["']"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Failed to compile name regex"))
    .collect()
});

static DIVIDEND_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // registration date, ex-dividend date, cash per share
        r"(\d{4}-\d{2}-\d{2})</td>\s*<td[^>]*>(\d{4}-\d{2}-\d{2})</td>\s*<td[^>]*>每份派现金\s*(\d+(?:\.\d+)?)\s*元",
        r"(\d{4}-\d{2}-\d{2})</td>\s*<td[^>]*>(\d{4}-\d{2}-\d{2})</td>",
        r"权益登记日[^\d]{0,40}(\d{4}-\d{2}-\d{2})",
        r"除息日[^\d]{0,40}(\d{4}-\d{2}-\d{2})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Failed to compile dividend regex"))
    .collect()
});

static DIVIDEND_CATCH_ALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})-(\d{2})-(\d{2})[^\d]*(分红|派现|派息|除息|权益登记)")
        .expect("Failed to compile dividend catch-all regex")
});

static PROFILE_MANAGER: Lazy<Regex> = Lazy::new(|| profile_regex("基金经理"));
static PROFILE_SCALE: Lazy<Regex> = Lazy::new(|| profile_regex("基金规模"));
static PROFILE_ESTABLISHED: Lazy<Regex> = Lazy::new(|| profile_regex("成立日期"));
static PROFILE_COMPANY: Lazy<Regex> = Lazy::new(|| profile_regex("基金管理人"));

fn profile_regex(label: &str) -> Regex {
    Regex::new(&format!(r"(?s){label}.*?<td[^>]*>([^<]+)</td>"))
        .expect("Failed to compile profile regex")
}

/// Unwraps a `jsonpgz({...});` payload. An empty call means the portal has
/// no real-time quote for the code.
pub fn parse_jsonp(body: &str) -> Result<Option<Quote>> {
    let captures = JSONP
        .captures(body.trim())
        .ok_or_else(|| anyhow!("Response is not a jsonpgz payload"))?;
    let inner = captures[1].trim();
    if inner.is_empty() {
        return Ok(None);
    }

    let quote: Quote = serde_json::from_str(inner)
        .with_context(|| format!("Failed to parse quote payload: '{inner}'"))?;
    Ok(Some(quote))
}

/// Rows of the historical NAV table in page order, most recent first.
pub fn parse_nav_rows(html: &str) -> Vec<NavRow> {
    NAV_ROW
        .captures_iter(html)
        .map(|c| NavRow {
            date: c[1].to_string(),
            net_value: c[2].trim().to_string(),
        })
        .collect()
}

pub fn extract_name(html: &str) -> Option<String> {
    NAME_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(html)
            .map(|c| c[1].trim().to_string())
            .filter(|name| name.chars().count() > 2)
    })
}

/// Most recent dividend date on a dividend page, trying the table row
/// patterns first and the labelled date patterns after.
///
/// The first pattern that matches anywhere on the page decides the answer.
/// If none of its dates survive the year filter the page has no dividend
/// date; later patterns are not consulted.
pub fn extract_dividend_date(html: &str) -> Option<String> {
    let pattern = DIVIDEND_PATTERNS.iter().find(|p| p.is_match(html))?;
    let dates = pattern
        .captures_iter(html)
        .filter_map(|c| parse_recent_date(&c[1]))
        .collect();
    latest(dates)
}

/// Last resort for pages whose layout none of the row patterns match: any
/// date directly followed by a dividend label.
pub fn extract_dividend_catch_all(html: &str) -> Option<String> {
    let dates = DIVIDEND_CATCH_ALL
        .captures_iter(html)
        .filter_map(|c| parse_recent_date(&format!("{}-{}-{}", &c[1], &c[2], &c[3])))
        .collect();
    latest(dates)
}

pub fn extract_profile(html: &str) -> FundProfile {
    let field = |pattern: &Regex| {
        pattern
            .captures(html)
            .map(|c| c[1].trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "-".to_string())
    };

    FundProfile {
        manager: field(&PROFILE_MANAGER),
        scale: field(&PROFILE_SCALE),
        establish_date: field(&PROFILE_ESTABLISHED),
        company: field(&PROFILE_COMPANY),
    }
}

fn parse_recent_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .filter(|date| date.year() >= MIN_DIVIDEND_YEAR)
}

fn latest(mut dates: Vec<NaiveDate>) -> Option<String> {
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.first().map(|d| d.format("%Y-%m-%d").to_string())
}
