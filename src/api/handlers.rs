//! JSON endpoints over the fund list and the resolver

use super::AppState;
use super::batch;
use super::error::ApiError;
use crate::core::fund::{
    FundCode, FundEntry, FundError, HistoryRange, ResolvedFundData, parse_code_list,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::Local;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct AddFundRequest {
    pub code: String,
}

/// Codes separated by ASCII or full-width commas, e.g. `000001，110011`.
#[derive(Debug, Deserialize)]
pub struct BatchAddRequest {
    pub codes: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub range: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SharesRequest {
    #[serde(default)]
    pub shares: Value,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub funds: Vec<String>,
}

/// Shares arrive as a JSON number, a numeric string, or null to clear them.
fn parse_shares(value: &Value) -> Result<Option<f64>, FundError> {
    let invalid = || FundError::InvalidShares(value.to_string());
    let shares = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    if !shares.is_finite() || shares < 0.0 {
        return Err(invalid());
    }
    Ok(Some(shares))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_funds(State(state): State<AppState>) -> Result<Json<Vec<FundEntry>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

pub async fn add_fund(
    State(state): State<AppState>,
    payload: Result<Json<AddFundRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let code = state.store.add(&request.code).await?;
    Ok(Json(json!({ "success": true, "code": code })))
}

pub async fn add_funds_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchAddRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let codes = parse_code_list(&request.codes)?;
    let outcome = batch::add_codes(&state.store, &state.resolver, codes).await?;
    Ok(Json(json!({
        "success": true,
        "added": outcome.added,
        "duplicates": outcome.duplicates,
        "notFound": outcome.not_found,
    })))
}

pub async fn remove_fund(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.store.remove(&code).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn update_shares(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Result<Json<SharesRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let shares = parse_shares(&request.shares)?;
    let entry = state.store.set_shares(&code, shares).await?;
    Ok(Json(json!({
        "success": true,
        "code": entry.code,
        "shares": entry.shares,
    })))
}

pub async fn reorder_funds(
    State(state): State<AppState>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    state.store.reorder(&request.funds).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn dividend(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let code = FundCode::parse(&code)?;
    let dividend_date = state.resolver.resolve_dividend(&code).await;
    Ok(Json(json!({ "code": code, "dividendDate": dividend_date })))
}

pub async fn fund_dividend(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let code = FundCode::parse(&code)?;
    let dividend_date = state.resolver.resolve_dividend(&code).await;
    Ok(Json(json!({ "success": true, "dividendDate": dividend_date })))
}

pub async fn fund_name(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let code = FundCode::parse(&code)?;
    let name = state.resolver.resolve_name(&code).await;
    Ok(Json(json!({ "code": code, "name": name })))
}

pub async fn fund_info(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ResolvedFundData>, ApiError> {
    let code = FundCode::parse(&code)?;
    let data = state.resolver.resolve_info(&code).await;
    debug!("Resolved fund {}: {:?}", code, data);
    Ok(Json(data))
}

pub async fn fund_profile(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let code = FundCode::parse(&code)?;
    let profile = state.resolver.resolve_profile(&code).await?;
    Ok(Json(json!({ "success": true, "data": profile })))
}

/// NAV chart data ending today. `range` defaults to one month.
pub async fn fund_history(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let code = FundCode::parse(&code)?;
    let range = match query.range.as_deref() {
        Some(raw) => raw.parse::<HistoryRange>()?,
        None => HistoryRange::default(),
    };
    let today = Local::now().date_naive();
    let points = state.resolver.resolve_history(&code, range, today).await?;
    Ok(Json(json!({
        "code": code,
        "range": range.as_str(),
        "points": points,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shares() {
        assert_eq!(parse_shares(&Value::Null), Ok(None));
        assert_eq!(parse_shares(&json!(100)), Ok(Some(100.0)));
        assert_eq!(parse_shares(&json!(0)), Ok(Some(0.0)));
        assert_eq!(parse_shares(&json!("12.5")), Ok(Some(12.5)));
        assert_eq!(parse_shares(&json!("")), Ok(None));

        for bad in [json!(-1), json!("-0.5"), json!("abc"), json!([1]), json!(true)] {
            assert!(
                matches!(parse_shares(&bad), Err(FundError::InvalidShares(_))),
                "{bad} should be rejected"
            );
        }
    }
}
