//! Spreadsheet export of an already resolved fund list

use super::error::ApiError;
use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use chrono::Local;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PLACEHOLDER: &str = "-";
const HEADER_COLOR: u32 = 0x4472C4;

const COLUMNS: [(&str, f64); 7] = [
    ("基金名称", 28.0),
    ("基金代码", 12.0),
    ("净值日期", 14.0),
    ("单位净值", 12.0),
    ("持有份额", 14.0),
    ("市值", 16.0),
    ("最近分红日", 14.0),
];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportFund {
    pub name: Option<String>,
    pub code: Option<String>,
    pub net_value_date: Option<String>,
    pub net_value: Value,
    pub shares: Value,
    pub market_value: Value,
    pub dividend_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    pub funds: Vec<ExportFund>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum NumberStyle {
    Nav,
    Amount,
}

#[derive(Debug, Clone, PartialEq)]
enum CellValue {
    Text(String),
    Number(f64, NumberStyle),
}

/// Numbers may arrive as JSON numbers or as numeric strings.
fn as_number(value: &Value) -> Option<f64> {
    let number: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn text(value: &Option<String>) -> CellValue {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => CellValue::Text(v.to_string()),
        _ => CellValue::Text(PLACEHOLDER.to_string()),
    }
}

fn number(value: Option<f64>, style: NumberStyle) -> CellValue {
    value.map_or(CellValue::Text(PLACEHOLDER.to_string()), |n| {
        CellValue::Number(n, style)
    })
}

fn row_cells(fund: &ExportFund) -> [CellValue; 7] {
    let net_value = as_number(&fund.net_value);
    let shares = as_number(&fund.shares);
    let market_value = as_number(&fund.market_value).or_else(|| Some(shares? * net_value?));

    [
        text(&fund.name),
        text(&fund.code),
        text(&fund.net_value_date),
        number(net_value, NumberStyle::Nav),
        number(shares, NumberStyle::Amount),
        number(market_value, NumberStyle::Amount),
        text(&fund.dividend_date),
    ]
}

pub fn build_workbook(funds: &[ExportFund]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("基金列表")?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_COLOR))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);
    let text_format = Format::new().set_border(FormatBorder::Thin);
    let nav_format = Format::new()
        .set_num_format("0.0000")
        .set_border(FormatBorder::Thin);
    let amount_format = Format::new()
        .set_num_format("0.00")
        .set_border(FormatBorder::Thin);

    for (col, (title, width)) in COLUMNS.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *title, &header_format)?;
        worksheet.set_column_width(col, *width)?;
    }

    for (index, fund) in funds.iter().enumerate() {
        let row = index as u32 + 1;
        for (col, cell) in row_cells(fund).into_iter().enumerate() {
            let col = col as u16;
            match cell {
                CellValue::Text(value) => {
                    worksheet.write_string_with_format(row, col, value, &text_format)?;
                }
                CellValue::Number(value, NumberStyle::Nav) => {
                    worksheet.write_number_with_format(row, col, value, &nav_format)?;
                }
                CellValue::Number(value, NumberStyle::Amount) => {
                    worksheet.write_number_with_format(row, col, value, &amount_format)?;
                }
            }
        }
    }
    worksheet.set_freeze_panes(1, 0)?;

    workbook.save_to_buffer()
}

pub async fn export_funds(
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    if request.funds.is_empty() {
        return Err(ApiError::BadRequest("No fund data to export".to_string()));
    }

    let bytes = build_workbook(&request.funds).context("Failed to build workbook")?;
    let filename = format!("fund_list_{}.xlsx", Local::now().format("%Y%m%d_%H%M%S"));
    info!("Exported {} funds to {}", request.funds.len(), filename);

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
