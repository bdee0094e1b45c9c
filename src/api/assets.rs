//! The web client, embedded in the binary

use axum::extract::Query;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;

const INDEX_HTML: &str = include_str!("../../static/index.html");
const STYLE_CSS: &str = include_str!("../../static/style.css");
const APP_JS: &str = include_str!("../../static/app.js");

/// Query parameter the client appends to bust caches on upgrade.
const VERSION_PARAM: &str = "v";

fn asset(
    body: &'static str,
    content_type: &'static str,
    params: &HashMap<String, String>,
) -> Response {
    let cache_control = if params.contains_key(VERSION_PARAM) {
        "public, max-age=31536000, immutable"
    } else {
        "no-cache"
    };
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, cache_control),
        ],
        body,
    )
        .into_response()
}

pub async fn index(Query(params): Query<HashMap<String, String>>) -> Response {
    asset(INDEX_HTML, "text/html; charset=utf-8", &params)
}

pub async fn stylesheet(Query(params): Query<HashMap<String, String>>) -> Response {
    asset(STYLE_CSS, "text/css; charset=utf-8", &params)
}

pub async fn script(Query(params): Query<HashMap<String, String>>) -> Response {
    asset(APP_JS, "application/javascript; charset=utf-8", &params)
}
