pub mod parse;

use crate::core::config::EastmoneyProviderConfig;
use crate::core::fund::{FundCode, FundProfile, NavRow, Quote};
use crate::core::source::FundSource;
use crate::providers::util::{DEFAULT_MAX_ATTEMPTS, safe_request};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};
use std::time::Duration;
use tracing::debug;

/// Days of NAV history requested when the real-time quote has no NAV.
const NAV_LOOKBACK_DAYS: u64 = 7;

/// Rows per history page; a year of trading days fits in one.
const HISTORY_PAGE_SIZE: u64 = 365;

/// Fund data scraped from the Eastmoney (天天基金) portal.
pub struct EastmoneyProvider {
    config: EastmoneyProviderConfig,
    client: reqwest::Client,
}

impl EastmoneyProvider {
    pub fn new(config: EastmoneyProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; fundtrack/0.1)")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        safe_request(
            &self.client,
            url,
            timeout,
            DEFAULT_MAX_ATTEMPTS,
            self.config.retry_delay(),
        )
        .await
    }

    async fn nav_rows(
        &self,
        code: &FundCode,
        start: NaiveDate,
        end: NaiveDate,
        per: u64,
    ) -> Result<Vec<NavRow>> {
        let url = format!(
            "{}/f10/F10DataApi.aspx?type=lsjz&code={}&page=1&per={}&sdate={}&edate={}",
            self.config.fund_base_url,
            code,
            per,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        );
        let html = self.fetch(&url, self.config.page_timeout()).await?;
        let rows = parse::parse_nav_rows(&html);
        debug!(
            "Found {} NAV rows for fund {} between {} and {}",
            rows.len(),
            code,
            start,
            end
        );
        Ok(rows)
    }

    fn dividend_pages(&self, code: &FundCode) -> [String; 2] {
        [
            format!("{}/fhsp_{}.html", self.config.f10_base_url, code),
            format!(
                "{}/f10/F10DataApi.aspx?type=FHFB&code={}",
                self.config.fund_base_url, code
            ),
        ]
    }
}

#[async_trait]
impl FundSource for EastmoneyProvider {
    async fn realtime_quote(&self, code: &FundCode) -> Result<Option<Quote>> {
        let url = format!("{}/js/{}.js", self.config.quote_base_url, code);
        let body = self.fetch(&url, self.config.quote_timeout()).await?;
        parse::parse_jsonp(&body).with_context(|| format!("Invalid quote for fund {code}"))
    }

    async fn recent_navs(&self, code: &FundCode) -> Result<Vec<NavRow>> {
        let end = Local::now().date_naive();
        let start = end - Days::new(NAV_LOOKBACK_DAYS);
        self.nav_rows(code, start, end, NAV_LOOKBACK_DAYS).await
    }

    async fn nav_history(
        &self,
        code: &FundCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NavRow>> {
        self.nav_rows(code, start, end, HISTORY_PAGE_SIZE).await
    }

    async fn page_name(&self, code: &FundCode) -> Result<Option<String>> {
        let url = format!("{}/{}.html", self.config.fund_base_url, code);
        let html = self.fetch(&url, self.config.page_timeout()).await?;
        Ok(parse::extract_name(&html))
    }

    async fn dividend_date(&self, code: &FundCode) -> Option<String> {
        let mut pages = Vec::new();
        for url in self.dividend_pages(code) {
            match self.fetch(&url, self.config.dividend_timeout()).await {
                Ok(html) => {
                    if let Some(date) = parse::extract_dividend_date(&html) {
                        return Some(date);
                    }
                    pages.push(html);
                }
                Err(e) => debug!("Dividend page unavailable for fund {}: {:#}", code, e),
            }
        }

        let date = pages
            .iter()
            .find_map(|html| parse::extract_dividend_catch_all(html));
        if date.is_none() {
            debug!("No dividend date found for fund {}", code);
        }
        date
    }

    async fn profile(&self, code: &FundCode) -> Result<FundProfile> {
        let url = format!(
            "{}/f10/F10DataApi.aspx?type=info&code={}",
            self.config.fund_base_url, code
        );
        let html = self.fetch(&url, self.config.dividend_timeout()).await?;
        Ok(parse::extract_profile(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(mock_server: &MockServer) -> EastmoneyProvider {
        EastmoneyProvider::new(EastmoneyProviderConfig::with_base_url(&mock_server.uri())).unwrap()
    }

    fn code(raw: &str) -> FundCode {
        FundCode::parse(raw).unwrap()
    }

    async fn mount_page(mock_server: &MockServer, page: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(mock_server)
            .await;
    }

    #[tokio::test]
    async fn test_realtime_quote() {
        let mock_server = MockServer::start().await;
        mount_page(
            &mock_server,
            "/js/000001.js",
            200,
            r#"jsonpgz({"fundcode":"000001","name":"华夏成长混合","jzrq":"2024-01-01","dwjz":"1.234","gszzl":"0.50"});"#,
        )
        .await;

        let quote = provider(&mock_server)
            .realtime_quote(&code("000001"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(quote.name.as_deref(), Some("华夏成长混合"));
        assert_eq!(quote.net_value.as_deref(), Some("1.234"));
    }

    #[tokio::test]
    async fn test_realtime_quote_error_status() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/js/000001.js", 404, "not found").await;

        let result = provider(&mock_server).realtime_quote(&code("000001")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_recent_navs_requests_lookback_window() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/f10/F10DataApi.aspx"))
            .and(query_param("type", "lsjz"))
            .and(query_param("code", "000001"))
            .and(query_param("per", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<tr><td>2024-01-05</td><td class='tor bold'>1.0230</td></tr>\
                 <tr><td>2024-01-04</td><td class='tor bold'>1.0190</td></tr>",
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let rows = provider(&mock_server)
            .recent_navs(&code("000001"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2024-01-05");
        assert_eq!(rows[0].net_value, "1.0230");
    }

    #[tokio::test]
    async fn test_nav_history_requests_date_range() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/f10/F10DataApi.aspx"))
            .and(query_param("type", "lsjz"))
            .and(query_param("code", "110011"))
            .and(query_param("per", "365"))
            .and(query_param("sdate", "2023-12-31"))
            .and(query_param("edate", "2024-03-31"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<tr><td>2024-03-29</td><td class='tor bold'>2.5100</td></tr>\
                 <tr><td>2024-03-28</td><td class='tor bold'>2.4870</td></tr>\
                 <tr><td>2024-03-27</td><td class='tor bold'>2.4920</td></tr>",
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let rows = provider(&mock_server)
            .nav_history(
                &code("110011"),
                NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            )
            .await
            .unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-29", "2024-03-28", "2024-03-27"]);
    }

    #[tokio::test]
    async fn test_page_name() {
        let mock_server = MockServer::start().await;
        mount_page(
            &mock_server,
            "/161725.html",
            200,
            "<title>招商中证白酒指数(LOF)A(161725)基金净值_估值_行情走势</title>",
        )
        .await;

        let name = provider(&mock_server)
            .page_name(&code("161725"))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("招商中证白酒指数"));
    }

    #[tokio::test]
    async fn test_dividend_date_from_second_page() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/fhsp_000001.html", 500, "oops").await;
        Mock::given(method("GET"))
            .and(path("/f10/F10DataApi.aspx"))
            .and(query_param("type", "FHFB"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<tr><td>2023年</td><td>2023-06-01</td><td>2023-06-05</td><td>每份派现金0.5元</td></tr>",
            ))
            .mount(&mock_server)
            .await;

        let date = provider(&mock_server).dividend_date(&code("000001")).await;
        assert_eq!(date.as_deref(), Some("2023-06-01"));
    }

    #[tokio::test]
    async fn test_dividend_date_first_page_wins() {
        let mock_server = MockServer::start().await;
        mount_page(
            &mock_server,
            "/fhsp_000001.html",
            200,
            "<td>2024-03-01</td><td>2024-03-04</td><td>每份派现金0.1元</td>",
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/f10/F10DataApi.aspx"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let date = provider(&mock_server).dividend_date(&code("000001")).await;
        assert_eq!(date.as_deref(), Some("2024-03-01"));
    }

    #[tokio::test]
    async fn test_dividend_date_catch_all() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/fhsp_000001.html", 200, "<p>暂无数据</p>").await;
        mount_page(
            &mock_server,
            "/f10/F10DataApi.aspx",
            200,
            "<li>2022-08-09 年度分红公告</li>",
        )
        .await;

        let date = provider(&mock_server).dividend_date(&code("000001")).await;
        assert_eq!(date.as_deref(), Some("2022-08-09"));
    }

    #[tokio::test]
    async fn test_dividend_date_swallows_failures() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/fhsp_000001.html", 404, "").await;
        mount_page(&mock_server, "/f10/F10DataApi.aspx", 502, "").await;

        let date = provider(&mock_server).dividend_date(&code("000001")).await;
        assert_eq!(date, None);
    }

    #[tokio::test]
    async fn test_profile() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/f10/F10DataApi.aspx"))
            .and(query_param("type", "info"))
            .and(query_param("code", "000001"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<th>基金经理</th><td>王五</td><th>基金管理人</th><td>华夏基金管理有限公司</td>",
            ))
            .mount(&mock_server)
            .await;

        let profile = provider(&mock_server)
            .profile(&code("000001"))
            .await
            .unwrap();
        assert_eq!(profile.manager, "王五");
        assert_eq!(profile.company, "华夏基金管理有限公司");
        assert_eq!(profile.scale, "-");
        assert_eq!(profile.establish_date, "-");
    }
}
