use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use yosoku_core::common::{Period, Ticker};
use yosoku_core::market::entity::{Candle, CompanyProfile};
use yosoku_core::market::error::MarketError;
use yosoku_core::market::port::MarketDataProvider;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
// 访问该地址会写入 quoteSummary 所需的会话 Cookie
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query2.finance.yahoo.com/v1/test/getcrumb";
const PROFILE_MODULES: &str = "assetProfile,summaryDetail,defaultKeyStatistics,financialData";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// # Summary
/// Yahoo Finance 日线行情提供者实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，单次请求受构造时给定的超时约束。
/// - 只请求日线 (`interval=1d`)，回溯区间直接映射为 `range` 参数。
/// - 客户端开启 Cookie 存储，公司概况请求依赖会话 Cookie 与 crumb。
#[derive(Clone)]
pub struct YahooProvider {
    /// 内部使用的 HTTP 客户端
    client: Client,
}

impl YahooProvider {
    /// # Summary
    /// 创建一个新的 YahooProvider 实例。
    ///
    /// # Logic
    /// 1. 安装 rustls 的 ring 加密后端（已安装则忽略）。
    /// 2. 设置伪装浏览器 Header (User-Agent) 以减少被拦截风险。
    /// 3. 以给定超时初始化带 Cookie 存储的 reqwest 客户端。
    ///
    /// # Arguments
    /// * `timeout`: 单次 HTTP 请求超时。
    ///
    /// # Returns
    /// 成功返回 YahooProvider，客户端构建失败返回 `MarketError::Network`。
    pub fn new(timeout: Duration) -> Result<Self, MarketError> {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(USER_AGENT),
        );

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|e| MarketError::Network(e.to_string()))?;

        Ok(Self { client })
    }

    /// # Summary
    /// 获取 quoteSummary 接口要求的 crumb。
    ///
    /// # Logic
    /// 1. 访问 `fc.yahoo.com` 写入会话 Cookie，该请求的响应状态不影响结果。
    /// 2. 读取 getcrumb 返回的纯文本。
    async fn crumb(&self) -> Result<String, MarketError> {
        if let Err(e) = self.client.get(COOKIE_URL).send().await {
            debug!("Cookie bootstrap request failed: {}", e);
        }

        let resp = self
            .client
            .get(CRUMB_URL)
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(MarketError::Network(format!("crumb request failed: HTTP {}", resp.status())));
        }

        let crumb = resp
            .text()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;
        let crumb = crumb.trim();
        if crumb.is_empty() {
            return Err(MarketError::Network("empty crumb".to_string()));
        }
        Ok(crumb.to_string())
    }
}

/// 把证券代码作为单独的路径段追加到 `base`，`/`、`?` 等字符被百分号编码
pub(crate) fn endpoint(base: &str, symbol: &str) -> Result<Url, MarketError> {
    let mut url = Url::parse(base).map_err(|e| MarketError::Parse(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| MarketError::Parse(format!("{} cannot be a base URL", base)))?
        .push(symbol);
    Ok(url)
}

/// 404 视为未知代码，其它非 2xx 视为网络错误
fn check_status(resp: &Response, symbol: &str) -> Result<(), MarketError> {
    if resp.status() == StatusCode::NOT_FOUND {
        return Err(MarketError::NotFound(symbol.to_string()));
    }
    if !resp.status().is_success() {
        return Err(MarketError::Network(format!("HTTP {}", resp.status())));
    }
    Ok(())
}

/// # Summary
/// Yahoo API 响应顶层结构。
///
/// # Invariants
/// - 映射自 Yahoo v8 chart 接口。
#[derive(Deserialize, Debug)]
pub(crate) struct YahooResponse {
    chart: YahooChart,
}

#[derive(Deserialize, Debug)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

/// Yahoo API 错误详情
#[derive(Deserialize, Debug)]
struct YahooError {
    code: Option<String>,
    description: String,
}

#[derive(Deserialize, Debug)]
struct YahooResult {
    meta: Option<YahooMeta>,
    // 无数据时 Yahoo 会直接省略该字段
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Deserialize, Debug)]
struct YahooMeta {
    // 交易所相对 UTC 的秒数偏移
    gmtoffset: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
    adjclose: Option<Vec<YahooAdjClose>>,
}

#[derive(Deserialize, Debug)]
struct YahooAdjClose {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo API 原始报价数据
#[derive(Deserialize, Debug)]
struct YahooQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// # Summary
/// 将 chart 接口响应转换为日线列表。
///
/// # Logic
/// 1. 接口自带的 error 字段优先：`Not Found` 归为 NotFound，其余归为 Unknown。
/// 2. 取第一条 result，缺失即 NotFound。
/// 3. 逐个时间戳组装 K 线，收盘价缺失的行直接丢弃；开高低缺失时用收盘价补齐。
/// 4. 交易日按交易所时区 (`gmtoffset`) 计算。
/// 5. 结果为空视为 NotFound。
pub(crate) fn parse_chart(json: YahooResponse, symbol: &str) -> Result<Vec<Candle>, MarketError> {
    if let Some(err) = json.chart.error {
        return match err.code.as_deref() {
            Some("Not Found") => Err(MarketError::NotFound(format!("{}: {}", symbol, err.description))),
            _ => Err(MarketError::Unknown(err.description)),
        };
    }

    let result = json
        .chart
        .result
        .and_then(|mut r| r.pop())
        .ok_or_else(|| MarketError::NotFound(symbol.to_string()))?;

    let offset = result.meta.as_ref().and_then(|m| m.gmtoffset).unwrap_or(0);
    let quote = result
        .indicators
        .quote
        .first()
        .ok_or_else(|| MarketError::Parse("No quote data".into()))?;
    let adj_close_list = result
        .indicators
        .adjclose
        .as_ref()
        .and_then(|v| v.first())
        .map(|v| &v.adjclose);

    let mut candles = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let Some(close) = quote.close.get(i).and_then(|x| *x) else {
            continue;
        };
        let (Some(time), Some(local)) = (
            DateTime::<Utc>::from_timestamp(ts, 0),
            DateTime::<Utc>::from_timestamp(ts + offset, 0),
        ) else {
            return Err(MarketError::Parse(format!("Invalid timestamp: {}", ts)));
        };

        let open = quote.open.get(i).and_then(|x| *x).unwrap_or(close);
        candles.push(Candle {
            time,
            date: local.date_naive(),
            open,
            high: quote.high.get(i).and_then(|x| *x).unwrap_or(open.max(close)),
            low: quote.low.get(i).and_then(|x| *x).unwrap_or(open.min(close)),
            close,
            adj_close: adj_close_list.and_then(|list| list.get(i)).and_then(|x| *x),
            volume: quote.volume.get(i).and_then(|x| *x).unwrap_or(0.0),
        });
    }

    if candles.is_empty() {
        return Err(MarketError::NotFound(symbol.to_string()));
    }
    Ok(candles)
}

/// quoteSummary 接口响应顶层结构
#[derive(Deserialize, Debug)]
pub(crate) struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummary,
}

#[derive(Deserialize, Debug)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryResult>>,
    error: Option<YahooError>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct QuoteSummaryResult {
    asset_profile: AssetProfile,
    summary_detail: SummaryDetail,
    default_key_statistics: KeyStatistics,
    financial_data: FinancialData,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct AssetProfile {
    long_business_summary: Option<String>,
    sector: Option<String>,
    industry: Option<String>,
    website: Option<String>,
    full_time_employees: Option<u64>,
}

/// Yahoo 的数值字段形如 `{"raw": 1.29, "fmt": "1.29"}`，缺失时为 `{}`
#[derive(Deserialize, Debug, Default)]
struct RawValue {
    raw: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct SummaryDetail {
    market_cap: Option<RawValue>,
    beta: Option<RawValue>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct KeyStatistics {
    trailing_eps: Option<RawValue>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct FinancialData {
    quick_ratio: Option<RawValue>,
    revenue_per_share: Option<RawValue>,
    profit_margins: Option<RawValue>,
    debt_to_equity: Option<RawValue>,
    return_on_assets: Option<RawValue>,
}

fn raw(value: Option<RawValue>) -> Option<f64> {
    value.and_then(|v| v.raw).filter(|x| x.is_finite())
}

/// # Summary
/// 将 quoteSummary 响应转换为公司概况。
///
/// # Logic
/// 1. 接口自带的 error 字段优先：`Not Found` 归为 NotFound，其余归为 Unknown。
/// 2. 取第一条 result，缺失即 NotFound。
/// 3. 缺失的模块或字段保留为 None，非有限数值同样丢弃。
pub(crate) fn parse_quote_summary(
    json: QuoteSummaryResponse,
    symbol: &str,
) -> Result<CompanyProfile, MarketError> {
    if let Some(err) = json.quote_summary.error {
        return match err.code.as_deref() {
            Some("Not Found") => Err(MarketError::NotFound(format!("{}: {}", symbol, err.description))),
            _ => Err(MarketError::Unknown(err.description)),
        };
    }

    let result = json
        .quote_summary
        .result
        .and_then(|mut r| r.pop())
        .ok_or_else(|| MarketError::NotFound(symbol.to_string()))?;
    let QuoteSummaryResult {
        asset_profile: profile,
        summary_detail: detail,
        default_key_statistics: stats,
        financial_data: financial,
    } = result;

    Ok(CompanyProfile {
        summary: profile.long_business_summary,
        sector: profile.sector,
        industry: profile.industry,
        website: profile.website,
        employees: profile.full_time_employees,
        market_cap: raw(detail.market_cap),
        beta: raw(detail.beta),
        trailing_eps: raw(stats.trailing_eps),
        trailing_pe: raw(detail.trailing_pe),
        quick_ratio: raw(financial.quick_ratio),
        revenue_per_share: raw(financial.revenue_per_share),
        profit_margins: raw(financial.profit_margins),
        debt_to_equity: raw(financial.debt_to_equity),
        return_on_assets: raw(financial.return_on_assets),
    })
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    /// # Summary
    /// 从 Yahoo Finance 抓取日线历史数据。
    ///
    /// # Logic
    /// 1. 以 `range=<period>&interval=1d` 构建请求。
    /// 2. 代码作为独立路径段编码进 URL；404 视为未知代码，其它非 2xx 视为网络错误。
    /// 3. 解析嵌套 JSON 并转换为 K 线。
    ///
    /// # Arguments
    /// * `ticker`: 证券代码。
    /// * `period`: 回溯区间。
    ///
    /// # Returns
    /// 成功返回 K 线列表，失败返回 MarketError。
    async fn fetch_daily(
        &self,
        ticker: &Ticker,
        period: Period,
    ) -> Result<Vec<Candle>, MarketError> {
        let symbol = ticker.as_str();
        let url = endpoint(CHART_URL, symbol)?;

        let resp = self
            .client
            .get(url)
            .query(&[
                ("range", period.as_str()),
                ("interval", "1d"),
                ("includeAdjustedClose", "true"),
            ])
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;
        check_status(&resp, symbol)?;

        let json: YahooResponse = resp
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        let candles = parse_chart(json, symbol)?;
        info!("Fetched {} daily candles for {} ({})", candles.len(), symbol, period);
        Ok(candles)
    }

    /// # Summary
    /// 从 quoteSummary 接口抓取公司概况与基本面指标。
    ///
    /// # Logic
    /// 1. 取得会话 crumb。
    /// 2. 一次请求 assetProfile、summaryDetail、defaultKeyStatistics、financialData 四个模块。
    /// 3. 解析为 `CompanyProfile`，缺失字段保留为 None。
    async fn fetch_profile(&self, ticker: &Ticker) -> Result<CompanyProfile, MarketError> {
        let symbol = ticker.as_str();
        let crumb = self.crumb().await?;
        let url = endpoint(QUOTE_SUMMARY_URL, symbol)?;

        let resp = self
            .client
            .get(url)
            .query(&[("modules", PROFILE_MODULES), ("crumb", crumb.as_str())])
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;
        check_status(&resp, symbol)?;

        let json: QuoteSummaryResponse = resp
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        let profile = parse_quote_summary(json, symbol)?;
        info!("Fetched company profile for {}", symbol);
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn parse(raw: &str) -> Result<Vec<Candle>, MarketError> {
        let json: YahooResponse = serde_json::from_str(raw).unwrap();
        parse_chart(json, "AAPL")
    }

    #[test]
    fn test_parse_drops_rows_without_close() {
        // 1704205800 = 2024-01-02 14:30 UTC，gmtoffset -18000 (美东)
        let raw = r#"{
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": -18000},
                    "timestamp": [1704205800, 1704292200, 1704378600],
                    "indicators": {
                        "quote": [{
                            "open": [187.15, null, 182.15],
                            "high": [188.44, 185.88, 183.09],
                            "low": [183.89, 183.43, 180.88],
                            "close": [185.64, null, 181.91],
                            "volume": [82488700, 58414500, null]
                        }],
                        "adjclose": [{"adjclose": [184.73, null, 181.02]}]
                    }
                }],
                "error": null
            }
        }"#;

        let candles = parse(raw).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(candles[0].close, 185.64);
        assert_eq!(candles[0].adj_close, Some(184.73));
        assert_eq!(candles[1].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert_eq!(candles[1].volume, 0.0);
    }

    #[test]
    fn test_parse_error_payload_is_not_found() {
        let raw = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        }"#;
        assert!(matches!(parse(raw), Err(MarketError::NotFound(_))));
    }

    #[test]
    fn test_parse_missing_timestamps_is_not_found() {
        let raw = r#"{
            "chart": {
                "result": [{"meta": {}, "indicators": {"quote": [{}]}}],
                "error": null
            }
        }"#;
        assert!(matches!(parse(raw), Err(MarketError::NotFound(_))));
    }

    #[test]
    fn test_endpoint_encodes_symbol_as_one_segment() {
        let url = endpoint(CHART_URL, "BRK-B").unwrap();
        assert_eq!(url.as_str(), "https://query1.finance.yahoo.com/v8/finance/chart/BRK-B");

        let url = endpoint(CHART_URL, "A/B?range=max#x").unwrap();
        assert_eq!(
            url.as_str(),
            "https://query1.finance.yahoo.com/v8/finance/chart/A%2FB%3Frange=max%23x"
        );
        assert_eq!(url.query(), None);
    }

    fn parse_summary(raw: &str) -> Result<CompanyProfile, MarketError> {
        let json: QuoteSummaryResponse = serde_json::from_str(raw).unwrap();
        parse_quote_summary(json, "AAPL")
    }

    #[test]
    fn test_parse_quote_summary() {
        let raw = r#"{
            "quoteSummary": {
                "result": [{
                    "assetProfile": {
                        "longBusinessSummary": "Apple Inc. designs, manufactures, and markets smartphones.",
                        "sector": "Technology",
                        "industry": "Consumer Electronics",
                        "website": "https://www.apple.com",
                        "fullTimeEmployees": 161000
                    },
                    "summaryDetail": {
                        "marketCap": {"raw": 2950000000000, "fmt": "2.95T"},
                        "beta": {"raw": 1.29, "fmt": "1.29"},
                        "trailingPE": {"raw": 30.1, "fmt": "30.10"}
                    },
                    "defaultKeyStatistics": {
                        "trailingEps": {"raw": 6.42, "fmt": "6.42"}
                    },
                    "financialData": {
                        "quickRatio": {"raw": 0.83, "fmt": "0.83"},
                        "revenuePerShare": {"raw": 24.54, "fmt": "24.54"},
                        "profitMargins": {"raw": 0.2631, "fmt": "26.31%"},
                        "debtToEquity": {},
                        "returnOnAssets": {"raw": 0.2215, "fmt": "22.15%"}
                    }
                }],
                "error": null
            }
        }"#;

        let profile = parse_summary(raw).unwrap();
        assert_eq!(profile.sector.as_deref(), Some("Technology"));
        assert_eq!(profile.industry.as_deref(), Some("Consumer Electronics"));
        assert_eq!(profile.website.as_deref(), Some("https://www.apple.com"));
        assert_eq!(profile.employees, Some(161000));
        assert_eq!(profile.market_cap, Some(2.95e12));
        assert_eq!(profile.beta, Some(1.29));
        assert_eq!(profile.trailing_eps, Some(6.42));
        assert_eq!(profile.trailing_pe, Some(30.1));
        assert_eq!(profile.quick_ratio, Some(0.83));
        assert_eq!(profile.revenue_per_share, Some(24.54));
        assert_eq!(profile.profit_margins, Some(0.2631));
        assert_eq!(profile.debt_to_equity, None);
        assert_eq!(profile.return_on_assets, Some(0.2215));
    }

    #[test]
    fn test_parse_quote_summary_missing_modules() {
        // ETF 没有 assetProfile 与 financialData
        let raw = r#"{
            "quoteSummary": {
                "result": [{"summaryDetail": {"beta": {"raw": 1.0, "fmt": "1.00"}}}],
                "error": null
            }
        }"#;
        let profile = parse_summary(raw).unwrap();
        assert_eq!(profile.beta, Some(1.0));
        assert_eq!(profile.sector, None);
        assert_eq!(profile.market_cap, None);
    }

    #[test]
    fn test_parse_quote_summary_not_found() {
        let raw = r#"{
            "quoteSummary": {
                "result": null,
                "error": {"code": "Not Found", "description": "Quote not found for symbol: ZZZZ"}
            }
        }"#;
        assert!(matches!(parse_summary(raw), Err(MarketError::NotFound(_))));

        let raw = r#"{"quoteSummary": {"result": [], "error": null}}"#;
        assert!(matches!(parse_summary(raw), Err(MarketError::NotFound(_))));
    }
}
