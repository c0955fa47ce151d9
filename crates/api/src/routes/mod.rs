//! 路由控制器，以及各控制器共用的路径/查询参数解析。

use crate::error::ApiError;
use crate::server::AppState;
use std::time::Duration;
use yosoku_core::common::{Period, Ticker};
use yosoku_core::market::entity::Candle;

pub mod analysis;
pub mod forecast;
pub mod market;

/// 解析路径中的证券代码（去空白、转大写）
pub(crate) fn parse_ticker(raw: &str) -> Result<Ticker, ApiError> {
    Ticker::parse(raw).ok_or_else(|| ApiError::BadRequest("Ticker symbol must not be empty".to_string()))
}

/// 解析回溯区间，缺省时使用 `default`
pub(crate) fn parse_period(raw: Option<&str>, default: Period) -> Result<Period, ApiError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(ApiError::BadRequest),
    }
}

/// # Summary
/// 通过行情端口抓取日线，受 `feed.timeout_secs` 约束。
///
/// # Logic
/// 1. 超时或端口错误统一映射为 404。
/// 2. 按交易日升序排列，供窗口截取与指标计算使用。
pub(crate) async fn fetch_candles(
    state: &AppState,
    ticker: &Ticker,
    period: Period,
) -> Result<Vec<Candle>, ApiError> {
    let timeout = Duration::from_secs(state.config.feed.timeout_secs);
    let mut candles = tokio::time::timeout(timeout, state.provider.fetch_daily(ticker, period))
        .await
        .map_err(|_| ApiError::NotFound(format!("{}: request timed out", ticker)))??;
    candles.sort_by_key(|c| c.date);
    Ok(candles)
}
