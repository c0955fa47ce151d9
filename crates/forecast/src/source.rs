use std::time::Duration;
use tracing::{info, warn};
use yosoku_core::common::{Period, Ticker};
use yosoku_core::forecast::error::ForecastError;
use yosoku_core::market::entity::PriceSeries;
use yosoku_core::market::port::MarketDataProvider;

/// # Summary
/// 抓取日线并转换为清洗后的收盘价序列。
///
/// # Logic
/// 1. 在 `timeout` 内调用行情端口，超时视为数据不可用。
/// 2. 端口错误（未知代码、网络、解析）统一映射为 `DataUnavailable`。
/// 3. 丢弃缺失/非有限收盘价，按日期排序去重。
/// 4. 清洗后为空同样视为数据不可用。
///
/// # Invariants
/// - 不做重试。
pub async fn fetch_price_series(
    provider: &dyn MarketDataProvider,
    ticker: &Ticker,
    period: Period,
    timeout: Duration,
) -> Result<PriceSeries, ForecastError> {
    let candles = match tokio::time::timeout(timeout, provider.fetch_daily(ticker, period)).await {
        Ok(result) => result?,
        Err(_) => {
            warn!("Fetching {} ({}) timed out after {:?}", ticker, period, timeout);
            return Err(ForecastError::DataUnavailable(format!(
                "{}: request timed out after {}s",
                ticker,
                timeout.as_secs()
            )));
        }
    };

    let series = PriceSeries::from_candles(&candles);
    if series.is_empty() {
        return Err(ForecastError::DataUnavailable(format!(
            "{}: no usable closing prices",
            ticker
        )));
    }

    info!("Loaded {} closes for {} ({})", series.len(), ticker, period);
    Ok(series)
}
