//! 测试辅助：内存行情源与合成 K 线。

use crate::common::{Period, Ticker};
use crate::market::entity::{Candle, CompanyProfile};
use crate::market::error::MarketError;
use crate::market::port::MarketDataProvider;
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// # Summary
/// 基于内存的行情源，按代码返回预置 K 线。
///
/// # Invariants
/// - 未登记的代码返回 `MarketError::NotFound`，登记为空列表的代码同样返回 `NotFound`。
/// - 公司概况单独登记，未登记时同样返回 `NotFound`。
#[derive(Default)]
pub struct MockMarketDataProvider {
    series: HashMap<String, Vec<Candle>>,
    profiles: HashMap<String, CompanyProfile>,
    calls: AtomicUsize,
}

impl MockMarketDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记某个代码的 K 线
    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.series.insert(symbol.to_uppercase(), candles);
        self
    }

    /// 登记某个代码的公司概况
    pub fn with_profile(mut self, symbol: &str, profile: CompanyProfile) -> Self {
        self.profiles.insert(symbol.to_uppercase(), profile);
        self
    }

    /// 已发生的抓取次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketDataProvider {
    async fn fetch_daily(
        &self,
        ticker: &Ticker,
        _period: Period,
    ) -> Result<Vec<Candle>, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.series.get(ticker.as_str()) {
            Some(candles) if !candles.is_empty() => Ok(candles.clone()),
            _ => Err(MarketError::NotFound(ticker.to_string())),
        }
    }

    async fn fetch_profile(&self, ticker: &Ticker) -> Result<CompanyProfile, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.profiles
            .get(ticker.as_str())
            .cloned()
            .ok_or_else(|| MarketError::NotFound(ticker.to_string()))
    }
}

/// # Summary
/// 按收盘价生成连续交易日（跳过周末）的合成日线。
///
/// # Logic
/// 1. 从 `start` 起逐日推进，遇到周六、周日跳过。
/// 2. 开盘价取前一日收盘价，高低价取开收盘的包络。
pub fn synthetic_candles(closes: &[f64], start: NaiveDate) -> Vec<Candle> {
    let mut candles = Vec::with_capacity(closes.len());
    let mut date = start;
    let mut prev_close = closes.first().copied().unwrap_or_default();

    for &close in closes {
        while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += Duration::days(1);
        }
        let time = Utc
            .from_utc_datetime(&date.and_hms_opt(14, 30, 0).unwrap_or_default());
        candles.push(Candle {
            time,
            date,
            open: prev_close,
            high: prev_close.max(close),
            low: prev_close.min(close),
            close,
            adj_close: Some(close),
            volume: 1_000_000.0,
        });
        prev_close = close;
        date += Duration::days(1);
    }

    candles
}
