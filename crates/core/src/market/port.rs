use crate::common::{Period, Ticker};
use crate::market::entity::{Candle, CompanyProfile};
use crate::market::error::MarketError;
use async_trait::async_trait;

/// # Summary
/// 市场行情数据提供者接口（原始数据源）。
///
/// # Invariants
/// - 返回的 K 线按交易日升序排列。
/// - 不做重试：失败直接向上返回，由调用方决定如何呈现。
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// # Summary
    /// 获取特定证券在指定回溯区间内的日线数据。
    ///
    /// # Logic
    /// 1. 将回溯区间映射为数据源识别的参数。
    /// 2. 执行网络请求并解析响应数据。
    /// 3. 丢弃关键字段缺失的行。
    ///
    /// # Arguments
    /// * `ticker`: 证券代码。
    /// * `period`: 回溯区间。
    ///
    /// # Returns
    /// 成功返回 K 线列表；代码未知或结果为空时返回 `MarketError::NotFound`。
    async fn fetch_daily(&self, ticker: &Ticker, period: Period)
    -> Result<Vec<Candle>, MarketError>;

    /// # Summary
    /// 获取证券的公司概况与基本面指标。
    ///
    /// # Arguments
    /// * `ticker`: 证券代码。
    ///
    /// # Returns
    /// 成功返回 `CompanyProfile`（字段可缺失）；代码未知时返回 `MarketError::NotFound`。
    async fn fetch_profile(&self, ticker: &Ticker) -> Result<CompanyProfile, MarketError>;
}
