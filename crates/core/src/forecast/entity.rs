use crate::common::{Period, Ticker};
use crate::market::entity::PricePoint;
use serde::Serialize;

/// # Summary
/// 收盘价的尾随滚动均值序列。
///
/// # Invariants
/// - 只包含窗口被完整覆盖的点，长度为 `max(0, 源长度 - window + 1)`。
/// - 每个点的日期是其窗口内最后一个交易日。
/// - 每次请求重新计算，不跨请求缓存。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingSeries {
    window: usize,
    points: Vec<PricePoint>,
}

impl RollingSeries {
    pub fn new(window: usize, points: Vec<PricePoint>) -> Self {
        Self { window, points }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 最后 `n` 个点（不足 `n` 个时返回全部）
    pub fn tail(&self, n: usize) -> &[PricePoint] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }
}

/// # Summary
/// 预测结果：未来逐日的收盘价点预测及留出评估得到的 RMSE。
///
/// # Invariants
/// - `points` 覆盖从运行当天（含）起连续的自然日，无缺口、无重复。
/// - `rmse` 来自独立的留出拟合（训练集为滚动序列去掉最后 horizon 个点），
///   与生成 `points` 的模型不共享任何拟合状态；单位为标准化后的尺度。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub points: Vec<PricePoint>,
    pub rmse: f64,
}

/// # Summary
/// 一次预测流水线运行的完整产出，供图表协作方绘制“历史 + 预测”两段折线。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    // 证券代码
    pub ticker: Ticker,
    // 回溯区间
    pub period: Period,
    // 使滚动序列平稳所需的差分阶数
    pub differencing_order: usize,
    // 滚动均值序列的尾部（历史段）
    pub history: Vec<PricePoint>,
    // 预测段及评估误差
    pub forecast: ForecastResult,
}
