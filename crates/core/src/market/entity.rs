use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 单根日线数据实体，记录一个交易日内的行情波动。
///
/// # Invariants
/// - `high` 必须大于或等于 `low`, `open`, `close`。
/// - `date` 为交易所本地日期，`time` 为该日开盘时刻的 UTC 时间。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // K 线开始时间
    pub time: DateTime<Utc>,
    // 交易日（交易所时区）
    pub date: NaiveDate,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 调整后收盘价 (用于处理分红、拆股等复权情况)
    pub adj_close: Option<f64>,
    // 成交量
    pub volume: f64,
}

/// 单日收盘价
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// # Summary
/// 按交易日升序排列的收盘价序列，是预测流水线的输入。
///
/// # Invariants
/// - 日期严格递增，无重复。
/// - 不含缺失值：所有收盘价均为有限数。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// # Summary
    /// 从 K 线列表构造收盘价序列。
    ///
    /// # Logic
    /// 1. 丢弃收盘价非有限值的行。
    /// 2. 按交易日稳定排序。
    /// 3. 同一交易日出现多次时保留最后一条。
    ///
    /// # Arguments
    /// * `candles`: 原始 K 线，顺序任意。
    ///
    /// # Returns
    /// 满足不变量的序列（可能为空）。
    pub fn from_candles(candles: &[Candle]) -> Self {
        let points = candles
            .iter()
            .filter(|c| c.close.is_finite())
            .map(|c| PricePoint {
                date: c.date,
                close: c.close,
            })
            .collect();
        Self::from_points(points)
    }

    /// 从任意顺序的点构造序列，规则同 [`PriceSeries::from_candles`]
    pub fn from_points(mut points: Vec<PricePoint>) -> Self {
        points.retain(|p| p.close.is_finite());
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }

        Self { points: deduped }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// 仅收盘价
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// # Summary
/// 公司概况与基本面指标，供技术分析页的“公司信息”表格使用。
///
/// # Invariants
/// - 所有字段均可缺失：数据源对不同证券（例如 ETF）给出的字段集合不同。
/// - 比率类字段保持数据源原始口径（`profit_margins` 为小数，`debt_to_equity` 为百分数）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    // 业务简介
    pub summary: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    // 全职员工数
    pub employees: Option<u64>,
    // 总市值
    pub market_cap: Option<f64>,
    pub beta: Option<f64>,
    // 过去四个季度每股收益
    pub trailing_eps: Option<f64>,
    // 市盈率 (TTM)
    pub trailing_pe: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub revenue_per_share: Option<f64>,
    pub profit_margins: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, close: f64) -> PricePoint {
        PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close,
        }
    }

    #[test]
    fn test_series_sorted_deduped_and_clean() {
        let series = PriceSeries::from_points(vec![
            point(3, 103.0),
            point(1, 101.0),
            point(2, f64::NAN),
            point(3, 104.0),
            point(4, 105.0),
        ]);

        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![101.0, 104.0, 105.0]);
        let dates = series.dates();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }
}
