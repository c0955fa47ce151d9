use std::num::NonZeroUsize;
use yosoku_core::common::numeric::count_to_f64;
use yosoku_core::forecast::entity::RollingSeries;
use yosoku_core::market::entity::{PricePoint, PriceSeries};

/// # Summary
/// 计算收盘价的尾随滚动均值，用于建模前去噪。
///
/// # Logic
/// 1. 对每个 `i >= window - 1`，取 `series[i-window+1..=i]` 的算术平均。
/// 2. 窗口未被完整覆盖的前 `window - 1` 个点直接省略，不补零也不补 NaN。
/// 3. 结果点的日期取窗口内最后一个交易日。
///
/// # Arguments
/// * `series`: 已清洗的收盘价序列。
/// * `window`: 窗口宽度（生产口径为 7）。
///
/// # Returns
/// 长度为 `max(0, len - window + 1)` 的滚动序列。
pub fn rolling_mean(series: &PriceSeries, window: NonZeroUsize) -> RollingSeries {
    let w = window.get();
    let points = series
        .points()
        .windows(w)
        .filter_map(|win| {
            let last = win.last()?;
            let sum: f64 = win.iter().map(|p| p.close).sum();
            Some(PricePoint {
                date: last.date,
                close: sum / count_to_f64(w),
            })
        })
        .collect();

    RollingSeries::new(w, points)
}
