use crate::indicators::{MacdSeries, macd, rsi, sma};
use crate::window::{DisplayWindow, filter_window};
use serde::Serialize;
use yosoku_core::market::entity::Candle;

// 图表使用的指标参数
pub const SMA_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// 最新收盘价及其相对前一交易日的变动
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CloseChange {
    pub close: f64,
    // 只有一根 K 线时为 None
    pub change: Option<f64>,
}

/// 最新收盘价；没有 K 线时返回 None
pub fn latest_close(candles: &[Candle]) -> Option<CloseChange> {
    let (last, rest) = candles.split_last()?;
    Some(CloseChange {
        close: last.close,
        change: rest.last().map(|prev| last.close - prev.close),
    })
}

/// # Summary
/// 技术分析页所需的全部数据，所有序列都与 `candles` 逐点对齐。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalReport {
    pub candles: Vec<Candle>,
    pub sma: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
    pub macd: MacdSeries,
    pub latest: Option<CloseChange>,
}

/// # Summary
/// 生成技术分析报表。
///
/// # Logic
/// 1. 在完整历史上计算 SMA(50)、RSI(14)、MACD(12, 26, 9)，避免窗口截断带来的预热缺口。
/// 2. 按展示窗口截取 K 线，指标序列截取相同的尾部。
/// 3. 最新收盘价取自截取后的 K 线。
pub fn build_report(candles: &[Candle], window: DisplayWindow) -> TechnicalReport {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let sma_full = sma(&closes, SMA_PERIOD);
    let rsi_full = rsi(&closes, RSI_PERIOD);
    let macd_full = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);

    let visible = filter_window(candles, window);
    let offset = candles.len() - visible.len();

    TechnicalReport {
        candles: visible.to_vec(),
        sma: sma_full[offset..].to_vec(),
        rsi: rsi_full[offset..].to_vec(),
        macd: MacdSeries {
            macd: macd_full.macd[offset..].to_vec(),
            signal: macd_full.signal[offset..].to_vec(),
            histogram: macd_full.histogram[offset..].to_vec(),
        },
        latest: latest_close(visible),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use yosoku_core::test_utils::synthetic_candles;

    fn candles(n: u32) -> Vec<Candle> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + f64::from(i % 7) - f64::from(i % 3)).collect();
        synthetic_candles(&closes, NaiveDate::from_ymd_opt(2023, 1, 2).unwrap())
    }

    #[test]
    fn test_latest_close() {
        let data = synthetic_candles(&[10.0, 12.5], NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(
            latest_close(&data),
            Some(CloseChange {
                close: 12.5,
                change: Some(2.5)
            })
        );
        assert_eq!(latest_close(&data[..1]).unwrap().change, None);
        assert_eq!(latest_close(&[]), None);
    }

    #[test]
    fn test_indicators_use_full_history_before_windowing() {
        let data = candles(120);
        let report = build_report(&data, DisplayWindow::LastRows(10));

        assert_eq!(report.candles.len(), 10);
        assert_eq!(report.sma.len(), 10);
        assert_eq!(report.macd.signal.len(), 10);
        // 窗口内的每个点都已越过 50 日预热期
        assert!(report.sma.iter().all(Option::is_some));
        assert!(report.rsi.iter().all(Option::is_some));
        assert!(report.macd.histogram.iter().all(Option::is_some));

        let full = sma(&data.iter().map(|c| c.close).collect::<Vec<_>>(), SMA_PERIOD);
        assert_eq!(report.sma[..], full[110..]);
        assert_eq!(report.latest.unwrap().close, data[119].close);
    }

    #[test]
    fn test_max_window_keeps_warm_up_gaps() {
        let report = build_report(&candles(60), DisplayWindow::Max);
        assert_eq!(report.candles.len(), 60);
        assert!(report.sma[..49].iter().all(Option::is_none));
        assert!(report.sma[49].is_some());
    }
}
