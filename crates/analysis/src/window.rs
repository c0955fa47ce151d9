use chrono::{Datelike, Days, Months, NaiveDate};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use yosoku_core::market::entity::Candle;

/// # Summary
/// 图表与表格的展示窗口。
///
/// # Invariants
/// - 日历窗口以最后一根 K 线的日期为基准向前回溯，只保留严格晚于锚点的 K 线。
/// - `LastRows(n)` 直接取最后 `n` 根，`n` 大于 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayWindow {
    FiveDays,
    OneMonth,
    SixMonths,
    OneYear,
    FiveYears,
    YearToDate,
    Max,
    LastRows(usize),
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown display window: {0}")]
pub struct WindowParseError(pub String);

impl FromStr for DisplayWindow {
    type Err = WindowParseError;

    /// 支持 `5d`、`1mo`、`6mo`、`1y`、`5y`、`ytd`、`max` 以及 `last-<N>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        let window = match raw.as_str() {
            "5d" => DisplayWindow::FiveDays,
            "1mo" => DisplayWindow::OneMonth,
            "6mo" => DisplayWindow::SixMonths,
            "1y" => DisplayWindow::OneYear,
            "5y" => DisplayWindow::FiveYears,
            "ytd" => DisplayWindow::YearToDate,
            "max" => DisplayWindow::Max,
            other => match other.strip_prefix("last-").and_then(|n| n.parse::<usize>().ok()) {
                Some(n) if n > 0 => DisplayWindow::LastRows(n),
                _ => return Err(WindowParseError(s.to_string())),
            },
        };
        Ok(window)
    }
}

impl fmt::Display for DisplayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayWindow::FiveDays => write!(f, "5d"),
            DisplayWindow::OneMonth => write!(f, "1mo"),
            DisplayWindow::SixMonths => write!(f, "6mo"),
            DisplayWindow::OneYear => write!(f, "1y"),
            DisplayWindow::FiveYears => write!(f, "5y"),
            DisplayWindow::YearToDate => write!(f, "ytd"),
            DisplayWindow::Max => write!(f, "max"),
            DisplayWindow::LastRows(n) => write!(f, "last-{}", n),
        }
    }
}

impl DisplayWindow {
    /// 日历窗口的锚点日期；`Max` 与 `LastRows` 没有锚点
    pub fn anchor(&self, last: NaiveDate) -> Option<NaiveDate> {
        match self {
            DisplayWindow::FiveDays => last.checked_sub_days(Days::new(5)),
            DisplayWindow::OneMonth => last.checked_sub_months(Months::new(1)),
            DisplayWindow::SixMonths => last.checked_sub_months(Months::new(6)),
            DisplayWindow::OneYear => last.checked_sub_months(Months::new(12)),
            DisplayWindow::FiveYears => last.checked_sub_months(Months::new(60)),
            DisplayWindow::YearToDate => NaiveDate::from_ymd_opt(last.year(), 1, 1),
            DisplayWindow::Max | DisplayWindow::LastRows(_) => None,
        }
    }
}

/// # Summary
/// 按展示窗口截取升序排列的 K 线。
///
/// # Logic
/// 1. `LastRows(n)` 取最后 `n` 根。
/// 2. 日历窗口保留日期严格晚于锚点的 K 线。
/// 3. `Max` 或锚点无法计算时返回全部。
///
/// # Returns
/// 输入切片的尾部子切片，不复制数据。
pub fn filter_window(candles: &[Candle], window: DisplayWindow) -> &[Candle] {
    if let DisplayWindow::LastRows(n) = window {
        return &candles[candles.len().saturating_sub(n)..];
    }

    let Some(last) = candles.last() else {
        return candles;
    };
    match window.anchor(last.date) {
        Some(anchor) => {
            let start = candles.partition_point(|c| c.date <= anchor);
            &candles[start..]
        }
        None => candles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yosoku_core::test_utils::synthetic_candles;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        for raw in ["5d", "1mo", "6mo", "1y", "5y", "ytd", "max", "last-10"] {
            let window: DisplayWindow = raw.parse().unwrap();
            assert_eq!(window.to_string(), raw);
        }
        assert_eq!("MAX".parse::<DisplayWindow>(), Ok(DisplayWindow::Max));
        assert!("last-0".parse::<DisplayWindow>().is_err());
        assert!("2w".parse::<DisplayWindow>().is_err());
    }

    #[test]
    fn test_anchor_handles_month_ends() {
        let last = date(2024, 3, 31);
        assert_eq!(DisplayWindow::OneMonth.anchor(last), Some(date(2024, 2, 29)));
        assert_eq!(DisplayWindow::YearToDate.anchor(last), Some(date(2024, 1, 1)));
        assert_eq!(DisplayWindow::FiveDays.anchor(last), Some(date(2024, 3, 26)));
        assert_eq!(DisplayWindow::Max.anchor(last), None);
    }

    #[test]
    fn test_filter_keeps_candles_after_anchor() {
        // 2024-01-01 (周一) 起 30 个交易日，最后一天为 2024-02-09 (周五)
        let candles = synthetic_candles(&[1.0; 30], date(2024, 1, 1));
        assert_eq!(candles.last().unwrap().date, date(2024, 2, 9));

        // 锚点 2024-02-04 (周日)，保留 02-05..02-09
        let five = filter_window(&candles, DisplayWindow::FiveDays);
        assert_eq!(five.len(), 5);
        assert_eq!(five[0].date, date(2024, 2, 5));

        // 锚点 2024-01-09 当天被排除
        let month = filter_window(&candles, DisplayWindow::OneMonth);
        assert_eq!(month[0].date, date(2024, 1, 10));

        // 年初 1 月 1 日本身被排除
        let ytd = filter_window(&candles, DisplayWindow::YearToDate);
        assert_eq!(ytd.len(), 29);

        assert_eq!(filter_window(&candles, DisplayWindow::Max).len(), 30);
        assert_eq!(filter_window(&candles, DisplayWindow::LastRows(7)).len(), 7);
        assert_eq!(filter_window(&candles, DisplayWindow::LastRows(100)).len(), 30);
        assert!(filter_window(&[], DisplayWindow::OneYear).is_empty());
    }
}
