//! # `yosoku-analysis` - 技术分析
//!
//! 对收盘价序列计算图表所需的指标序列，并按展示窗口截取。
//! 所有函数都是纯函数：输入只读，结果与输入逐点对齐，预热期为 `None`。

pub mod indicators;
pub mod report;
pub mod window;

pub use indicators::{MacdSeries, ema, macd, rsi, sma};
pub use report::{CloseChange, TechnicalReport, build_report, latest_close};
pub use window::{DisplayWindow, filter_window};
