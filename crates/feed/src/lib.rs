//! # `yosoku-feed` - 行情数据源适配器
//!
//! 实现 `yosoku-core` 中的 `MarketDataProvider` 端口。

pub mod yahoo;
