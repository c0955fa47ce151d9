//! # `yosoku-core` - 领域核心
//!
//! 只包含领域实体、端口 (Trait) 与错误类型，不依赖任何具体基础设施。
//! 行情抓取、模型计算、HTTP 服务等实现分别位于 `yosoku-feed`、
//! `yosoku-forecast` 与 `yosoku-api`，由 `yosoku-app` 统一装配。

pub mod common;
pub mod config;
pub mod forecast;
pub mod market;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
