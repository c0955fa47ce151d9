//! # `yosoku-forecast` - 预测流水线
//!
//! 数据严格单向流动：
//! 抓取 → 滚动均值 → 差分阶数 → 标准化 → 留出评估 → 预测 → 反标准化 → 打包。
//!
//! 所有中间状态（标准化参数、拟合模型）都是单次运行的局部值，不跨请求共享。

pub mod arima;
pub mod engine;
pub(crate) mod linalg;
pub mod pipeline;
pub(crate) mod polynomial;
pub mod scaler;
pub mod smoother;
pub mod source;
pub mod stationarity;

pub use engine::ForecastEngine;
pub use pipeline::ForecastPipeline;
