//! # `yosoku-api` - HTTP API 网关
//!
//! 使用 `axum` 构建路由与控制器，通过 `utoipa` 自动生成 OpenAPI 3.0 Swagger 文档。
//!
//! ## 架构职责
//! - 接收图表前端的 HTTP 请求，解析证券代码、回溯区间与展示窗口
//! - 调用 `ForecastPipeline` 与行情端口完成预测和技术分析
//! - 将领域模型转换为 DTO 返回给前端，领域错误映射为 HTTP 状态码

pub mod error;
pub mod routes;
pub mod server;
pub mod types;
