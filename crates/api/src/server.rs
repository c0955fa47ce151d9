//! # API 服务启动器
//!
//! 组装 axum 路由、挂载 Swagger UI、配置 CORS 并绑定 TCP 端口对外提供服务。
//! 本模块不直接启动 `main()`, 而是由 `crates/app` 的 DI 容器持有并调用。

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use yosoku_core::config::AppConfig;
use yosoku_core::market::port::MarketDataProvider;
use yosoku_forecast::ForecastPipeline;

use crate::routes::{analysis, forecast, market};

// ============================================================
//  共享应用状态
// ============================================================

/// 全局应用状态，通过 axum 的 `State` 提取器注入到每个 Handler 中。
///
/// # Invariants
/// - 所有字段在服务启动前由 DI 容器注入，生命周期与进程等同。
/// - 只包含不可变配置与无状态服务，请求之间不共享任何中间计算结果。
#[derive(Clone)]
pub struct AppState {
    /// 行情端口 (用于历史与技术分析)
    pub provider: Arc<dyn MarketDataProvider>,
    /// 预测流水线
    pub pipeline: Arc<ForecastPipeline>,
    /// 全局配置
    pub config: Arc<AppConfig>,
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

/// 全局 OpenAPI 文档结构
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Yosoku 股价预测 API",
        version = "0.1.0",
        description = "基于 ARIMA 的 30 日收盘价预测与技术分析 RESTful API。",
        license(name = "MIT")
    ),
    tags(
        (name = "预测 (Forecast)", description = "滚动均值 + ARIMA 收盘价预测"),
        (name = "行情 (Market)", description = "历史日线与公司概况查询"),
        (name = "分析 (Analysis)", description = "SMA / RSI / MACD 技术指标")
    )
)]
pub struct ApiDoc;

// ============================================================
//  服务构建与启动
// ============================================================

/// 构建完整的 axum 应用路由树（含 Swagger UI 与 CORS）。
pub fn build_router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(forecast::get_forecast))
        .routes(routes!(market::get_history))
        .routes(routes!(market::get_info))
        .routes(routes!(analysis::get_analysis))
        .with_state(state)
        .split_for_parts();

    // 前端渲染器与服务分开部署，允许所有来源
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors)
}

/// 绑定端口并启动 HTTP 服务。
///
/// # Arguments
/// * `state` - 由外部 DI 容器注入的共享状态
/// * `bind_addr` - 监听的地址与端口，如 `"0.0.0.0:8080"`
pub async fn start_server(state: AppState, bind_addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state);

    tracing::info!("Yosoku API Server listening on {}", bind_addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui/", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
