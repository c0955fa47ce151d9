//! # 技术分析路由控制器
//!
//! 实现 `/api/v1/analysis/{symbol}`，对应分析页的 K 线、SMA、RSI 与 MACD 图表。

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use utoipa::IntoParams;
use yosoku_analysis::{DisplayWindow, build_report};
use yosoku_core::common::Period;

use crate::error::ApiError;
use crate::routes::{fetch_candles, parse_period, parse_ticker};
use crate::server::AppState;
use crate::types::{ApiErrorResponse, ApiResponse, IndicatorResponse};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalysisQuery {
    /// 抓取区间（默认 max），指标在完整区间上计算
    pub period: Option<String>,
    /// 展示窗口：5d, 1mo, 6mo, 1y, 5y, ytd, max, last-N（默认 1y）
    pub window: Option<String>,
}

/// 计算技术指标并按展示窗口截取
#[utoipa::path(
    get,
    path = "/api/v1/analysis/{symbol}",
    tag = "分析 (Analysis)",
    params(
        ("symbol" = String, Path, description = "证券代码"),
        AnalysisQuery
    ),
    responses(
        (status = 200, description = "成功计算指标", body = ApiResponse<IndicatorResponse>),
        (status = 400, description = "参数非法", body = ApiErrorResponse),
        (status = 404, description = "行情数据不可用", body = ApiErrorResponse)
    )
)]
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<ApiResponse<IndicatorResponse>>, ApiError> {
    let ticker = parse_ticker(&symbol)?;
    let period = parse_period(query.period.as_deref(), Period::Max)?;
    let window = match query.window.as_deref() {
        None => DisplayWindow::OneYear,
        Some(raw) => raw
            .parse::<DisplayWindow>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
    };

    let candles = fetch_candles(&state, &ticker, period).await?;
    let report = build_report(&candles, window);
    tracing::debug!("Analysis for {} ({}): {} candles in window", ticker, window, report.candles.len());

    Ok(Json(ApiResponse::ok(IndicatorResponse::from_report(
        ticker.to_string(),
        window.to_string(),
        report,
    ))))
}
