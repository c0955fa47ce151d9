//! # 预测路由控制器
//!
//! 实现 `/api/v1/forecast/{symbol}`，对应预测页的 "历史 + 30 日预测" 图表数据源。

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use utoipa::IntoParams;
use yosoku_core::common::Period;

use crate::error::ApiError;
use crate::routes::{parse_period, parse_ticker};
use crate::server::AppState;
use crate::types::{ApiErrorResponse, ApiResponse, ForecastResponse};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ForecastQuery {
    /// 回溯区间：6mo, 1y, 2y, 5y, 10y, ytd, max（默认 2y）
    pub period: Option<String>,
}

/// 对指定证券执行一次 30 日收盘价预测
///
/// 依次完成抓取、7 日滚动均值、ADF 差分阶数搜索、标准化、留出评估与 ARIMA 预测。
#[utoipa::path(
    get,
    path = "/api/v1/forecast/{symbol}",
    tag = "预测 (Forecast)",
    params(
        ("symbol" = String, Path, description = "证券代码，如 AAPL"),
        ForecastQuery
    ),
    responses(
        (status = 200, description = "预测成功", body = ApiResponse<ForecastResponse>),
        (status = 400, description = "参数非法", body = ApiErrorResponse),
        (status = 404, description = "行情数据不可用", body = ApiErrorResponse),
        (status = 422, description = "数据无法建模", body = ApiErrorResponse)
    )
)]
pub async fn get_forecast(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ApiResponse<ForecastResponse>>, ApiError> {
    let ticker = parse_ticker(&symbol)?;
    let period = parse_period(query.period.as_deref(), Period::TwoYears)?;

    let report = state.pipeline.run(&ticker, period).await?;
    Ok(Json(ApiResponse::ok(report.into())))
}
