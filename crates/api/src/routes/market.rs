//! # 行情路由控制器
//!
//! 实现 `/api/v1/market/history/{symbol}` 与 `/api/v1/market/info/{symbol}`：
//! 原始日线供 K 线图与历史表格使用，公司概况供基本面表格使用。

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use std::time::Duration;
use utoipa::IntoParams;
use yosoku_core::common::Period;

use crate::error::ApiError;
use crate::routes::{fetch_candles, parse_period, parse_ticker};
use crate::server::AppState;
use crate::types::{ApiErrorResponse, ApiResponse, CandleResponse, CompanyProfileResponse};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// 回溯区间：6mo, 1y, 2y, 5y, 10y, ytd, max（默认 1y）
    pub period: Option<String>,
}

/// 获取历史日线
#[utoipa::path(
    get,
    path = "/api/v1/market/history/{symbol}",
    tag = "行情 (Market)",
    params(
        ("symbol" = String, Path, description = "证券代码"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "成功获取日线", body = ApiResponse<Vec<CandleResponse>>),
        (status = 400, description = "参数非法", body = ApiErrorResponse),
        (status = 404, description = "行情数据不可用", body = ApiErrorResponse)
    )
)]
pub async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<CandleResponse>>>, ApiError> {
    let ticker = parse_ticker(&symbol)?;
    let period = parse_period(query.period.as_deref(), Period::OneYear)?;

    let candles = fetch_candles(&state, &ticker, period).await?;
    let response: Vec<CandleResponse> = candles.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::ok(response)))
}

/// 获取公司概况与基本面指标
#[utoipa::path(
    get,
    path = "/api/v1/market/info/{symbol}",
    tag = "行情 (Market)",
    params(
        ("symbol" = String, Path, description = "证券代码")
    ),
    responses(
        (status = 200, description = "成功获取公司概况", body = ApiResponse<CompanyProfileResponse>),
        (status = 400, description = "参数非法", body = ApiErrorResponse),
        (status = 404, description = "数据不可用", body = ApiErrorResponse)
    )
)]
pub async fn get_info(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<CompanyProfileResponse>>, ApiError> {
    let ticker = parse_ticker(&symbol)?;
    let timeout = Duration::from_secs(state.config.feed.timeout_secs);

    let profile = tokio::time::timeout(timeout, state.provider.fetch_profile(&ticker))
        .await
        .map_err(|_| ApiError::NotFound(format!("{}: request timed out", ticker)))??;
    Ok(Json(ApiResponse::ok(CompanyProfileResponse::from_profile(
        ticker.to_string(),
        profile,
    ))))
}
