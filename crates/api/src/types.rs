//! # DTO (Data Transfer Object) 层
//!
//! 将内部领域模型转化为面向前端 JSON 输出的轻量结构体。
//! 所有 DTO 必须派生 `utoipa::ToSchema` 以自动进入 Swagger 文档。

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use yosoku_analysis::TechnicalReport;
use yosoku_core::forecast::entity::ForecastReport;
use yosoku_core::market::entity::{Candle, CompanyProfile, PricePoint};

// ============================================================
//  行情相关 DTO
// ============================================================

/// 日线 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CandleResponse {
    /// 时间戳 (ISO 8601)
    #[schema(example = "2024-06-03T13:30:00+00:00")]
    pub time: String,
    /// 交易日
    #[schema(example = "2024-06-03")]
    pub date: String,
    /// 开盘价
    #[schema(example = 192.9)]
    pub open: f64,
    /// 最高价
    #[schema(example = 194.99)]
    pub high: f64,
    /// 最低价
    #[schema(example = 192.52)]
    pub low: f64,
    /// 收盘价
    #[schema(example = 194.03)]
    pub close: f64,
    /// 复权收盘价
    pub adj_close: Option<f64>,
    /// 成交量
    #[schema(example = 50080500.0)]
    pub volume: f64,
}

/// 单日价格点 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PricePointResponse {
    /// 日期
    #[schema(example = "2024-06-03")]
    pub date: String,
    /// 价格
    #[schema(example = 194.03)]
    pub close: f64,
}

/// 公司概况 DTO，字段缺失时为 null
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanyProfileResponse {
    /// 证券代码
    #[schema(example = "AAPL")]
    pub ticker: String,
    /// 业务简介
    pub summary: Option<String>,
    /// 板块
    #[schema(example = "Technology")]
    pub sector: Option<String>,
    /// 行业
    #[schema(example = "Consumer Electronics")]
    pub industry: Option<String>,
    /// 官网
    pub website: Option<String>,
    /// 全职员工数
    #[schema(example = 161000)]
    pub employees: Option<u64>,
    /// 总市值
    pub market_cap: Option<f64>,
    pub beta: Option<f64>,
    /// 每股收益 (TTM)
    pub trailing_eps: Option<f64>,
    /// 市盈率 (TTM)
    pub trailing_pe: Option<f64>,
    /// 速动比率
    pub quick_ratio: Option<f64>,
    /// 每股营收
    pub revenue_per_share: Option<f64>,
    /// 利润率（小数）
    pub profit_margins: Option<f64>,
    /// 负债权益比（百分数）
    pub debt_to_equity: Option<f64>,
    /// 总资产收益率（小数）
    pub return_on_assets: Option<f64>,
}

// ============================================================
//  预测相关 DTO
// ============================================================

/// 预测结果 DTO - 对应图表中 "历史 + 预测" 两段折线
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ForecastResponse {
    /// 证券代码
    #[schema(example = "AAPL")]
    pub ticker: String,
    /// 回溯区间
    #[schema(example = "2y")]
    pub period: String,
    /// 差分阶数
    #[schema(example = 1)]
    pub differencing_order: usize,
    /// 留出评估 RMSE（标准化尺度）
    #[schema(example = 0.12)]
    pub rmse: f64,
    /// 滚动均值历史段
    pub history: Vec<PricePointResponse>,
    /// 逐日预测
    pub forecast: Vec<PricePointResponse>,
}

// ============================================================
//  技术分析 DTO
// ============================================================

/// 最新收盘价 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LatestCloseResponse {
    /// 最新收盘价
    #[schema(example = 194.03)]
    pub close: f64,
    /// 相对前一交易日的变动，只有一根 K 线时为 null
    #[schema(example = 1.21)]
    pub change: Option<f64>,
}

/// 技术分析 DTO，所有指标序列与 `candles` 逐点对齐，预热期为 null
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IndicatorResponse {
    /// 证券代码
    #[schema(example = "AAPL")]
    pub ticker: String,
    /// 展示窗口
    #[schema(example = "1y")]
    pub window: String,
    /// 窗口内的日线
    pub candles: Vec<CandleResponse>,
    /// 50 日简单均线
    pub sma: Vec<Option<f64>>,
    /// 14 日 RSI
    pub rsi: Vec<Option<f64>>,
    /// MACD 线
    pub macd: Vec<Option<f64>>,
    /// MACD 信号线
    pub macd_signal: Vec<Option<f64>>,
    /// MACD 柱状图
    pub macd_histogram: Vec<Option<f64>>,
    /// 最新收盘价
    pub latest: Option<LatestCloseResponse>,
}

// ============================================================
//  通用响应 DTO
// ============================================================

/// 统一 API 响应包装器
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: Serialize + ToSchema> {
    /// 是否成功
    pub success: bool,
    /// 数据载荷 (成功时)
    pub data: Option<T>,
    /// 错误信息 (失败时)
    pub error: Option<String>,
}

impl<T: Serialize + ToSchema> ApiResponse<T> {
    /// 构建成功响应
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// 构建失败响应 (不含泛型载荷)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 固定为 false
    pub success: bool,
    /// 错误描述信息
    pub error: String,
    /// 错误类别，如 `DataUnavailable`、`InsufficientHistory`
    #[schema(example = "InsufficientHistory")]
    pub kind: String,
}

impl ApiErrorResponse {
    pub fn new(msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
            kind: kind.into(),
        }
    }
}

// ============================================================
//  领域模型 → DTO 惯用转换 (impl From<T>)
// ============================================================

impl From<Candle> for CandleResponse {
    fn from(c: Candle) -> Self {
        Self {
            time: c.time.to_rfc3339(),
            date: c.date.to_string(),
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            adj_close: c.adj_close,
            volume: c.volume,
        }
    }
}

impl From<PricePoint> for PricePointResponse {
    fn from(p: PricePoint) -> Self {
        Self {
            date: p.date.to_string(),
            close: p.close,
        }
    }
}

impl From<ForecastReport> for ForecastResponse {
    fn from(r: ForecastReport) -> Self {
        Self {
            ticker: r.ticker.to_string(),
            period: r.period.to_string(),
            differencing_order: r.differencing_order,
            rmse: r.forecast.rmse,
            history: r.history.into_iter().map(Into::into).collect(),
            forecast: r.forecast.points.into_iter().map(Into::into).collect(),
        }
    }
}

impl CompanyProfileResponse {
    pub fn from_profile(ticker: String, p: CompanyProfile) -> Self {
        Self {
            ticker,
            summary: p.summary,
            sector: p.sector,
            industry: p.industry,
            website: p.website,
            employees: p.employees,
            market_cap: p.market_cap,
            beta: p.beta,
            trailing_eps: p.trailing_eps,
            trailing_pe: p.trailing_pe,
            quick_ratio: p.quick_ratio,
            revenue_per_share: p.revenue_per_share,
            profit_margins: p.profit_margins,
            debt_to_equity: p.debt_to_equity,
            return_on_assets: p.return_on_assets,
        }
    }
}

impl IndicatorResponse {
    pub fn from_report(ticker: String, window: String, report: TechnicalReport) -> Self {
        Self {
            ticker,
            window,
            candles: report.candles.into_iter().map(Into::into).collect(),
            sma: report.sma,
            rsi: report.rsi,
            macd: report.macd.macd,
            macd_signal: report.macd.signal,
            macd_histogram: report.macd.histogram,
            latest: report.latest.map(|l| LatestCloseResponse {
                close: l.close,
                change: l.change,
            }),
        }
    }
}
