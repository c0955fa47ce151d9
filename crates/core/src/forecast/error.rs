use crate::market::error::MarketError;
use thiserror::Error;

/// # Summary
/// 预测流水线错误枚举。任何一个阶段失败都会终止整次运行，不返回部分结果。
///
/// # Invariants
/// - 不做自动重试。
/// - `kind()` 返回的名称是对外稳定的错误类别标识。
#[derive(Error, Debug)]
pub enum ForecastError {
    // 未知代码、上游返回空结果、网络失败或抓取超时
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),
    // 标准化输入方差为零
    #[error("Degenerate series: standard deviation is zero")]
    DegenerateSeries,
    // 差分次数超过上限，或序列在差分过程中被耗尽
    #[error("Stationarity not achieved within {max_order} differences")]
    StationarityNotAchieved { max_order: usize },
    // 序列长度不足以支撑检验或评估
    #[error("Insufficient history: need more than {required} points, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },
    // 参数估计发散、阶数组合非法、序列过短或拟合超时
    #[error("Model fit error: {0}")]
    ModelFitError(String),
}

impl ForecastError {
    /// 错误类别名称
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::DataUnavailable(_) => "DataUnavailable",
            ForecastError::DegenerateSeries => "DegenerateSeries",
            ForecastError::StationarityNotAchieved { .. } => "StationarityNotAchieved",
            ForecastError::InsufficientHistory { .. } => "InsufficientHistory",
            ForecastError::ModelFitError(_) => "ModelFitError",
        }
    }
}

impl From<MarketError> for ForecastError {
    fn from(err: MarketError) -> Self {
        ForecastError::DataUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_error_maps_to_data_unavailable() {
        let err: ForecastError = MarketError::NotFound("ZZZZ".to_string()).into();
        assert_eq!(err.kind(), "DataUnavailable");
        assert!(err.to_string().contains("ZZZZ"));
    }
}
