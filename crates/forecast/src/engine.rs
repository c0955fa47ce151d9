use crate::arima::{self, ArimaOrder, EstimationOptions, FittedArima};
use std::num::NonZeroUsize;
use tracing::debug;
use yosoku_core::common::numeric::count_to_f64;
use yosoku_core::config::ForecastConfig;
use yosoku_core::forecast::error::ForecastError;

/// # Summary
/// ARIMA 预测引擎：封装固定的 AR/MA 阶数与预测步长。
///
/// # Invariants
/// - 引擎本身无状态，拟合出的模型是调用方的局部值。
/// - `horizon` 同时决定预测步数与留出评估的测试集长度。
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    ar_order: usize,
    ma_order: usize,
    horizon: NonZeroUsize,
    options: EstimationOptions,
}

impl ForecastEngine {
    pub fn new(ar_order: usize, ma_order: usize, horizon: NonZeroUsize, options: EstimationOptions) -> Self {
        Self {
            ar_order,
            ma_order,
            horizon,
            options,
        }
    }

    pub fn from_config(config: &ForecastConfig) -> Self {
        Self::new(
            config.ar_order,
            config.ma_order,
            config.horizon,
            EstimationOptions {
                max_iterations: config.max_iterations,
                tolerance: config.tolerance,
                ridge: config.ridge,
            },
        )
    }

    pub fn horizon(&self) -> usize {
        self.horizon.get()
    }

    /// 以引擎阶数和给定差分阶数拟合 ARIMA(p, d, q)
    pub fn fit(&self, train: &[f64], d: usize) -> Result<FittedArima, ForecastError> {
        arima::fit(train, ArimaOrder::new(self.ar_order, d, self.ma_order), &self.options)
    }

    /// 用已拟合模型向前预测 `steps` 步
    pub fn forecast(&self, model: &FittedArima, steps: usize) -> Result<Vec<f64>, ForecastError> {
        model.forecast(steps)
    }

    /// # Summary
    /// 留出评估：用除最后 `horizon` 个点外的数据拟合，预测最后 `horizon` 个点并计算 RMSE。
    ///
    /// # Logic
    /// 1. `len <= horizon` 时训练集为空，返回 `InsufficientHistory`；`horizon` 至少为 1，测试集不会为空。
    /// 2. 拟合独立的评估模型，预测 `horizon` 步。
    /// 3. RMSE 保留 2 位小数，单位与输入序列一致（标准化尺度）。
    pub fn evaluate(&self, series: &[f64], d: usize) -> Result<f64, ForecastError> {
        let horizon = self.horizon();
        if series.len() <= horizon {
            return Err(ForecastError::InsufficientHistory {
                required: horizon,
                actual: series.len(),
            });
        }

        let (train, test) = series.split_at(series.len() - horizon);
        let model = self.fit(train, d)?;
        let predicted = self.forecast(&model, test.len())?;

        let rmse = root_mean_squared_error(test, &predicted);
        debug!(
            "holdout evaluation: train={} test={} rmse={:.4}",
            train.len(),
            test.len(),
            rmse
        );
        Ok((rmse * 100.0).round() / 100.0)
    }
}

fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let sse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    (sse / count_to_f64(n)).sqrt()
}
