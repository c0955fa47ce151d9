use crate::engine::ForecastEngine;
use crate::stationarity::StationarityAnalyzer;
use crate::{scaler, smoother, source};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use yosoku_core::common::time::TimeProvider;
use yosoku_core::common::{Period, Ticker};
use yosoku_core::config::ForecastConfig;
use yosoku_core::forecast::entity::{ForecastReport, ForecastResult, RollingSeries};
use yosoku_core::forecast::error::ForecastError;
use yosoku_core::market::entity::{PricePoint, PriceSeries};
use yosoku_core::market::port::MarketDataProvider;

/// # Summary
/// 模型阶段（抓取之后、打包之前）的产出。
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub differencing_order: usize,
    pub rolling: RollingSeries,
    pub forecast: ForecastResult,
}

/// # Summary
/// 预测流水线编排器：抓取 → 滚动均值 → 差分阶数 → 标准化 → 评估 → 预测 → 反标准化。
///
/// # Invariants
/// - 只持有不可变配置、行情端口与时钟，多请求并发调用无需加锁。
/// - 标准化参数与拟合模型都是单次运行的局部值，运行结束即丢弃。
/// - 任一阶段失败立即终止，不返回部分结果，也不重试。
pub struct ForecastPipeline {
    provider: Arc<dyn MarketDataProvider>,
    clock: Arc<dyn TimeProvider>,
    config: ForecastConfig,
    fetch_timeout: Duration,
}

impl ForecastPipeline {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        clock: Arc<dyn TimeProvider>,
        config: ForecastConfig,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            clock,
            config,
            fetch_timeout,
        }
    }

    /// # Summary
    /// 对单个证券执行一次完整预测。
    ///
    /// # Logic
    /// 1. 在 `fetch_timeout` 内抓取并清洗收盘价。
    /// 2. 从注入的时钟取“今天”作为预测日期起点。
    /// 3. 把模型阶段放到阻塞线程池执行，并受 `fit_timeout_secs` 约束；超时的计算被放弃。
    /// 4. 打包历史尾部、差分阶数与预测结果。
    ///
    /// # Arguments
    /// * `ticker`: 证券代码。
    /// * `period`: 回溯区间。
    ///
    /// # Returns
    /// 成功返回 `ForecastReport`，任一阶段失败返回对应的 `ForecastError`。
    pub async fn run(&self, ticker: &Ticker, period: Period) -> Result<ForecastReport, ForecastError> {
        let series =
            source::fetch_price_series(self.provider.as_ref(), ticker, period, self.fetch_timeout)
                .await?;
        let today = self.clock.now().date_naive();

        let config = self.config.clone();
        let fit_timeout = Duration::from_secs(self.config.fit_timeout_secs);
        let task = tokio::task::spawn_blocking(move || run_model(&series, &config, today));

        let output = match tokio::time::timeout(fit_timeout, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) => {
                error!("Model task for {} failed: {}", ticker, join_err);
                return Err(ForecastError::ModelFitError(format!(
                    "model task aborted: {}",
                    join_err
                )));
            }
            Err(_) => {
                error!("Model stage for {} exceeded {}s", ticker, fit_timeout.as_secs());
                return Err(ForecastError::ModelFitError(format!(
                    "model fit timed out after {}s",
                    fit_timeout.as_secs()
                )));
            }
        };

        info!(
            "Forecast for {} ({}) complete: d={}, rmse={}, points={}",
            ticker,
            period,
            output.differencing_order,
            output.forecast.rmse,
            output.forecast.points.len()
        );

        Ok(ForecastReport {
            ticker: ticker.clone(),
            period,
            differencing_order: output.differencing_order,
            history: output.rolling.tail(self.config.history_tail).to_vec(),
            forecast: output.forecast,
        })
    }
}

/// # Summary
/// 模型阶段的同步实现，纯计算、无 I/O。
///
/// # Logic
/// 1. 7 日滚动均值（窗口可配）。
/// 2. ADF 循环求差分阶数 d。
/// 3. 标准化滚动序列。
/// 4. 留出评估得到 RMSE（独立拟合）。
/// 5. 在完整标准化序列上拟合生产模型并预测 `horizon` 步。
/// 6. 生成从 `today`（含）开始的连续自然日。
/// 7. 用本次的标准化参数反标准化预测值。
///
/// # Arguments
/// * `series`: 清洗后的收盘价序列。
/// * `config`: 流水线参数。
/// * `today`: 预测日期起点。
pub fn run_model(
    series: &PriceSeries,
    config: &ForecastConfig,
    today: NaiveDate,
) -> Result<ModelOutput, ForecastError> {
    let rolling = smoother::rolling_mean(series, config.window);
    let values = rolling.values();

    let analyzer = StationarityAnalyzer::new(config.significance, config.max_differencing_order);
    let (differencing_order, _) = analyzer.find_differencing_order(&values)?;
    info!(
        "Rolling series of {} points is stationary after {} differences",
        values.len(),
        differencing_order
    );

    let (scaled, params) = scaler::fit(&values)?;

    let engine = ForecastEngine::from_config(config);
    let rmse = engine.evaluate(&scaled, differencing_order)?;

    let model = engine.fit(&scaled, differencing_order)?;
    let predicted = engine.forecast(&model, engine.horizon())?;
    let prices = scaler::inverse(params, &predicted);

    let points = forecast_dates(today, prices.len())
        .into_iter()
        .zip(prices)
        .map(|(date, close)| PricePoint { date, close })
        .collect();

    Ok(ModelOutput {
        differencing_order,
        rolling,
        forecast: ForecastResult { points, rmse },
    })
}

/// 从 `start`（含）开始的 `n` 个连续自然日，周末不跳过
pub fn forecast_dates(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    start.iter_days().take(n).collect()
}
