use chrono::{NaiveDate, TimeZone, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use std::sync::Arc;
use std::time::Duration;
use yosoku_core::common::time::FakeClockProvider;
use yosoku_core::common::{Period, Ticker};
use yosoku_core::config::ForecastConfig;
use yosoku_core::forecast::error::ForecastError;
use yosoku_core::market::entity::PriceSeries;
use yosoku_core::test_utils::{MockMarketDataProvider, synthetic_candles};
use yosoku_forecast::ForecastPipeline;
use yosoku_forecast::pipeline::run_model;

fn random_walk(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.05, 1.0).unwrap();
    let mut level = 150.0;
    (0..n)
        .map(|_| {
            level += normal.sample(&mut rng);
            level
        })
        .collect()
}

fn first_trading_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 6, 1).unwrap()
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
}

fn pipeline(provider: MockMarketDataProvider) -> ForecastPipeline {
    let now = Utc.with_ymd_and_hms(2024, 6, 3, 15, 0, 0).unwrap();
    ForecastPipeline::new(
        Arc::new(provider),
        Arc::new(FakeClockProvider::new(now)),
        ForecastConfig::default(),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn test_full_pipeline_produces_thirty_dated_points() -> anyhow::Result<()> {
    let closes = random_walk(500, 2024);
    let provider = MockMarketDataProvider::new()
        .with_candles("AAPL", synthetic_candles(&closes, first_trading_day()));
    let pipeline = pipeline(provider);
    let ticker = Ticker::parse("aapl").unwrap();

    let report = pipeline.run(&ticker, Period::TwoYears).await?;

    assert_eq!(report.ticker.as_str(), "AAPL");
    assert_eq!(report.history.len(), 60);
    assert_eq!(report.forecast.points.len(), 30);
    assert!(report.forecast.rmse >= 0.0);
    assert_eq!(report.forecast.rmse, (report.forecast.rmse * 100.0).round() / 100.0);

    let dates: Vec<_> = report.forecast.points.iter().map(|p| p.date).collect();
    assert_eq!(dates[0], run_date());
    assert_eq!(dates[29], NaiveDate::from_ymd_opt(2024, 7, 2).unwrap());
    assert!(dates.windows(2).all(|w| (w[1] - w[0]).num_days() == 1));
    assert!(report.forecast.points.iter().all(|p| p.close.is_finite()));

    // 历史段是滚动均值的尾部，末点对应最后一个交易日
    let last_candle_date = synthetic_candles(&closes, first_trading_day())
        .last()
        .map(|c| c.date)
        .unwrap();
    assert_eq!(report.history.last().unwrap().date, last_candle_date);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_runs_do_not_share_state() -> anyhow::Result<()> {
    let a = random_walk(400, 1);
    let b: Vec<f64> = random_walk(400, 2).iter().map(|v| v * 10.0).collect();
    let provider = MockMarketDataProvider::new()
        .with_candles("AAA", synthetic_candles(&a, first_trading_day()))
        .with_candles("BBB", synthetic_candles(&b, first_trading_day()));
    let pipeline = pipeline(provider);
    let ta = Ticker::parse("AAA").unwrap();
    let tb = Ticker::parse("BBB").unwrap();

    let solo_a = pipeline.run(&ta, Period::TwoYears).await?;
    let solo_b = pipeline.run(&tb, Period::TwoYears).await?;
    let (joint_a, joint_b) = tokio::join!(
        pipeline.run(&ta, Period::TwoYears),
        pipeline.run(&tb, Period::TwoYears)
    );

    assert_eq!(joint_a?, solo_a);
    assert_eq!(joint_b?, solo_b);
    Ok(())
}

#[tokio::test]
async fn test_unknown_ticker_is_data_unavailable() {
    let pipeline = pipeline(MockMarketDataProvider::new());
    let ticker = Ticker::parse("NOPE").unwrap();
    let err = pipeline.run(&ticker, Period::OneYear).await.unwrap_err();
    assert!(matches!(err, ForecastError::DataUnavailable(_)));
}

#[tokio::test]
async fn test_constant_prices_are_degenerate() {
    let provider = MockMarketDataProvider::new()
        .with_candles("FLAT", synthetic_candles(&[50.0; 46], first_trading_day()));
    let pipeline = pipeline(provider);
    let ticker = Ticker::parse("FLAT").unwrap();
    let err = pipeline.run(&ticker, Period::SixMonths).await.unwrap_err();
    assert!(matches!(err, ForecastError::DegenerateSeries));
}

#[test]
fn test_linear_trend_is_too_short_to_evaluate() {
    // 31 个收盘价 -> 25 个滚动点 -> d = 1 -> 25 <= 30 无法留出评估
    let closes: Vec<f64> = (100..=130).map(f64::from).collect();
    let candles = synthetic_candles(&closes, first_trading_day());
    let series = PriceSeries::from_candles(&candles);

    let err = run_model(&series, &ForecastConfig::default(), run_date()).unwrap_err();
    assert!(matches!(
        err,
        ForecastError::InsufficientHistory { required: 30, actual: 25 }
    ));
}

#[test]
fn test_short_history_cannot_identify_full_order_model() {
    // 约半年的数据不足以支撑 ARIMA(30, d, 30)
    let closes = random_walk(126, 8);
    let series = PriceSeries::from_candles(&synthetic_candles(&closes, first_trading_day()));

    let err = run_model(&series, &ForecastConfig::default(), run_date()).unwrap_err();
    assert!(matches!(err, ForecastError::ModelFitError(_)));
}

#[test]
fn test_tiny_history_is_insufficient() {
    let series = PriceSeries::from_candles(&synthetic_candles(&[1.0, 2.0, 1.5, 2.5, 2.0, 3.0, 2.2, 2.9], first_trading_day()));
    let err = run_model(&series, &ForecastConfig::default(), run_date()).unwrap_err();
    assert!(matches!(err, ForecastError::InsufficientHistory { actual: 2, .. }));
}

#[test]
fn test_random_walk_forecasts_stay_near_last_close() {
    let config = ForecastConfig::default();
    for n in [160, 252, 500] {
        for seed in 0..8 {
            let closes = random_walk(n, seed);
            let series = PriceSeries::from_candles(&synthetic_candles(&closes, first_trading_day()));
            let output = run_model(&series, &config, run_date()).unwrap();

            let last = closes[n - 1];
            for point in &output.forecast.points {
                assert!(
                    point.close > 0.0 && (point.close - last).abs() <= 0.5 * last,
                    "n={n} seed={seed}: forecast {} drifted from last close {last}",
                    point.close
                );
            }
            assert!(output.forecast.rmse < 100.0, "n={n} seed={seed}: rmse {}", output.forecast.rmse);
        }
    }
}
