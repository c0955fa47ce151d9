use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use yosoku_api::server::{AppState, start_server};
use yosoku_core::common::time::RealTimeProvider;
use yosoku_core::config::LogConfig;
use yosoku_core::market::port::MarketDataProvider;
use yosoku_feed::yahoo::YahooProvider;
use yosoku_forecast::ForecastPipeline;

mod settings;

/// 初始化日志：控制台 + 按天滚动的文件，返回的 guard 必须存活到进程结束
fn init_tracing(log: &LogConfig) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(&log.dir, "yosoku.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking_file))
        .init();

    guard
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到预测流水线与 API 层。
///
/// # Logic
/// 1. 加载配置。
/// 2. 初始化全局日志。
/// 3. 实例化基础设施层（Yahoo 行情源、系统时钟）。
/// 4. 构造预测流水线。
/// 5. 启动 HTTP 服务，直到收到退出信号。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 加载配置
    let config = settings::load(settings::DEFAULT_CONFIG_PATH)?;

    // 2. 初始化日志
    let _guard = init_tracing(&config.log);
    info!("Yosoku starting...");

    // 3. 实例化基础设施层
    let fetch_timeout = Duration::from_secs(config.feed.timeout_secs);
    let provider: Arc<dyn MarketDataProvider> = Arc::new(YahooProvider::new(fetch_timeout)?);
    let clock = Arc::new(RealTimeProvider);

    // 4. 构造预测流水线
    let pipeline = Arc::new(ForecastPipeline::new(
        provider.clone(),
        clock,
        config.forecast.clone(),
        fetch_timeout,
    ));
    info!(
        "ForecastPipeline initialized: ARIMA({}, d, {}), horizon {} days",
        config.forecast.ar_order, config.forecast.ma_order, config.forecast.horizon
    );

    // 5. 启动 HTTP 服务
    let bind_addr = config.server.bind_addr();
    let state = AppState {
        provider,
        pipeline,
        config: Arc::new(config),
    };
    start_server(state, &bind_addr).await?;

    info!("Shutdown complete. Exiting...");
    Ok(())
}
