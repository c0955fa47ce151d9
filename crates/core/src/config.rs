use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// 全局应用配置
///
/// 每个分节都带 `#[serde(default)]`，配置文件或环境变量只需覆盖关心的字段。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub feed: FeedConfig,
    pub forecast: ForecastConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// 监听地址，如 `0.0.0.0:8080`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 行情数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    // 单次历史数据请求的超时秒数
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

/// # Summary
/// 预测流水线参数。
///
/// # Invariants
/// - 默认值即生产口径：7 日滚动均值、ARIMA(30, d, 30)、预测 30 天、显著性 0.05。
/// - `max_differencing_order` 是差分循环的硬上限，不允许无界迭代。
/// - `window` 与 `horizon` 不允许为 0，反序列化时即被拒绝。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    // 滚动均值窗口
    pub window: NonZeroUsize,
    // 预测步数，同时也是留出评估的测试集长度
    pub horizon: NonZeroUsize,
    // 自回归阶数 p
    pub ar_order: usize,
    // 移动平均阶数 q
    pub ma_order: usize,
    // ADF 检验显著性水平
    pub significance: f64,
    // 差分阶数上限
    pub max_differencing_order: usize,
    // Hannan-Rissanen 迭代精化的最大轮数
    pub max_iterations: usize,
    // 残差方差相对改善低于该值即视为收敛
    pub tolerance: f64,
    // 最小二乘的岭正则系数（相对 X'X 对角线均值）
    pub ridge: f64,
    // 模型阶段（平稳性检验 + 拟合 + 预测）的超时秒数
    pub fit_timeout_secs: u64,
    // 返回给图表的历史滚动序列尾部长度
    pub history_tail: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            window: NonZeroUsize::new(7).unwrap_or(NonZeroUsize::MIN),
            horizon: NonZeroUsize::new(30).unwrap_or(NonZeroUsize::MIN),
            ar_order: 30,
            ma_order: 30,
            significance: 0.05,
            max_differencing_order: 10,
            max_iterations: 10,
            tolerance: 1e-4,
            ridge: 1e-4,
            fit_timeout_secs: 120,
            history_tail: 60,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    // 滚动日志文件目录
    pub dir: String,
    // 未设置 RUST_LOG 时使用的过滤表达式
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            level: "info".to_string(),
        }
    }
}
