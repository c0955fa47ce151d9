//! 配置加载：内置默认值 ← 可选 TOML 文件 ← `YOSOKU__*` 环境变量。

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use yosoku_core::config::AppConfig;

/// 默认配置文件路径（不含扩展名，可为 `.toml`）
pub const DEFAULT_CONFIG_PATH: &str = "config/yosoku";

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 1. 文件不存在时跳过，字段缺省由 `AppConfig` 的 serde 默认值补齐。
/// 2. 环境变量覆盖文件，例如 `YOSOKU__SERVER__PORT=9000`、`YOSOKU__FORECAST__HORIZON=10`。
pub fn load(path: &str) -> Result<AppConfig, ConfigError> {
    finish(Config::builder().add_source(File::with_name(path).required(false)))
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, ConfigError> {
    builder
        .add_source(
            Environment::with_prefix("YOSOKU")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
