use serde::Serialize;
use yosoku_core::common::numeric::count_to_f64;

/// # Summary
/// 简单移动平均。
///
/// # Logic
/// 下标 `i >= period - 1` 处取最近 `period` 个值的算术平均，之前为 `None`。
/// `period` 为 0 时整条序列为 `None`。
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }

    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out[i] = Some(sum / count_to_f64(period));
        }
    }
    out
}

/// # Summary
/// 指数移动平均，以前 `period` 个值的 SMA 作为种子。
///
/// # Logic
/// 1. 平滑系数 `α = 2 / (period + 1)`。
/// 2. 第一个有效值出现在下标 `period - 1`，等于前 `period` 个值的均值。
/// 3. 之后 `ema_t = α·x_t + (1 - α)·ema_t-1`。
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let alpha = 2.0 / (count_to_f64(period) + 1.0);
    let mut current = values[..period].iter().sum::<f64>() / count_to_f64(period);
    out[period - 1] = Some(current);
    for (i, &v) in values.iter().enumerate().skip(period) {
        current = alpha * v + (1.0 - alpha) * current;
        out[i] = Some(current);
    }
    out
}

/// # Summary
/// 相对强弱指数 (Wilder 平滑)。
///
/// # Logic
/// 1. 逐日涨跌拆分为 gain / loss。
/// 2. 前 `period` 个变动取简单平均作为初始均值，之后 `avg = (avg·(n-1) + x) / n`。
/// 3. `RSI = 100 - 100 / (1 + avg_gain / avg_loss)`；没有下跌时为 100。
///
/// # Returns
/// 第一个有效值位于下标 `period`（需要 `period` 个变动）。
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() <= period {
        return out;
    }

    let n = count_to_f64(period);
    let (mut avg_gain, mut avg_loss) = values[..=period]
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), change| {
            (g + change.max(0.0), l + (-change).max(0.0))
        });
    avg_gain /= n;
    avg_loss /= n;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for i in period + 1..values.len() {
        let change = values[i] - values[i - 1];
        avg_gain = (avg_gain * (n - 1.0) + change.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-change).max(0.0)) / n;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// MACD 三条线，均与输入逐点对齐
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacdSeries {
    // 快线 EMA - 慢线 EMA
    pub macd: Vec<Option<f64>>,
    // MACD 线的 EMA
    pub signal: Vec<Option<f64>>,
    // MACD - signal
    pub histogram: Vec<Option<f64>>,
}

/// # Summary
/// 一次调用同时计算 MACD 线、信号线与柱状图。
///
/// # Logic
/// 1. MACD 线在快慢两条 EMA 都有效的位置取差值。
/// 2. 信号线是 MACD 有效段上的 EMA（同样以 SMA 为种子），再映射回原下标。
/// 3. 柱状图在两条线都有效的位置取差值。
///
/// # Arguments
/// * `values`: 收盘价。
/// * `fast` / `slow` / `signal`: 三个周期，常用 12 / 26 / 9。
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_line = ema(values, fast);
    let slow_line = ema(values, slow);

    let macd_line: Vec<Option<f64>> = fast_line
        .iter()
        .zip(&slow_line)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let mut signal_line = vec![None; values.len()];
    if let Some(start) = macd_line.iter().position(Option::is_some) {
        let valid: Vec<f64> = macd_line[start..].iter().map(|v| v.unwrap_or_default()).collect();
        for (offset, value) in ema(&valid, signal).into_iter().enumerate() {
            signal_line[start + offset] = value;
        }
    }

    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();

    MacdSeries {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}
