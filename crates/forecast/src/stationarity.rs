//! Augmented Dickey-Fuller 平稳性检验与差分阶数搜索。

use crate::linalg::least_squares;
use statrs::function::erf::erfc;
use tracing::{debug, warn};
use yosoku_core::common::numeric::{ceil_count, count_to_f64};
use yosoku_core::forecast::error::ForecastError;

/// ADF（含常数项回归）至少需要的观测数：`n / 2 - 2 >= 0`
pub const ADF_MIN_LEN: usize = 4;

// MacKinnon (1994) 常数项回归、单变量的响应面系数
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038_269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.932_02, -0.127_45, -0.010_368];

/// # Summary
/// 一次 ADF 检验的结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdfResult {
    // 滞后一期水平项系数的 t 统计量
    pub statistic: f64,
    // MacKinnon 近似 p 值（未取整）
    pub p_value: f64,
    // AIC 选出的差分滞后阶数
    pub used_lag: usize,
    // 最终回归的样本量
    pub nobs: usize,
}

/// # Summary
/// 执行含常数项的 Augmented Dickey-Fuller 检验。
///
/// # Logic
/// 1. 最大滞后 `ceil(12·(n/100)^¼)`，并截断到 `n/2 - 2`。
/// 2. 在同一截断样本上对 `0..=maxlag` 逐个回归，按 AIC 选滞后阶数（并列取较小者）。
/// 3. 用选出的滞后阶数在其完整样本上重新回归 `Δx_t ~ x_t-1 + Δx_t-1.. + c`。
/// 4. 取水平项系数的 t 统计量，代入 MacKinnon 响应面得到 p 值。
/// 5. 最终回归奇异时按“无法拒绝单位根”处理，p 值记为 1。
///
/// # Arguments
/// * `series`: 待检验序列。
///
/// # Returns
/// 观测数不足 `ADF_MIN_LEN` 时返回 `InsufficientHistory`。
pub fn adf_test(series: &[f64]) -> Result<AdfResult, ForecastError> {
    let n = series.len();
    if n < ADF_MIN_LEN {
        return Err(ForecastError::InsufficientHistory {
            required: ADF_MIN_LEN - 1,
            actual: n,
        });
    }

    let schwert = ceil_count(12.0 * (count_to_f64(n) / 100.0).powf(0.25), n);
    let maxlag = schwert.min(n / 2 - 2);
    let xdiff = difference(series);

    let mut best_lag = 0;
    let mut best_aic = f64::INFINITY;
    for lag in 0..=maxlag {
        let (design, y) = adf_design(series, &xdiff, lag, maxlag);
        let Some(fit) = least_squares(&design, &y, 0.0) else {
            continue;
        };
        let aic = fit.aic();
        if aic < best_aic {
            best_aic = aic;
            best_lag = lag;
        }
    }

    let (design, y) = adf_design(series, &xdiff, best_lag, best_lag);
    let nobs = y.len();
    let Some(fit) = least_squares(&design, &y, 0.0) else {
        warn!("ADF regression is singular (n={}, lag={}), treating as unit root", n, best_lag);
        return Ok(AdfResult {
            statistic: f64::NAN,
            p_value: 1.0,
            used_lag: best_lag,
            nobs,
        });
    };

    let coef = fit.beta[0];
    let se = fit.standard_error(0);
    let statistic = if se > 0.0 {
        coef / se
    } else if coef < 0.0 {
        f64::NEG_INFINITY
    } else if coef > 0.0 {
        f64::INFINITY
    } else {
        f64::NAN
    };

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        used_lag: best_lag,
        nobs,
    })
}

/// 构造 ADF 回归：行 t 取 `Δx_t` 为因变量，回归量依次为 `x_t`、`Δx_t-1..Δx_t-lag`、常数
fn adf_design(series: &[f64], xdiff: &[f64], lag: usize, trim: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let rows = xdiff.len().saturating_sub(trim);
    let mut design = Vec::with_capacity(rows);
    let mut y = Vec::with_capacity(rows);

    for t in trim..xdiff.len() {
        let mut row = Vec::with_capacity(lag + 2);
        row.push(series[t]);
        row.extend((1..=lag).map(|i| xdiff[t - i]));
        row.push(1.0);
        design.push(row);
        y.push(xdiff[t]);
    }

    (design, y)
}

/// MacKinnon (1994) 近似 p 值，常数项回归
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic.is_nan() || statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }

    let coefficients: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    let z = coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * statistic + c);
    standard_normal_cdf(z)
}

fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

/// 一阶差分：每个元素减去前一个元素，首元素丢弃
pub fn difference(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|w| w[1] - w[0]).collect()
}

/// 序列是否在数值容差内恒定
fn is_flat(values: &[f64], scale: f64) -> bool {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    max - min <= 1e-9 * scale.max(1.0)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// # Summary
/// 平稳性分析器：判定序列是否平稳，并寻找使其平稳的最小差分阶数。
///
/// # Invariants
/// - 差分循环有硬上限 `max_order`，超过即返回 `StationarityNotAchieved`，绝不无界迭代。
/// - 差分过程中不检查方差；常数序列视为平稳。
#[derive(Debug, Clone, Copy)]
pub struct StationarityAnalyzer {
    significance: f64,
    max_order: usize,
}

impl StationarityAnalyzer {
    pub fn new(significance: f64, max_order: usize) -> Self {
        Self {
            significance,
            max_order,
        }
    }

    /// # Summary
    /// 计算序列的 ADF p 值（保留 3 位小数）。
    ///
    /// # Logic
    /// 1. 观测数不足直接报 `InsufficientHistory`。
    /// 2. 常数序列视为平稳，p 值为 0。
    /// 3. 一阶差分恒定（纯线性趋势）视为非平稳，p 值为 1。
    /// 4. 其余情况执行 ADF 检验。
    pub fn p_value(&self, series: &[f64]) -> Result<f64, ForecastError> {
        if series.len() < ADF_MIN_LEN {
            return Err(ForecastError::InsufficientHistory {
                required: ADF_MIN_LEN - 1,
                actual: series.len(),
            });
        }

        let scale = series.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if is_flat(series, scale) {
            return Ok(0.0);
        }
        if is_flat(&difference(series), scale) {
            return Ok(1.0);
        }

        let result = adf_test(series)?;
        debug!(
            "ADF statistic={:.4} p={:.4} lag={} nobs={}",
            result.statistic, result.p_value, result.used_lag, result.nobs
        );
        Ok(round_to(result.p_value, 3))
    }

    /// 是否在给定显著性水平下平稳 (`p <= significance`)
    pub fn is_stationary(&self, series: &[f64]) -> Result<bool, ForecastError> {
        Ok(self.p_value(series)? <= self.significance)
    }

    /// # Summary
    /// 寻找使序列平稳的最小差分阶数。
    ///
    /// # Logic
    /// 1. 从 `d = 0` 开始检验当前序列。
    /// 2. 不平稳则做一次一阶差分，`d += 1` 后重新检验。
    /// 3. `d` 已达上限仍不平稳，或差分后序列短到无法检验，返回 `StationarityNotAchieved`。
    ///
    /// # Arguments
    /// * `series`: 待分析序列。
    ///
    /// # Returns
    /// `(d, 差分 d 次后的序列)`。原始序列过短时返回 `InsufficientHistory`。
    pub fn find_differencing_order(
        &self,
        series: &[f64],
    ) -> Result<(usize, Vec<f64>), ForecastError> {
        let mut current = series.to_vec();
        let mut d = 0;

        loop {
            let p_value = match self.p_value(&current) {
                Ok(p) => p,
                Err(ForecastError::InsufficientHistory { .. }) if d > 0 => {
                    return Err(ForecastError::StationarityNotAchieved {
                        max_order: self.max_order,
                    });
                }
                Err(e) => return Err(e),
            };
            debug!("differencing order {} -> p-value {:.3}", d, p_value);

            if p_value <= self.significance {
                return Ok((d, current));
            }
            if d >= self.max_order {
                return Err(ForecastError::StationarityNotAchieved {
                    max_order: self.max_order,
                });
            }

            current = difference(&current);
            d += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    fn random_walk_with_drift(n: usize, seed: u64) -> Vec<f64> {
        let mut level = 100.0;
        noise(n, seed)
            .into_iter()
            .map(|e| {
                level += 0.5 + e;
                level
            })
            .collect()
    }

    fn analyzer() -> StationarityAnalyzer {
        StationarityAnalyzer::new(0.05, 10)
    }

    #[test]
    fn test_mackinnon_p_value_at_five_percent_critical_value() {
        // 常数项 ADF 的渐近 5% 临界值约为 -2.86
        let p = mackinnon_p_value(-2.86);
        assert!((p - 0.05).abs() < 0.005, "p={p}");
        assert_eq!(mackinnon_p_value(3.0), 1.0);
        assert_eq!(mackinnon_p_value(-25.0), 0.0);
        assert_eq!(mackinnon_p_value(f64::NAN), 1.0);
        // 两段响应面在分界点附近近似连续
        assert!((mackinnon_p_value(-1.6101) - mackinnon_p_value(-1.6099)).abs() < 0.01);
    }

    #[test]
    fn test_white_noise_is_stationary_at_order_zero() {
        let series = noise(300, 7);
        let result = adf_test(&series).unwrap();
        assert!(result.statistic < -5.0, "statistic={}", result.statistic);

        let (d, out) = analyzer().find_differencing_order(&series).unwrap();
        assert_eq!(d, 0);
        assert_eq!(out.len(), 300);
    }

    #[test]
    fn test_random_walk_needs_differencing() {
        let series = random_walk_with_drift(300, 11);
        assert!(!analyzer().is_stationary(&series).unwrap());

        let (d, out) = analyzer().find_differencing_order(&series).unwrap();
        assert!(d >= 1);
        assert_eq!(out.len(), 300 - d);
    }

    #[test]
    fn test_linear_trend_resolves_after_one_difference() {
        let rolling: Vec<f64> = (0..25).map(|i| 103.0 + f64::from(i)).collect();
        assert_eq!(analyzer().p_value(&rolling).unwrap(), 1.0);

        let (d, out) = analyzer().find_differencing_order(&rolling).unwrap();
        assert_eq!(d, 1);
        // 差分后为常数斜率，差分阶段不做方差检查
        assert!(out.iter().all(|v| (v - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_constant_series_is_stationary() {
        assert_eq!(analyzer().p_value(&[5.0; 40]).unwrap(), 0.0);
        assert_eq!(analyzer().find_differencing_order(&[5.0; 40]).unwrap().0, 0);
    }

    #[test]
    fn test_differencing_cap_is_enforced() {
        let series = random_walk_with_drift(200, 3);
        let capped = StationarityAnalyzer::new(0.05, 0);
        let err = capped.find_differencing_order(&series).unwrap_err();
        assert!(matches!(err, ForecastError::StationarityNotAchieved { max_order: 0 }));
    }

    #[test]
    fn test_series_exhausted_by_differencing() {
        // 线性趋势 -> 差分后只剩 3 个点，无法再检验
        let err = analyzer()
            .find_differencing_order(&[1.0, 2.0, 3.0, 4.0])
            .unwrap_err();
        assert!(matches!(err, ForecastError::StationarityNotAchieved { .. }));
    }

    #[test]
    fn test_too_short_before_differencing() {
        let err = analyzer().find_differencing_order(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientHistory { actual: 2, .. }));
        let err = analyzer().find_differencing_order(&[]).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientHistory { actual: 0, .. }));
    }

    #[test]
    fn test_p_value_is_rounded_to_three_decimals() {
        let p = analyzer().p_value(&random_walk_with_drift(150, 5)).unwrap();
        assert!(((p * 1000.0).round() - p * 1000.0).abs() < 1e-9);
    }
}
