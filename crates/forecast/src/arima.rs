//! ARIMA(p, d, q) 估计与递推预测。
//!
//! 估计采用 Hannan-Rissanen 两阶段最小二乘：先用长自回归的残差近似不可观测的新息，
//! 再对 `w_t ~ w_t-1..w_t-p + e_t-1..e_t-q` 做回归；之后以条件平方和 (CSS) 残差
//! 反复替换新息代理，直到残差方差不再明显改善。
//!
//! 每个候选估计都被约束在平稳、可逆区域内：AR 与 MA 的逆根模不超过 `MAX_ROOT_RADIUS`，
//! 且零新息外推路径不超出样本的幅度范围，否则整体收缩逆根后重算。

use crate::linalg::least_squares;
use crate::polynomial;
use crate::stationarity::difference;
use tracing::{debug, warn};
use yosoku_core::common::numeric::{count_to_f64, floor_count};
use yosoku_core::forecast::error::ForecastError;

// AR 与 MA 逆根的最大模
const MAX_ROOT_RADIUS: f64 = 0.97;
// CSS 残差方差超过差分序列二阶矩的该倍数即视为发散
const EXPLOSION_FACTOR: f64 = 10.0;
// 候选不可接受时每轮对全部逆根的收缩比例与最大轮数
const ROOT_SHRINK: f64 = 0.9;
const MAX_SHRINK_ROUNDS: usize = 50;

/// ARIMA 阶数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// 拟合所需的最少观测数（不含）：`2·(p+q) + d`
    pub fn min_observations(&self) -> usize {
        2 * (self.p + self.q) + self.d
    }
}

/// # Summary
/// 参数估计的数值选项。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimationOptions {
    // 迭代精化的最大轮数
    pub max_iterations: usize,
    // 残差方差相对改善的收敛阈值
    pub tolerance: f64,
    // 最小二乘的相对岭系数
    pub ridge: f64,
}

impl Default for EstimationOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 1e-4,
            ridge: 1e-4,
        }
    }
}

/// # Summary
/// 已拟合的 ARIMA 模型。
///
/// # Invariants
/// - 只在一次流水线运行内存在，不跨请求缓存或共享。
/// - `level_tails[k]` 是差分 `k` 次后序列的最后一个值，用于预测值的逐级积分还原。
/// - `mean` 只在 `d = 0` 时非零。
#[derive(Debug, Clone)]
pub struct FittedArima {
    order: ArimaOrder,
    ar: Vec<f64>,
    ma: Vec<f64>,
    mean: f64,
    sigma2: f64,
    iterations: usize,
    // 差分并去均值后的序列
    stationary: Vec<f64>,
    residuals: Vec<f64>,
    level_tails: Vec<f64>,
}

/// 候选参数及其 CSS 残差
struct Candidate {
    ar: Vec<f64>,
    ma: Vec<f64>,
    residuals: Vec<f64>,
    sigma2: f64,
    accepted: bool,
}

/// 候选估计的可接受范围，由差分后的序列决定
struct Admissibility {
    // CSS 残差方差上限
    max_sigma2: f64,
    // 零新息外推路径的幅度上限：样本的最大绝对值
    max_level: f64,
}

impl Admissibility {
    fn new(w: &[f64]) -> Self {
        Self {
            max_sigma2: EXPLOSION_FACTOR * second_moment(w).max(f64::MIN_POSITIVE),
            max_level: w.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())),
        }
    }

    /// AR 平稳、MA 可逆、残差方差有界，且外推 `len(w)` 步不越过样本幅度
    fn accepts(&self, w: &[f64], ar: &[f64], ma: &[f64], residuals: &[f64], sigma2: f64) -> bool {
        if !(sigma2.is_finite() && sigma2 <= self.max_sigma2) {
            return false;
        }
        let ar_poly: Vec<f64> = ar.iter().map(|a| -a).collect();
        if !polynomial::is_stable(&ar_poly) || !polynomial::is_stable(ma) {
            return false;
        }
        project(w, residuals, ar, ma, w.len())
            .iter()
            .all(|v| v.abs() <= self.max_level)
    }
}

fn second_moment(w: &[f64]) -> f64 {
    w.iter().map(|v| v * v).sum::<f64>() / count_to_f64(w.len())
}

/// # Summary
/// 在给定序列上估计 ARIMA(p, d, q)。
///
/// # Logic
/// 1. 校验：所有值有限，且 `len > 2·(p+q) + d`。
/// 2. 差分 `d` 次并记录每一级的末值；`d = 0` 时去均值。
/// 3. `q > 0` 时拟合长自回归得到新息代理，否则直接做 AR 最小二乘。
/// 4. 第二阶段回归得到初始 AR/MA 系数，计算 CSS 残差。
/// 5. 以 CSS 残差为新息代理迭代重估，残差方差不再改善或改善低于 `tolerance` 即停止。
/// 6. 每个候选先把逆根压入半径 `MAX_ROOT_RADIUS` 内；仍不可接受（残差发散或外推越界）
///    时逐轮收缩全部逆根。
///
/// # Arguments
/// * `series`: 训练序列（通常为标准化后的滚动均值）。
/// * `order`: 模型阶数。
/// * `options`: 数值选项。
///
/// # Returns
/// 参数非有限、回归奇异、序列过短，或收缩后仍找不到可接受的估计时返回 `ModelFitError`。
pub fn fit(
    series: &[f64],
    order: ArimaOrder,
    options: &EstimationOptions,
) -> Result<FittedArima, ForecastError> {
    if series.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::ModelFitError(
            "training series contains non-finite values".to_string(),
        ));
    }
    if series.len() <= order.min_observations() {
        return Err(ForecastError::ModelFitError(format!(
            "ARIMA({},{},{}) needs more than {} observations, got {}",
            order.p,
            order.d,
            order.q,
            order.min_observations(),
            series.len()
        )));
    }

    let mut stationary = series.to_vec();
    let mut level_tails = Vec::with_capacity(order.d);
    for _ in 0..order.d {
        let last = stationary
            .last()
            .copied()
            .ok_or_else(|| ForecastError::ModelFitError("series exhausted by differencing".to_string()))?;
        level_tails.push(last);
        stationary = difference(&stationary);
    }

    let mean = if order.d == 0 {
        stationary.iter().sum::<f64>() / count_to_f64(stationary.len())
    } else {
        0.0
    };
    for v in &mut stationary {
        *v -= mean;
    }

    let (best, iterations) = estimate(&stationary, order, options)?;

    if !best.sigma2.is_finite() || best.ar.iter().chain(&best.ma).any(|c| !c.is_finite()) {
        return Err(ForecastError::ModelFitError(format!(
            "ARIMA({},{},{}) estimation produced non-finite parameters",
            order.p, order.d, order.q
        )));
    }
    if !best.accepted {
        return Err(ForecastError::ModelFitError(format!(
            "ARIMA({},{},{}) has no stationary, invertible estimate with a bounded forecast path",
            order.p, order.d, order.q
        )));
    }

    debug!(
        "ARIMA({},{},{}) fitted on {} points: sigma2={:.6}, iterations={}",
        order.p,
        order.d,
        order.q,
        stationary.len(),
        best.sigma2,
        iterations
    );

    Ok(FittedArima {
        order,
        ar: best.ar,
        ma: best.ma,
        mean,
        sigma2: best.sigma2,
        iterations,
        stationary,
        residuals: best.residuals,
        level_tails,
    })
}

fn estimate(
    w: &[f64],
    order: ArimaOrder,
    options: &EstimationOptions,
) -> Result<(Candidate, usize), ForecastError> {
    let (p, q) = (order.p, order.q);

    if p == 0 && q == 0 {
        return Ok((
            Candidate {
                ar: Vec::new(),
                ma: Vec::new(),
                residuals: w.to_vec(),
                sigma2: second_moment(w),
                accepted: true,
            },
            0,
        ));
    }

    let singular = || {
        ForecastError::ModelFitError(format!(
            "ARIMA({},{},{}) regression is singular",
            order.p, order.d, order.q
        ))
    };

    let (proxies, first_valid) = if q > 0 {
        long_ar_residuals(w, p.max(q), options.ridge).ok_or_else(singular)?
    } else {
        (vec![0.0; w.len()], 0)
    };

    let (ar, ma) = regress_arma(w, &proxies, first_valid, p, q, options.ridge).ok_or_else(singular)?;
    let limits = Admissibility::new(w);
    let mut best = admissible(w, ar, ma, &limits);

    if q == 0 {
        return Ok((best, 0));
    }

    let mut iterations = 0;
    let mut converged = false;
    while iterations < options.max_iterations {
        iterations += 1;
        let Some((ar, ma)) = regress_arma(w, &best.residuals, p, p, q, options.ridge) else {
            debug!("refinement round {} is singular, keeping previous estimate", iterations);
            converged = true;
            break;
        };
        let candidate = admissible(w, ar, ma, &limits);

        if !best.accepted {
            if candidate.accepted {
                best = candidate;
            }
            continue;
        }
        if !candidate.accepted || candidate.sigma2 >= best.sigma2 {
            converged = true;
            break;
        }

        let improvement = (best.sigma2 - candidate.sigma2) / best.sigma2;
        best = candidate;
        if improvement < options.tolerance {
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(
            "ARIMA({},{},{}) refinement stopped after {} iterations without converging (sigma2={:.6})",
            order.p, order.d, order.q, iterations, best.sigma2
        );
    }

    Ok((best, iterations))
}

/// 长自回归残差，作为新息的代理；返回 `(残差, 首个有效下标)`
fn long_ar_residuals(w: &[f64], max_order: usize, ridge: f64) -> Option<(Vec<f64>, usize)> {
    let n = w.len();
    let ln = count_to_f64(n).ln();
    let m = floor_count(ln * ln, n)
        .max(2 * max_order)
        .min((n - 1) / 2)
        .max(1);

    let design: Vec<Vec<f64>> = (m..n).map(|t| (1..=m).map(|i| w[t - i]).collect()).collect();
    let y: Vec<f64> = w[m..].to_vec();
    let fit = least_squares(&design, &y, ridge)?;

    let mut residuals = vec![0.0; n];
    for (t, row) in (m..n).zip(&design) {
        residuals[t] = w[t] - fit.predict(row);
    }
    Some((residuals, m))
}

/// 第二阶段回归：`w_t ~ w_t-1..w_t-p + e_t-1..e_t-q`，样本从 `max(first_valid + q, p)` 开始
fn regress_arma(
    w: &[f64],
    innovations: &[f64],
    first_valid: usize,
    p: usize,
    q: usize,
    ridge: f64,
) -> Option<(Vec<f64>, Vec<f64>)> {
    let start = (first_valid + q).max(p);
    let design: Vec<Vec<f64>> = (start..w.len())
        .map(|t| {
            (1..=p)
                .map(|i| w[t - i])
                .chain((1..=q).map(|j| innovations[t - j]))
                .collect()
        })
        .collect();
    let y: Vec<f64> = w.get(start..)?.to_vec();

    let fit = least_squares(&design, &y, ridge)?;
    let (ar, ma) = fit.beta.split_at(p);
    Some((ar.to_vec(), ma.to_vec()))
}

/// 条件平方和残差：前 `p` 个残差取 0
fn css_candidate(w: &[f64], ar: Vec<f64>, ma: Vec<f64>, limits: &Admissibility) -> Candidate {
    let p = ar.len();
    let mut residuals = vec![0.0; w.len()];
    for t in p..w.len() {
        let ar_part: f64 = ar.iter().enumerate().map(|(i, a)| a * w[t - i - 1]).sum();
        let ma_part: f64 = ma
            .iter()
            .enumerate()
            .filter(|(j, _)| *j < t)
            .map(|(j, b)| b * residuals[t - j - 1])
            .sum();
        residuals[t] = w[t] - ar_part - ma_part;
    }

    let tail = &residuals[p..];
    let sigma2 = if tail.is_empty() {
        f64::NAN
    } else {
        second_moment(tail)
    };
    let accepted = limits.accepts(w, &ar, &ma, &residuals, sigma2);

    Candidate {
        ar,
        ma,
        residuals,
        sigma2,
        accepted,
    }
}

/// 把回归系数变成可接受的候选：先压入逆根半径上限，再视需要逐轮收缩
fn admissible(w: &[f64], mut ar: Vec<f64>, mut ma: Vec<f64>, limits: &Admissibility) -> Candidate {
    constrain_roots(&mut ar, &mut ma);
    let mut candidate = css_candidate(w, ar, ma, limits);

    for round in 1..=MAX_SHRINK_ROUNDS {
        if candidate.accepted {
            break;
        }
        let Candidate { mut ar, mut ma, .. } = candidate;
        polynomial::contract(&mut ar, ROOT_SHRINK);
        polynomial::contract(&mut ma, ROOT_SHRINK);
        debug!("ARMA candidate rejected, contracting roots (round {})", round);
        candidate = css_candidate(w, ar, ma, limits);
    }

    candidate
}

/// AR 非平稳或 MA 不可逆时，把全部逆根等比压到半径 `MAX_ROOT_RADIUS`
fn constrain_roots(ar: &mut [f64], ma: &mut [f64]) {
    let ar_poly: Vec<f64> = ar.iter().map(|a| -a).collect();
    let ar_radius = polynomial::spectral_radius(&ar_poly);
    if ar_radius > MAX_ROOT_RADIUS {
        debug!("AR part not stationary (radius {:.3}), contracting roots", ar_radius);
        polynomial::contract(ar, MAX_ROOT_RADIUS / ar_radius);
    }

    let ma_radius = polynomial::spectral_radius(ma);
    if ma_radius > MAX_ROOT_RADIUS {
        debug!("MA part not invertible (radius {:.3}), contracting roots", ma_radius);
        polynomial::contract(ma, MAX_ROOT_RADIUS / ma_radius);
    }
}

/// 零新息外推：在 `w` 之后按 ARMA 方程递推 `steps` 步
fn project(w: &[f64], residuals: &[f64], ar: &[f64], ma: &[f64], steps: usize) -> Vec<f64> {
    let n = w.len();
    let mut path = w.to_vec();
    path.reserve(steps);
    let mut e = residuals.to_vec();
    e.resize(n + steps, 0.0);

    for t in n..n + steps {
        let ar_part: f64 = ar
            .iter()
            .enumerate()
            .filter(|(i, _)| *i < t)
            .map(|(i, a)| a * path[t - i - 1])
            .sum();
        let ma_part: f64 = ma
            .iter()
            .enumerate()
            .filter(|(j, _)| *j < t)
            .map(|(j, b)| b * e[t - j - 1])
            .sum();
        path.push(ar_part + ma_part);
    }
    path.split_off(n)
}

impl FittedArima {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// # Summary
    /// 向前递推 `steps` 步点预测。
    ///
    /// # Logic
    /// 1. 未来新息取 0，在平稳序列上按 ARMA 方程递推。
    /// 2. 加回均值。
    /// 3. 按差分级别由深到浅，以各级末值为起点做累加积分。
    ///
    /// # Returns
    /// 长度为 `steps` 的原尺度预测；出现非有限值时返回 `ModelFitError`。
    pub fn forecast(&self, steps: usize) -> Result<Vec<f64>, ForecastError> {
        let mut out: Vec<f64> = project(&self.stationary, &self.residuals, &self.ar, &self.ma, steps)
            .into_iter()
            .map(|v| v + self.mean)
            .collect();
        for &tail in self.level_tails.iter().rev() {
            let mut level = tail;
            for v in &mut out {
                level += *v;
                *v = level;
            }
        }

        if out.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ModelFitError(format!(
                "ARIMA({},{},{}) forecast diverged",
                self.order.p, self.order.d, self.order.q
            )));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    fn shocks(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    fn arma_1_1(n: usize, phi: f64, theta: f64, seed: u64) -> Vec<f64> {
        let e = shocks(n + 100, seed);
        let mut x = vec![0.0; n + 100];
        for t in 1..x.len() {
            x[t] = phi * x[t - 1] + e[t] + theta * e[t - 1];
        }
        x.split_off(100)
    }

    #[test]
    fn test_ar1_coefficient_is_recovered() {
        let series = arma_1_1(500, 0.7, 0.0, 42);
        let model = fit(&series, ArimaOrder::new(1, 0, 0), &EstimationOptions::default()).unwrap();
        assert!((model.ar_coefficients()[0] - 0.7).abs() < 0.1);
        assert!(model.ma_coefficients().is_empty());
        assert!((model.sigma2() - 1.0).abs() < 0.2);
    }

    #[test]
    fn test_arma11_coefficients_are_recovered() {
        let series = arma_1_1(2000, 0.5, 0.3, 9);
        let model = fit(&series, ArimaOrder::new(1, 0, 1), &EstimationOptions::default()).unwrap();
        assert!((model.ar_coefficients()[0] - 0.5).abs() < 0.15);
        assert!((model.ma_coefficients()[0] - 0.3).abs() < 0.15);
        assert!(model.iterations() <= 10);
    }

    #[test]
    fn test_random_walk_model_forecasts_last_value() {
        let series = [10.0, 12.0, 11.0, 13.0, 14.5];
        let model = fit(&series, ArimaOrder::new(0, 1, 0), &EstimationOptions::default()).unwrap();
        let forecast = model.forecast(5).unwrap();
        assert_eq!(forecast, vec![14.5; 5]);
    }

    #[test]
    fn test_twice_integrated_zero_model_extends_linear_trend() {
        let series: Vec<f64> = (0..10).map(|i| 2.0 * f64::from(i) + 1.0).collect();
        let model = fit(&series, ArimaOrder::new(0, 2, 0), &EstimationOptions::default()).unwrap();
        let forecast = model.forecast(3).unwrap();
        let expected = [21.0, 23.0, 25.0];
        for (a, b) in forecast.iter().zip(expected) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_high_order_fit_on_random_walk_is_finite() {
        let mut level = 0.0;
        let series: Vec<f64> = shocks(400, 5)
            .into_iter()
            .map(|e| {
                level += 0.1 + e;
                level
            })
            .collect();
        let model = fit(&series, ArimaOrder::new(10, 1, 10), &EstimationOptions::default()).unwrap();
        let forecast = model.forecast(30).unwrap();
        assert_eq!(forecast.len(), 30);
        assert!(forecast.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_high_order_fit_is_stationary_and_invertible() {
        let mut level = 0.0;
        let series: Vec<f64> = shocks(300, 11)
            .into_iter()
            .map(|e| {
                level += e;
                level
            })
            .collect();
        let model = fit(&series, ArimaOrder::new(30, 1, 30), &EstimationOptions::default()).unwrap();

        let ar_poly: Vec<f64> = model.ar_coefficients().iter().map(|a| -a).collect();
        assert!(polynomial::spectral_radius(&ar_poly) <= MAX_ROOT_RADIUS + 1e-9);
        assert!(polynomial::spectral_radius(model.ma_coefficients()) <= MAX_ROOT_RADIUS + 1e-9);

        // 一阶差分的外推不越过样本幅度，30 步内的水平移动有界
        let max_step = series.windows(2).map(|w| (w[1] - w[0]).abs()).fold(0.0, f64::max);
        let last = series[series.len() - 1];
        for (h, v) in model.forecast(30).unwrap().iter().enumerate() {
            assert!((v - last).abs() <= max_step * count_to_f64(h + 1) + 1e-9);
        }
    }

    #[test]
    fn test_explosive_candidate_is_pulled_into_stationary_region() {
        let w = arma_1_1(200, 0.5, 0.0, 3);
        let limits = Admissibility::new(&w);
        let candidate = admissible(&w, vec![1.5], vec![-2.0], &limits);

        assert!(candidate.accepted);
        assert!(candidate.ar[0].abs() <= MAX_ROOT_RADIUS + 1e-9);
        assert!(candidate.ma[0].abs() <= MAX_ROOT_RADIUS + 1e-9);
        assert!(candidate.sigma2.is_finite());
    }

    #[test]
    fn test_short_series_is_rejected() {
        let series: Vec<f64> = (0..21).map(f64::from).collect();
        let err = fit(&series, ArimaOrder::new(5, 1, 5), &EstimationOptions::default()).unwrap_err();
        assert!(matches!(err, ForecastError::ModelFitError(_)));
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let mut series = shocks(100, 1);
        series[50] = f64::NAN;
        let err = fit(&series, ArimaOrder::new(1, 0, 0), &EstimationOptions::default()).unwrap_err();
        assert!(matches!(err, ForecastError::ModelFitError(_)));
    }
}
