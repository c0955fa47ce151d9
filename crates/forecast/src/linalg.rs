//! 小规模稠密最小二乘，供 ADF 回归与 ARIMA 参数估计使用。

use yosoku_core::common::numeric::count_to_f64;

/// # Summary
/// 一次 (可选岭正则的) 最小二乘回归结果。
///
/// # Invariants
/// - `xtx_inv` 是 `X'X + λI` 的逆；`ridge = 0` 时即普通最小二乘。
#[derive(Debug, Clone)]
pub(crate) struct LeastSquares {
    pub beta: Vec<f64>,
    pub ssr: f64,
    pub nobs: usize,
    xtx_inv: Vec<Vec<f64>>,
}

impl LeastSquares {
    /// 第 `i` 个系数的标准误；自由度不足时返回 NaN
    pub fn standard_error(&self, i: usize) -> f64 {
        let k = self.beta.len();
        if self.nobs <= k || i >= k {
            return f64::NAN;
        }
        let s2 = self.ssr / count_to_f64(self.nobs - k);
        (s2 * self.xtx_inv[i][i]).sqrt()
    }

    /// 高斯似然下的 AIC，与 statsmodels OLS 口径一致
    pub fn aic(&self) -> f64 {
        let n = count_to_f64(self.nobs);
        let k = count_to_f64(self.beta.len());
        n * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0) + 2.0 * k
    }

    /// 用拟合系数计算单行预测值
    pub fn predict(&self, row: &[f64]) -> f64 {
        row.iter().zip(&self.beta).map(|(x, b)| x * b).sum()
    }
}

/// # Summary
/// 求解 `min ||y - Xβ||² + λ·s·||β||²`，其中 `s` 为 `X'X` 对角线均值。
///
/// # Logic
/// 1. 累加正规方程 `X'X` 与 `X'y`。
/// 2. 在对角线上加相对岭项。
/// 3. 部分主元 Gauss-Jordan 求逆，主元过小判定为奇异。
/// 4. 回代得到系数与残差平方和。
///
/// # Arguments
/// * `design`: 设计矩阵，每行一条观测。
/// * `y`: 因变量。
/// * `ridge`: 相对岭系数，`0` 表示普通最小二乘。
///
/// # Returns
/// 维度不一致、无观测或矩阵奇异时返回 None。
pub(crate) fn least_squares(design: &[Vec<f64>], y: &[f64], ridge: f64) -> Option<LeastSquares> {
    let nobs = design.len();
    let k = design.first()?.len();
    if nobs == 0 || k == 0 || y.len() != nobs || design.iter().any(|row| row.len() != k) {
        return None;
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &target) in design.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * target;
            for j in i..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    if ridge > 0.0 {
        let scale = (0..k).map(|i| xtx[i][i]).sum::<f64>() / count_to_f64(k);
        let penalty = ridge * if scale > 0.0 { scale } else { 1.0 };
        for (i, row) in xtx.iter_mut().enumerate() {
            row[i] += penalty;
        }
    }

    let xtx_inv = invert(xtx)?;
    let beta: Vec<f64> = xtx_inv
        .iter()
        .map(|row| row.iter().zip(&xty).map(|(a, b)| a * b).sum())
        .collect();

    let ssr = design
        .iter()
        .zip(y)
        .map(|(row, &target)| {
            let fitted: f64 = row.iter().zip(&beta).map(|(x, b)| x * b).sum();
            (target - fitted).powi(2)
        })
        .sum();

    Some(LeastSquares {
        beta,
        ssr,
        nobs,
        xtx_inv,
    })
}

/// 部分主元 Gauss-Jordan 求逆
fn invert(mut a: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if !scale.is_finite() || scale == 0.0 {
        return None;
    }
    let eps = scale * 1e-13;

    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))?;
        if a[pivot_row][col].abs() <= eps {
            return None;
        }
        a.swap(col, pivot_row);
        inv.swap(col, pivot_row);

        let pivot = a[col][col];
        for j in 0..n {
            a[col][j] /= pivot;
            inv[col][j] /= pivot;
        }

        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = a[r][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[r][j] -= factor * a[col][j];
                inv[r][j] -= factor * inv[col][j];
            }
        }
    }

    Some(inv)
}
