//! 滞后多项式 `1 + c1·z + ... + ck·z^k` 的根位置判定与收缩。
//!
//! 对 AR 部分传入 `-φ`，对 MA 部分直接传入 `θ`。“逆根”指多项式根的倒数，
//! 其最大模即伴随矩阵的谱半径；全部逆根落在单位圆内等价于 AR 平稳 / MA 可逆。

// 谱半径二分的轮数，精度约为上界的 2^-60
const BISECTION_ROUNDS: usize = 60;

/// # Summary
/// Schur-Cohn（Levinson 降阶）判定：全部逆根严格落在单位圆内。
///
/// # Logic
/// 从最高阶开始，最高次系数即反射系数 `k_m`，要求 `|k_m| < 1`；
/// 随后降阶 `c'_i = (c_i - k_m·c_{m-i}) / (1 - k_m²)`，直到阶数为 0。
/// 出现非有限值时判为不稳定。
pub(crate) fn is_stable(coeffs: &[f64]) -> bool {
    let mut current = coeffs.to_vec();
    while let Some(&k) = current.last() {
        if !(k.abs() < 1.0) {
            return false;
        }
        let m = current.len();
        let denom = 1.0 - k * k;
        current = (0..m - 1)
            .map(|i| (current[i] - k * current[m - 2 - i]) / denom)
            .collect();
    }
    true
}

/// # Summary
/// 逆根的最大模（谱半径）。
///
/// # Logic
/// 系数 `c_i` 换成 `c_i / r^i` 后逆根整体缩小为 `1/r` 倍，
/// 因而“缩放后稳定”对 `r` 单调，在 `[0, 1 + max|c_i|]`（Cauchy 界）上二分即可。
pub(crate) fn spectral_radius(coeffs: &[f64]) -> f64 {
    if coeffs.iter().all(|c| *c == 0.0) {
        return 0.0;
    }
    let mut lo = 0.0;
    let mut hi = 1.0 + coeffs.iter().fold(0.0_f64, |acc, c| acc.max(c.abs()));
    if !hi.is_finite() {
        return f64::INFINITY;
    }

    let mut scaled = vec![0.0; coeffs.len()];
    for _ in 0..BISECTION_ROUNDS {
        let mid = 0.5 * (lo + hi);
        let mut power = 1.0;
        for (s, c) in scaled.iter_mut().zip(coeffs) {
            power /= mid;
            *s = c * power;
        }
        if is_stable(&scaled) {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    hi
}

/// 把全部逆根按 `factor` 等比收缩：`c_i ← c_i · factor^i`
pub(crate) fn contract(coeffs: &mut [f64], factor: f64) {
    let mut power = 1.0;
    for c in coeffs {
        power *= factor;
        *c *= power;
    }
}
