use yosoku_core::forecast::error::ForecastError;
use yosoku_core::common::numeric::count_to_f64;

/// # Summary
/// 一次标准化的参数：均值与总体标准差。
///
/// # Invariants
/// - 不实现 `Clone` / `Copy`：参数在 [`inverse`] 中被按值消费，只能用于产生它的那次运行。
/// - `std_dev` 有限且严格为正。
#[derive(Debug, PartialEq)]
pub struct ScalingParameters {
    mean: f64,
    std_dev: f64,
}

impl ScalingParameters {
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }
}

/// # Summary
/// 按 `(x - μ) / σ` 标准化序列。
///
/// # Logic
/// 1. 计算均值与总体标准差（除以 n）。
/// 2. σ 为零（相对容差 1e-12）、非有限或序列为空时拒绝标准化。
///
/// # Returns
/// `(标准化序列, 参数)`；退化序列返回 `DegenerateSeries`。
pub fn fit(series: &[f64]) -> Result<(Vec<f64>, ScalingParameters), ForecastError> {
    if series.is_empty() {
        return Err(ForecastError::DegenerateSeries);
    }

    let n = count_to_f64(series.len());
    let mean = series.iter().sum::<f64>() / n;
    let variance = series.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if !std_dev.is_finite() || std_dev <= 1e-12 * mean.abs().max(1.0) {
        return Err(ForecastError::DegenerateSeries);
    }

    let scaled = series.iter().map(|x| (x - mean) / std_dev).collect();
    Ok((scaled, ScalingParameters { mean, std_dev }))
}

/// 反标准化：`x·σ + μ`，消费参数
pub fn inverse(params: ScalingParameters, scaled: &[f64]) -> Vec<f64> {
    scaled
        .iter()
        .map(|x| x * params.std_dev + params.mean)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_series_has_zero_mean_unit_variance() {
        let series = [101.0, 99.5, 103.2, 98.7, 100.4, 102.9];
        let (scaled, params) = fit(&series).unwrap();

        let n = count_to_f64(scaled.len());
        let mean = scaled.iter().sum::<f64>() / n;
        let var = scaled.iter().map(|x| x.powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
        assert!((params.mean() - 100.95).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_recovers_original_prices() {
        let series: Vec<f64> = (0..50).map(|i| 150.0 + (f64::from(i) * 0.3).sin() * 12.0).collect();
        let (scaled, params) = fit(&series).unwrap();
        let restored = inverse(params, &scaled);

        for (a, b) in series.iter().zip(&restored) {
            assert!((a - b).abs() < 1e-9 * a.abs().max(1.0));
        }
    }

    #[test]
    fn test_degenerate_inputs_are_rejected() {
        assert!(matches!(fit(&[]), Err(ForecastError::DegenerateSeries)));
        assert!(matches!(fit(&[42.0; 10]), Err(ForecastError::DegenerateSeries)));
        assert!(matches!(
            fit(&[1.0, f64::INFINITY]),
            Err(ForecastError::DegenerateSeries)
        ));
    }
}
