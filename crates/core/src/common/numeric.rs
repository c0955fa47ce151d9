//! 计数 (`usize`) 与 `f64` 之间的检查转换。
//!
//! 工作区禁止 `as` 数值转换，统计代码里所有“样本数参与浮点运算”的地方都经由这里。

/// 把计数转换为 `f64`；超过 `u32::MAX` 的计数按 `u32::MAX` 饱和
pub fn count_to_f64(n: usize) -> f64 {
    u32::try_from(n).map_or(f64::from(u32::MAX), f64::from)
}

/// 不小于 `x` 的最小计数，结果不超过 `max`
pub fn ceil_count(x: f64, max: usize) -> usize {
    (0..max).find(|&k| count_to_f64(k) >= x).unwrap_or(max)
}

/// 不大于 `x` 的最大计数，结果不超过 `max`；`x < 0` 时为 0
pub fn floor_count(x: f64, max: usize) -> usize {
    (1..=max).take_while(|&k| count_to_f64(k) <= x).last().unwrap_or(0)
}
